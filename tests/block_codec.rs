//! 块级编解码集成测试.
//!
//! 覆盖:
//! - 零残差块与已知码字
//! - 全部块类别、各 nC 区间的编解码重建一致性
//! - 比特段队列打包为字节后再解码
//! - 非法码流与非法参数的错误类别

use avcref::codec::cavlc::{decode_scan, encode_scan};
use avcref::codec::{
    BlockClass, BlockContext, CoeffTokenTable, DcHold, NeighborCounts, QuantParams, decode_block,
    encode_block, zigzag_scan,
};
use avcref::core::{AvcError, BitRunQueue};

const ALL_CLASSES: [BlockClass; 7] = [
    BlockClass::Luma4x4,
    BlockClass::LumaAc,
    BlockClass::CbAc,
    BlockClass::CrAc,
    BlockClass::CbDc,
    BlockClass::CrDc,
    BlockClass::LumaDc,
];

/// 邻居计数工作区: 左列 4 项, 上行 4 项
struct Neighbors {
    left: [i8; 4],
    above: [i8; 4],
}

impl Neighbors {
    fn with(left: i8, above: i8) -> Self {
        Self {
            left: [left; 4],
            above: [above; 4],
        }
    }

    fn counts(&mut self) -> NeighborCounts<'_> {
        NeighborCounts::new(&mut self.left, &mut self.above)
    }
}

/// 确定性的伪随机样本
fn pattern(seed: u32, base: i32, spread: i32) -> [i32; 16] {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    let mut out = [0i32; 16];
    for v in &mut out {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        *v = base + (state % (2 * spread as u32 + 1)) as i32 - spread;
    }
    out
}

fn run_block(
    class: BlockClass,
    qp: u8,
    orig: &[i32; 16],
    reference: &[i32; 16],
    nc: (i8, i8),
) -> (avcref::codec::EncodedBlock, avcref::codec::DecodedBlock) {
    let ctx = BlockContext::new(qp, class, 0);
    let params = QuantParams::new(96, 0);

    let mut enc_nb = Neighbors::with(nc.0, nc.1);
    let mut enc_hold = DcHold::new();
    let enc = encode_block(&ctx, params, orig, reference, &mut enc_nb.counts(), &mut enc_hold)
        .unwrap_or_else(|e| panic!("{:?} 编码失败: {}", class, e));

    let mut dec_nb = Neighbors::with(nc.0, nc.1);
    let mut dec_hold = DcHold::new();
    let dec = decode_block(
        &ctx,
        Some(&enc.queue),
        0,
        reference,
        &mut dec_nb.counts(),
        &mut dec_hold,
    )
    .unwrap_or_else(|e| panic!("{:?} 解码失败: {}", class, e));

    assert_eq!(enc_nb.left, dec_nb.left, "{:?}: 左邻计数更新应一致", class);
    assert_eq!(enc_nb.above, dec_nb.above, "{:?}: 上邻计数更新应一致", class);
    if class.is_dc() {
        assert_eq!(enc_hold, dec_hold, "{:?}: DC 暂存应一致", class);
    }
    (enc, dec)
}

#[test]
fn test_zero_residual_block() {
    let pred = [77i32; 16];
    let (enc, dec) = run_block(BlockClass::Luma4x4, 26, &pred, &pred, (0, 0));
    assert_eq!(enc.queue.to_bit_string(), "1", "零残差块只有 1 位 coeff_token");
    assert_eq!(enc.num_coeff, 0);
    assert_eq!(enc.bit_count, 1);
    assert_eq!((enc.sad, enc.ssd), (0, 0));
    assert_eq!(dec.coeffs, [0; 16]);
    assert_eq!(dec.recon, Some([77u8; 16]), "重建应等于预测");
    assert_eq!(dec.bits_consumed, 1);
}

#[test]
fn test_known_codeword() {
    // 扫描 [1, -1, 1, 0, ...], nC=0
    let mut scan = [0i32; 16];
    scan[..3].copy_from_slice(&[1, -1, 1]);
    let mut queue = BitRunQueue::new();
    let info = encode_scan(&scan, CoeffTokenTable::Nc0To1, &mut queue)
        .unwrap_or_else(|e| panic!("编码失败: {}", e));
    assert_eq!(queue.to_bit_string(), "000110100101");
    assert_eq!((info.num_coeff, info.trailing_ones, info.total_zeros), (3, 3, 0));

    let dec = decode_scan(&queue, 0, 16, CoeffTokenTable::Nc0To1)
        .unwrap_or_else(|e| panic!("解码失败: {}", e));
    assert_eq!(dec.scan, scan);
    assert_eq!(dec.bits_consumed, 12);
}

#[test]
fn test_every_class_and_nc_bucket() {
    for (k, class) in ALL_CLASSES.into_iter().enumerate() {
        for (n, nc) in [0i8, 1, 2, 3, 4, 7, 8].into_iter().enumerate() {
            for qp in [12u8, 28, 40] {
                let seed = (k * 31 + n * 7) as u32 + u32::from(qp);
                let (orig, reference) = if class.is_chroma_dc() {
                    // 色度 DC 只用网格位置 0/2/8/10
                    let sums = pattern(seed, 1600, 600);
                    let mut grid = [0i32; 16];
                    for pos in [0, 2, 8, 10] {
                        grid[pos] = sums[pos];
                    }
                    (grid, [0i32; 16])
                } else if class.is_dc() {
                    // 亮度 DC 输入为块样本和, 量级更大
                    (pattern(seed, 1600, 600), [0i32; 16])
                } else {
                    (pattern(seed, 128, 40), pattern(seed + 1, 120, 10))
                };
                let (enc, dec) = run_block(class, qp, &orig, &reference, (nc, nc));

                // 只比较实际编码的扫描位置
                let coded = class.max_coeff();
                assert_eq!(
                    zigzag_scan(&dec.coeffs, class)[..coded],
                    zigzag_scan(&enc.coeffs, class)[..coded],
                    "{:?} nC={} qp={}: 系数",
                    class,
                    nc,
                    qp
                );
                assert_eq!(dec.num_coeff, enc.num_coeff);
                assert_eq!(dec.recon, enc.recon, "{:?} nC={} qp={}: 重建", class, nc, qp);
                assert_eq!(dec.bits_consumed, enc.bit_count);
                assert_eq!(enc.bit_count, enc.queue.total_bits());
                assert_eq!(enc.recon.is_none(), class.is_dc(), "DC 类别不直接产生样本");
            }
        }
    }
}

#[test]
fn test_packed_bytes_decode() {
    let orig = pattern(9, 140, 60);
    let reference = [128i32; 16];
    let (enc, _) = run_block(BlockClass::Luma4x4, 20, &orig, &reference, (2, 2));

    let bytes = enc.queue.to_bytes();
    assert_eq!(bytes.len(), enc.bit_count.div_ceil(8));
    let queue = BitRunQueue::from_bytes(&bytes, enc.bit_count)
        .unwrap_or_else(|e| panic!("还原队列失败: {}", e));
    assert_eq!(queue.to_bit_string(), enc.queue.to_bit_string());

    let ctx = BlockContext::new(20, BlockClass::Luma4x4, 0);
    let mut nb = Neighbors::with(2, 2);
    let mut hold = DcHold::new();
    let dec = decode_block(&ctx, Some(&queue), 0, &reference, &mut nb.counts(), &mut hold)
        .unwrap_or_else(|e| panic!("解码失败: {}", e));
    assert_eq!(dec.recon, enc.recon);
}

#[test]
fn test_malformed_stream_is_invalid_data() {
    // nC >= 8 表中不存在的 6 位码字
    let mut queue = BitRunQueue::new();
    queue
        .push_bits(0b000010, 6)
        .unwrap_or_else(|e| panic!("写入失败: {}", e));
    let ctx = BlockContext::new(26, BlockClass::Luma4x4, 0);
    let mut nb = Neighbors::with(8, 8);
    let mut hold = DcHold::new();
    let err = decode_block(&ctx, Some(&queue), 0, &[0; 16], &mut nb.counts(), &mut hold)
        .expect_err("非法码字应报错");
    assert!(matches!(err, AvcError::InvalidData(_)), "实际错误: {:?}", err);
}

#[test]
fn test_invalid_arguments() {
    let mut nb = Neighbors::with(0, 0);
    let mut hold = DcHold::new();
    let orig = [0i32; 16];

    // 色度 AC 块只有 4 个
    let ctx = BlockContext::new(26, BlockClass::CbAc, 4);
    let err = encode_block(&ctx, QuantParams::default(), &orig, &orig, &mut nb.counts(), &mut hold)
        .expect_err("块序号越界应报错");
    assert!(matches!(err, AvcError::InvalidArgument(_)));

    let ctx = BlockContext::new(52, BlockClass::Luma4x4, 0);
    let err = encode_block(&ctx, QuantParams::default(), &orig, &orig, &mut nb.counts(), &mut hold)
        .expect_err("qp 越界应报错");
    assert!(matches!(err, AvcError::InvalidArgument(_)));
}

#[test]
fn test_queue_overflow() {
    let mut queue = BitRunQueue::new();
    for _ in 0..64 {
        queue.push_bits(1, 1).unwrap_or_else(|e| panic!("写入失败: {}", e));
    }
    let err = queue.push_bits(1, 1).expect_err("第 65 段应溢出");
    assert!(matches!(err, AvcError::QueueOverflow { capacity: 64 }));
}
