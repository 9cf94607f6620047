//! 宏块重建与去块滤波流水集成测试.
//!
//! 目标:
//! 1. 编码端与解码端逐宏块重建, 再经同一去块滤波后逐字节一致;
//! 2. 宏块边界强度随宏块类型、运动矢量变化;
//! 3. 环形缓冲与上行缓存在多行、多帧之间状态正确;
//! 4. 低 qp 下重建误差不超过量化步长决定的上限.

use avcref::codec::{
    DeblockCtx, DeblockParams, LumaMode, MacroblockCoder, MacroblockHeader, MbType, MotionVector,
    NonzeroCounts, Plane, Planes, QuantParams,
};
use avcref::core::AvcError;

const MB_WIDTH: usize = 3;
const MB_HEIGHT: usize = 2;

fn must<T>(result: avcref::core::AvcResult<T>, what: &str) -> T {
    result.unwrap_or_else(|e| panic!("{}失败: {}", what, e))
}

/// 带纹理的原始图像
fn textured_planes(mb_width: usize, mb_height: usize) -> Planes {
    let mut planes = must(Planes::new(mb_width, mb_height, 0), "创建图像");
    for plane in Plane::ALL {
        let stride = planes.stride(plane);
        for (i, v) in planes.plane_mut(plane).iter_mut().enumerate() {
            let (x, y) = (i % stride, i / stride);
            *v = (30 + (x * 5 + y * 9 + (x * y) % 23) % 190) as u8;
        }
    }
    planes
}

/// 每个宏块单一灰度, 亮度与色度在宏块之间形成 60 -> 64 的台阶
fn stepped_planes(mb_width: usize, mb_height: usize) -> Planes {
    let mut planes = must(Planes::new(mb_width, mb_height, 0), "创建图像");
    for plane in Plane::ALL {
        let stride = planes.stride(plane);
        let size = plane.mb_size();
        for (i, v) in planes.plane_mut(plane).iter_mut().enumerate() {
            let mbx = (i % stride) / size;
            *v = (60 + 4 * mbx) as u8;
        }
    }
    planes
}

/// 按光栅顺序排列的宏块头
fn frame_headers() -> Vec<MacroblockHeader> {
    let types = [
        MbType::Intra,
        MbType::Inter,
        MbType::Skip,
        MbType::Inter,
        MbType::Ipcm,
        MbType::Intra,
    ];
    let mut headers = Vec::new();
    for mby in 0..MB_HEIGHT {
        for mbx in 0..MB_WIDTH {
            let k = mby * MB_WIDTH + mbx;
            let mut hdr = MacroblockHeader::new(mbx, mby, types[k], 22 + 3 * k as u8);
            hdr.mv = MotionVector::new(4 * k as i32, 0);
            headers.push(hdr);
        }
    }
    headers
}

fn filter_frame(planes: &mut Planes, headers: &[MacroblockHeader], nonzero: &[NonzeroCounts]) {
    let mut deblock = must(
        DeblockCtx::new(planes.mb_width(), planes.mb_height(), DeblockParams::default()),
        "创建去块上下文",
    );
    for (hdr, nz) in headers.iter().zip(nonzero) {
        must(deblock.filter_macroblock(planes, hdr, nz), "去块滤波");
    }
}

#[test]
fn test_encode_decode_deblock_match() {
    let _ = env_logger::builder().is_test(true).try_init();
    for mode in [LumaMode::Block4x4, LumaMode::DcAc] {
        let orig = textured_planes(MB_WIDTH, MB_HEIGHT);
        let pred = must(Planes::new(MB_WIDTH, MB_HEIGHT, 110), "创建预测");
        let params = QuantParams::new(96, 0);
        let headers = frame_headers();

        let mut encoder = must(MacroblockCoder::new(MB_WIDTH, params), "创建编码器").with_luma_mode(mode);
        let mut decoder = must(MacroblockCoder::new(MB_WIDTH, params), "创建解码器").with_luma_mode(mode);
        let mut enc_recon = must(Planes::new(MB_WIDTH, MB_HEIGHT, 0), "创建重建");
        let mut dec_recon = enc_recon.clone();

        let mut nonzero = Vec::new();
        let mut total_bits = 0;
        for hdr in &headers {
            if hdr.mbx == 0 {
                encoder.start_row();
                decoder.start_row();
            }
            let enc = must(encoder.encode(hdr, &orig, &pred, &mut enc_recon), "宏块编码");
            let dec = must(decoder.decode(hdr, &enc.bits, &pred, &mut dec_recon), "宏块解码");
            assert_eq!(dec.nonzero, enc.nonzero, "{:?} {:?}: 非零个数", mode, hdr.mb_type);
            assert_eq!(dec.bits_consumed, enc.bit_count);
            total_bits += enc.bit_count;
            nonzero.push(enc.nonzero);
        }
        assert!(total_bits > 0);
        assert_eq!(enc_recon, dec_recon, "{:?}: 滤波前重建应一致", mode);

        // IPCM 宏块 (1, 1) 原样传递
        for plane in Plane::ALL {
            assert_eq!(
                must(enc_recon.load_macroblock(plane, 1, 1), "读取宏块"),
                must(orig.load_macroblock(plane, 1, 1), "读取宏块"),
            );
        }

        filter_frame(&mut enc_recon, &headers, &nonzero);
        filter_frame(&mut dec_recon, &headers, &nonzero);
        assert_eq!(enc_recon, dec_recon, "{:?}: 滤波后重建应一致", mode);
    }
}

/// xorshift32 随机样本填满全部平面
fn random_planes(mb_width: usize, mb_height: usize, state: &mut u32) -> Planes {
    let mut planes = must(Planes::new(mb_width, mb_height, 0), "创建图像");
    for plane in Plane::ALL {
        for v in planes.plane_mut(plane).iter_mut() {
            *state ^= *state << 13;
            *state ^= *state >> 17;
            *state ^= *state << 5;
            *v = (*state & 0xFF) as u8;
        }
    }
    planes
}

#[test]
fn test_dc_ac_recon_error_within_quant_step() {
    // 亮度 DC + AC 路径, 无舍入偏移、无死区, 误差上限约为 3 倍量化步长
    for (qp, limit) in [(0u8, 2u8), (6, 4), (12, 8)] {
        let mut state = 0x2545_F491u32 ^ u32::from(qp);
        let orig = random_planes(4, 4, &mut state);
        let pred = random_planes(4, 4, &mut state);
        let params = QuantParams::new(0, 0);

        let mut encoder =
            must(MacroblockCoder::new(4, params), "创建编码器").with_luma_mode(LumaMode::DcAc);
        let mut decoder =
            must(MacroblockCoder::new(4, params), "创建解码器").with_luma_mode(LumaMode::DcAc);
        let mut enc_recon = must(Planes::new(4, 4, 0), "创建重建");
        let mut dec_recon = enc_recon.clone();
        for mby in 0..4 {
            encoder.start_row();
            decoder.start_row();
            for mbx in 0..4 {
                let hdr = MacroblockHeader::new(mbx, mby, MbType::Intra, qp);
                let enc = must(encoder.encode(&hdr, &orig, &pred, &mut enc_recon), "宏块编码");
                must(decoder.decode(&hdr, &enc.bits, &pred, &mut dec_recon), "宏块解码");
            }
        }
        assert_eq!(enc_recon, dec_recon, "qp={}: 两端重建应一致", qp);

        for plane in Plane::ALL {
            let worst = dec_recon
                .plane(plane)
                .iter()
                .zip(orig.plane(plane))
                .map(|(&r, &o)| r.abs_diff(o))
                .max()
                .unwrap_or(0);
            assert!(
                worst <= limit,
                "qp={} {:?}: 最大重建误差 {} 超过 {}",
                qp,
                plane,
                worst,
                limit
            );
        }
    }
}

#[test]
fn test_macroblock_edge_strength() {
    // 第 5 行 x=13 为左宏块内距边界第 3 个样本 (p2), 只有 bS=4 的强滤波会修改它
    let run = |left: MacroblockHeader, right: MacroblockHeader| -> Planes {
        let mut planes = stepped_planes(2, 1);
        let nz = NonzeroCounts::default();
        let mut ctx = must(DeblockCtx::new(2, 1, DeblockParams::default()), "创建去块上下文");
        must(ctx.filter_macroblock(&mut planes, &left, &nz), "去块滤波");
        must(ctx.filter_macroblock(&mut planes, &right, &nz), "去块滤波");
        planes
    };
    let sample = |planes: &Planes, x: usize| planes.plane(Plane::Y)[5 * planes.stride(Plane::Y) + x];

    // 帧内 | 帧间: bS=4
    let planes = run(
        MacroblockHeader::new(0, 0, MbType::Intra, 36),
        MacroblockHeader::new(1, 0, MbType::Inter, 36),
    );
    assert_eq!(sample(&planes, 13), 61, "强滤波修改 p2");
    assert_eq!((sample(&planes, 15), sample(&planes, 16)), (62, 63));

    // 帧间 | 帧间, 运动矢量相差一个整像素: bS=1
    let mut right = MacroblockHeader::new(1, 0, MbType::Inter, 36);
    right.mv = MotionVector::new(4, 0);
    let planes = run(MacroblockHeader::new(0, 0, MbType::Inter, 36), right);
    assert_eq!(sample(&planes, 13), 60, "普通滤波不修改 p2");
    assert_eq!((sample(&planes, 15), sample(&planes, 16)), (62, 62));

    // 帧间 | 跳过, 运动一致: bS=0
    let planes = run(
        MacroblockHeader::new(0, 0, MbType::Inter, 36),
        MacroblockHeader::new(1, 0, MbType::Skip, 36),
    );
    assert_eq!(planes, stepped_planes(2, 1));
}

#[test]
fn test_deblock_state_across_frames() {
    let headers = frame_headers();
    let nonzero = vec![NonzeroCounts::default(); headers.len()];
    let source = stepped_planes(MB_WIDTH, MB_HEIGHT);
    let mut deblock = must(
        DeblockCtx::new(MB_WIDTH, MB_HEIGHT, DeblockParams::default()),
        "创建去块上下文",
    );

    let mut first = source.clone();
    for (hdr, nz) in headers.iter().zip(&nonzero) {
        must(deblock.filter_macroblock(&mut first, hdr, nz), "去块滤波");
    }
    assert_eq!(deblock.ring_index(), (24 * headers.len()) % 64);

    // 帧结束后必须重置才能从 (0, 0) 开始
    let mut second = source.clone();
    let err = deblock
        .filter_macroblock(&mut second, &headers[0], &nonzero[0])
        .expect_err("未重置时不能回到 (0, 0)");
    assert!(matches!(err, AvcError::InvalidArgument(_)), "实际错误: {:?}", err);

    deblock.reset();
    for (hdr, nz) in headers.iter().zip(&nonzero) {
        must(deblock.filter_macroblock(&mut second, hdr, nz), "去块滤波");
    }
    assert_eq!(first, second, "重置后同一输入应得到同一输出");
    assert_ne!(first, source, "帧内宏块边界应被滤波");
}

#[test]
fn test_slice_offsets_change_output() {
    let headers: Vec<_> = (0..2)
        .map(|mbx| MacroblockHeader::new(mbx, 0, MbType::Intra, 17))
        .collect();
    let nz = NonzeroCounts::default();
    let run = |params: DeblockParams| -> Planes {
        let mut planes = stepped_planes(2, 1);
        let mut ctx = must(DeblockCtx::new(2, 1, params), "创建去块上下文");
        for hdr in &headers {
            must(ctx.filter_macroblock(&mut planes, hdr, &nz), "去块滤波");
        }
        planes
    };

    // qp 17 时 alpha 只有 4, 台阶 4 不满足 |p0-q0| < alpha
    assert_eq!(run(DeblockParams::default()), stepped_planes(2, 1));
    let boosted = must(DeblockParams::new(0, 6, 6), "创建去块参数");
    assert_ne!(run(boosted), stepped_planes(2, 1), "正偏移放宽阈值后应滤波");
}
