//! 单块变换/量化/CAVLC 编解码.
//!
//! 正向: 减预测 → 正变换 → 量化 → 反量化 → 反变换 → 重建 → CAVLC 编码.
//! 反向: CAVLC 解码 → 反量化 → 反变换 → 重建.
//! 两个方向共用同一段反量化与重建代码, 保证编码端重建与解码端逐位一致.
//!
//! DC 类别的块不直接产生像素: 反变换结果写入 [`DcHold`], 由随后同一平面的
//! AC 块取用.

use avcref_core::{AvcError, AvcResult, BitRunQueue};
use log::{trace, warn};

use crate::cavlc::{CoeffTokenTable, decode_coefficients, encode_coefficients};
use crate::class::BlockClass;
use crate::nz_cache::NeighborCounts;
use crate::quant::{DcHold, QuantParams, dequantize, effective_qp, quantize};
use crate::transform::{forward_4x4, inverse_4x4, scale_residual};

/// 块编解码上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockContext {
    /// 亮度 QP (0..=51), 色度类别内部换算
    pub qp: u8,
    pub class: BlockClass,
    /// 宏块内块位置: 亮度 0..=15 (四叉树序), 色度 0..=3, DC 类别为 0
    pub bidx: usize,
}

impl BlockContext {
    pub fn new(qp: u8, class: BlockClass, bidx: usize) -> Self {
        Self { qp, class, bidx }
    }

    fn validate(&self) -> AvcResult<u8> {
        let limit = if self.class.is_dc() {
            1
        } else if self.class.is_chroma() {
            4
        } else {
            16
        };
        if self.bidx >= limit {
            return Err(AvcError::InvalidArgument(format!(
                "{:?} 块位置 {} 超出 0..{}",
                self.class, self.bidx, limit
            )));
        }
        effective_qp(self.qp, self.class)
    }

    /// 选择 coeff_token 码表
    fn token_table(&self, counts: &NeighborCounts<'_>) -> AvcResult<CoeffTokenTable> {
        if self.class.is_chroma_dc() {
            return Ok(CoeffTokenTable::ChromaDc);
        }
        // 亮度 DC 以块 0 的左/上邻居预测
        let bidx = if self.class.is_dc() { 0 } else { self.bidx };
        Ok(CoeffTokenTable::from_nc(counts.predict(bidx)?))
    }

    fn record_count(&self, counts: &mut NeighborCounts<'_>, num_coeff: usize) -> AvcResult<()> {
        if self.class.is_dc() {
            return Ok(());
        }
        counts.update(self.bidx, num_coeff)
    }
}

/// 编码结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBlock {
    /// 本块的比特段
    pub queue: BitRunQueue,
    /// 量化系数 (光栅顺序)
    pub coeffs: [i32; 16],
    pub num_coeff: usize,
    pub trailing_ones: usize,
    /// 重建像素, DC 类别为 None
    pub recon: Option<[u8; 16]>,
    pub bit_count: usize,
    pub sad: u32,
    pub ssd: u32,
}

/// 解码结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedBlock {
    pub coeffs: [i32; 16],
    pub num_coeff: usize,
    pub recon: Option<[u8; 16]>,
    pub bits_consumed: usize,
}

/// 反量化 + 反变换 + 重建. DC 类别把结果写入 `dc_hold` 并返回 None.
fn reconstruct(
    class: BlockClass,
    qp: u8,
    bidx: usize,
    coeffs: &[i32; 16],
    reference: &[i32; 16],
    dc_hold: &mut DcHold,
) -> Option<[u8; 16]> {
    let f = dequantize(coeffs, qp, class, bidx, dc_hold);
    let m = inverse_4x4(&f, class.transform_shift());
    if class.is_dc() {
        dc_hold.store(m);
        return None;
    }
    let res = scale_residual(&m);
    let mut recon = [0u8; 16];
    for ((r, &d), &p) in recon.iter_mut().zip(res.iter()).zip(reference.iter()) {
        *r = (d + p).clamp(0, 255) as u8;
    }
    Some(recon)
}

/// 编码一个块.
///
/// `orig` / `reference` 为光栅顺序的原始与预测样本; DC 类别传入的是
/// 各子块样本之和组成的 4x4 网格 (色度 DC 只用位置 0/2/8/10).
pub fn encode_block(
    ctx: &BlockContext,
    params: QuantParams,
    orig: &[i32; 16],
    reference: &[i32; 16],
    counts: &mut NeighborCounts<'_>,
    dc_hold: &mut DcHold,
) -> AvcResult<EncodedBlock> {
    let qp = ctx.validate()?;
    let class = ctx.class;

    let mut residual = [0i32; 16];
    for (r, (&o, &p)) in residual.iter_mut().zip(orig.iter().zip(reference.iter())) {
        *r = o - p;
    }
    let transformed = forward_4x4(&residual, class.transform_shift());
    let coeffs = quantize(&transformed, qp, class, params);

    let recon = reconstruct(class, qp, ctx.bidx, &coeffs, reference, dc_hold);

    let (mut sad, mut ssd) = (0u32, 0u32);
    if let Some(pixels) = &recon {
        for (&r, &o) in pixels.iter().zip(orig.iter()) {
            let d = (i32::from(r) - o).unsigned_abs();
            sad += d;
            ssd += d * d;
        }
    }

    let table = ctx.token_table(counts)?;
    let mut queue = BitRunQueue::new();
    let info = encode_coefficients(&coeffs, class, table, &mut queue)?;
    ctx.record_count(counts, info.num_coeff)?;

    trace!(
        "编码块: class={:?} bidx={} qp={} num_coeff={} bits={}",
        class, ctx.bidx, qp, info.num_coeff, info.bit_count
    );

    Ok(EncodedBlock {
        queue,
        coeffs,
        num_coeff: info.num_coeff,
        trailing_ones: info.trailing_ones,
        recon,
        bit_count: info.bit_count,
        sad,
        ssd,
    })
}

/// 解码一个块.
///
/// `bits` 为 None 表示块未编码 (跳过): 系数全零, 不消耗比特, 非零个数记为 0.
/// 否则从 `bits` 的第 `pos` 位开始解析.
pub fn decode_block(
    ctx: &BlockContext,
    bits: Option<&BitRunQueue>,
    pos: usize,
    reference: &[i32; 16],
    counts: &mut NeighborCounts<'_>,
    dc_hold: &mut DcHold,
) -> AvcResult<DecodedBlock> {
    let qp = ctx.validate()?;
    let class = ctx.class;

    let (coeffs, num_coeff, bits_consumed) = match bits {
        None => ([0i32; 16], 0, 0),
        Some(queue) => {
            let table = ctx.token_table(counts)?;
            let (coeffs, decoded) =
                decode_coefficients(queue, pos, class, table).inspect_err(|e| {
                    warn!("块解码失败: class={:?} bidx={}: {}", class, ctx.bidx, e);
                })?;
            (coeffs, decoded.num_coeff, decoded.bits_consumed)
        }
    };
    ctx.record_count(counts, num_coeff)?;

    let recon = reconstruct(class, qp, ctx.bidx, &coeffs, reference, dc_hold);
    Ok(DecodedBlock {
        coeffs,
        num_coeff,
        recon,
        bits_consumed,
    })
}
