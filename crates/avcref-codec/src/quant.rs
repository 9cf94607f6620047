//! 量化与反量化.
//!
//! 量化在 8 位小数精度下加入舍入偏移并与死区阈值比较; 反量化对
//! AC 块的位置 0 使用 DC 暂存区中已反变换的 DC 值.

use avcref_core::{AvcError, AvcResult};
use log::trace;

use crate::class::BlockClass;
use crate::tables::{DEQUANT_V, QUANT_MF, chroma_qp, scale_class};

/// 量化参数 (均为 1/256 单位)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuantParams {
    /// 舍入偏移, 在右移 8 位之前加入
    pub offset: i32,
    /// 死区阈值, 加入偏移后小于此值的系数量化为 0
    pub deadzone: i32,
}

impl QuantParams {
    pub fn new(offset: i32, deadzone: i32) -> Self {
        Self { offset, deadzone }
    }
}

/// 校验亮度 QP 并换算为本类别使用的 QP
pub fn effective_qp(qpy: u8, class: BlockClass) -> AvcResult<u8> {
    if qpy > 51 {
        return Err(AvcError::InvalidArgument(format!(
            "qp={} 超出 0..=51",
            qpy
        )));
    }
    Ok(if class.is_chroma() {
        chroma_qp(qpy)
    } else {
        qpy
    })
}

// ============================================================
// DC 暂存区
// ============================================================

/// 同一宏块、同一平面内 DC 块反变换结果的暂存区.
///
/// DC 块解码/重建后写入, 随后的 AC 块从中读取各自位置 0 的 DC 值.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DcHold {
    values: [i32; 16],
}

impl DcHold {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &[i32; 16] {
        &self.values
    }

    pub fn store(&mut self, values: [i32; 16]) {
        self.values = values;
    }

    pub fn clear(&mut self) {
        self.values = [0; 16];
    }

    /// AC 块 `bidx` 对应的 DC 值
    pub fn dc_for(&self, class: BlockClass, bidx: usize) -> i32 {
        let idx = if class.is_chroma() {
            // 色度 2x2: 位置 0, 1, 4, 5
            (bidx & 1) + ((bidx & 2) << 1)
        } else {
            // 亮度: 四叉树块序转光栅位置
            (bidx & 1) + ((bidx & 2) << 1) + ((bidx & 4) >> 1) + (bidx & 8)
        };
        self.values[idx]
    }
}

// ============================================================
// 正向量化
// ============================================================

/// 量化 16 个变换系数 (光栅顺序)
pub fn quantize(coeffs: &[i32; 16], qp: u8, class: BlockClass, params: QuantParams) -> [i32; 16] {
    let qp = u32::from(qp);
    let qshift = qp / 6 + class.quant_shift_bias();
    let row = &QUANT_MF[(qp % 6) as usize];
    let offset = i64::from(params.offset);
    let deadzone = i64::from(params.deadzone);

    let mut out = [0i32; 16];
    for (i, (&e, q)) in coeffs.iter().zip(out.iter_mut()).enumerate() {
        let quant = if class.is_dc() { row[0] } else { row[scale_class(i)] };
        let qc = ((i64::from(e).abs() * i64::from(quant)) >> qshift) + offset;
        let level = if qc < deadzone { 0 } else { (qc >> 8) as i32 };
        *q = if e < 0 { -level } else { level };
    }
    out
}

// ============================================================
// 反量化
// ============================================================

/// 反量化, 返回反变换的输入 (光栅顺序).
///
/// DC 类别不缩放: 亮度 DC 原样复制 16 个值, 色度 DC 把 2x2 的四个值
/// 散布到 4x4 网格的 0/2/8/10 位置, 交给 Hadamard 反变换.
pub fn dequantize(
    coeffs: &[i32; 16],
    qp: u8,
    class: BlockClass,
    bidx: usize,
    dc_hold: &DcHold,
) -> [i32; 16] {
    let mut f = [0i32; 16];

    if class.is_dc() {
        if class.is_chroma() {
            f[0] = coeffs[0];
            f[2] = coeffs[1];
            f[8] = coeffs[4];
            f[10] = coeffs[5];
        } else {
            f = *coeffs;
        }
        return f;
    }

    let qp = u32::from(qp);
    let per = qp / 6;
    let scale = &DEQUANT_V[(qp % 6) as usize];

    for (i, out) in f.iter_mut().enumerate() {
        if i == 0 && class.is_ac_only() {
            let dequant = 16 * scale[0];
            let dc = dc_hold.dc_for(class, bidx);
            *out = if class.is_chroma() {
                ((dc * dequant) << per) >> 5
            } else if qp >= 36 {
                (dc * dequant) << (per - 6)
            } else {
                (dc * dequant + (1 << (5 - per))) >> (6 - per)
            };
        } else {
            let dequant = 16 * scale[scale_class(i)];
            *out = if qp >= 24 {
                (coeffs[i] * dequant) << (per - 4)
            } else {
                (coeffs[i] * dequant + (1 << (3 - per))) >> (4 - per)
            };
        }
    }

    trace!("dequantize: class={:?} bidx={} qp={} dc={}", class, bidx, qp, f[0]);
    f
}
