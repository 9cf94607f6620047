//! CAVLC 残差熵编解码.
//!
//! 一个块的语法元素依次为 coeff_token、拖尾 ±1 符号、level (高频到低频)、
//! total_zeros、run_before (高频到低频). 编码结果以比特段队列输出,
//! 解码从比特段队列的任意位置开始按 32 位窗口解析.

mod decode;
mod encode;
mod level;

pub use decode::{DecodedScan, decode_coefficients, decode_scan};
pub use encode::{EncodedScan, encode_coefficients, encode_scan};
pub use level::{
    LEVEL_ESCAPE_SL0_LONG, LEVEL_ESCAPE_SL0_SHORT, LEVEL_PREFIX_ESCAPE, MAX_SUFFIX_LENGTH,
    next_suffix_length,
};

use crate::class::BlockClass;
use crate::tables::{
    CHROMA_DC_COEFF_TOKEN_BITS, CHROMA_DC_COEFF_TOKEN_LENS, COEFF_TOKEN_BITS, COEFF_TOKEN_LENS,
    ZIGZAG_2X2, ZIGZAG_4X4, token_index,
};

// ============================================================
// coeff_token 表选择
// ============================================================

/// coeff_token 码表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoeffTokenTable {
    /// 0 <= nC < 2
    Nc0To1,
    /// 2 <= nC < 4
    Nc2To3,
    /// 4 <= nC < 8
    Nc4To7,
    /// 8 <= nC
    Nc8Plus,
    /// 2x2 色度 DC (nC = -1)
    ChromaDc,
}

impl CoeffTokenTable {
    /// 按预测的 nC 选表
    pub fn from_nc(nc: i32) -> Self {
        if nc < 2 {
            Self::Nc0To1
        } else if nc < 4 {
            Self::Nc2To3
        } else if nc < 8 {
            Self::Nc4To7
        } else {
            Self::Nc8Plus
        }
    }

    /// 表号: 0..=3 为 nC 区间, 4 为色度 DC
    pub fn index(self) -> usize {
        match self {
            Self::Nc0To1 => 0,
            Self::Nc2To3 => 1,
            Self::Nc4To7 => 2,
            Self::Nc8Plus => 3,
            Self::ChromaDc => 4,
        }
    }

    /// 本表可表示的最大系数个数
    pub fn max_total_coeff(self) -> usize {
        if self == Self::ChromaDc { 4 } else { 16 }
    }

    /// (total_coeff, trailing_ones) 的码字与码长
    pub fn code(self, total_coeff: usize, trailing_ones: usize) -> (u32, u8) {
        let idx = token_index(total_coeff, trailing_ones);
        match self {
            Self::ChromaDc => (
                u32::from(CHROMA_DC_COEFF_TOKEN_BITS[idx]),
                CHROMA_DC_COEFF_TOKEN_LENS[idx],
            ),
            _ => (
                u32::from(COEFF_TOKEN_BITS[self.index()][idx]),
                COEFF_TOKEN_LENS[self.index()][idx],
            ),
        }
    }
}

// ============================================================
// 扫描顺序
// ============================================================

/// 扫描位置 `scan_pos` 对应的光栅位置
pub fn raster_index(class: BlockClass, scan_pos: usize) -> usize {
    if class.is_chroma_dc() {
        ZIGZAG_2X2[scan_pos]
    } else {
        ZIGZAG_4X4[scan_pos + class.scan_start()]
    }
}

/// 光栅顺序系数转为扫描列表, 只有前 `class.max_coeff()` 项有效
pub fn zigzag_scan(coeffs: &[i32; 16], class: BlockClass) -> [i32; 16] {
    let mut scan = [0i32; 16];
    for (i, s) in scan.iter_mut().take(class.max_coeff()).enumerate() {
        *s = coeffs[raster_index(class, i)];
    }
    scan
}

/// 扫描列表放回光栅顺序
pub fn inverse_zigzag(scan: &[i32; 16], class: BlockClass) -> [i32; 16] {
    let mut coeffs = [0i32; 16];
    for (i, &s) in scan.iter().take(class.max_coeff()).enumerate() {
        coeffs[raster_index(class, i)] = s;
    }
    coeffs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_nc_buckets() {
        assert_eq!(CoeffTokenTable::from_nc(0), CoeffTokenTable::Nc0To1);
        assert_eq!(CoeffTokenTable::from_nc(1), CoeffTokenTable::Nc0To1);
        assert_eq!(CoeffTokenTable::from_nc(2), CoeffTokenTable::Nc2To3);
        assert_eq!(CoeffTokenTable::from_nc(3), CoeffTokenTable::Nc2To3);
        assert_eq!(CoeffTokenTable::from_nc(4), CoeffTokenTable::Nc4To7);
        assert_eq!(CoeffTokenTable::from_nc(7), CoeffTokenTable::Nc4To7);
        assert_eq!(CoeffTokenTable::from_nc(8), CoeffTokenTable::Nc8Plus);
        assert_eq!(CoeffTokenTable::from_nc(16), CoeffTokenTable::Nc8Plus);
    }

    #[test]
    fn test_token_codes() {
        assert_eq!(CoeffTokenTable::Nc0To1.code(0, 0), (1, 1));
        assert_eq!(CoeffTokenTable::Nc0To1.code(3, 3), (0b00011, 5));
        assert_eq!(CoeffTokenTable::Nc8Plus.code(0, 0), (0b000011, 6));
        assert_eq!(CoeffTokenTable::ChromaDc.code(1, 1), (1, 1));
    }

    #[test]
    fn test_scan_order() {
        let coeffs: [i32; 16] = core::array::from_fn(|i| i as i32);
        let scan = zigzag_scan(&coeffs, BlockClass::Luma4x4);
        assert_eq!(&scan[..6], &[0, 1, 4, 8, 5, 2]);

        let scan = zigzag_scan(&coeffs, BlockClass::LumaAc);
        assert_eq!(&scan[..3], &[1, 4, 8], "AC 块应跳过位置 0");
        assert_eq!(scan[15], 0);

        let scan = zigzag_scan(&coeffs, BlockClass::CbDc);
        assert_eq!(&scan[..4], &[0, 1, 4, 5]);

        let back = inverse_zigzag(&zigzag_scan(&coeffs, BlockClass::CrAc), BlockClass::CrAc);
        assert_eq!(back[0], 0);
        assert_eq!(&back[1..], &coeffs[1..]);
    }
}
