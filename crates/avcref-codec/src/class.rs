//! 块类别定义.
//!
//! 同一套变换/量化/CAVLC 流程按块类别切换扫描范围、量化位移、
//! 变换位移以及 DC 处理方式.

use bitflags::bitflags;

use avcref_core::{AvcError, AvcResult};

bitflags! {
    /// 块类别属性标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClassFlags: u8 {
        /// DC 块 (只含 DC 系数, 不直接重建像素)
        const DC = 1 << 0;
        /// AC 块 (位置 0 由 DC 块提供)
        const AC = 1 << 1;
        /// 色度平面
        const CHROMA = 1 << 2;
    }
}

/// 块类别 (7 种)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockClass {
    /// 亮度 4x4, 16 个系数自带 DC
    Luma4x4,
    /// 亮度 AC, DC 来自亮度 DC 块
    LumaAc,
    /// Cb AC
    CbAc,
    /// Cr AC
    CrAc,
    /// Cb 2x2 DC
    CbDc,
    /// Cr 2x2 DC
    CrDc,
    /// 亮度 4x4 DC (16 个块的 DC 汇总)
    LumaDc,
}

impl BlockClass {
    /// 全部类别, 按索引顺序
    pub const ALL: [BlockClass; 7] = [
        Self::Luma4x4,
        Self::LumaAc,
        Self::CbAc,
        Self::CrAc,
        Self::CbDc,
        Self::CrDc,
        Self::LumaDc,
    ];

    /// 类别索引 (0..=6)
    pub fn index(self) -> usize {
        match self {
            Self::Luma4x4 => 0,
            Self::LumaAc => 1,
            Self::CbAc => 2,
            Self::CrAc => 3,
            Self::CbDc => 4,
            Self::CrDc => 5,
            Self::LumaDc => 6,
        }
    }

    /// 由类别索引构造
    pub fn from_index(index: usize) -> AvcResult<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or_else(|| AvcError::InvalidArgument(format!("块类别索引 {} 超出 0..=6", index)))
    }

    pub fn flags(self) -> ClassFlags {
        match self {
            Self::Luma4x4 => ClassFlags::empty(),
            Self::LumaAc => ClassFlags::AC,
            Self::CbAc | Self::CrAc => ClassFlags::AC | ClassFlags::CHROMA,
            Self::CbDc | Self::CrDc => ClassFlags::DC | ClassFlags::CHROMA,
            Self::LumaDc => ClassFlags::DC,
        }
    }

    pub fn is_dc(self) -> bool {
        self.flags().contains(ClassFlags::DC)
    }

    /// 位置 0 的系数不在本块内编码
    pub fn is_ac_only(self) -> bool {
        self.flags().contains(ClassFlags::AC)
    }

    pub fn is_chroma(self) -> bool {
        self.flags().contains(ClassFlags::CHROMA)
    }

    /// 2x2 色度 DC 块
    pub fn is_chroma_dc(self) -> bool {
        self.flags().contains(ClassFlags::DC | ClassFlags::CHROMA)
    }

    /// zigzag 扫描起点 (AC 块跳过位置 0)
    pub fn scan_start(self) -> usize {
        usize::from(self.is_ac_only())
    }

    /// 本块最多可编码的系数个数
    pub fn max_coeff(self) -> usize {
        if self.is_chroma_dc() {
            4
        } else if self.is_ac_only() {
            15
        } else {
            16
        }
    }

    /// 系数网格的有效元素个数 (2x2 色度 DC 为 4)
    pub fn coeff_count(self) -> usize {
        if self.is_chroma_dc() { 4 } else { 16 }
    }

    /// 量化右移的附加位数: qbits = qp / 6 + bias
    pub fn quant_shift_bias(self) -> u32 {
        match self {
            Self::LumaDc => 9,
            Self::CbDc | Self::CrDc => 8,
            _ => 7,
        }
    }

    /// 变换蝶形中奇数行/列的加权位移 (DC 类别为 Hadamard, 不加权)
    pub fn transform_shift(self) -> u32 {
        if self.is_dc() { 0 } else { 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for (i, class) in BlockClass::ALL.iter().enumerate() {
            assert_eq!(class.index(), i);
            assert_eq!(BlockClass::from_index(i).unwrap(), *class);
        }
        assert!(BlockClass::from_index(7).is_err());
    }

    #[test]
    fn test_class_properties() {
        assert_eq!(BlockClass::Luma4x4.max_coeff(), 16);
        assert_eq!(BlockClass::LumaDc.max_coeff(), 16);
        assert_eq!(BlockClass::LumaAc.max_coeff(), 15);
        assert_eq!(BlockClass::CrAc.max_coeff(), 15);
        assert_eq!(BlockClass::CbDc.max_coeff(), 4);
        assert_eq!(BlockClass::CbDc.coeff_count(), 4);
        assert_eq!(BlockClass::LumaAc.coeff_count(), 16);

        assert_eq!(BlockClass::LumaAc.scan_start(), 1);
        assert_eq!(BlockClass::Luma4x4.scan_start(), 0);
        assert_eq!(BlockClass::CbDc.scan_start(), 0);

        assert!(BlockClass::CrDc.is_chroma_dc());
        assert!(!BlockClass::LumaDc.is_chroma_dc());
        assert!(BlockClass::CbAc.is_chroma());
        assert!(!BlockClass::Luma4x4.is_dc());
    }

    #[test]
    fn test_shift_parameters() {
        assert_eq!(BlockClass::LumaDc.quant_shift_bias(), 9);
        assert_eq!(BlockClass::CbDc.quant_shift_bias(), 8);
        assert_eq!(BlockClass::CrAc.quant_shift_bias(), 7);
        assert_eq!(BlockClass::LumaDc.transform_shift(), 0);
        assert_eq!(BlockClass::LumaAc.transform_shift(), 1);
    }
}
