//! 共享静态数据表.
//!
//! 量化/反量化矩阵、色度 QP 映射、zigzag 扫描顺序、CAVLC 码表
//! 以及去块滤波阈值表. 编码与解码两侧共用.

// ============================================================
// 量化
// ============================================================

/// 正向量化乘数, 列依次为 (偶, 偶) / (奇, 奇) / 混合 位置
#[rustfmt::skip]
pub const QUANT_MF: [[i32; 3]; 6] = [
    [13107, 5243, 8066],
    [11916, 4660, 7490],
    [10082, 4194, 6554],
    [9362,  3647, 5825],
    [8192,  3355, 5243],
    [7282,  2893, 4559],
];

/// 反量化缩放因子, 列顺序同 [`QUANT_MF`]
#[rustfmt::skip]
pub const DEQUANT_V: [[i32; 3]; 6] = [
    [10, 16, 13],
    [11, 18, 14],
    [13, 20, 16],
    [14, 23, 18],
    [16, 25, 20],
    [18, 29, 23],
];

/// 亮度 QP 到色度 QP 的映射
#[rustfmt::skip]
pub const CHROMA_QP_TABLE: [u8; 52] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15,
    16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 29, 30,
    31, 32, 32, 33, 34, 34, 35, 35, 36, 36, 37, 37, 37, 38, 38, 38,
    39, 39, 39, 39,
];

/// 4x4 块内光栅位置对应的缩放因子列: 0 = (偶, 偶), 1 = (奇, 奇), 2 = 混合
pub fn scale_class(pos: usize) -> usize {
    let row_odd = (pos >> 2) & 1;
    let col_odd = pos & 1;
    match (row_odd, col_odd) {
        (0, 0) => 0,
        (1, 1) => 1,
        _ => 2,
    }
}

/// 色度 QP (输入需在 0..=51 内)
pub fn chroma_qp(qp: u8) -> u8 {
    debug_assert!(qp <= 51, "qp={} 超出 0..=51", qp);
    CHROMA_QP_TABLE[usize::from(qp)]
}

// ============================================================
// 扫描顺序
// ============================================================

/// 4x4 zigzag 扫描: 扫描位置 → 光栅位置
#[rustfmt::skip]
pub const ZIGZAG_4X4: [usize; 16] = [0, 1, 4, 8, 5, 2, 3, 6, 9, 12, 13, 10, 7, 11, 14, 15];

/// 2x2 色度 DC 扫描: 扫描位置 → 4x4 网格中的光栅位置
pub const ZIGZAG_2X2: [usize; 4] = [0, 1, 4, 5];

// ============================================================
// CAVLC 码表
// ============================================================
//
// 编码与解码共用同一份码表: 编码按语法元素值查 (码字, 码长),
// 解码先由前导零个数确定码长, 再在同一张表中精确匹配码字.

/// coeff_token 码字, 按 nC 区间分 4 张表, 下标见 [`token_index`]
#[rustfmt::skip]
pub const COEFF_TOKEN_BITS: [[u16; 62]; 4] = [
    [
        0x01, 0x05, 0x01, 0x07, 0x04, 0x01, 0x07, 0x06,
        0x05, 0x03, 0x07, 0x06, 0x05, 0x03, 0x07, 0x06,
        0x05, 0x04, 0x0F, 0x06, 0x05, 0x04, 0x0B, 0x0E,
        0x05, 0x04, 0x08, 0x0A, 0x0D, 0x04, 0x0F, 0x0E,
        0x09, 0x04, 0x0B, 0x0A, 0x0D, 0x0C, 0x0F, 0x0E,
        0x09, 0x0C, 0x0B, 0x0A, 0x0D, 0x08, 0x0F, 0x01,
        0x09, 0x0C, 0x0B, 0x0E, 0x0D, 0x08, 0x07, 0x0A,
        0x09, 0x0C, 0x04, 0x06, 0x05, 0x08,
    ],
    [
        0x03, 0x0B, 0x02, 0x07, 0x07, 0x03, 0x07, 0x0A,
        0x09, 0x05, 0x07, 0x06, 0x05, 0x04, 0x04, 0x06,
        0x05, 0x06, 0x07, 0x06, 0x05, 0x08, 0x0F, 0x06,
        0x05, 0x04, 0x0B, 0x0E, 0x0D, 0x04, 0x0F, 0x0A,
        0x09, 0x04, 0x0B, 0x0E, 0x0D, 0x0C, 0x08, 0x0A,
        0x09, 0x08, 0x0F, 0x0E, 0x0D, 0x0C, 0x0B, 0x0A,
        0x09, 0x0C, 0x07, 0x0B, 0x06, 0x08, 0x09, 0x08,
        0x0A, 0x01, 0x07, 0x06, 0x05, 0x04,
    ],
    [
        0x0F, 0x0F, 0x0E, 0x0B, 0x0F, 0x0D, 0x08, 0x0C,
        0x0E, 0x0C, 0x0F, 0x0A, 0x0B, 0x0B, 0x0B, 0x08,
        0x09, 0x0A, 0x09, 0x0E, 0x0D, 0x09, 0x08, 0x0A,
        0x09, 0x08, 0x0F, 0x0E, 0x0D, 0x0D, 0x0B, 0x0E,
        0x0A, 0x0C, 0x0F, 0x0A, 0x0D, 0x0C, 0x0B, 0x0E,
        0x09, 0x0C, 0x08, 0x0A, 0x0D, 0x08, 0x0D, 0x07,
        0x09, 0x0C, 0x09, 0x0C, 0x0B, 0x0A, 0x05, 0x08,
        0x07, 0x06, 0x01, 0x04, 0x03, 0x02,
    ],
    [
        0x03, 0x00, 0x01, 0x04, 0x05, 0x06, 0x08, 0x09,
        0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F, 0x10, 0x11,
        0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19,
        0x1A, 0x1B, 0x1C, 0x1D, 0x1E, 0x1F, 0x20, 0x21,
        0x22, 0x23, 0x24, 0x25, 0x26, 0x27, 0x28, 0x29,
        0x2A, 0x2B, 0x2C, 0x2D, 0x2E, 0x2F, 0x30, 0x31,
        0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39,
        0x3A, 0x3B, 0x3C, 0x3D, 0x3E, 0x3F,
    ],
];

/// coeff_token 码长
#[rustfmt::skip]
pub const COEFF_TOKEN_LENS: [[u8; 62]; 4] = [
    [
         1,  6,  2,  8,  6,  3,  9,  8,  7,  5, 10,  9,  8,  6, 11, 10,
         9,  7, 13, 11, 10,  8, 13, 13, 11,  9, 13, 13, 13, 10, 14, 14,
        13, 11, 14, 14, 14, 13, 15, 15, 14, 14, 15, 15, 15, 14, 16, 15,
        15, 15, 16, 16, 16, 15, 16, 16, 16, 16, 16, 16, 16, 16,
    ],
    [
         2,  6,  2,  6,  5,  3,  7,  6,  6,  4,  8,  6,  6,  4,  8,  7,
         7,  5,  9,  8,  8,  6, 11,  9,  9,  6, 11, 11, 11,  7, 12, 11,
        11,  9, 12, 12, 12, 11, 12, 12, 12, 11, 13, 13, 13, 12, 13, 13,
        13, 13, 13, 14, 13, 13, 14, 14, 14, 13, 14, 14, 14, 14,
    ],
    [
         4,  6,  4,  6,  5,  4,  6,  5,  5,  4,  7,  5,  5,  4,  7,  5,
         5,  4,  7,  6,  6,  4,  7,  6,  6,  4,  8,  7,  7,  5,  8,  8,
         7,  6,  9,  8,  8,  7,  9,  9,  8,  8,  9,  9,  9,  8, 10,  9,
         9,  9, 10, 10, 10, 10, 10, 10, 10, 10, 10, 10, 10, 10,
    ],
    [
         6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,
         6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,
         6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,
         6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,
    ],
];

/// 2x2 色度 DC 的 coeff_token 码字 (nC = -1)
#[rustfmt::skip]
pub const CHROMA_DC_COEFF_TOKEN_BITS: [u8; 14] = [1, 7, 1, 4, 6, 1, 3, 3, 2, 5, 2, 3, 2, 0];

#[rustfmt::skip]
pub const CHROMA_DC_COEFF_TOKEN_LENS: [u8; 14] = [2, 6, 1, 6, 6, 3, 6, 7, 7, 6, 6, 8, 8, 7];

/// 4x4 块 total_zeros 码字, 下标 [total_coeff - 1][total_zeros]
#[rustfmt::skip]
pub const TOTAL_ZEROS_BITS: [[u8; 16]; 15] = [
    [1, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 1],
    [7, 6, 5, 4, 3, 5, 4, 3, 2, 3, 2, 3, 2, 1, 0, 0],
    [5, 7, 6, 5, 4, 3, 4, 3, 2, 3, 2, 1, 1, 0, 0, 0],
    [3, 7, 5, 4, 6, 5, 4, 3, 3, 2, 2, 1, 0, 0, 0, 0],
    [5, 4, 3, 7, 6, 5, 4, 3, 2, 1, 1, 0, 0, 0, 0, 0],
    [1, 1, 7, 6, 5, 4, 3, 2, 1, 1, 0, 0, 0, 0, 0, 0],
    [1, 1, 5, 4, 3, 3, 2, 1, 1, 0, 0, 0, 0, 0, 0, 0],
    [1, 1, 1, 3, 3, 2, 2, 1, 0, 0, 0, 0, 0, 0, 0, 0],
    [1, 0, 1, 3, 2, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0],
    [1, 0, 1, 3, 2, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 2, 1, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
];

#[rustfmt::skip]
pub const TOTAL_ZEROS_LENS: [[u8; 16]; 15] = [
    [1, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 9],
    [3, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 6, 6, 6, 6, 0],
    [4, 3, 3, 3, 4, 4, 3, 3, 4, 5, 5, 6, 5, 6, 0, 0],
    [5, 3, 4, 4, 3, 3, 3, 4, 3, 4, 5, 5, 5, 0, 0, 0],
    [4, 4, 4, 3, 3, 3, 3, 3, 4, 5, 4, 5, 0, 0, 0, 0],
    [6, 5, 3, 3, 3, 3, 3, 3, 4, 3, 6, 0, 0, 0, 0, 0],
    [6, 5, 3, 3, 3, 2, 3, 4, 3, 6, 0, 0, 0, 0, 0, 0],
    [6, 4, 5, 3, 2, 2, 3, 3, 6, 0, 0, 0, 0, 0, 0, 0],
    [6, 6, 4, 2, 2, 3, 2, 5, 0, 0, 0, 0, 0, 0, 0, 0],
    [5, 5, 3, 2, 2, 2, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [4, 4, 3, 3, 1, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [4, 4, 2, 1, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [3, 3, 1, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [2, 2, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
];

/// 2x2 色度 DC total_zeros 码字
#[rustfmt::skip]
pub const CHROMA_DC_TOTAL_ZEROS_BITS: [[u8; 4]; 3] = [
    [1, 1, 1, 0],
    [1, 1, 0, 0],
    [1, 0, 0, 0],
];

#[rustfmt::skip]
pub const CHROMA_DC_TOTAL_ZEROS_LENS: [[u8; 4]; 3] = [
    [1, 2, 3, 3],
    [1, 2, 2, 0],
    [1, 1, 0, 0],
];

/// run_before 码字, 下标 [min(zeros_left, 7) - 1][run_before]
#[rustfmt::skip]
pub const RUN_BEFORE_BITS: [[u8; 15]; 7] = [
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [3, 2, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [3, 2, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [3, 2, 3, 2, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [3, 0, 1, 3, 2, 5, 4, 0, 0, 0, 0, 0, 0, 0, 0],
    [7, 6, 5, 4, 3, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1],
];

#[rustfmt::skip]
pub const RUN_BEFORE_LENS: [[u8; 15]; 7] = [
    [ 1,  1,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0],
    [ 1,  2,  2,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0],
    [ 2,  2,  2,  2,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0],
    [ 2,  2,  2,  3,  3,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0],
    [ 2,  2,  3,  3,  3,  3,  0,  0,  0,  0,  0,  0,  0,  0,  0],
    [ 2,  3,  3,  3,  3,  3,  3,  0,  0,  0,  0,  0,  0,  0,  0],
    [ 3,  3,  3,  3,  3,  3,  3,  4,  5,  6,  7,  8,  9, 10, 11],
];

/// coeff_token 表内下标
pub fn token_index(total_coeff: usize, trailing_ones: usize) -> usize {
    if total_coeff < 3 {
        total_coeff * (total_coeff + 1) / 2 + trailing_ones
    } else {
        6 + (total_coeff - 3) * 4 + trailing_ones
    }
}

// ============================================================
// CAVLC 解码码长表
// ============================================================
//
// 下标为前导零个数 + 1 (即第一个 1 所在的位置, 从 1 开始计数);
// 窗口前 max_lead - 1 位全为 0 时取 max_lead.

/// 前导零个数对应码长不唯一时的修正: 窗口满足 `w & mask == mask` 时码长减 1
#[derive(Debug, Clone, Copy)]
pub struct LengthFix {
    /// 表号
    pub table: usize,
    /// 前导位置 (从 1 开始)
    pub lead: u32,
    pub mask: u32,
}

/// coeff_token 各表 (0..=3 为 nC 区间, 4 为色度 DC) 的最大前导位置
pub const COEFF_TOKEN_MAX_LEAD: [u32; 5] = [15, 13, 10, 1, 8];

#[rustfmt::skip]
pub const COEFF_TOKEN_LEAD_LENS: [[u8; 15]; 5] = [
    [1, 2, 3, 6, 7, 8, 9, 10, 11, 13, 14, 15, 16, 16, 15],
    [2, 4, 6, 6, 7, 8, 9, 11, 12, 13, 14, 14, 13, 0, 0],
    [4, 5, 6, 7, 8, 9, 10, 10, 10, 10, 0, 0, 0, 0, 0],
    [6, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [1, 2, 3, 6, 6, 7, 8, 7, 0, 0, 0, 0, 0, 0, 0],
];

pub const COEFF_TOKEN_LEN_FIXES: [LengthFix; 6] = [
    LengthFix { table: 0, lead: 4, mask: 1 << 27 },
    LengthFix { table: 0, lead: 5, mask: 1 << 26 },
    LengthFix { table: 1, lead: 2, mask: 1 << 29 },
    LengthFix { table: 1, lead: 3, mask: 1 << 28 },
    LengthFix { table: 1, lead: 11, mask: 1 << 20 },
    LengthFix { table: 2, lead: 7, mask: (1 << 24) | (1 << 23) },
];

/// 4x4 total_zeros 各表 (下标 total_coeff - 1) 的最大前导位置
pub const TOTAL_ZEROS_MAX_LEAD: [u32; 15] = [9, 7, 7, 6, 6, 7, 7, 7, 7, 6, 5, 5, 4, 3, 2];

#[rustfmt::skip]
pub const TOTAL_ZEROS_LEAD_LENS: [[u8; 9]; 15] = [
    [1, 3, 4, 5, 6, 7, 8, 9, 9],
    [3, 4, 4, 5, 6, 6, 6, 0, 0],
    [3, 4, 4, 5, 5, 6, 6, 0, 0],
    [3, 4, 4, 5, 5, 5, 0, 0, 0],
    [3, 4, 4, 4, 5, 5, 0, 0, 0],
    [3, 3, 3, 4, 5, 6, 6, 0, 0],
    [3, 3, 3, 4, 5, 6, 6, 0, 0],
    [2, 3, 3, 4, 5, 6, 6, 0, 0],
    [2, 2, 3, 4, 5, 6, 6, 0, 0],
    [2, 2, 3, 4, 5, 5, 0, 0, 0],
    [1, 3, 3, 4, 4, 0, 0, 0, 0],
    [1, 2, 3, 4, 4, 0, 0, 0, 0],
    [1, 2, 3, 3, 0, 0, 0, 0, 0],
    [1, 2, 2, 0, 0, 0, 0, 0, 0],
    [1, 1, 0, 0, 0, 0, 0, 0, 0],
];

/// total_zeros 码长修正, `table` 为 total_coeff - 1
pub const TOTAL_ZEROS_LEN_FIXES: [LengthFix; 5] = [
    LengthFix { table: 1, lead: 2, mask: 1 << 29 },
    LengthFix { table: 2, lead: 2, mask: 1 << 29 },
    LengthFix { table: 3, lead: 2, mask: 1 << 29 },
    LengthFix { table: 4, lead: 2, mask: 1 << 29 },
    LengthFix { table: 6, lead: 1, mask: 1 << 30 },
];

pub const CHROMA_DC_TOTAL_ZEROS_MAX_LEAD: [u32; 3] = [4, 3, 2];

#[rustfmt::skip]
pub const CHROMA_DC_TOTAL_ZEROS_LEAD_LENS: [[u8; 4]; 3] = [
    [1, 2, 3, 3],
    [1, 2, 2, 0],
    [1, 1, 0, 0],
];

/// run_before 各表 (下标 min(zeros_left, 7) - 1) 的最大前导位置
pub const RUN_BEFORE_MAX_LEAD: [u32; 7] = [2, 3, 3, 4, 4, 4, 11];

#[rustfmt::skip]
pub const RUN_BEFORE_LEAD_LENS: [[u8; 11]; 7] = [
    [1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [1, 2, 2, 0, 0, 0, 0, 0, 0, 0, 0],
    [2, 2, 2, 0, 0, 0, 0, 0, 0, 0, 0],
    [2, 2, 3, 3, 0, 0, 0, 0, 0, 0, 0],
    [2, 3, 3, 3, 0, 0, 0, 0, 0, 0, 0],
    [3, 3, 3, 3, 0, 0, 0, 0, 0, 0, 0],
    [3, 3, 3, 4, 5, 6, 7, 8, 9, 10, 11],
];

pub const RUN_BEFORE_LEN_FIXES: [LengthFix; 1] = [LengthFix { table: 5, lead: 1, mask: 1 << 30 }];

// ============================================================
// 去块滤波阈值
// ============================================================

#[rustfmt::skip]
pub const ALPHA_TABLE: [u8; 52] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    4, 4, 5, 6, 7, 8, 9, 10, 12, 13, 15, 17, 20, 22, 25, 28,
    32, 36, 40, 45, 50, 56, 63, 71, 80, 90, 101, 113, 127, 144, 162, 182,
    203, 226, 255, 255,
];

#[rustfmt::skip]
pub const BETA_TABLE: [u8; 52] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 6, 6, 7, 7, 8, 8,
    9, 9, 10, 10, 11, 11, 12, 12, 13, 13, 14, 14, 15, 15, 16, 16,
    17, 17, 18, 18,
];

/// tc0 阈值, 下标 [indexA][bS - 1]
#[rustfmt::skip]
pub const TC0_TABLE: [[u8; 3]; 52] = [
    [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0],
    [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0],
    [0, 0, 0], [0, 0, 1], [0, 0, 1], [0, 0, 1], [0, 0, 1], [0, 1, 1], [0, 1, 1], [1, 1, 1],
    [1, 1, 1], [1, 1, 1], [1, 1, 1], [1, 1, 2], [1, 1, 2], [1, 1, 2], [1, 1, 2], [1, 2, 3],
    [1, 2, 3], [2, 2, 3], [2, 2, 4], [2, 3, 4], [2, 3, 4], [3, 3, 5], [3, 4, 6], [3, 4, 6],
    [4, 5, 7], [4, 5, 8], [4, 6, 9], [5, 7, 10], [6, 8, 11], [6, 8, 13], [7, 10, 14], [8, 11, 16],
    [9, 12, 18], [10, 13, 20], [11, 15, 23], [13, 17, 25],
];
