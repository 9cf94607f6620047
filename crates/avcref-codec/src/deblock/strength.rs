//! 边界强度与滤波阈值.

use super::{DeblockBlock, DeblockParams};
use crate::macroblock::MbType;
use crate::tables::{ALPHA_TABLE, BETA_TABLE, chroma_qp};

/// 一条边缘的滤波阈值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeThresholds {
    pub alpha: i32,
    pub beta: i32,
    /// tc0 表行号
    pub index_a: usize,
}

/// 边界强度 (0..=4).
///
/// `mb_edge` 表示边缘位于宏块边界上.
pub fn boundary_strength(p: &DeblockBlock, q: &DeblockBlock, mb_edge: bool) -> u8 {
    if p.mb_type.is_intra() || q.mb_type.is_intra() {
        return if mb_edge { 4 } else { 3 };
    }
    if p.nonzero || q.nonzero {
        return 2;
    }
    if p.ref_idx != q.ref_idx
        || (p.mv.x - q.mv.x).abs() >= 4
        || (p.mv.y - q.mv.y).abs() >= 4
    {
        return 1;
    }
    0
}

fn block_qp(block: &DeblockBlock, chroma: bool) -> i32 {
    // IPCM 按 qp 0 参与平均
    let qp = if block.mb_type == MbType::Ipcm { 0 } else { block.qp };
    i32::from(if chroma { chroma_qp(qp) } else { qp })
}

/// 两侧 QP 的平均值, 色度先各自换算
pub fn average_qp(p: &DeblockBlock, q: &DeblockBlock, chroma: bool) -> i32 {
    (block_qp(p, chroma) + block_qp(q, chroma) + 1) >> 1
}

/// 由平均 QP 与片级偏移查表
pub fn edge_thresholds(qp_avg: i32, params: &DeblockParams) -> EdgeThresholds {
    let index_a = (qp_avg + 2 * i32::from(params.alpha_offset_div2)).clamp(0, 51) as usize;
    let index_b = (qp_avg + 2 * i32::from(params.beta_offset_div2)).clamp(0, 51) as usize;
    EdgeThresholds {
        alpha: i32::from(ALPHA_TABLE[index_a]),
        beta: i32::from(BETA_TABLE[index_b]),
        index_a,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macroblock::MotionVector;

    fn block(mb_type: MbType) -> DeblockBlock {
        DeblockBlock {
            mb_type,
            qp: 30,
            out_of_picture: false,
            ..DeblockBlock::default()
        }
    }

    #[test]
    fn test_intra_strength() {
        let intra = block(MbType::Intra);
        let inter = block(MbType::Inter);
        assert_eq!(boundary_strength(&intra, &inter, true), 4);
        assert_eq!(boundary_strength(&inter, &intra, false), 3);
        assert_eq!(boundary_strength(&block(MbType::Ipcm), &inter, true), 4);
    }

    #[test]
    fn test_inter_strength() {
        let a = block(MbType::Inter);
        let mut b = block(MbType::Inter);
        assert_eq!(boundary_strength(&a, &b, true), 0);

        b.mv = MotionVector::new(3, -3);
        assert_eq!(boundary_strength(&a, &b, true), 0, "运动差小于 4 不滤波");
        b.mv = MotionVector::new(0, -4);
        assert_eq!(boundary_strength(&a, &b, false), 1);

        let mut c = block(MbType::Inter);
        c.ref_idx = 1;
        assert_eq!(boundary_strength(&a, &c, false), 1);
        c.nonzero = true;
        assert_eq!(boundary_strength(&a, &c, false), 2, "非零系数优先于运动差");
    }

    #[test]
    fn test_average_qp() {
        let mut p = block(MbType::Inter);
        let mut q = block(MbType::Inter);
        p.qp = 30;
        q.qp = 33;
        assert_eq!(average_qp(&p, &q, false), 32);
        // QPc(30) = 29, QPc(33) = 32
        assert_eq!(average_qp(&p, &q, true), 31);
        p.mb_type = MbType::Ipcm;
        assert_eq!(average_qp(&p, &q, false), 17);
    }

    #[test]
    fn test_threshold_offsets() {
        let plain = edge_thresholds(30, &DeblockParams::default());
        assert_eq!((plain.alpha, plain.beta, plain.index_a), (25, 8, 30));
        let shifted = DeblockParams {
            alpha_offset_div2: 6,
            beta_offset_div2: -6,
            ..DeblockParams::default()
        };
        let th = edge_thresholds(45, &shifted);
        assert_eq!(th.index_a, 51, "indexA 截断到 51");
        assert_eq!(th.beta, i32::from(BETA_TABLE[33]));
    }
}
