//! 边缘样本滤波.
//!
//! 每个 4x4 块是独立的 16 样本数组, 边缘两侧的样本按方向与线号索引:
//! 垂直边缘 (p 在左) 沿行取样, 水平边缘 (p 在上) 沿列取样.

use super::strength::EdgeThresholds;
use crate::tables::TC0_TABLE;

/// 边缘方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeDir {
    /// 垂直边缘, 左右两块
    Vertical,
    /// 水平边缘, 上下两块
    Horizontal,
}

impl EdgeDir {
    /// p 侧第 k 个样本 (k = 0 紧邻边缘) 在块内的下标
    pub fn p_index(self, line: usize, k: usize) -> usize {
        match self {
            Self::Vertical => line * 4 + 3 - k,
            Self::Horizontal => (3 - k) * 4 + line,
        }
    }

    /// q 侧第 k 个样本在块内的下标
    pub fn q_index(self, line: usize, k: usize) -> usize {
        match self {
            Self::Vertical => line * 4 + k,
            Self::Horizontal => k * 4 + line,
        }
    }
}

#[inline]
fn clip1(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// 一条线两侧各 4 个样本
struct Line {
    p: [i32; 4],
    q: [i32; 4],
}

impl Line {
    fn load(p: &[u8; 16], q: &[u8; 16], dir: EdgeDir, line: usize) -> Self {
        Self {
            p: core::array::from_fn(|k| i32::from(p[dir.p_index(line, k)])),
            q: core::array::from_fn(|k| i32::from(q[dir.q_index(line, k)])),
        }
    }

    /// 滤波开关: |p0-q0| < alpha, |p1-p0| < beta, |q1-q0| < beta
    fn active(&self, th: &EdgeThresholds) -> bool {
        (self.p[0] - self.q[0]).abs() < th.alpha
            && (self.q[1] - self.q[0]).abs() < th.beta
            && (self.p[1] - self.p[0]).abs() < th.beta
    }

    fn ap(&self, th: &EdgeThresholds) -> bool {
        (self.p[2] - self.p[0]).abs() < th.beta
    }

    fn aq(&self, th: &EdgeThresholds) -> bool {
        (self.q[2] - self.q[0]).abs() < th.beta
    }

    fn strong_gate(&self, th: &EdgeThresholds) -> bool {
        (self.p[0] - self.q[0]).abs() < (th.alpha >> 2) + 2
    }

    fn normal_delta(&self, tc: i32) -> i32 {
        let [p0, p1, ..] = self.p;
        let [q0, q1, ..] = self.q;
        ((((q0 - p0) << 2) + (p1 - q1) + 4) >> 3).clamp(-tc, tc)
    }
}

/// 亮度一条线. 返回 p、q 两侧前 3 个样本的新值.
fn luma_line(line: &Line, bs: u8, th: &EdgeThresholds) -> ([i32; 3], [i32; 3]) {
    let [p0, p1, p2, p3] = line.p;
    let [q0, q1, q2, q3] = line.q;
    let mut np = [p0, p1, p2];
    let mut nq = [q0, q1, q2];
    let (ap, aq) = (line.ap(th), line.aq(th));

    if bs == 4 {
        let strong = line.strong_gate(th);
        if ap && strong {
            np[0] = (p2 + 2 * p1 + 2 * p0 + 2 * q0 + q1 + 4) >> 3;
            np[1] = (p2 + p1 + p0 + q0 + 2) >> 2;
            np[2] = (2 * p3 + 3 * p2 + p1 + p0 + q0 + 4) >> 3;
        } else {
            np[0] = (2 * p1 + p0 + q1 + 2) >> 2;
        }
        if aq && strong {
            nq[0] = (p1 + 2 * p0 + 2 * q0 + 2 * q1 + q2 + 4) >> 3;
            nq[1] = (p0 + q0 + q1 + q2 + 2) >> 2;
            nq[2] = (2 * q3 + 3 * q2 + q1 + q0 + p0 + 4) >> 3;
        } else {
            nq[0] = (2 * q1 + q0 + p1 + 2) >> 2;
        }
        return (np, nq);
    }

    let tc0 = i32::from(TC0_TABLE[th.index_a][usize::from(bs) - 1]);
    let tc = tc0 + i32::from(ap) + i32::from(aq);
    let delta = line.normal_delta(tc);
    np[0] = i32::from(clip1(p0 + delta));
    nq[0] = i32::from(clip1(q0 - delta));
    if ap {
        np[1] = p1 + ((p2 + ((p0 + q0 + 1) >> 1) - (p1 << 1)) >> 1).clamp(-tc0, tc0);
    }
    if aq {
        nq[1] = q1 + ((q2 + ((p0 + q0 + 1) >> 1) - (q1 << 1)) >> 1).clamp(-tc0, tc0);
    }
    (np, nq)
}

/// 色度一条线, 只修改 p0/q0
fn chroma_line(line: &Line, bs: u8, th: &EdgeThresholds) -> (i32, i32) {
    let [p0, p1, ..] = line.p;
    let [q0, q1, ..] = line.q;

    if bs == 4 {
        let strong = line.strong_gate(th);
        let np0 = if line.ap(th) && strong {
            (2 * p1 + p0 + q1 + 2) >> 2
        } else {
            p0
        };
        let nq0 = if line.aq(th) && strong {
            (2 * q1 + q0 + p1 + 2) >> 2
        } else {
            q0
        };
        return (np0, nq0);
    }

    let tc = i32::from(TC0_TABLE[th.index_a][usize::from(bs) - 1]) + 1;
    let delta = line.normal_delta(tc);
    (i32::from(clip1(p0 + delta)), i32::from(clip1(q0 - delta)))
}

/// 滤波 p、q 两块之间的一条边缘.
///
/// `line_bs[i]` 为第 i 条线的边界强度, 0 表示该线不滤波.
pub fn filter_edge(
    p: &mut [u8; 16],
    q: &mut [u8; 16],
    dir: EdgeDir,
    line_bs: &[u8; 4],
    th: &EdgeThresholds,
    chroma: bool,
) {
    for (i, &bs) in line_bs.iter().enumerate() {
        if bs == 0 {
            continue;
        }
        let line = Line::load(p, q, dir, i);
        if !line.active(th) {
            continue;
        }
        if chroma {
            let (np0, nq0) = chroma_line(&line, bs, th);
            p[dir.p_index(i, 0)] = clip1(np0);
            q[dir.q_index(i, 0)] = clip1(nq0);
        } else {
            let (np, nq) = luma_line(&line, bs, th);
            for k in 0..3 {
                p[dir.p_index(i, k)] = clip1(np[k]);
                q[dir.q_index(i, k)] = clip1(nq[k]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds(alpha: i32, beta: i32, index_a: usize) -> EdgeThresholds {
        EdgeThresholds {
            alpha,
            beta,
            index_a,
        }
    }

    /// 构造垂直边缘两侧: 每行 p = [a, a, a, a], q = [b, b, b, b]
    fn flat_pair(a: u8, b: u8) -> ([u8; 16], [u8; 16]) {
        ([a; 16], [b; 16])
    }

    #[test]
    fn test_sample_indexing() {
        assert_eq!(EdgeDir::Vertical.p_index(1, 0), 7);
        assert_eq!(EdgeDir::Vertical.q_index(1, 0), 4);
        assert_eq!(EdgeDir::Horizontal.p_index(2, 0), 14);
        assert_eq!(EdgeDir::Horizontal.q_index(2, 3), 14);
        assert_eq!(EdgeDir::Horizontal.p_index(0, 3), 0);
    }

    #[test]
    fn test_zero_strength_is_noop() {
        let (mut p, mut q) = flat_pair(40, 44);
        filter_edge(&mut p, &mut q, EdgeDir::Vertical, &[0; 4], &thresholds(50, 10, 36), false);
        assert_eq!((p, q), flat_pair(40, 44), "bS=0 不应修改样本");
    }

    #[test]
    fn test_large_step_is_kept() {
        let (mut p, mut q) = flat_pair(10, 90);
        filter_edge(&mut p, &mut q, EdgeDir::Horizontal, &[4; 4], &thresholds(40, 10, 30), false);
        assert_eq!((p, q), flat_pair(10, 90), "大于 alpha 的跳变是真实边缘");
    }

    #[test]
    fn test_luma_strong_filter() {
        // p = 40, q = 44: 强滤波后 p0 = (40+80+80+88+44+4)>>3 = 42
        let (mut p, mut q) = flat_pair(40, 44);
        filter_edge(&mut p, &mut q, EdgeDir::Vertical, &[4; 4], &thresholds(50, 10, 36), false);
        for line in 0..4 {
            assert_eq!(p[line * 4 + 3], 42);
            assert_eq!(p[line * 4 + 2], 41, "p1 = (40+40+40+44+2)>>2");
            assert_eq!(p[line * 4 + 1], 41, "p2 = (80+120+40+40+44+4)>>3");
            assert_eq!(p[line * 4], 40, "p3 不变");
            assert_eq!(q[line * 4], 43, "q0 = (40+80+88+88+44+4)>>3");
            assert_eq!(q[line * 4 + 1], 43);
        }
    }

    #[test]
    fn test_luma_normal_filter() {
        // bS=2, indexA=36: tc0 = 3, ap/aq 均成立 → tc = 5
        // delta = (4*4 + 0 + 4) >> 3 = 2
        let (mut p, mut q) = flat_pair(40, 44);
        filter_edge(&mut p, &mut q, EdgeDir::Horizontal, &[2; 4], &thresholds(50, 10, 36), false);
        for line in 0..4 {
            assert_eq!(p[12 + line], 42);
            assert_eq!(q[line], 42);
            // p1 += clip(+-3, (40 + 42 - 80) >> 1 = 1)
            assert_eq!(p[8 + line], 41);
            assert_eq!(q[4 + line], 43);
            assert_eq!(p[4 + line], 40, "普通滤波不修改 p2");
        }
    }

    #[test]
    fn test_chroma_filters() {
        let (mut p, mut q) = flat_pair(40, 44);
        filter_edge(&mut p, &mut q, EdgeDir::Vertical, &[4, 4, 0, 0], &thresholds(50, 10, 36), true);
        assert_eq!(p[3], 41, "p0 = (80+40+44+2)>>2");
        assert_eq!(q[0], 43, "q0 = (88+44+40+2)>>2");
        assert_eq!(p[2], 40, "色度只修改 p0");
        assert_eq!((p[11], q[8]), (40, 44), "bS=0 的线保持不变");

        // bS=1: tc = tc0 + 1 = 3, delta = 2
        let (mut p, mut q) = flat_pair(40, 44);
        filter_edge(&mut p, &mut q, EdgeDir::Vertical, &[1; 4], &thresholds(50, 10, 36), true);
        assert_eq!((p[3], q[0]), (42, 42));
    }
}
