//! 宏块级去块滤波引擎.
//!
//! 按光栅顺序逐宏块调用 [`DeblockCtx::filter_macroblock`]. 上下文保存两类邻居状态:
//! - 环形缓冲: 最近装入的 4x4 块, 每个宏块 24 块 (16 亮度 + 4 Cb + 4 Cr),
//!   左邻宏块的块位于当前写位置之前 24 项.
//! - 上行缓存: 每个宏块列 8 项 (亮度底行 4 块, Cb/Cr 底行各 2 块),
//!   保存上一宏块行滤波后尚未写回的块.
//!
//! 宏块右列与底行的块要等右侧/下方宏块滤波完边缘后才写回图像,
//! 位于图像右边界或底边界的块在本宏块内立即写回.

mod filter;
mod strength;

pub use filter::{EdgeDir, filter_edge};
pub use strength::{EdgeThresholds, average_qp, boundary_strength, edge_thresholds};

use avcref_core::{AvcError, AvcResult};
use log::{debug, trace};

use crate::macroblock::{MacroblockHeader, MbType, MotionVector, NonzeroCounts};
use crate::planes::{Plane, Planes};

/// 环形缓冲容量
pub const RING_CAPACITY: usize = 64;
/// 每个宏块装入环形缓冲的块数
pub const BLOCKS_PER_MB: usize = 24;
/// 上行缓存中每个宏块列的项数
pub const ABOVE_SLOTS_PER_MB: usize = 8;

/// 片级去块参数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeblockParams {
    /// 0: 全部滤波; 1: 关闭; 2: 不跨片边界 (单片图像与 0 相同)
    pub disable_idc: u8,
    /// alpha 偏移 / 2, 范围 -6..=6
    pub alpha_offset_div2: i8,
    /// beta 偏移 / 2, 范围 -6..=6
    pub beta_offset_div2: i8,
}

impl DeblockParams {
    pub fn new(disable_idc: u8, alpha_offset_div2: i8, beta_offset_div2: i8) -> AvcResult<Self> {
        let params = Self {
            disable_idc,
            alpha_offset_div2,
            beta_offset_div2,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> AvcResult<()> {
        if self.disable_idc > 2 {
            return Err(AvcError::InvalidArgument(format!(
                "disable_deblocking_filter_idc={} 超出 0..=2",
                self.disable_idc
            )));
        }
        for (name, v) in [
            ("alpha_offset_div2", self.alpha_offset_div2),
            ("beta_offset_div2", self.beta_offset_div2),
        ] {
            if !(-6..=6).contains(&v) {
                return Err(AvcError::InvalidArgument(format!(
                    "{}={} 超出 -6..=6",
                    name, v
                )));
            }
        }
        Ok(())
    }

    pub fn is_disabled(&self) -> bool {
        self.disable_idc == 1
    }
}

/// 一个 4x4 块的滤波状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeblockBlock {
    pub samples: [u8; 16],
    pub mb_type: MbType,
    pub qp: u8,
    pub nonzero: bool,
    pub out_of_picture: bool,
    pub mv: MotionVector,
    pub ref_idx: i32,
}

impl Default for DeblockBlock {
    fn default() -> Self {
        Self {
            samples: [0; 16],
            mb_type: MbType::default(),
            qp: 0,
            nonzero: false,
            out_of_picture: true,
            mv: MotionVector::default(),
            ref_idx: 0,
        }
    }
}

/// 缓冲区位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Ring(usize),
    Above(usize),
}

/// 亮度块 (列, 行) 的解码序号
fn luma_order(col: usize, row: usize) -> usize {
    (col & 1) | ((row & 1) << 1) | ((col & 2) << 1) | ((row & 2) << 2)
}

/// 色度块 (列, 行) 在 24 块中的序号, `k` 为 0 (Cb) 或 1 (Cr)
fn chroma_order(k: usize, col: usize, row: usize) -> usize {
    16 + k * 4 + row * 2 + col
}

/// 序号 0..24 对应的平面与宏块内 (列, 行)
fn order_position(i: usize) -> (Plane, usize, usize) {
    if i < 16 {
        let (c, r) = crate::macroblock::luma_block_pos(i);
        (Plane::Y, c, r)
    } else {
        let plane = if i < 20 { Plane::Cb } else { Plane::Cr };
        let (c, r) = crate::macroblock::chroma_block_pos((i - 16) % 4);
        (plane, c, r)
    }
}

const CHROMA_PLANES: [Plane; 2] = [Plane::Cb, Plane::Cr];

/// 去块滤波上下文, 每帧创建一次
#[derive(Debug, Clone)]
pub struct DeblockCtx {
    params: DeblockParams,
    mb_width: usize,
    mb_height: usize,
    ring: Vec<DeblockBlock>,
    ring_idx: usize,
    above: Vec<DeblockBlock>,
    next_mb: (usize, usize),
}

impl DeblockCtx {
    pub fn new(mb_width: usize, mb_height: usize, params: DeblockParams) -> AvcResult<Self> {
        if mb_width == 0 || mb_height == 0 {
            return Err(AvcError::InvalidArgument(format!(
                "图像尺寸无效: {}x{} 宏块",
                mb_width, mb_height
            )));
        }
        params.validate()?;
        Ok(Self {
            params,
            mb_width,
            mb_height,
            ring: vec![DeblockBlock::default(); RING_CAPACITY],
            ring_idx: 0,
            above: vec![DeblockBlock::default(); mb_width * ABOVE_SLOTS_PER_MB],
            next_mb: (0, 0),
        })
    }

    /// 新一帧: 两个缓冲区全部标记为图像外
    pub fn reset(&mut self) {
        self.ring.fill(DeblockBlock::default());
        self.above.fill(DeblockBlock::default());
        self.ring_idx = 0;
        self.next_mb = (0, 0);
    }

    pub fn params(&self) -> &DeblockParams {
        &self.params
    }

    /// 环形缓冲当前写位置
    pub fn ring_index(&self) -> usize {
        self.ring_idx
    }

    /// 宏块列 `mbx` 第 `slot` 项在上行缓存中的下标
    pub fn above_index(&self, mbx: usize, slot: usize) -> usize {
        (mbx * ABOVE_SLOTS_PER_MB + slot) % self.above.len()
    }

    pub fn ring_slot(&self, index: usize) -> Option<&DeblockBlock> {
        self.ring.get(index)
    }

    pub fn above_slot(&self, index: usize) -> Option<&DeblockBlock> {
        self.above.get(index)
    }

    fn cur(&self, i: usize) -> Slot {
        Slot::Ring((self.ring_idx + i) % RING_CAPACITY)
    }

    fn left(&self, i: usize) -> Slot {
        Slot::Ring((self.ring_idx + RING_CAPACITY - BLOCKS_PER_MB + i) % RING_CAPACITY)
    }

    fn get(&self, slot: Slot) -> &DeblockBlock {
        match slot {
            Slot::Ring(i) => &self.ring[i],
            Slot::Above(i) => &self.above[i],
        }
    }

    fn put(&mut self, slot: Slot, block: DeblockBlock) {
        match slot {
            Slot::Ring(i) => self.ring[i] = block,
            Slot::Above(i) => self.above[i] = block,
        }
    }

    /// 滤波 p、q 两块之间的边缘; p 在图像外时跳过
    fn filter_pair(&mut self, p: Slot, q: Slot, dir: EdgeDir, line_bs: [u8; 4], chroma: bool) {
        let mut pb = *self.get(p);
        let mut qb = *self.get(q);
        if pb.out_of_picture || qb.out_of_picture || line_bs.iter().all(|&bs| bs == 0) {
            return;
        }
        let th = edge_thresholds(average_qp(&pb, &qb, chroma), &self.params);
        filter_edge(&mut pb.samples, &mut qb.samples, dir, &line_bs, &th, chroma);
        self.put(p, pb);
        self.put(q, qb);
    }

    fn load(&mut self, planes: &Planes, hdr: &MacroblockHeader, nz: &NonzeroCounts) -> AvcResult<()> {
        for i in 0..BLOCKS_PER_MB {
            let (plane, c, r) = order_position(i);
            let per_mb = plane.mb_size() / 4;
            let samples = planes.load_block(plane, hdr.mbx * per_mb + c, hdr.mby * per_mb + r)?;
            let b = if plane.is_chroma() { (i - 16) % 4 } else { i };
            let block = DeblockBlock {
                samples,
                mb_type: hdr.mb_type,
                qp: hdr.qp,
                nonzero: nz.plane(plane)[b] != 0,
                out_of_picture: false,
                mv: hdr.mv,
                ref_idx: hdr.ref_idx,
            };
            let slot = self.cur(i);
            self.put(slot, block);
        }
        Ok(())
    }

    fn store(&self, planes: &mut Planes, slot: Slot, plane: Plane, bx: usize, by: usize) -> AvcResult<()> {
        planes.store_block(plane, bx, by, &self.get(slot).samples)
    }

    /// 对一个宏块执行去块滤波, 结果写回 `planes`.
    ///
    /// 宏块必须按光栅顺序提交; `disable_idc == 1` 时整个调用为空操作.
    pub fn filter_macroblock(
        &mut self,
        planes: &mut Planes,
        hdr: &MacroblockHeader,
        nz: &NonzeroCounts,
    ) -> AvcResult<()> {
        if planes.mb_width() != self.mb_width || planes.mb_height() != self.mb_height {
            return Err(AvcError::InvalidArgument(format!(
                "图像尺寸 {}x{} 与上下文 {}x{} 不符",
                planes.mb_width(),
                planes.mb_height(),
                self.mb_width,
                self.mb_height
            )));
        }
        if (hdr.mbx, hdr.mby) != self.next_mb {
            return Err(AvcError::InvalidArgument(format!(
                "宏块 ({}, {}) 不符合光栅顺序, 应为 ({}, {})",
                hdr.mbx, hdr.mby, self.next_mb.0, self.next_mb.1
            )));
        }
        if hdr.qp > 51 {
            return Err(AvcError::InvalidArgument(format!("qp={} 超出 0..=51", hdr.qp)));
        }
        self.next_mb = if hdr.mbx + 1 == self.mb_width {
            (0, hdr.mby + 1)
        } else {
            (hdr.mbx + 1, hdr.mby)
        };

        if self.params.is_disabled() {
            trace!("宏块 ({}, {}) 去块已关闭", hdr.mbx, hdr.mby);
            return Ok(());
        }

        self.load(planes, hdr, nz)?;
        let (bs_vertical, bs_horizontal) = self.filter_edges(hdr.mbx, hdr.mby);
        self.write_back(planes, hdr.mbx, hdr.mby)?;
        self.ring_idx = (self.ring_idx + BLOCKS_PER_MB) % RING_CAPACITY;

        debug!(
            "宏块 ({}, {}) 去块: type={:?} qp={} bS 垂直={:?} 水平={:?}",
            hdr.mbx, hdr.mby, hdr.mb_type, hdr.qp, bs_vertical, bs_horizontal
        );
        Ok(())
    }

    /// 按边缘分组滤波: 亮度垂直边缘自左向右, 亮度水平边缘自上而下, 然后 Cb、Cr.
    ///
    /// 返回亮度边界强度, 下标为 `边缘 * 4 + 线`.
    fn filter_edges(&mut self, mbx: usize, mby: usize) -> ([u8; 16], [u8; 16]) {
        let has_left = mbx > 0;
        let has_top = mby > 0;
        let mut bs_v = [0u8; 16];
        let mut bs_h = [0u8; 16];

        for c in 0..4 {
            for r in 0..4 {
                let q = self.cur(luma_order(c, r));
                let p = match c {
                    0 if !has_left => continue,
                    0 => self.left(luma_order(3, r)),
                    _ => self.cur(luma_order(c - 1, r)),
                };
                if self.get(p).out_of_picture {
                    continue;
                }
                let bs = boundary_strength(self.get(p), self.get(q), c == 0);
                bs_v[c * 4 + r] = bs;
                self.filter_pair(p, q, EdgeDir::Vertical, [bs; 4], false);
            }
        }

        for r in 0..4 {
            for c in 0..4 {
                let q = self.cur(luma_order(c, r));
                let p = match r {
                    0 if !has_top => continue,
                    0 => Slot::Above(self.above_index(mbx, c)),
                    _ => self.cur(luma_order(c, r - 1)),
                };
                if self.get(p).out_of_picture {
                    continue;
                }
                let bs = boundary_strength(self.get(p), self.get(q), r == 0);
                bs_h[r * 4 + c] = bs;
                self.filter_pair(p, q, EdgeDir::Horizontal, [bs; 4], false);
            }
        }

        // 色度第 e 条边缘对应亮度第 2e 条, 每两条线共用一个亮度强度
        let chroma_bs = |table: &[u8; 16], edge: usize, rc: usize| -> [u8; 4] {
            let base = edge * 2 * 4 + rc * 2;
            [table[base], table[base], table[base + 1], table[base + 1]]
        };
        for k in 0..CHROMA_PLANES.len() {
            for c in 0..2 {
                for r in 0..2 {
                    let q = self.cur(chroma_order(k, c, r));
                    let p = match c {
                        0 if !has_left => continue,
                        0 => self.left(chroma_order(k, 1, r)),
                        _ => self.cur(chroma_order(k, 0, r)),
                    };
                    self.filter_pair(p, q, EdgeDir::Vertical, chroma_bs(&bs_v, c, r), true);
                }
            }
            for r in 0..2 {
                for c in 0..2 {
                    let q = self.cur(chroma_order(k, c, r));
                    let p = match r {
                        0 if !has_top => continue,
                        0 => Slot::Above(self.above_index(mbx, 4 + k * 2 + c)),
                        _ => self.cur(chroma_order(k, c, 0)),
                    };
                    self.filter_pair(p, q, EdgeDir::Horizontal, chroma_bs(&bs_h, r, c), true);
                }
            }
        }
        (bs_v, bs_h)
    }

    /// 写回已完成的块, 并更新上行缓存
    fn write_back(&mut self, planes: &mut Planes, mbx: usize, mby: usize) -> AvcResult<()> {
        let right_edge = mbx + 1 == self.mb_width;
        let bottom_edge = mby + 1 == self.mb_height;

        // 本宏块: 右列等待右侧宏块, 底行等待下方宏块
        for i in 0..BLOCKS_PER_MB {
            let (plane, c, r) = order_position(i);
            let last = plane.mb_size() / 4 - 1;
            if (c < last || right_edge) && (r < last || bottom_edge) {
                let per_mb = last + 1;
                self.store(planes, self.cur(i), plane, mbx * per_mb + c, mby * per_mb + r)?;
            }
        }

        // 左邻宏块的右列: 除右下角外已全部完成
        if mbx > 0 {
            for r in 0..4 {
                if r < 3 || bottom_edge {
                    let slot = self.left(luma_order(3, r));
                    self.store(planes, slot, Plane::Y, (mbx - 1) * 4 + 3, mby * 4 + r)?;
                }
            }
            for (k, &plane) in CHROMA_PLANES.iter().enumerate() {
                for r in 0..2 {
                    if r < 1 || bottom_edge {
                        let slot = self.left(chroma_order(k, 1, r));
                        self.store(planes, slot, plane, (mbx - 1) * 2 + 1, mby * 2 + r)?;
                    }
                }
            }
            // 左邻右下角块进入上行缓存
            let corners = [
                (3, luma_order(3, 3)),
                (5, chroma_order(0, 1, 1)),
                (7, chroma_order(1, 1, 1)),
            ];
            for (slot, i) in corners {
                let block = *self.get(self.left(i));
                let idx = self.above_index(mbx - 1, slot);
                self.above[idx] = block;
            }
        }

        // 上方宏块的底行在本宏块顶边缘滤波后完成
        if mby > 0 {
            for slot in 0..ABOVE_SLOTS_PER_MB {
                let (plane, c) = match slot {
                    0..4 => (Plane::Y, slot),
                    4..6 => (Plane::Cb, slot - 4),
                    _ => (Plane::Cr, slot - 6),
                };
                let per_mb = plane.mb_size() / 4;
                let idx = Slot::Above(self.above_index(mbx, slot));
                self.store(planes, idx, plane, mbx * per_mb + c, mby * per_mb - 1)?;
            }
        }

        // 本宏块底行进入上行缓存, 右下角块留待右侧宏块
        for c in 0..4 {
            if c < 3 || right_edge {
                let block = *self.get(self.cur(luma_order(c, 3)));
                let idx = self.above_index(mbx, c);
                self.above[idx] = block;
            }
        }
        for k in 0..CHROMA_PLANES.len() {
            for c in 0..2 {
                if c < 1 || right_edge {
                    let block = *self.get(self.cur(chroma_order(k, c, 1)));
                    let idx = self.above_index(mbx, 4 + k * 2 + c);
                    self.above[idx] = block;
                }
            }
        }
        Ok(())
    }
}
