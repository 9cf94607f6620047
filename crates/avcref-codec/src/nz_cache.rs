//! 非零系数个数缓存.
//!
//! coeff_token 码表由左邻与上邻块的非零系数个数预测 (nC). 上邻缓存覆盖
//! 整行宏块, 每帧重置; 左邻缓存只保存当前宏块左侧一列, 每行重置.
//! 未知 (图像边界外) 记为 [`UNKNOWN`], 不参与平均.

use avcref_core::{AvcError, AvcResult};

use crate::planes::Plane;

/// 邻居不可用
pub const UNKNOWN: i8 = -1;

/// 跳过宏块强制写入的非零个数
pub const SKIP_COUNT: i8 = 0;
/// IPCM 宏块强制写入的非零个数
pub const PCM_COUNT: i8 = 16;

/// 块在宏块内的上邻缓存下标 (列)
pub fn above_slot(bidx: usize) -> usize {
    (bidx & 1) + ((bidx & 4) >> 1)
}

/// 块在宏块内的左邻缓存下标 (行)
pub fn left_slot(bidx: usize) -> usize {
    ((bidx & 2) >> 1) + ((bidx & 8) >> 2)
}

/// 按左/上邻居预测 nC
pub fn predict_nc(left: i8, above: i8) -> i32 {
    match (left != UNKNOWN, above != UNKNOWN) {
        (true, true) => (i32::from(left) + i32::from(above) + 1) >> 1,
        (true, false) => i32::from(left),
        (false, true) => i32::from(above),
        (false, false) => 0,
    }
}

/// 单个宏块、单个平面的邻居视图
#[derive(Debug)]
pub struct NeighborCounts<'a> {
    /// 左邻一列 (亮度 4 项, 色度 2 项)
    pub left: &'a mut [i8],
    /// 上邻一行
    pub above: &'a mut [i8],
}

impl<'a> NeighborCounts<'a> {
    pub fn new(left: &'a mut [i8], above: &'a mut [i8]) -> Self {
        Self { left, above }
    }

    fn slots(&self, bidx: usize) -> AvcResult<(usize, usize)> {
        let (l, a) = (left_slot(bidx), above_slot(bidx));
        if l >= self.left.len() || a >= self.above.len() {
            return Err(AvcError::InvalidArgument(format!(
                "块位置 {} 超出邻居缓存范围",
                bidx
            )));
        }
        Ok((l, a))
    }

    /// 块 `bidx` 的 nC 预测值
    pub fn predict(&self, bidx: usize) -> AvcResult<i32> {
        let (l, a) = self.slots(bidx)?;
        Ok(predict_nc(self.left[l], self.above[a]))
    }

    /// 记录块 `bidx` 的非零系数个数, 供右侧与下方的块预测
    pub fn update(&mut self, bidx: usize, num_coeff: usize) -> AvcResult<()> {
        let (l, a) = self.slots(bidx)?;
        let n = num_coeff.min(16) as i8;
        self.left[l] = n;
        self.above[a] = n;
        Ok(())
    }

    /// 整个视图写入同一个值
    pub fn fill(&mut self, value: i8) {
        self.left.fill(value);
        self.above.fill(value);
    }
}

/// 一个宏块三个平面的邻居个数副本.
///
/// 由 [`NzCache::stage`] 取出, 宏块全部块处理成功后经 [`NzCache::commit`] 写回,
/// 中途出错时直接丢弃, 缓存保持宏块开始前的状态.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NzStage {
    mbx: usize,
    left: [[i8; 4]; 3],
    above: [[i8; 4]; 3],
}

impl NzStage {
    /// 平面 `plane` 的邻居视图
    pub fn window(&mut self, plane: Plane) -> NeighborCounts<'_> {
        let (k, n) = stage_slots(plane);
        NeighborCounts::new(&mut self.left[k][..n], &mut self.above[k][..n])
    }
}

fn stage_slots(plane: Plane) -> (usize, usize) {
    match plane {
        Plane::Y => (0, 4),
        Plane::Cb => (1, 2),
        Plane::Cr => (2, 2),
    }
}

/// 整帧的非零系数个数缓存
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NzCache {
    mb_width: usize,
    above_y: Vec<i8>,
    above_cb: Vec<i8>,
    above_cr: Vec<i8>,
    left_y: [i8; 4],
    left_cb: [i8; 2],
    left_cr: [i8; 2],
}

impl NzCache {
    pub fn new(mb_width: usize) -> AvcResult<Self> {
        if mb_width == 0 {
            return Err(AvcError::InvalidArgument("图像宽度不能为 0".into()));
        }
        Ok(Self {
            mb_width,
            above_y: vec![UNKNOWN; mb_width * 4],
            above_cb: vec![UNKNOWN; mb_width * 2],
            above_cr: vec![UNKNOWN; mb_width * 2],
            left_y: [UNKNOWN; 4],
            left_cb: [UNKNOWN; 2],
            left_cr: [UNKNOWN; 2],
        })
    }

    pub fn mb_width(&self) -> usize {
        self.mb_width
    }

    /// 帧开始: 上邻与左邻全部置为未知
    pub fn reset_frame(&mut self) {
        self.above_y.fill(UNKNOWN);
        self.above_cb.fill(UNKNOWN);
        self.above_cr.fill(UNKNOWN);
        self.start_row();
    }

    /// 宏块行开始: 左邻置为未知
    pub fn start_row(&mut self) {
        self.left_y = [UNKNOWN; 4];
        self.left_cb = [UNKNOWN; 2];
        self.left_cr = [UNKNOWN; 2];
    }

    fn check_column(&self, mbx: usize) -> AvcResult<()> {
        if mbx >= self.mb_width {
            return Err(AvcError::InvalidArgument(format!(
                "宏块列 {} 超出图像宽度 {}",
                mbx, self.mb_width
            )));
        }
        Ok(())
    }

    /// 宏块 `mbx` 在平面 `plane` 上的邻居视图
    pub fn window(&mut self, plane: Plane, mbx: usize) -> AvcResult<NeighborCounts<'_>> {
        self.check_column(mbx)?;
        Ok(match plane {
            Plane::Y => NeighborCounts::new(&mut self.left_y, &mut self.above_y[mbx * 4..mbx * 4 + 4]),
            Plane::Cb => {
                NeighborCounts::new(&mut self.left_cb, &mut self.above_cb[mbx * 2..mbx * 2 + 2])
            }
            Plane::Cr => {
                NeighborCounts::new(&mut self.left_cr, &mut self.above_cr[mbx * 2..mbx * 2 + 2])
            }
        })
    }

    /// 复制宏块 `mbx` 三个平面的邻居个数
    pub fn stage(&self, mbx: usize) -> AvcResult<NzStage> {
        self.check_column(mbx)?;
        let mut stage = NzStage {
            mbx,
            left: [[UNKNOWN; 4]; 3],
            above: [[UNKNOWN; 4]; 3],
        };
        for plane in Plane::ALL {
            let (k, n) = stage_slots(plane);
            let (left, above) = match plane {
                Plane::Y => (self.left_y.as_slice(), &self.above_y[mbx * 4..mbx * 4 + 4]),
                Plane::Cb => (self.left_cb.as_slice(), &self.above_cb[mbx * 2..mbx * 2 + 2]),
                Plane::Cr => (self.left_cr.as_slice(), &self.above_cr[mbx * 2..mbx * 2 + 2]),
            };
            stage.left[k][..n].copy_from_slice(left);
            stage.above[k][..n].copy_from_slice(above);
        }
        Ok(stage)
    }

    /// 写回 [`NzCache::stage`] 取出的副本
    pub fn commit(&mut self, stage: &NzStage) -> AvcResult<()> {
        for plane in Plane::ALL {
            let (k, n) = stage_slots(plane);
            let mut win = self.window(plane, stage.mbx)?;
            win.left.copy_from_slice(&stage.left[k][..n]);
            win.above.copy_from_slice(&stage.above[k][..n]);
        }
        Ok(())
    }

    /// 宏块 `mbx` 的全部平面写入同一个值 (跳过宏块 0, IPCM 16)
    pub fn fill_macroblock(&mut self, mbx: usize, value: i8) -> AvcResult<()> {
        for plane in Plane::ALL {
            self.window(plane, mbx)?.fill(value);
        }
        Ok(())
    }
}
