//! 4:2:0 图像平面.
//!
//! 亮度平面 16 x 16 像素对应一个宏块, 两个色度平面各 8 x 8.
//! 块坐标以 4x4 块为单位.

use avcref_core::{AvcError, AvcResult};

/// 图像平面
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plane {
    Y,
    Cb,
    Cr,
}

impl Plane {
    pub const ALL: [Plane; 3] = [Plane::Y, Plane::Cb, Plane::Cr];

    pub fn is_chroma(self) -> bool {
        self != Plane::Y
    }

    /// 每个宏块在本平面的边长 (像素)
    pub fn mb_size(self) -> usize {
        if self.is_chroma() { 8 } else { 16 }
    }
}

/// Y/Cb/Cr 三个平面的样本缓冲区
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Planes {
    mb_width: usize,
    mb_height: usize,
    y: Vec<u8>,
    cb: Vec<u8>,
    cr: Vec<u8>,
}

impl Planes {
    /// 创建以 `fill` 填充的平面
    pub fn new(mb_width: usize, mb_height: usize, fill: u8) -> AvcResult<Self> {
        if mb_width == 0 || mb_height == 0 {
            return Err(AvcError::InvalidArgument(format!(
                "图像尺寸无效: {}x{} 宏块",
                mb_width, mb_height
            )));
        }
        let luma = mb_width * 16 * mb_height * 16;
        Ok(Self {
            mb_width,
            mb_height,
            y: vec![fill; luma],
            cb: vec![fill; luma / 4],
            cr: vec![fill; luma / 4],
        })
    }

    /// 由已有样本构造, 各平面长度必须与尺寸一致
    pub fn from_samples(
        mb_width: usize,
        mb_height: usize,
        y: Vec<u8>,
        cb: Vec<u8>,
        cr: Vec<u8>,
    ) -> AvcResult<Self> {
        let mut planes = Self::new(mb_width, mb_height, 0)?;
        if y.len() != planes.y.len() || cb.len() != planes.cb.len() || cr.len() != planes.cr.len() {
            return Err(AvcError::InvalidArgument(format!(
                "平面长度与 {}x{} 宏块不符: y={} cb={} cr={}",
                mb_width,
                mb_height,
                y.len(),
                cb.len(),
                cr.len()
            )));
        }
        planes.y = y;
        planes.cb = cb;
        planes.cr = cr;
        Ok(planes)
    }

    pub fn mb_width(&self) -> usize {
        self.mb_width
    }

    pub fn mb_height(&self) -> usize {
        self.mb_height
    }

    /// 平面行跨度 (像素)
    pub fn stride(&self, plane: Plane) -> usize {
        self.mb_width * plane.mb_size()
    }

    /// 平面高度 (像素)
    pub fn height(&self, plane: Plane) -> usize {
        self.mb_height * plane.mb_size()
    }

    pub fn plane(&self, plane: Plane) -> &[u8] {
        match plane {
            Plane::Y => &self.y,
            Plane::Cb => &self.cb,
            Plane::Cr => &self.cr,
        }
    }

    pub fn plane_mut(&mut self, plane: Plane) -> &mut [u8] {
        match plane {
            Plane::Y => &mut self.y,
            Plane::Cb => &mut self.cb,
            Plane::Cr => &mut self.cr,
        }
    }

    fn check_block(&self, plane: Plane, bx: usize, by: usize) -> AvcResult<()> {
        let stride = self.stride(plane);
        if (bx + 1) * 4 > stride || (by + 1) * 4 > self.height(plane) {
            return Err(AvcError::InvalidArgument(format!(
                "{:?} 平面块坐标 ({}, {}) 越界",
                plane, bx, by
            )));
        }
        Ok(())
    }

    /// 读取平面中第 (bx, by) 个 4x4 块, 光栅顺序
    pub fn load_block(&self, plane: Plane, bx: usize, by: usize) -> AvcResult<[u8; 16]> {
        self.check_block(plane, bx, by)?;
        let stride = self.stride(plane);
        let data = self.plane(plane);
        let mut out = [0u8; 16];
        for row in 0..4 {
            let start = (by * 4 + row) * stride + bx * 4;
            out[row * 4..row * 4 + 4].copy_from_slice(&data[start..start + 4]);
        }
        Ok(out)
    }

    /// 写入平面中第 (bx, by) 个 4x4 块
    pub fn store_block(
        &mut self,
        plane: Plane,
        bx: usize,
        by: usize,
        block: &[u8; 16],
    ) -> AvcResult<()> {
        self.check_block(plane, bx, by)?;
        let stride = self.stride(plane);
        let data = self.plane_mut(plane);
        for row in 0..4 {
            let start = (by * 4 + row) * stride + bx * 4;
            data[start..start + 4].copy_from_slice(&block[row * 4..row * 4 + 4]);
        }
        Ok(())
    }

    /// 读取一个宏块在平面上的全部样本, 光栅顺序 (亮度 256, 色度 64)
    pub fn load_macroblock(&self, plane: Plane, mbx: usize, mby: usize) -> AvcResult<Vec<u8>> {
        let size = plane.mb_size();
        self.check_block(plane, (mbx + 1) * size / 4 - 1, (mby + 1) * size / 4 - 1)?;
        let stride = self.stride(plane);
        let data = self.plane(plane);
        let mut out = Vec::with_capacity(size * size);
        for row in 0..size {
            let start = (mby * size + row) * stride + mbx * size;
            out.extend_from_slice(&data[start..start + size]);
        }
        Ok(out)
    }

    /// 写入一个宏块的全部样本
    pub fn store_macroblock(
        &mut self,
        plane: Plane,
        mbx: usize,
        mby: usize,
        samples: &[u8],
    ) -> AvcResult<()> {
        let size = plane.mb_size();
        if samples.len() != size * size {
            return Err(AvcError::InvalidArgument(format!(
                "{:?} 宏块样本数 {} 应为 {}",
                plane,
                samples.len(),
                size * size
            )));
        }
        self.check_block(plane, (mbx + 1) * size / 4 - 1, (mby + 1) * size / 4 - 1)?;
        let stride = self.stride(plane);
        let data = self.plane_mut(plane);
        for (row, line) in samples.chunks_exact(size).enumerate() {
            let start = (mby * size + row) * stride + mbx * size;
            data[start..start + size].copy_from_slice(line);
        }
        Ok(())
    }

    /// 4x4 块样本之和
    pub fn block_sum(&self, plane: Plane, bx: usize, by: usize) -> AvcResult<i32> {
        Ok(self
            .load_block(plane, bx, by)?
            .iter()
            .map(|&v| i32::from(v))
            .sum())
    }
}

/// u8 块转为 i32 块
pub fn widen(block: &[u8; 16]) -> [i32; 16] {
    let mut out = [0i32; 16];
    for (o, &v) in out.iter_mut().zip(block.iter()) {
        *o = i32::from(v);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_dimensions() {
        let planes = Planes::new(3, 2, 128).unwrap();
        assert_eq!(planes.stride(Plane::Y), 48);
        assert_eq!(planes.stride(Plane::Cb), 24);
        assert_eq!(planes.height(Plane::Cr), 16);
        assert_eq!(planes.plane(Plane::Y).len(), 48 * 32);
        assert_eq!(planes.plane(Plane::Cb).len(), 24 * 16);
        assert!(Planes::new(0, 1, 0).is_err());
    }

    #[test]
    fn test_block_load_store() {
        let mut planes = Planes::new(2, 2, 0).unwrap();
        let block: [u8; 16] = core::array::from_fn(|i| i as u8 + 1);
        planes.store_block(Plane::Cb, 3, 1, &block).unwrap();
        assert_eq!(planes.load_block(Plane::Cb, 3, 1).unwrap(), block);
        assert_eq!(planes.block_sum(Plane::Cb, 3, 1).unwrap(), 136);
        // 行跨度 16: 第 (3, 1) 块左上角位于第 4 行第 12 列
        assert_eq!(planes.plane(Plane::Cb)[4 * 16 + 12], 1);
        assert_eq!(planes.plane(Plane::Cb)[7 * 16 + 15], 16);
    }

    #[test]
    fn test_block_out_of_range() {
        let planes = Planes::new(1, 1, 0).unwrap();
        assert!(planes.load_block(Plane::Y, 3, 3).is_ok());
        assert!(planes.load_block(Plane::Y, 4, 0).is_err());
        assert!(planes.load_block(Plane::Cr, 0, 2).is_err());
    }

    #[test]
    fn test_macroblock_copy() {
        let mut src = Planes::new(2, 2, 0).unwrap();
        let block: [u8; 16] = [9; 16];
        src.store_block(Plane::Cr, 3, 3, &block).unwrap();
        let samples = src.load_macroblock(Plane::Cr, 1, 1).unwrap();
        assert_eq!(samples.len(), 64);
        assert_eq!(samples[4 * 8 + 4], 9, "右下 4x4 块应位于宏块内 (4, 4)");
        assert_eq!(samples[0], 0);

        let mut dst = Planes::new(2, 2, 1).unwrap();
        dst.store_macroblock(Plane::Cr, 1, 1, &samples).unwrap();
        assert_eq!(dst.load_block(Plane::Cr, 3, 3).unwrap(), block);
        assert_eq!(dst.load_block(Plane::Cr, 0, 0).unwrap(), [1; 16]);
        assert!(dst.store_macroblock(Plane::Y, 0, 0, &samples).is_err());
        assert!(dst.load_macroblock(Plane::Y, 2, 0).is_err());
    }

    #[test]
    fn test_from_samples_validates_length() {
        let ok = Planes::from_samples(1, 1, vec![0; 256], vec![0; 64], vec![0; 64]);
        assert!(ok.is_ok());
        let bad = Planes::from_samples(1, 1, vec![0; 255], vec![0; 64], vec![0; 64]);
        assert!(bad.is_err());
    }
}
