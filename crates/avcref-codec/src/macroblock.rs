//! 宏块级块编解码驱动.
//!
//! 按解码顺序驱动一个宏块的全部块: 亮度 16 个 4x4 块 (四叉树序),
//! 然后 Cb、Cr 各一个 2x2 DC 块与 4 个 AC 块. 宏块类型由调用方决定,
//! 驱动只负责执行: 跳过宏块直接复制预测, IPCM 宏块直接传递原始样本.

use avcref_core::{AvcError, AvcResult, BitRunQueue};
use log::debug;

use crate::block::{BlockContext, decode_block, encode_block};
use crate::class::BlockClass;
use crate::nz_cache::{NzCache, PCM_COUNT, SKIP_COUNT};
use crate::planes::{Plane, Planes, widen};
use crate::quant::{DcHold, QuantParams};

/// IPCM 宏块的样本个数 (256 亮度 + 2 x 64 色度)
pub const PCM_SAMPLES: usize = 384;

// ============================================================
// 宏块头
// ============================================================

/// 宏块类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MbType {
    /// 帧间预测
    #[default]
    Inter,
    /// 帧内预测
    Intra,
    /// 跳过: 无残差
    Skip,
    /// 原始样本直传
    Ipcm,
}

impl MbType {
    /// 去块滤波按帧内处理的类型
    pub fn is_intra(self) -> bool {
        matches!(self, Self::Intra | Self::Ipcm)
    }
}

/// 运动矢量, 1/4 像素单位
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MotionVector {
    pub x: i32,
    pub y: i32,
}

impl MotionVector {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// 亮度残差组织方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LumaMode {
    /// 16 个独立的 4x4 块
    #[default]
    Block4x4,
    /// 亮度 DC 4x4 块 + 16 个仅 AC 块
    DcAc,
}

/// 宏块头: 位置与块编解码、去块滤波共用的属性
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MacroblockHeader {
    pub mbx: usize,
    pub mby: usize,
    pub mb_type: MbType,
    pub qp: u8,
    pub ref_idx: i32,
    pub mv: MotionVector,
}

impl MacroblockHeader {
    pub fn new(mbx: usize, mby: usize, mb_type: MbType, qp: u8) -> Self {
        Self {
            mbx,
            mby,
            mb_type,
            qp,
            ..Self::default()
        }
    }
}

/// 亮度块 `bidx` (四叉树序) 在宏块内的 (列, 行)
pub fn luma_block_pos(bidx: usize) -> (usize, usize) {
    ((bidx & 1) | ((bidx & 4) >> 1), ((bidx & 2) >> 1) | ((bidx & 8) >> 2))
}

/// 色度块 `bidx` 在宏块内的 (列, 行)
pub fn chroma_block_pos(bidx: usize) -> (usize, usize) {
    (bidx & 1, bidx >> 1)
}

// ============================================================
// 输入输出
// ============================================================

/// 各块的非零系数个数, 块序与解码顺序一致
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NonzeroCounts {
    pub luma: [u8; 16],
    pub cb: [u8; 4],
    pub cr: [u8; 4],
}

impl NonzeroCounts {
    pub fn filled(value: u8) -> Self {
        Self {
            luma: [value; 16],
            cb: [value; 4],
            cr: [value; 4],
        }
    }

    /// 按平面取计数
    pub fn plane(&self, plane: Plane) -> &[u8] {
        match plane {
            Plane::Y => &self.luma,
            Plane::Cb => &self.cb,
            Plane::Cr => &self.cr,
        }
    }

    fn plane_mut(&mut self, plane: Plane) -> &mut [u8] {
        match plane {
            Plane::Y => &mut self.luma,
            Plane::Cb => &mut self.cb,
            Plane::Cr => &mut self.cr,
        }
    }
}

/// 一个宏块的全部比特段.
///
/// 空队列表示该块未编码 (CAVLC 编码的块至少产生 1 比特).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroblockBits {
    /// 亮度 DC 块, 仅 [`LumaMode::DcAc`]
    pub luma_dc: Option<BitRunQueue>,
    /// 16 个亮度块, 四叉树序
    pub luma: Vec<BitRunQueue>,
    /// Cb DC, Cr DC
    pub chroma_dc: Vec<BitRunQueue>,
    /// Cb 块 0..4, 然后 Cr 块 0..4
    pub chroma_ac: Vec<BitRunQueue>,
    /// IPCM 样本: 亮度 256, Cb 64, Cr 64, 各自光栅顺序
    pub pcm: Option<Vec<u8>>,
}

impl MacroblockBits {
    /// 总比特数
    pub fn total_bits(&self) -> usize {
        let queues = self
            .luma_dc
            .iter()
            .chain(&self.luma)
            .chain(&self.chroma_dc)
            .chain(&self.chroma_ac)
            .map(BitRunQueue::total_bits)
            .sum::<usize>();
        queues + self.pcm.as_ref().map_or(0, |pcm| pcm.len() * 8)
    }
}

/// 宏块编码结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMacroblock {
    pub bits: MacroblockBits,
    pub nonzero: NonzeroCounts,
    pub bit_count: usize,
    pub sad: u32,
    pub ssd: u32,
}

/// 宏块解码结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedMacroblock {
    pub nonzero: NonzeroCounts,
    pub bits_consumed: usize,
}

fn chroma_classes(plane: Plane) -> (BlockClass, BlockClass) {
    match plane {
        Plane::Cb => (BlockClass::CbDc, BlockClass::CbAc),
        _ => (BlockClass::CrDc, BlockClass::CrAc),
    }
}

/// 色度 DC 输入: 各 4x4 块样本之和放在 4x4 网格的 0/2/8/10 位置
fn chroma_dc_grid(planes: &Planes, plane: Plane, mbx: usize, mby: usize) -> AvcResult<[i32; 16]> {
    let mut grid = [0i32; 16];
    for b in 0..4 {
        let (c, r) = chroma_block_pos(b);
        grid[c * 2 + r * 8] = planes.block_sum(plane, mbx * 2 + c, mby * 2 + r)?;
    }
    Ok(grid)
}

/// 亮度 DC 输入: 16 个 4x4 块样本之和, 光栅排列
fn luma_dc_grid(planes: &Planes, mbx: usize, mby: usize) -> AvcResult<[i32; 16]> {
    let mut grid = [0i32; 16];
    for b in 0..16 {
        let (c, r) = luma_block_pos(b);
        grid[r * 4 + c] = planes.block_sum(Plane::Y, mbx * 4 + c, mby * 4 + r)?;
    }
    Ok(grid)
}

fn distortion(a: &[u8], b: &[u8]) -> (u32, u32) {
    a.iter().zip(b).fold((0, 0), |(sad, ssd), (&x, &y)| {
        let d = u32::from(x.abs_diff(y));
        (sad + d, ssd + d * d)
    })
}

fn block_coords(plane: Plane, mbx: usize, mby: usize, bidx: usize) -> (usize, usize) {
    let (c, r) = if plane.is_chroma() {
        chroma_block_pos(bidx)
    } else {
        luma_block_pos(bidx)
    };
    let per_mb = plane.mb_size() / 4;
    (mbx * per_mb + c, mby * per_mb + r)
}

fn coded(queue: &BitRunQueue) -> Option<&BitRunQueue> {
    (!queue.is_empty()).then_some(queue)
}

// ============================================================
// 宏块驱动
// ============================================================

/// 宏块编解码器, 持有整帧的非零系数个数缓存
#[derive(Debug, Clone)]
pub struct MacroblockCoder {
    nz: NzCache,
    params: QuantParams,
    luma_mode: LumaMode,
}

impl MacroblockCoder {
    pub fn new(mb_width: usize, params: QuantParams) -> AvcResult<Self> {
        Ok(Self {
            nz: NzCache::new(mb_width)?,
            params,
            luma_mode: LumaMode::default(),
        })
    }

    pub fn with_luma_mode(mut self, luma_mode: LumaMode) -> Self {
        self.luma_mode = luma_mode;
        self
    }

    pub fn luma_mode(&self) -> LumaMode {
        self.luma_mode
    }

    pub fn params(&self) -> QuantParams {
        self.params
    }

    pub fn nz_cache(&self) -> &NzCache {
        &self.nz
    }

    /// 帧开始
    pub fn start_frame(&mut self) {
        self.nz.reset_frame();
    }

    /// 宏块行开始
    pub fn start_row(&mut self) {
        self.nz.start_row();
    }

    fn luma_class(&self) -> BlockClass {
        match self.luma_mode {
            LumaMode::Block4x4 => BlockClass::Luma4x4,
            LumaMode::DcAc => BlockClass::LumaAc,
        }
    }

    fn check_position(&self, hdr: &MacroblockHeader, planes: &Planes) -> AvcResult<()> {
        if hdr.mbx >= planes.mb_width() || hdr.mby >= planes.mb_height() {
            return Err(AvcError::InvalidArgument(format!(
                "宏块 ({}, {}) 超出图像 {}x{}",
                hdr.mbx,
                hdr.mby,
                planes.mb_width(),
                planes.mb_height()
            )));
        }
        if planes.mb_width() != self.nz.mb_width() {
            return Err(AvcError::InvalidArgument(format!(
                "图像宽度 {} 与缓存宽度 {} 不符",
                planes.mb_width(),
                self.nz.mb_width()
            )));
        }
        Ok(())
    }

    /// 编码并重建一个宏块, 重建样本写入 `recon`. 出错时状态不变.
    pub fn encode(
        &mut self,
        hdr: &MacroblockHeader,
        orig: &Planes,
        pred: &Planes,
        recon: &mut Planes,
    ) -> AvcResult<EncodedMacroblock> {
        self.check_position(hdr, recon)?;
        let (mbx, mby) = (hdr.mbx, hdr.mby);

        match hdr.mb_type {
            MbType::Skip => {
                let (mut sad, mut ssd) = (0, 0);
                for plane in Plane::ALL {
                    let p = pred.load_macroblock(plane, mbx, mby)?;
                    let o = orig.load_macroblock(plane, mbx, mby)?;
                    let (s, q) = distortion(&o, &p);
                    sad += s;
                    ssd += q;
                    recon.store_macroblock(plane, mbx, mby, &p)?;
                }
                self.nz.fill_macroblock(mbx, SKIP_COUNT)?;
                debug!("宏块 ({}, {}) 跳过", mbx, mby);
                return Ok(EncodedMacroblock {
                    bits: MacroblockBits::default(),
                    nonzero: NonzeroCounts::default(),
                    bit_count: 0,
                    sad,
                    ssd,
                });
            }
            MbType::Ipcm => {
                let mut pcm = Vec::with_capacity(PCM_SAMPLES);
                for plane in Plane::ALL {
                    let o = orig.load_macroblock(plane, mbx, mby)?;
                    recon.store_macroblock(plane, mbx, mby, &o)?;
                    pcm.extend_from_slice(&o);
                }
                self.nz.fill_macroblock(mbx, PCM_COUNT)?;
                let bits = MacroblockBits {
                    pcm: Some(pcm),
                    ..MacroblockBits::default()
                };
                let bit_count = bits.total_bits();
                return Ok(EncodedMacroblock {
                    bits,
                    nonzero: NonzeroCounts::filled(PCM_COUNT as u8),
                    bit_count,
                    sad: 0,
                    ssd: 0,
                });
            }
            MbType::Inter | MbType::Intra => {}
        }

        let params = self.params;
        let luma_class = self.luma_class();
        let mut stage = self.nz.stage(mbx)?;
        let mut blocks = StagedBlocks::new();
        let mut bits = MacroblockBits::default();
        let mut nonzero = NonzeroCounts::default();
        let (mut sad, mut ssd) = (0u32, 0u32);

        // 亮度
        {
            let mut counts = stage.window(Plane::Y);
            let mut hold = DcHold::new();
            if luma_class == BlockClass::LumaAc {
                let ctx = BlockContext::new(hdr.qp, BlockClass::LumaDc, 0);
                let o = luma_dc_grid(orig, mbx, mby)?;
                let p = luma_dc_grid(pred, mbx, mby)?;
                let enc = encode_block(&ctx, params, &o, &p, &mut counts, &mut hold)?;
                bits.luma_dc = Some(enc.queue);
            }
            for b in 0..16 {
                let (bx, by) = block_coords(Plane::Y, mbx, mby, b);
                let o = widen(&orig.load_block(Plane::Y, bx, by)?);
                let p = widen(&pred.load_block(Plane::Y, bx, by)?);
                let ctx = BlockContext::new(hdr.qp, luma_class, b);
                let enc = encode_block(&ctx, params, &o, &p, &mut counts, &mut hold)?;
                blocks.push(Plane::Y, bx, by, enc.recon);
                sad += enc.sad;
                ssd += enc.ssd;
                nonzero.luma[b] = enc.num_coeff as u8;
                bits.luma.push(enc.queue);
            }
        }

        // 色度
        for plane in [Plane::Cb, Plane::Cr] {
            let (dc_class, ac_class) = chroma_classes(plane);
            let mut counts = stage.window(plane);
            let mut hold = DcHold::new();

            let ctx = BlockContext::new(hdr.qp, dc_class, 0);
            let o = chroma_dc_grid(orig, plane, mbx, mby)?;
            let p = chroma_dc_grid(pred, plane, mbx, mby)?;
            let enc = encode_block(&ctx, params, &o, &p, &mut counts, &mut hold)?;
            bits.chroma_dc.push(enc.queue);

            for b in 0..4 {
                let (bx, by) = block_coords(plane, mbx, mby, b);
                let o = widen(&orig.load_block(plane, bx, by)?);
                let p = widen(&pred.load_block(plane, bx, by)?);
                let ctx = BlockContext::new(hdr.qp, ac_class, b);
                let enc = encode_block(&ctx, params, &o, &p, &mut counts, &mut hold)?;
                blocks.push(plane, bx, by, enc.recon);
                sad += enc.sad;
                ssd += enc.ssd;
                nonzero.plane_mut(plane)[b] = enc.num_coeff as u8;
                bits.chroma_ac.push(enc.queue);
            }
        }

        blocks.commit(recon)?;
        self.nz.commit(&stage)?;

        let bit_count = bits.total_bits();
        debug!(
            "宏块 ({}, {}) 编码: type={:?} qp={} bits={} sad={}",
            mbx, mby, hdr.mb_type, hdr.qp, bit_count, sad
        );
        Ok(EncodedMacroblock {
            bits,
            nonzero,
            bit_count,
            sad,
            ssd,
        })
    }

    /// 解码并重建一个宏块, 重建样本写入 `recon`.
    ///
    /// 任一块解析失败时返回错误, `recon` 与非零个数缓存都保持调用前的状态.
    pub fn decode(
        &mut self,
        hdr: &MacroblockHeader,
        bits: &MacroblockBits,
        pred: &Planes,
        recon: &mut Planes,
    ) -> AvcResult<DecodedMacroblock> {
        self.check_position(hdr, recon)?;
        let (mbx, mby) = (hdr.mbx, hdr.mby);

        match hdr.mb_type {
            MbType::Skip => {
                for plane in Plane::ALL {
                    let p = pred.load_macroblock(plane, mbx, mby)?;
                    recon.store_macroblock(plane, mbx, mby, &p)?;
                }
                self.nz.fill_macroblock(mbx, SKIP_COUNT)?;
                return Ok(DecodedMacroblock {
                    nonzero: NonzeroCounts::default(),
                    bits_consumed: 0,
                });
            }
            MbType::Ipcm => {
                let pcm = bits
                    .pcm
                    .as_deref()
                    .filter(|pcm| pcm.len() == PCM_SAMPLES)
                    .ok_or_else(|| {
                        AvcError::InvalidData(format!(
                            "宏块 ({}, {}) 缺少 {} 个 IPCM 样本",
                            mbx, mby, PCM_SAMPLES
                        ))
                    })?;
                let (luma, chroma) = pcm.split_at(256);
                let (cb, cr) = chroma.split_at(64);
                recon.store_macroblock(Plane::Y, mbx, mby, luma)?;
                recon.store_macroblock(Plane::Cb, mbx, mby, cb)?;
                recon.store_macroblock(Plane::Cr, mbx, mby, cr)?;
                self.nz.fill_macroblock(mbx, PCM_COUNT)?;
                return Ok(DecodedMacroblock {
                    nonzero: NonzeroCounts::filled(PCM_COUNT as u8),
                    bits_consumed: PCM_SAMPLES * 8,
                });
            }
            MbType::Inter | MbType::Intra => {}
        }

        if bits.luma.len() != 16 || bits.chroma_dc.len() != 2 || bits.chroma_ac.len() != 8 {
            return Err(AvcError::InvalidArgument(format!(
                "宏块比特段个数错误: luma={} chroma_dc={} chroma_ac={}",
                bits.luma.len(),
                bits.chroma_dc.len(),
                bits.chroma_ac.len()
            )));
        }

        let luma_class = self.luma_class();
        let mut stage = self.nz.stage(mbx)?;
        let mut blocks = StagedBlocks::new();
        let mut nonzero = NonzeroCounts::default();
        let mut bits_consumed = 0usize;
        let zero = [0i32; 16];

        // 亮度
        {
            let mut counts = stage.window(Plane::Y);
            let mut hold = DcHold::new();
            if luma_class == BlockClass::LumaAc {
                let ctx = BlockContext::new(hdr.qp, BlockClass::LumaDc, 0);
                let queue = bits.luma_dc.as_ref().and_then(coded);
                let dec = decode_block(&ctx, queue, 0, &zero, &mut counts, &mut hold)?;
                bits_consumed += checked_consumed(queue, dec.bits_consumed)?;
            }
            for (b, queue) in bits.luma.iter().enumerate() {
                let (bx, by) = block_coords(Plane::Y, mbx, mby, b);
                let p = widen(&pred.load_block(Plane::Y, bx, by)?);
                let ctx = BlockContext::new(hdr.qp, luma_class, b);
                let queue = coded(queue);
                let dec = decode_block(&ctx, queue, 0, &p, &mut counts, &mut hold)?;
                bits_consumed += checked_consumed(queue, dec.bits_consumed)?;
                blocks.push(Plane::Y, bx, by, dec.recon);
                nonzero.luma[b] = dec.num_coeff as u8;
            }
        }

        // 色度
        for (k, plane) in [Plane::Cb, Plane::Cr].into_iter().enumerate() {
            let (dc_class, ac_class) = chroma_classes(plane);
            let mut counts = stage.window(plane);
            let mut hold = DcHold::new();

            let ctx = BlockContext::new(hdr.qp, dc_class, 0);
            let queue = coded(&bits.chroma_dc[k]);
            let dec = decode_block(&ctx, queue, 0, &zero, &mut counts, &mut hold)?;
            bits_consumed += checked_consumed(queue, dec.bits_consumed)?;

            for (b, queue) in bits.chroma_ac[k * 4..k * 4 + 4].iter().enumerate() {
                let (bx, by) = block_coords(plane, mbx, mby, b);
                let p = widen(&pred.load_block(plane, bx, by)?);
                let ctx = BlockContext::new(hdr.qp, ac_class, b);
                let queue = coded(queue);
                let dec = decode_block(&ctx, queue, 0, &p, &mut counts, &mut hold)?;
                bits_consumed += checked_consumed(queue, dec.bits_consumed)?;
                blocks.push(plane, bx, by, dec.recon);
                nonzero.plane_mut(plane)[b] = dec.num_coeff as u8;
            }
        }

        blocks.commit(recon)?;
        self.nz.commit(&stage)?;

        debug!(
            "宏块 ({}, {}) 解码: type={:?} qp={} bits={}",
            mbx, mby, hdr.mb_type, hdr.qp, bits_consumed
        );
        Ok(DecodedMacroblock {
            nonzero,
            bits_consumed,
        })
    }
}

/// 宏块内已重建、尚未写入图像的块
struct StagedBlocks(Vec<(Plane, usize, usize, [u8; 16])>);

impl StagedBlocks {
    fn new() -> Self {
        Self(Vec::with_capacity(24))
    }

    /// 跳过的块没有重建样本, 保留图像中原有内容
    fn push(&mut self, plane: Plane, bx: usize, by: usize, pixels: Option<[u8; 16]>) {
        if let Some(pixels) = pixels {
            self.0.push((plane, bx, by, pixels));
        }
    }

    fn commit(self, recon: &mut Planes) -> AvcResult<()> {
        for (plane, bx, by, pixels) in &self.0 {
            recon.store_block(*plane, *bx, *by, pixels)?;
        }
        Ok(())
    }
}

/// 每个块的比特段必须恰好被完整消耗
fn checked_consumed(queue: Option<&BitRunQueue>, consumed: usize) -> AvcResult<usize> {
    let expected = queue.map_or(0, BitRunQueue::total_bits);
    if consumed != expected {
        return Err(AvcError::InvalidData(format!(
            "块比特段长度 {} 与解析消耗 {} 不符",
            expected, consumed
        )));
    }
    Ok(consumed)
}
