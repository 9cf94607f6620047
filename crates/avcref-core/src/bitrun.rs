//! 比特段 (bit run) 与比特段队列.
//!
//! 一个 [`BitRun`] 是右对齐的定长码字; [`BitRunQueue`] 按发射顺序保存
//! 一个 4x4 块的全部语法元素, 队列内容按 MSB-first 顺序拼接即为该块的码流.
//!
//! 解码侧通过 [`BitRunQueue::window`] 取得跨越多个比特段的 32 位窗口,
//! 窗口最高位对应请求的起始位置.

use bytes::Bytes;
use log::warn;

use crate::bitreader::BitReader;
use crate::bitwriter::BitWriter;
use crate::{AvcError, AvcResult};

/// 单个队列可容纳的比特段数.
///
/// 一个 4x4 块最坏情况: 1 个 coeff_token + 1 段拖尾符号 + 16 个 level
/// + 1 个 total_zeros + 14 个 run_before, 共 33 段.
pub const BIT_RUN_QUEUE_CAPACITY: usize = 64;

/// 右对齐的定长码字
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitRun {
    /// 码字 (低 `size` 位有效)
    pub bits: u32,
    /// 码字位数 (0..=32)
    pub size: u8,
}

impl BitRun {
    /// 创建比特段, 校验位数与码字是否匹配
    pub fn new(bits: u32, size: u8) -> AvcResult<Self> {
        if size > 32 {
            return Err(AvcError::InvalidArgument(format!(
                "比特段位数 {} 超过 32",
                size,
            )));
        }
        if size < 32 && bits >> size != 0 {
            return Err(AvcError::InvalidArgument(format!(
                "码字 {:#x} 超出 {} 位",
                bits, size,
            )));
        }
        Ok(Self { bits, size })
    }

    /// 是否为空段 (不携带任何比特)
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// 以 "0"/"1" 字符串形式输出, 便于测试与调试
    pub fn to_bit_string(&self) -> String {
        (0..self.size)
            .rev()
            .map(|i| if (self.bits >> i) & 1 == 1 { '1' } else { '0' })
            .collect()
    }
}

/// 有序比特段队列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitRunQueue {
    runs: Vec<BitRun>,
    total_bits: usize,
}

impl BitRunQueue {
    /// 创建空队列
    pub fn new() -> Self {
        Self {
            runs: Vec::with_capacity(BIT_RUN_QUEUE_CAPACITY),
            total_bits: 0,
        }
    }

    /// 追加一个比特段, 空段直接忽略
    pub fn push(&mut self, run: BitRun) -> AvcResult<()> {
        if run.is_empty() {
            return Ok(());
        }
        if self.runs.len() >= BIT_RUN_QUEUE_CAPACITY {
            warn!(
                "比特段队列已满 ({} 段, {} 位), 丢弃 {} 位码字",
                self.runs.len(),
                self.total_bits,
                run.size
            );
            return Err(AvcError::QueueOverflow {
                capacity: BIT_RUN_QUEUE_CAPACITY,
            });
        }
        self.total_bits += run.size as usize;
        self.runs.push(run);
        Ok(())
    }

    /// 校验后追加 `(bits, size)`
    pub fn push_bits(&mut self, bits: u32, size: u8) -> AvcResult<()> {
        self.push(BitRun::new(bits, size)?)
    }

    /// 依次追加另一个队列的全部比特段
    pub fn extend(&mut self, other: &BitRunQueue) -> AvcResult<()> {
        for run in &other.runs {
            self.push(*run)?;
        }
        Ok(())
    }

    /// 队列中的比特段 (按发射顺序)
    pub fn runs(&self) -> &[BitRun] {
        &self.runs
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// 全部比特段的总位数
    pub fn total_bits(&self) -> usize {
        self.total_bits
    }

    pub fn clear(&mut self) {
        self.runs.clear();
        self.total_bits = 0;
    }

    /// 从第 `pos` 位起取 `len` 位 (0..=32), 结果右对齐.
    ///
    /// 超出队列末尾的部分以 0 填充.
    pub fn peek(&self, pos: usize, len: u32) -> u32 {
        if len == 0 {
            return 0;
        }
        let len = len.min(32) as usize;
        let end = pos + len;

        let mut acc: u64 = 0;
        let mut taken = 0usize;
        let mut start = 0usize;
        let mut current = pos;

        for run in &self.runs {
            let size = run.size as usize;
            if current >= start + size {
                start += size;
                continue;
            }
            if current >= end {
                break;
            }
            let offset = current - start;
            let avail = size - offset;
            let take = avail.min(end - current);
            let shift = avail - take;
            let chunk = (u64::from(run.bits) >> shift) & ((1u64 << take) - 1);
            acc = (acc << take) | chunk;
            taken += take;
            current += take;
            start += size;
        }

        // 队列末尾之后补 0
        acc <<= len - taken;
        acc as u32
    }

    /// 从第 `pos` 位起的 32 位窗口, 最高位对应 `pos`
    pub fn window(&self, pos: usize) -> u32 {
        self.peek(pos, 32)
    }

    /// 打包为字节 (末尾补 0 到整字节)
    pub fn to_bytes(&self) -> Bytes {
        let mut bw = BitWriter::with_capacity(self.total_bits.div_ceil(8));
        for run in &self.runs {
            bw.write_bits(run.bits, u32::from(run.size));
        }
        Bytes::from(bw.finish())
    }

    /// 从字节缓冲区还原前 `bit_len` 位.
    ///
    /// 还原出的比特段以 32 位为单位切分, 段边界与原队列不必一致,
    /// 但 [`peek`](Self::peek) 视图完全相同.
    pub fn from_bytes(data: &[u8], bit_len: usize) -> AvcResult<Self> {
        if bit_len > data.len() * 8 {
            return Err(AvcError::InvalidArgument(format!(
                "请求 {} 位, 缓冲区只有 {} 位",
                bit_len,
                data.len() * 8,
            )));
        }
        let mut br = BitReader::new(data);
        let mut queue = Self::new();
        let mut remaining = bit_len;
        while remaining > 0 {
            let n = remaining.min(32);
            let bits = br.read_bits(n as u32)?;
            queue.push(BitRun {
                bits,
                size: n as u8,
            })?;
            remaining -= n;
        }
        Ok(queue)
    }

    /// 以 "0"/"1" 字符串形式输出整个队列
    pub fn to_bit_string(&self) -> String {
        self.runs.iter().map(BitRun::to_bit_string).collect()
    }
}
