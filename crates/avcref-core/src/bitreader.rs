//! 字节缓冲区位读取器.
//!
//! 把打包后的熵编码字节流重新拆成比特, 供 [`BitRunQueue::from_bytes`]
//! 还原比特段队列. 按大端位序读取 (MSB first), 与 H.264 码流一致.
//!
//! [`BitRunQueue::from_bytes`]: crate::bitrun::BitRunQueue::from_bytes

use crate::{AvcError, AvcResult};

/// 位读取器
///
/// # 示例
/// ```
/// use avcref_core::bitreader::BitReader;
///
/// let data = [0b0001_1010, 0b1000_0000];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(5).unwrap(), 0b00011);
/// assert_eq!(br.read_bits(4).unwrap(), 0b0101);
/// assert_eq!(br.bits_left(), 7);
/// ```
pub struct BitReader<'a> {
    data: &'a [u8],
    /// 下一个待读位的绝对位置
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// 已读取的总位数
    pub fn bits_read(&self) -> usize {
        self.pos
    }

    /// 剩余可读位数
    pub fn bits_left(&self) -> usize {
        self.data.len() * 8 - self.pos
    }

    /// 读取 N 个位 (最多 32 位), 返回值右对齐
    pub fn read_bits(&mut self, n: u32) -> AvcResult<u32> {
        if n > 32 {
            return Err(AvcError::InvalidArgument(format!("一次最多读取 32 位, 请求 {}", n)));
        }
        if n as usize > self.bits_left() {
            return Err(AvcError::Eof);
        }

        // 逐字节拼入 64 位累加器, 最多跨 5 个字节
        let mut acc = 0u64;
        let mut taken = 0u32;
        while taken < n {
            let byte = self.data[self.pos / 8];
            let offset = (self.pos % 8) as u32;
            let width = (8 - offset).min(n - taken);
            let bits = (byte >> (8 - offset - width)) & (0xFF >> (8 - width));
            acc = (acc << width) | u64::from(bits);
            taken += width;
            self.pos += width as usize;
        }
        Ok(acc as u32)
    }
}
