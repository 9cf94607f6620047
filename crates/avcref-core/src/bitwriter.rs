//! 字节缓冲区位写入器.
//!
//! 把比特段队列按发射顺序打包成字节 (MSB first), 与 [`BitReader`] 对应.
//!
//! [`BitReader`]: crate::bitreader::BitReader

/// 位写入器
///
/// # 示例
/// ```
/// use avcref_core::bitwriter::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_bits(0b00011, 5);
/// bw.write_bits(0b010, 3);
/// assert_eq!(bw.finish(), vec![0b0001_1010]);
/// ```
#[derive(Debug, Default)]
pub struct BitWriter {
    data: Vec<u8>,
    /// 尚未凑满一字节的位, 右对齐
    pending: u64,
    pending_bits: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以指定字节容量创建
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// 已写入的总位数
    pub fn bits_written(&self) -> usize {
        self.data.len() * 8 + self.pending_bits as usize
    }

    /// 写入 `value` 的低 N 位 (最多 32 位), 高位在前
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "一次最多写入 32 位, 请求 {}", n);
        if n == 0 {
            return;
        }
        let mask = (1u64 << n) - 1;
        self.pending = (self.pending << n) | (u64::from(value) & mask);
        self.pending_bits += n;
        while self.pending_bits >= 8 {
            self.pending_bits -= 8;
            self.data.push((self.pending >> self.pending_bits) as u8);
        }
        self.pending &= (1u64 << self.pending_bits) - 1;
    }

    /// 完成写入, 返回字节数据 (末尾不足一字节时补 0)
    pub fn finish(mut self) -> Vec<u8> {
        if self.pending_bits > 0 {
            self.data.push((self.pending << (8 - self.pending_bits)) as u8);
        }
        self.data
    }
}
