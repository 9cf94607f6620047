//! # avcref-core
//!
//! avcref 参考模型的底层基础设施: 统一错误类型、比特段 (bit run) 队列,
//! 以及按大端位序读写字节缓冲区的工具.
//!
//! 熵编码结果在模型内部以比特段队列的形式流转, 只有在需要落盘或
//! 与外部比特流对接时才经由 [`BitWriter`] / [`BitReader`] 打包成字节.

pub mod bitreader;
pub mod bitrun;
pub mod bitwriter;
pub mod error;

// 重导出常用类型
pub use bitreader::BitReader;
pub use bitrun::{BIT_RUN_QUEUE_CAPACITY, BitRun, BitRunQueue};
pub use bitwriter::BitWriter;
pub use error::{AvcError, AvcResult};
