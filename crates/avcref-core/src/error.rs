//! 统一错误类型定义.
//!
//! 参考模型只在三类异常输入上失败: 前置条件被破坏 (qp/偏移越界等),
//! 码流无法匹配任何码表项, 以及字节层面的读写问题.

use thiserror::Error;

/// avcref 统一错误类型
#[derive(Debug, Error)]
pub enum AvcError {
    /// 无效参数 (qp、滤波偏移、块位置等越界)
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 无效数据 (码字不匹配任何码表项等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 比特段队列超出容量
    #[error("比特段队列溢出: 容量 {capacity}")]
    QueueOverflow { capacity: usize },

    /// 已到达比特流末尾
    #[error("已到达比特流末尾")]
    Eof,

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

/// avcref 统一 Result 类型
pub type AvcResult<T> = Result<T, AvcError>;
