//! # avcref
//!
//! H.264 基线档次宏块重建参考模型.
//!
//! - **块编解码**: 4x4/2x2 整数变换、量化与 CAVLC 熵编解码, 编码端与解码端重建逐位一致
//! - **去块滤波**: 以环形缓冲与上行缓存跟踪邻居宏块, 按光栅顺序逐宏块滤波
//!
//! # 快速开始
//!
//! ```rust
//! use avcref::codec::{
//!     DeblockCtx, DeblockParams, MacroblockCoder, MacroblockHeader, MbType, Planes, QuantParams,
//! };
//!
//! let orig = Planes::new(1, 1, 120).unwrap();
//! let pred = Planes::new(1, 1, 100).unwrap();
//! let mut recon = Planes::new(1, 1, 0).unwrap();
//!
//! let mut coder = MacroblockCoder::new(1, QuantParams::default()).unwrap();
//! let hdr = MacroblockHeader::new(0, 0, MbType::Intra, 26);
//! let mb = coder.encode(&hdr, &orig, &pred, &mut recon).unwrap();
//!
//! let mut deblock = DeblockCtx::new(1, 1, DeblockParams::default()).unwrap();
//! deblock.filter_macroblock(&mut recon, &hdr, &mb.nonzero).unwrap();
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `avcref-core` | 错误类型、比特段队列、位读写 |
//! | `avcref-codec` | 变换、量化、CAVLC、宏块驱动、去块滤波 |

/// 核心类型与工具
pub use avcref_core as core;

/// 块编解码与去块滤波
pub use avcref_codec as codec;

pub mod config;
pub mod logging;

/// 获取版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
