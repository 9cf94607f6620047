//! # avcref-codec
//!
//! H.264 基线档次宏块重建参考模型: 块级整数变换、量化、CAVLC 熵编解码,
//! 以及带环形缓冲与上行缓存的去块滤波引擎.
//!
//! 所有运算都是定点整数运算, 编码端重建与解码端重建逐位一致.
//!
//! ## 使用示例
//!
//! ```rust
//! use avcref_codec::{BlockClass, BlockContext, DcHold, NzCache, Plane, QuantParams};
//! use avcref_codec::{decode_block, encode_block};
//!
//! let mut cache = NzCache::new(1).unwrap();
//! let mut hold = DcHold::new();
//! let ctx = BlockContext::new(26, BlockClass::Luma4x4, 0);
//! let pred = [80i32; 16];
//!
//! let mut counts = cache.window(Plane::Y, 0).unwrap();
//! let enc = encode_block(&ctx, QuantParams::default(), &pred, &pred, &mut counts, &mut hold)
//!     .unwrap();
//! assert_eq!(enc.queue.to_bit_string(), "1");
//!
//! cache.reset_frame();
//! let mut counts = cache.window(Plane::Y, 0).unwrap();
//! let dec = decode_block(&ctx, Some(&enc.queue), 0, &pred, &mut counts, &mut hold).unwrap();
//! assert_eq!(dec.recon, Some([80u8; 16]));
//! ```

pub mod block;
pub mod cavlc;
pub mod class;
pub mod deblock;
pub mod macroblock;
pub mod nz_cache;
pub mod planes;
pub mod quant;
pub mod tables;
pub mod transform;

// 重导出常用类型
pub use block::{BlockContext, DecodedBlock, EncodedBlock, decode_block, encode_block};
pub use cavlc::{CoeffTokenTable, inverse_zigzag, zigzag_scan};
pub use class::{BlockClass, ClassFlags};
pub use deblock::{DeblockBlock, DeblockCtx, DeblockParams, EdgeDir};
pub use macroblock::{
    DecodedMacroblock, EncodedMacroblock, LumaMode, MacroblockBits, MacroblockCoder,
    MacroblockHeader, MbType, MotionVector, NonzeroCounts,
};
pub use nz_cache::{NeighborCounts, NzCache, NzStage};
pub use planes::{Plane, Planes};
pub use quant::{DcHold, QuantParams};
