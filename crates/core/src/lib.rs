//! kbridge Core - 核心数据模型
//!
//! 包含：
//! - Triple / Confidence / Cue: 符号事实与部分查询
//! - SparseCode: 定宽加权稀疏向量
//! - Assembly: 绑定编码与元数据
//! - 错误类型与配置

mod assembly;
mod code;
mod config;
mod error;
mod triple;

pub use assembly::*;
pub use code::*;
pub use config::*;
pub use error::*;
pub use triple::*;
