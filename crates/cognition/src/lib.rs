//! kbridge Cognition - 编码与联想记忆模块
//!
//! 职责：
//! - 将符号三元组编码为稀疏 assembly
//! - 存储 assembly，按相似度或精确键检索
//! - 词表与记忆状态持久化
//!
//! 架构：
//! - Encoder: 词表、绑定、相似度
//! - MemoryBridge: 键值存储、线索检索、外部协作接口
//! - LongTermMemory / EpisodeConsolidator: 外部协作者

pub mod consolidation;
pub mod encoder;
pub mod ltm;
pub mod memory;
pub mod vector;
pub mod vocabulary;

pub use consolidation::{EpisodeConsolidator, ObservationConsolidator};
pub use encoder::{Encoder, EncoderState, EncoderStats};
pub use ltm::{LongTermMemory, VecLongTermMemory};
pub use memory::{
    memory_key, BridgeError, BridgeState, BridgeStats, MemoryBridge, MemoryEntry, SharedBridge,
};
pub use vocabulary::{Vocabulary, VocabularySnapshot};
