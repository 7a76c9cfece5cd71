//! kbridge Persistence - 持久化层
//!
//! 设计原则：
//! - 每个快照一个 JSON 信封（格式标记、版本、类型、校验和）
//! - 原子写入：先写临时文件，再 rename 覆盖目标
//! - 负载做 SHA-256 校验，读取时验证
//! - 版本私有：不保证跨版本兼容

pub mod json;
pub mod store;

pub use json::SnapshotFile;
pub use store::{
    PersistenceError, Result, SnapshotInfo, SnapshotKind, SNAPSHOT_FORMAT, SNAPSHOT_VERSION,
};
