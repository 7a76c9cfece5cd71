//! 快照信封与错误类型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;

/// 写入每个快照的格式标记
pub const SNAPSHOT_FORMAT: &str = "kbridge-snapshot";

/// 快照布局版本。负载结构变化时递增，旧文件直接拒绝
pub const SNAPSHOT_VERSION: u32 = 1;

/// 持久化错误
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("serialization error")]
    Serialize(#[from] serde_json::Error),

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("not a compatible snapshot: {0}")]
    FormatMismatch(String),

    #[error("snapshot does not fit this instance: {0}")]
    Incompatible(String),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// 快照内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    /// 编码器词表与计数
    Encoder,
    /// 记忆条目、二级索引与完整编码器状态
    Bridge,
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotKind::Encoder => write!(f, "encoder"),
            SnapshotKind::Bridge => write!(f, "bridge"),
        }
    }
}

/// 磁盘信封。负载保留为原始 JSON 文本，校验和覆盖实际写入的字节
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Envelope {
    pub format: String,
    pub version: u32,
    pub kind: SnapshotKind,
    pub saved_at: DateTime<Utc>,
    pub checksum: String,
    pub payload: Box<RawValue>,
}

/// 快照头信息（不含负载）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub kind: SnapshotKind,
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub checksum: String,
    pub payload_bytes: usize,
}

impl Envelope {
    pub(crate) fn info(&self) -> SnapshotInfo {
        SnapshotInfo {
            kind: self.kind,
            version: self.version,
            saved_at: self.saved_at,
            checksum: self.checksum.clone(),
            payload_bytes: self.payload.get().len(),
        }
    }

    /// 检查格式标记、版本与类型
    pub(crate) fn check_header(&self, expected: SnapshotKind) -> Result<()> {
        if self.format != SNAPSHOT_FORMAT {
            return Err(PersistenceError::FormatMismatch(format!(
                "unknown format tag {:?}",
                self.format
            )));
        }
        if self.version != SNAPSHOT_VERSION {
            return Err(PersistenceError::FormatMismatch(format!(
                "version {} (this build reads {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        if self.kind != expected {
            return Err(PersistenceError::FormatMismatch(format!(
                "expected a {} snapshot, found {}",
                expected, self.kind
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_io_cause_in_source_only() {
        let err = PersistenceError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(err.to_string(), "IO error");
        assert_eq!(err.source().map(|s| s.to_string()), Some("denied".to_string()));
    }

    #[test]
    fn test_serialize_cause_in_source_only() {
        let cause = serde_json::from_str::<u32>("x").unwrap_err();
        let err = PersistenceError::from(cause);
        assert_eq!(err.to_string(), "serialization error");
        assert!(err.source().is_some());
    }
}
