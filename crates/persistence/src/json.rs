//! JSON 快照文件
//!
//! 轻量级单文件存储，每次保存整体重写。

use crate::store::{
    Envelope, PersistenceError, Result, SnapshotInfo, SnapshotKind, SNAPSHOT_FORMAT,
    SNAPSHOT_VERSION,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::value::RawValue;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 固定路径的快照文件
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 写入时使用的临时文件路径
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// 序列化 `data` 并原子替换文件
    pub fn write<T: Serialize>(&self, kind: SnapshotKind, data: &T) -> Result<SnapshotInfo> {
        let payload_text = serde_json::to_string(data)?;
        let checksum = checksum(&payload_text);
        let envelope = Envelope {
            format: SNAPSHOT_FORMAT.to_string(),
            version: SNAPSHOT_VERSION,
            kind,
            saved_at: chrono::Utc::now(),
            checksum,
            payload: RawValue::from_string(payload_text)?,
        };
        let content = serde_json::to_string_pretty(&envelope)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // 先写临时文件
        let temp_path = self.temp_path();
        std::fs::write(&temp_path, &content)?;

        // 原子重命名（同一文件系统）
        if let Err(e) = std::fs::rename(&temp_path, &self.path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(PersistenceError::Io(e));
        }

        info!(
            "Saved {} snapshot to {} ({} bytes)",
            kind,
            self.path.display(),
            content.len()
        );

        Ok(envelope.info())
    }

    /// 读取、校验并反序列化指定类型的快照
    pub fn read<T: DeserializeOwned>(&self, kind: SnapshotKind) -> Result<T> {
        let envelope = self.load_envelope()?;
        envelope.check_header(kind)?;

        let actual = checksum(envelope.payload.get());
        if actual != envelope.checksum {
            return Err(PersistenceError::ChecksumMismatch {
                expected: envelope.checksum,
                actual,
            });
        }

        let data = serde_json::from_str(envelope.payload.get())?;
        info!("Loaded {} snapshot from {}", kind, self.path.display());
        Ok(data)
    }

    /// 仅读取头信息，不验证校验和
    pub fn inspect(&self) -> Result<SnapshotInfo> {
        Ok(self.load_envelope()?.info())
    }

    fn load_envelope(&self) -> Result<Envelope> {
        let content = std::fs::read_to_string(&self.path)?;
        let envelope: Envelope = serde_json::from_str(&content)?;
        debug!(
            "Read envelope {} v{} ({})",
            envelope.format, envelope.version, envelope.kind
        );
        Ok(envelope)
    }
}

/// 负载文本的 SHA-256 十六进制摘要
fn checksum(payload: &str) -> String {
    let digest = Sha256::digest(payload.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
