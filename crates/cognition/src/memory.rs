//! Memory Bridge - 记忆桥接模块
//!
//! 职责：
//! - 按事实身份编码并存储三元组
//! - 基于线索的相似度检索与精确查找
//! - 可选：委托给外部长期记忆
//! - 全量状态持久化（条目、二级索引、编码器）
//!
//! 未挂载长期记忆时，使用内部有序存储并线性扫描查询。

use kbridge_core::{Assembly, BridgeConfig, Cue, EncodingError, Triple, Unsupported};
use kbridge_persistence::{PersistenceError, SnapshotFile, SnapshotKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consolidation::EpisodeConsolidator;
use crate::encoder::{Encoder, EncoderState, EncoderStats};
use crate::ltm::LongTermMemory;
use crate::vector;

/// 记忆桥错误
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Unsupported(#[from] Unsupported),
}

/// 跨线程共享的桥（单个粗粒度锁）
pub type SharedBridge = Arc<Mutex<MemoryBridge>>;

/// 单条存储事实
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub key: String,
    pub assembly: Assembly,
}

/// `save` 写入的全部状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeState {
    /// 按插入顺序的条目
    pub entries: Vec<MemoryEntry>,

    /// 位置哈希 → 记忆键
    pub position_index: BTreeMap<String, String>,

    pub encoder: EncoderState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeStats {
    pub total_knowledge: usize,
    pub entities: usize,
    pub relations: usize,
    pub using_ltm: bool,

    /// 委托给长期记忆（未进入内部存储）的事实数
    pub delegated: u64,

    pub encoder: EncoderStats,
}

/// Deterministic key for a fact.
///
/// Each field is written as `<byte length>:<text>` and fields are joined by
/// `|`, so the key can be split back unambiguously whatever the fields hold.
pub fn memory_key(subject: &str, predicate: &str, object: &str) -> String {
    format!(
        "{}:{}|{}:{}|{}:{}",
        subject.len(),
        subject,
        predicate.len(),
        predicate,
        object.len(),
        object
    )
}

#[derive(Debug)]
pub struct MemoryBridge {
    encoder: Encoder,
    config: BridgeConfig,
    ltm: Option<Box<dyn LongTermMemory>>,
    consolidator: Option<Box<dyn EpisodeConsolidator>>,

    /// 内部存储，插入顺序
    entries: Vec<MemoryEntry>,

    /// 记忆键 → `entries` 下标
    key_index: HashMap<String, usize>,

    /// 位置哈希 → 记忆键，用于精确结构查找
    position_index: BTreeMap<String, String>,

    delegated: u64,
}

impl MemoryBridge {
    pub fn new(encoder: Encoder) -> Self {
        Self::with_config(encoder, BridgeConfig::default())
    }

    pub fn with_config(encoder: Encoder, config: BridgeConfig) -> Self {
        Self {
            encoder,
            config,
            ltm: None,
            consolidator: None,
            entries: Vec::new(),
            key_index: HashMap::new(),
            position_index: BTreeMap::new(),
            delegated: 0,
        }
    }

    /// Delegate storage and cue retrieval to an external long-term memory.
    pub fn with_long_term_memory(mut self, ltm: Box<dyn LongTermMemory>) -> Self {
        self.ltm = Some(ltm);
        self
    }

    pub fn with_consolidator(mut self, consolidator: Box<dyn EpisodeConsolidator>) -> Self {
        self.consolidator = Some(consolidator);
        self
    }

    pub fn into_shared(self) -> SharedBridge {
        Arc::new(Mutex::new(self))
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn encoder_mut(&mut self) -> &mut Encoder {
        &mut self.encoder
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Stored entries in insertion order
    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode and store a fact.
    ///
    /// Re-storing a fact replaces its assembly but keeps its original
    /// position in the ranking order.
    pub fn store_knowledge(&mut self, triple: &Triple) -> Result<Assembly, EncodingError> {
        let assembly = self
            .encoder
            .encode_triple(triple, None)?
            .with_source(self.config.source_tag.as_str());
        let key = memory_key(&triple.subject, &triple.predicate, &triple.object);

        if let Some(ltm) = self.ltm.as_mut() {
            ltm.store(&assembly, triple.confidence.unwrap_or(1.0));
            self.delegated += 1;
            debug!("Delegated {} to long-term memory", triple);
        } else {
            let entry = MemoryEntry {
                key: key.clone(),
                assembly: assembly.clone(),
            };
            match self.key_index.get(&key).copied() {
                Some(index) => {
                    warn!("Overwriting memory: {}", triple);
                    let old_hash = self.entries[index].assembly.position_hash();
                    if self.position_index.get(&old_hash) == Some(&key) {
                        self.position_index.remove(&old_hash);
                    }
                    self.entries[index] = entry;
                }
                None => {
                    self.key_index.insert(key.clone(), self.entries.len());
                    self.entries.push(entry);
                }
            }
            debug!("Stored {} ({} active)", triple, assembly.size());
        }

        self.position_index.insert(assembly.position_hash(), key);

        Ok(assembly)
    }

    /// Rank stored facts by similarity to a partial triple.
    ///
    /// Unknown cue fields are encoded as the empty string. Equal scores keep
    /// insertion order.
    pub fn retrieve_by_cue(
        &mut self,
        cue: &Cue,
        top_k: usize,
    ) -> Result<Vec<(Triple, f32)>, EncodingError> {
        let cue_assembly = self.encoder.encode_triple(&cue.fill(), None)?;

        if let Some(ltm) = self.ltm.as_ref() {
            let results: Vec<(Triple, f32)> = ltm
                .retrieve_similar(&cue_assembly, top_k)
                .into_iter()
                .filter_map(|(assembly, score)| {
                    self.encoder.decode_assembly(&assembly).map(|t| (t, score))
                })
                .take(top_k)
                .collect();
            return Ok(results);
        }

        let ranked = vector::scan(
            &cue_assembly,
            self.entries.iter().map(|e| &e.assembly),
            top_k,
        );
        let results: Vec<(Triple, f32)> = ranked
            .into_iter()
            .filter_map(|(assembly, score)| assembly.triple().map(|t| (t.clone(), score)))
            .collect();

        debug!(
            "Cue matched {} of {} facts",
            results.len(),
            self.entries.len()
        );
        Ok(results)
    }

    /// Exact lookup in the internal store. The long-term memory is not consulted.
    pub fn retrieve_exact(&self, subject: &str, predicate: &str, object: &str) -> Option<Triple> {
        let key = memory_key(subject, predicate, object);
        let index = *self.key_index.get(&key)?;
        self.entries[index].assembly.triple().cloned()
    }

    /// Memory key of a stored assembly with the same active positions.
    pub fn lookup_by_positions(&self, assembly: &Assembly) -> Option<&str> {
        self.position_index
            .get(&assembly.position_hash())
            .map(String::as_str)
    }

    /// Extract facts from an episode with the attached consolidator and
    /// store each of them.
    ///
    /// All or nothing: if any extracted fact carries an invalid confidence,
    /// none are stored.
    pub fn consolidate_episode(&mut self, episode: &Value) -> Result<Vec<Triple>, BridgeError> {
        let consolidator = self
            .consolidator
            .as_ref()
            .ok_or(Unsupported("episode consolidation without a consolidator"))?;
        let triples = consolidator.extract(episode);

        if let Some(p) = triples
            .iter()
            .filter_map(|t| t.confidence)
            .find(|p| !(0.0..=1.0).contains(p))
        {
            warn!("Rejected episode: confidence {} out of range", p);
            return Err(EncodingError::InvalidConfidence(p).into());
        }

        for triple in &triples {
            self.store_knowledge(triple)?;
        }
        info!("Consolidated {} facts from episode", triples.len());

        Ok(triples)
    }

    pub fn snapshot(&self) -> BridgeState {
        BridgeState {
            entries: self.entries.clone(),
            position_index: self.position_index.clone(),
            encoder: self.encoder.snapshot(),
        }
    }

    /// Replace entries, index and encoder state with `state`.
    ///
    /// Nothing changes unless the whole state is valid.
    pub fn restore(&mut self, state: BridgeState) -> Result<(), PersistenceError> {
        let width = self.encoder.width();
        let mut key_index = HashMap::with_capacity(state.entries.len());
        for (index, entry) in state.entries.iter().enumerate() {
            entry.assembly.code().check(width).map_err(|e| {
                PersistenceError::Incompatible(format!("entry {}: {e}", entry.key))
            })?;
            if key_index.insert(entry.key.clone(), index).is_some() {
                return Err(PersistenceError::Incompatible(format!(
                    "duplicate key {}",
                    entry.key
                )));
            }
        }

        self.encoder.restore(state.encoder)?;
        self.entries = state.entries;
        self.key_index = key_index;
        self.position_index = state.position_index;
        Ok(())
    }

    /// Save entries, secondary index and encoder state as one snapshot.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        SnapshotFile::new(path.as_ref()).write(SnapshotKind::Bridge, &self.snapshot())?;
        Ok(())
    }

    /// Load a snapshot, fully replacing bridge and encoder state.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let state: BridgeState = SnapshotFile::new(path.as_ref()).read(SnapshotKind::Bridge)?;
        self.restore(state)?;
        info!("Restored {} facts", self.entries.len());
        Ok(())
    }

    pub fn get_stats(&self) -> BridgeStats {
        let (entities, relations) = self.encoder.vocabulary_sizes();
        BridgeStats {
            total_knowledge: self.entries.len(),
            entities,
            relations,
            using_ltm: self.ltm.is_some(),
            delegated: self.delegated,
            encoder: self.encoder.stats(),
        }
    }
}
