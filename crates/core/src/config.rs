//! kbridge 配置系统
//!
//! 支持 YAML 配置文件和环境变量（`KBRIDGE_*` 覆盖文件中的值）

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{ConfigError, EncodingError};

/// 顶层配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KbridgeConfig {
    #[serde(default)]
    pub encoder: EncoderConfig,

    #[serde(default)]
    pub bridge: BridgeConfig,
}

impl KbridgeConfig {
    /// 从 YAML 文件加载，并应用环境变量覆盖
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// 从 YAML 文件加载，覆盖值由 `lookup` 提供
    pub fn load_with_env<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml_str(&content)?;
        config.apply_env_from(lookup)?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// 应用进程环境变量覆盖
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// 从任意变量查找函数应用覆盖
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("KBRIDGE_WIDTH") {
            self.encoder.width = parse_env("KBRIDGE_WIDTH", &v)?;
        }
        if let Some(v) = lookup("KBRIDGE_SPARSITY") {
            self.encoder.sparsity = parse_env("KBRIDGE_SPARSITY", &v)?;
        }
        if let Some(v) = lookup("KBRIDGE_SEED") {
            self.encoder.seed = parse_env("KBRIDGE_SEED", &v)?;
        }
        if let Some(v) = lookup("KBRIDGE_VOCAB_CAPACITY") {
            self.encoder.vocab_capacity = parse_env("KBRIDGE_VOCAB_CAPACITY", &v)?;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var: var.to_string(),
        value: value.to_string(),
    })
}

/// 编码器配置（构造后不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// 预期词表大小（初始容量）
    #[serde(default = "default_vocab_capacity")]
    pub vocab_capacity: usize,

    /// 编码宽度 W
    #[serde(default = "default_width")]
    pub width: usize,

    /// 新编码中激活位置的比例
    #[serde(default = "default_sparsity")]
    pub sparsity: f64,

    /// 编码生成的随机种子
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// 未提供置信度时的绑定强度
    #[serde(default = "default_strength")]
    pub default_strength: f32,
}

fn default_vocab_capacity() -> usize {
    10_000
}

fn default_width() -> usize {
    512
}

fn default_sparsity() -> f64 {
    0.05
}

fn default_seed() -> u64 {
    42
}

fn default_strength() -> f32 {
    0.8
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            vocab_capacity: default_vocab_capacity(),
            width: default_width(),
            sparsity: default_sparsity(),
            seed: default_seed(),
            default_strength: default_strength(),
        }
    }
}

impl EncoderConfig {
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn with_sparsity(mut self, sparsity: f64) -> Self {
        self.sparsity = sparsity;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Active positions per fresh code: `floor(width * sparsity)`.
    ///
    /// A tiny epsilon absorbs float error such as `100 * 0.07 = 7.000…01`
    /// versus `100 * 0.29 = 28.999…96`.
    pub fn active_count(&self) -> usize {
        (self.width as f64 * self.sparsity + 1e-9).floor() as usize
    }

    pub fn validate(&self) -> Result<(), EncodingError> {
        if self.width == 0 || self.width > u32::MAX as usize {
            return Err(EncodingError::InvalidConfig(format!(
                "width must be in 1..=u32::MAX, got {}",
                self.width
            )));
        }
        if !self.sparsity.is_finite() || self.sparsity <= 0.0 || self.sparsity > 1.0 {
            return Err(EncodingError::InvalidConfig(format!(
                "sparsity must be in (0, 1], got {}",
                self.sparsity
            )));
        }
        if self.active_count() == 0 {
            return Err(EncodingError::InvalidConfig(format!(
                "width {} with sparsity {} activates no positions",
                self.width, self.sparsity
            )));
        }
        if !(0.0..=1.0).contains(&self.default_strength) {
            return Err(EncodingError::InvalidConfig(format!(
                "default strength must be in [0, 1], got {}",
                self.default_strength
            )));
        }
        Ok(())
    }
}

/// MemoryBridge 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// 存储时附加的来源标签
    #[serde(default = "default_source_tag")]
    pub source_tag: String,

    /// 默认返回结果数
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

fn default_source_tag() -> String {
    "explicit_knowledge".to_string()
}

fn default_top_k() -> usize {
    5
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            source_tag: default_source_tag(),
            default_top_k: default_top_k(),
        }
    }
}
