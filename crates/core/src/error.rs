//! Error taxonomy shared across crates

use thiserror::Error;

/// Failure while generating or binding a code.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodingError {
    #[error("invalid encoder config: {0}")]
    InvalidConfig(String),

    #[error("confidence {0} is outside [0, 1]")]
    InvalidConfidence(f32),

    #[error("binding strength {0} is outside [0, 1]")]
    InvalidStrength(f32),

    #[error("code width {found} does not match encoder width {expected}")]
    WidthMismatch { expected: usize, found: usize },

    #[error("malformed code: {0}")]
    MalformedCode(String),
}

/// A capability this build does not provide.
///
/// Returned by extension points (pattern-based decode, episode
/// consolidation without a consolidator) so callers can tell "nothing found"
/// from "not implemented".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0} is not supported")]
pub struct Unsupported(pub &'static str);

/// Failure while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("YAML error")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid value for {var}: {value}")]
    Env { var: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_wrapped_cause_is_reported_once() {
        let err = ConfigError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.to_string(), "IO error");
        assert_eq!(err.source().map(|s| s.to_string()), Some("gone".to_string()));
    }

    #[test]
    fn test_unsupported_message() {
        assert_eq!(
            Unsupported("pattern decoding").to_string(),
            "pattern decoding is not supported"
        );
    }
}
