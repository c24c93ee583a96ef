//! Configuration errors.

use super::error_code::{self, SkeinErrorCode};

/// Errors raised while loading an analysis configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unknown predicate name: {name}")]
    UnknownPredicate { name: String },
}

impl SkeinErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        error_code::CONFIG_ERROR
    }
}
