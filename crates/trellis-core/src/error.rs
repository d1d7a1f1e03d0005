//! Error types for the Trellis engine

use std::path::PathBuf;
use trellis_model::GraphError;
use trellis_sync::SyncError;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Text is not valid TOML for the config
    #[error("invalid config: {source}")]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: toml::de::Error,
    },

    /// Config could not be rendered
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Value the engine cannot run with
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create invalid-value error
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Rejected graph operation
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Persistence or reconciliation failure
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Bad configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Save requested on an engine without a fragment store
    #[error("engine is not attached to a fragment store")]
    Detached,
}

impl EngineError {
    /// Check if the error came from a rejected graph operation
    #[inline]
    #[must_use]
    pub fn is_graph(&self) -> bool {
        matches!(self, Self::Graph(_))
    }
}

/// Result alias for engine commands
pub type EngineResult<T> = Result<T, EngineError>;
