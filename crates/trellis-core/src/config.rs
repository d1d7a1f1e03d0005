//! Engine configuration
//!
//! Device-local settings. Nothing here is part of the shared document.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use trellis_model::{WorkspaceId, DEFAULT_UNDO_DEPTH};

/// Default cap on mounted pages
pub const DEFAULT_MAX_MOUNTED_PAGES: usize = 20;

/// Default workspace name
pub const DEFAULT_WORKSPACE_NAME: &str = "Default";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Undo frames kept before the oldest is dropped
    pub undo_depth: usize,
    /// Mounted pages kept before the least recent is dropped
    pub max_mounted_pages: usize,
    /// Cap on search results
    pub search_result_limit: Option<usize>,
    /// Workspace this device shows
    pub workspace_id: WorkspaceId,
    /// Name given to the workspace when it has to be created
    pub workspace_name: String,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With undo depth
    #[inline]
    #[must_use]
    pub fn with_undo_depth(mut self, depth: usize) -> Self {
        self.undo_depth = depth;
        self
    }

    /// With mounted page cap
    #[inline]
    #[must_use]
    pub fn with_max_mounted_pages(mut self, max: usize) -> Self {
        self.max_mounted_pages = max;
        self
    }

    /// With search result cap
    #[inline]
    #[must_use]
    pub fn with_search_result_limit(mut self, limit: Option<usize>) -> Self {
        self.search_result_limit = limit;
        self
    }

    /// With workspace
    #[inline]
    #[must_use]
    pub fn with_workspace(mut self, id: WorkspaceId, name: impl Into<String>) -> Self {
        self.workspace_id = id;
        self.workspace_name = name.into();
        self
    }

    /// Check values the engine cannot run with
    ///
    /// # Errors
    /// Returns error for a zero undo depth or a zero mounted page cap
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.undo_depth == 0 {
            return Err(ConfigError::invalid("undo_depth", "must be at least 1"));
        }
        if self.max_mounted_pages == 0 {
            return Err(ConfigError::invalid("max_mounted_pages", "must be at least 1"));
        }
        Ok(())
    }

    /// Parse and validate TOML
    ///
    /// Missing keys take their default value.
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML for this type or fails
    /// validation
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse { path: None, source })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or validated
    pub async fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::io_error(path, e))?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })?;
        config.validate()?;
        tracing::debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            undo_depth: DEFAULT_UNDO_DEPTH,
            max_mounted_pages: DEFAULT_MAX_MOUNTED_PAGES,
            search_result_limit: None,
            workspace_id: WorkspaceId::generate(),
            workspace_name: DEFAULT_WORKSPACE_NAME.to_string(),
        }
    }
}
