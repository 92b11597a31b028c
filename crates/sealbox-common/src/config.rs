//! Configuration types for Sealbox
//!
//! This module defines configuration structures used across components.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Namespace store configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NamespaceStoreConfig {
    /// Directory holding the namespace database
    pub data_dir: PathBuf,
    /// Cap on the serialized size of one namespace's custom metadata
    pub max_metadata_bytes: usize,
}

impl Default for NamespaceStoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/sealbox"),
            max_metadata_bytes: 4096,
        }
    }
}

impl NamespaceStoreConfig {
    /// Create config with data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NamespaceStoreConfig::default();
        assert_eq!(config.max_metadata_bytes, 4096);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/sealbox"));
    }
}
