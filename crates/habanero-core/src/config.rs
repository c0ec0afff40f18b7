//! Session and store configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Cache window for multiple relationships that do not set their own
    /// timeout. A clean collection older than this is reloaded on access.
    /// None means load once and keep.
    pub relationship_timeout: Option<Duration>,

    /// Check compulsory properties before inserts and updates.
    pub validate_on_save: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            relationship_timeout: None,
            validate_on_save: true,
        }
    }
}

impl SessionConfig {
    /// Set the default relationship cache window.
    pub fn with_relationship_timeout(mut self, timeout: Duration) -> Self {
        self.relationship_timeout = Some(timeout);
        self
    }

    /// Skip compulsory property checks on save.
    pub fn without_validation(mut self) -> Self {
        self.validate_on_save = false;
        self
    }
}

/// Configuration for the sled-backed data store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the database directory.
    pub path: PathBuf,

    /// Page cache capacity in bytes.
    pub cache_capacity: u64,

    /// Flush interval in milliseconds. None means flush on every write.
    pub flush_every_ms: Option<u64>,

    /// Enable zstd compression.
    pub compression: bool,

    /// Temporary database (deleted on drop).
    pub temporary: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./habanero_data"),
            cache_capacity: 256 * 1024 * 1024, // 256MB
            flush_every_ms: Some(1000),
            compression: true,
            temporary: false,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create a temporary configuration for testing.
    pub fn temporary() -> Self {
        Self {
            path: PathBuf::from(""),
            temporary: true,
            ..Default::default()
        }
    }

    /// Set the page cache capacity.
    pub fn with_cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    /// Flush on every write.
    pub fn flush_on_write(mut self) -> Self {
        self.flush_every_ms = None;
        self
    }

    /// Convert to sled configuration.
    pub(crate) fn to_sled_config(&self) -> sled::Config {
        let mut config = sled::Config::new()
            .cache_capacity(self.cache_capacity)
            .use_compression(self.compression);

        if self.temporary {
            config = config.temporary(true);
        } else {
            config = config.path(&self.path);
        }

        config.flush_every_ms(self.flush_every_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_builders() {
        let config = SessionConfig::default()
            .with_relationship_timeout(Duration::from_millis(250))
            .without_validation();
        assert_eq!(config.relationship_timeout, Some(Duration::from_millis(250)));
        assert!(!config.validate_on_save);
    }

    #[test]
    fn test_store_config_temporary() {
        let config = StoreConfig::temporary().flush_on_write();
        assert!(config.temporary);
        assert_eq!(config.flush_every_ms, None);
    }
}
