//! Service configuration.
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! file (or no file) is a valid configuration. Command-line flags override
//! what the file says.
//!
//! ```toml
//! log_level = "debug"
//!
//! [storage]
//! db_path = "/var/lib/ordersvc"
//!
//! [timeouts]
//! store_ms = 2000
//! authorizer_ms = 8000
//!
//! [pagination]
//! max_page_size = 50
//! ```

use crate::error::{OrderError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
    pub storage: StorageConfig,
    pub timeouts: TimeoutConfig,
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Selects the RocksDB backend when set.
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub store_ms: u64,
    pub authorizer_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub max_page_size: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            storage: StorageConfig::default(),
            timeouts: TimeoutConfig::default(),
            pagination: PaginationConfig::default(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            store_ms: 5_000,
            authorizer_ms: 10_000,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { max_page_size: 100 }
    }
}

impl TimeoutConfig {
    pub fn store(&self) -> Duration {
        Duration::from_millis(self.store_ms)
    }

    pub fn authorizer(&self) -> Duration {
        Duration::from_millis(self.authorizer_ms)
    }
}

impl ServiceConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            OrderError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        content.parse()
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeouts.store_ms == 0 {
            return Err(OrderError::Config("timeouts.store_ms must be positive".into()));
        }
        if self.timeouts.authorizer_ms == 0 {
            return Err(OrderError::Config(
                "timeouts.authorizer_ms must be positive".into(),
            ));
        }
        if self.pagination.max_page_size == 0 {
            return Err(OrderError::Config(
                "pagination.max_page_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl FromStr for ServiceConfig {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self> {
        let config: ServiceConfig =
            toml::from_str(s).map_err(|e| OrderError::Config(e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
