//! Configuration management for chatbridge
//!
//! Settings live in a key/value store (`storage.json` under the user's
//! config directory by default). The path can be overridden on the command
//! line or with `CHATBRIDGE_STORE`.

pub mod models;
pub mod settings;

use std::path::PathBuf;

pub use self::{
    models::{LocalModelConfig, DEFAULT_API_URL, DEFAULT_MODEL},
    settings::LocalModelSettings,
};
use crate::storage::JsonFileStore;

/// Application-level paths
#[derive(Debug, Clone)]
pub struct Config {
    /// Location of the settings store
    pub store_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: Self::default_store_path(),
        }
    }
}

impl Config {
    /// Use `store_path` if given, else the default location
    #[must_use]
    pub fn new(store_path: Option<PathBuf>) -> Self {
        store_path.map_or_else(Self::default, |store_path| Self { store_path })
    }

    /// Get the configuration directory path
    #[must_use]
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chatbridge")
    }

    /// Get the default settings store path
    #[must_use]
    pub fn default_store_path() -> PathBuf {
        Self::config_dir().join("storage.json")
    }

    /// Open the settings store at the configured path
    #[must_use]
    pub fn open_store(&self) -> JsonFileStore {
        JsonFileStore::new(&self.store_path)
    }
}
