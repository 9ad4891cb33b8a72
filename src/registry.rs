//! Registry of available chat bots
//!
//! Holds the fixed list of bots the front end can offer, the subset that is
//! active for the current session, and builds bot instances by name.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    error::{ChatBridgeError, Result},
    services::{BotInfo, ChatBot, ChatTransport, LocalBot},
    storage::SettingsStore,
};

/// Store key holding the names of the active bots
pub const CURRENT_MODELS_KEY: &str = "currentModelsKey";

type BuildFn = fn(Arc<dyn SettingsStore>, Arc<dyn ChatTransport>) -> Box<dyn ChatBot>;

/// A bot the registry knows how to build
#[derive(Clone, Copy)]
pub struct BotDescriptor {
    pub info: &'static BotInfo,
    build: BuildFn,
}

impl std::fmt::Debug for BotDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotDescriptor")
            .field("name", &self.info.name)
            .finish_non_exhaustive()
    }
}

impl BotDescriptor {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.info.name
    }
}

/// Bots grouped under a display label
#[derive(Debug, Clone)]
pub struct ModelCategory {
    pub label: &'static str,
    pub models: Vec<BotDescriptor>,
}

fn build_local(store: Arc<dyn SettingsStore>, transport: Arc<dyn ChatTransport>) -> Box<dyn ChatBot> {
    Box::new(LocalBot::new(store, transport))
}

const LOCAL_BOT: BotDescriptor = BotDescriptor {
    info: &LocalBot::INFO,
    build: build_local,
};

/// Available bots and the active subset
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    all: Vec<BotDescriptor>,
    defaults: Vec<BotDescriptor>,
    active: Vec<BotDescriptor>,
    categories: Vec<ModelCategory>,
    loaded: bool,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            all: vec![LOCAL_BOT],
            defaults: vec![LOCAL_BOT],
            active: vec![LOCAL_BOT],
            categories: vec![ModelCategory {
                label: "Local",
                models: vec![LOCAL_BOT],
            }],
            loaded: false,
        }
    }

    /// Reset the active subset to the defaults and mark the registry ready
    pub fn initialize(&mut self) {
        self.active = self.defaults.clone();
        self.loaded = true;
        tracing::debug!(active = ?self.active_keys(), "model registry initialized");
    }

    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[must_use]
    pub fn all_models(&self) -> &[BotDescriptor] {
        &self.all
    }

    #[must_use]
    pub fn active(&self) -> &[BotDescriptor] {
        &self.active
    }

    #[must_use]
    pub fn categories(&self) -> &[ModelCategory] {
        &self.categories
    }

    /// Look up a bot by name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<BotDescriptor> {
        self.all.iter().copied().find(|d| d.name() == name)
    }

    #[must_use]
    pub fn is_active(&self, name: &str) -> bool {
        self.active.iter().any(|d| d.name() == name)
    }

    /// Replace the active subset
    ///
    /// # Errors
    ///
    /// Returns [`ChatBridgeError::ModelNotFound`] for an unknown name; the
    /// active subset is left unchanged.
    pub fn set_active<I, S>(&mut self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut active: Vec<BotDescriptor> = Vec::new();
        for name in names {
            let name = name.as_ref();
            let descriptor = self
                .find(name)
                .ok_or_else(|| ChatBridgeError::ModelNotFound(name.to_string()))?;
            if !active.iter().any(|d| d.name() == name) {
                active.push(descriptor);
            }
        }
        self.active = active;
        Ok(())
    }

    /// Names of the active bots, in order
    #[must_use]
    pub fn active_keys(&self) -> Vec<String> {
        self.active.iter().map(|d| d.name().to_string()).collect()
    }

    /// Persist the active bots' names under [`CURRENT_MODELS_KEY`]
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written
    pub async fn save_active_keys(&self, store: &dyn SettingsStore) -> Result<()> {
        let keys: Vec<Value> = self.active_keys().into_iter().map(Value::from).collect();
        store.set(CURRENT_MODELS_KEY, Value::Array(keys)).await
    }

    /// Restore the active subset saved by [`ModelRegistry::save_active_keys`]
    ///
    /// Unknown names are skipped. If nothing usable was saved the defaults
    /// are used.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read
    pub async fn restore_active_keys(&mut self, store: &dyn SettingsStore) -> Result<()> {
        let saved = store.get(CURRENT_MODELS_KEY).await?;
        let names: Vec<String> = saved
            .as_ref()
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|name| {
                        let known = self.find(name).is_some();
                        if !known {
                            tracing::warn!(name, "ignoring unknown saved model");
                        }
                        known
                    })
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        if names.is_empty() {
            self.active = self.defaults.clone();
        } else {
            self.set_active(&names)?;
        }
        self.loaded = true;
        Ok(())
    }

    /// Build a bot by name
    ///
    /// # Errors
    ///
    /// Returns [`ChatBridgeError::ModelNotFound`] for an unknown name
    pub fn create(
        &self,
        name: &str,
        store: Arc<dyn SettingsStore>,
        transport: Arc<dyn ChatTransport>,
    ) -> Result<Box<dyn ChatBot>> {
        let descriptor = self
            .find(name)
            .ok_or_else(|| ChatBridgeError::ModelNotFound(name.to_string()))?;
        Ok((descriptor.build)(store, transport))
    }
}
