//! Local model configuration

use serde::{Deserialize, Serialize};

use crate::{error::Result, storage::SettingsStore};

/// Store key holding the inference server's chat endpoint
pub const LOCAL_MODEL_API_URL_KEY: &str = "localModelApiUrl";

/// Store key holding the model name sent with each request
pub const LOCAL_MODEL_NAME_KEY: &str = "localModelName";

pub const DEFAULT_API_URL: &str = "http://10.123.1.158:11434/api/chat";

pub const DEFAULT_MODEL: &str = "llama3.3:latest";

/// Endpoint and model used by the local adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalModelConfig {
    /// Full URL of the chat endpoint (POST target)
    pub endpoint_url: String,

    /// Model identifier understood by the server
    pub model_name: String,
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_API_URL.to_string(),
            model_name: DEFAULT_MODEL.to_string(),
        }
    }
}

impl LocalModelConfig {
    /// Build a config from the store, starting from the defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read
    pub async fn load(store: &dyn SettingsStore) -> Result<Self> {
        let mut config = Self::default();
        config.reload(store).await?;
        Ok(config)
    }

    /// Overwrite fields with any persisted values
    ///
    /// Absent or empty keys leave the current value untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read; in that case no field
    /// is changed.
    pub async fn reload(&mut self, store: &dyn SettingsStore) -> Result<()> {
        let saved_url = store.get_string(LOCAL_MODEL_API_URL_KEY).await?;
        let saved_model = store.get_string(LOCAL_MODEL_NAME_KEY).await?;

        if let Some(url) = saved_url {
            tracing::debug!(endpoint = %url, "endpoint loaded from store");
            self.endpoint_url = url;
        }

        if let Some(model) = saved_model {
            tracing::debug!(model = %model, "model name loaded from store");
            self.model_name = model;
        }

        Ok(())
    }

    /// Persist both fields
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written
    pub async fn save(&self, store: &dyn SettingsStore) -> Result<()> {
        store
            .set(LOCAL_MODEL_API_URL_KEY, self.endpoint_url.clone().into())
            .await?;
        store
            .set(LOCAL_MODEL_NAME_KEY, self.model_name.clone().into())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_load_without_persisted_values_uses_defaults() {
        let store = MemoryStore::new();
        let config = LocalModelConfig::load(&store).await.unwrap();
        assert_eq!(config, LocalModelConfig::default());
        assert_eq!(config.endpoint_url, DEFAULT_API_URL);
        assert_eq!(config.model_name, DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_reload_overrides_only_present_keys() {
        let store = MemoryStore::new();
        store
            .set(LOCAL_MODEL_NAME_KEY, json!("qwen2.5:7b"))
            .await
            .unwrap();

        let mut config = LocalModelConfig {
            endpoint_url: "http://localhost:11434/api/chat".into(),
            model_name: "old".into(),
        };
        config.reload(&store).await.unwrap();

        assert_eq!(config.endpoint_url, "http://localhost:11434/api/chat");
        assert_eq!(config.model_name, "qwen2.5:7b");
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = MemoryStore::new();
        let config = LocalModelConfig {
            endpoint_url: "http://127.0.0.1:8080/api/chat".into(),
            model_name: "mistral".into(),
        };
        config.save(&store).await.unwrap();

        assert_eq!(LocalModelConfig::load(&store).await.unwrap(), config);
    }
}
