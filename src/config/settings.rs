//! Settings form for the local model
//!
//! A headless version of the endpoint/model form: load current values,
//! validate, and persist both fields together.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::LocalModelConfig;
use crate::{
    error::{ChatBridgeError, Result},
    storage::SettingsStore,
};

/// Editable values for the local model settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalModelSettings {
    pub endpoint_url: String,
    pub model_name: String,
}

impl LocalModelSettings {
    /// Current persisted values, falling back to defaults per field
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read
    pub async fn load(store: &dyn SettingsStore) -> Result<Self> {
        let config = LocalModelConfig::load(store).await?;
        Ok(config.into())
    }

    /// Check both fields
    ///
    /// # Errors
    ///
    /// Returns [`ChatBridgeError::ConfigValidation`] naming the first bad field
    pub fn validate(&self) -> Result<()> {
        if self.endpoint_url.trim().is_empty() {
            return Err(ChatBridgeError::ConfigValidation(
                "endpoint URL is required".to_string(),
            ));
        }

        let url = Url::parse(self.endpoint_url.trim()).map_err(|e| {
            ChatBridgeError::ConfigValidation(format!(
                "endpoint URL {:?} is not a valid URL: {e}",
                self.endpoint_url
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ChatBridgeError::ConfigValidation(format!(
                "endpoint URL must use http or https, got {}",
                url.scheme()
            )));
        }

        if self.model_name.trim().is_empty() {
            return Err(ChatBridgeError::ConfigValidation(
                "model name is required".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate, then persist both fields
    ///
    /// # Errors
    ///
    /// Returns a validation error without writing anything, or a store error
    pub async fn submit(&self, store: &dyn SettingsStore) -> Result<()> {
        self.validate()?;
        let config = LocalModelConfig {
            endpoint_url: self.endpoint_url.trim().to_string(),
            model_name: self.model_name.trim().to_string(),
        };
        config.save(store).await?;
        tracing::info!(endpoint = %config.endpoint_url, model = %config.model_name, "local model settings saved");
        Ok(())
    }
}

impl From<LocalModelConfig> for LocalModelSettings {
    fn from(config: LocalModelConfig) -> Self {
        Self {
            endpoint_url: config.endpoint_url,
            model_name: config.model_name,
        }
    }
}
