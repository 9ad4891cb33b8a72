//! Service layer for chat backends
//!
//! Every backend is exposed through the [`ChatBot`] trait. A bot turns one
//! prompt into a short sequence of [`ResponseEnvelope`]s delivered to a
//! callback together with the caller's request id.

pub mod local;
pub mod transport;

use std::path::Path;

use async_trait::async_trait;

pub use self::{
    local::LocalBot,
    transport::{ChatTransport, HttpTransport},
};
use crate::{
    error::{ChatError, Result},
    messages::ResponseEnvelope,
};

/// Callback receiving `(request_id, envelope)`
pub type ResponseCallback<'a> = dyn FnMut(&str, ResponseEnvelope) + Send + 'a;

/// Static description of a bot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotInfo {
    /// Display name, also the key persisted for active bots
    pub name: &'static str,
    pub max_token_limit: u32,
    pub requires_login: bool,
    pub paid_model: bool,
    pub supports_pdf_upload: bool,
    pub supports_image_upload: bool,
    pub is_new_model: bool,
    pub login_url: &'static str,
    pub supported_upload_types: &'static [&'static str],
}

/// Result of a single completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The backend replied with this text
    Reply(String),
    /// The request failed
    Failed(ChatError),
}

impl CompletionOutcome {
    /// Envelopes to deliver for this outcome
    ///
    /// A reply yields `Generating` then `Done` with the same text; a failure
    /// yields a single `Error`.
    #[must_use]
    pub fn envelopes(&self) -> Vec<ResponseEnvelope> {
        match self {
            Self::Reply(text) => vec![
                ResponseEnvelope::Generating {
                    message_text: text.clone(),
                },
                ResponseEnvelope::Done {
                    message_text: text.clone(),
                },
            ],
            Self::Failed(error) => vec![ResponseEnvelope::Error {
                error: error.clone(),
            }],
        }
    }

    #[must_use]
    pub const fn is_reply(&self) -> bool {
        matches!(self, Self::Reply(_))
    }
}

/// Common interface for chat backends
///
/// `completion` takes `&mut self`: a bot owns its transcript, so only one
/// request can be in flight per instance.
#[async_trait]
pub trait ChatBot: Send + Sync {
    /// Static metadata for this bot
    fn info(&self) -> &'static BotInfo;

    /// Send `prompt` and report progress through `callback`
    ///
    /// Failures never surface as `Err`; they arrive as an error envelope.
    async fn completion(
        &mut self,
        prompt: &str,
        request_id: &str,
        callback: &mut ResponseCallback<'_>,
    );

    /// Forget the conversation so far
    fn clear_history(&mut self);

    /// Run the backend's login flow; `Ok(true)` when nothing is needed
    async fn start_auth(&self) -> Result<bool> {
        Ok(true)
    }

    /// Run the backend's captcha flow; `Ok(true)` when nothing is needed
    async fn start_captcha(&self) -> Result<bool> {
        Ok(true)
    }

    fn supports_file_upload(&self) -> bool {
        let info = self.info();
        info.supports_pdf_upload || info.supports_image_upload
    }

    /// Upload an attachment, returning the backend's reference to it
    async fn upload_file(&self, path: &Path) -> Result<String>;

    fn name(&self) -> &'static str {
        self.info().name
    }
}
