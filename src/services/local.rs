//! Adapter for a self-hosted inference server
//!
//! Speaks the Ollama `/api/chat` format with streaming disabled: the whole
//! transcript goes out on every request and the reply comes back in one
//! JSON object.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{BotInfo, ChatBot, ChatTransport, CompletionOutcome, ResponseCallback};
use crate::{
    config::LocalModelConfig,
    error::{ChatBridgeError, ChatError, ErrorCode, Result},
    messages::{Transcript, Turn},
    storage::SettingsStore,
};

/// Chat adapter for a local model server
pub struct LocalBot {
    store: Arc<dyn SettingsStore>,
    transport: Arc<dyn ChatTransport>,
    config: LocalModelConfig,
    history: Transcript,
}

impl LocalBot {
    pub const INFO: BotInfo = BotInfo {
        name: "Local LLM",
        max_token_limit: 4096,
        requires_login: false,
        paid_model: false,
        supports_pdf_upload: false,
        supports_image_upload: false,
        is_new_model: false,
        login_url: "",
        supported_upload_types: &[],
    };

    /// Create an adapter using the default configuration
    ///
    /// Persisted settings are picked up on the first completion, or earlier
    /// through [`LocalBot::reload_config`].
    #[must_use]
    pub fn new(store: Arc<dyn SettingsStore>, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            store,
            transport,
            config: LocalModelConfig::default(),
            history: Transcript::new(),
        }
    }

    /// Create an adapter and load persisted settings right away
    pub async fn load(store: Arc<dyn SettingsStore>, transport: Arc<dyn ChatTransport>) -> Self {
        let mut bot = Self::new(store, transport);
        if let Err(e) = bot.reload_config().await {
            tracing::warn!("failed to load local model settings: {e}");
        }
        bot
    }

    /// Re-read endpoint and model from the store
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read; the current
    /// configuration is kept.
    pub async fn reload_config(&mut self) -> Result<()> {
        self.config.reload(self.store.as_ref()).await
    }

    pub fn set_endpoint(&mut self, url: impl Into<String>) {
        self.config.endpoint_url = url.into();
    }

    pub fn set_model(&mut self, model_name: impl Into<String>) {
        self.config.model_name = model_name.into();
    }

    #[must_use]
    pub fn config(&self) -> &LocalModelConfig {
        &self.config
    }

    #[must_use]
    pub fn history(&self) -> &Transcript {
        &self.history
    }

    /// Send `prompt` and return the outcome without a callback
    ///
    /// The user turn is always recorded. The assistant turn is recorded only
    /// when the server returns usable content.
    pub async fn respond(&mut self, prompt: &str) -> CompletionOutcome {
        if let Err(e) = self.reload_config().await {
            tracing::warn!("failed to reload local model settings: {e}");
        }

        self.history.push(Turn::user(prompt));

        let request = ChatRequest {
            model: &self.config.model_name,
            messages: self.history.turns(),
            stream: false,
        };
        let body = match serde_json::to_value(&request) {
            Ok(body) => body,
            Err(e) => return CompletionOutcome::Failed(ChatError::new(ErrorCode::Unknown, e.to_string())),
        };
        tracing::debug!(endpoint = %self.config.endpoint_url, turns = self.history.len(), "sending local completion");

        let raw = match self.transport.post_json(&self.config.endpoint_url, &body).await {
            Ok(raw) => raw,
            Err(error) => {
                tracing::error!("local completion failed: {error}");
                return CompletionOutcome::Failed(error);
            }
        };

        let content = match extract_reply(&raw) {
            Ok(content) => content,
            Err(error) => {
                tracing::error!("local completion returned an unusable body: {error}");
                return CompletionOutcome::Failed(error);
            }
        };

        self.history.push(Turn::assistant(content.clone()));
        CompletionOutcome::Reply(content)
    }
}

#[async_trait]
impl ChatBot for LocalBot {
    fn info(&self) -> &'static BotInfo {
        &Self::INFO
    }

    async fn completion(
        &mut self,
        prompt: &str,
        request_id: &str,
        callback: &mut ResponseCallback<'_>,
    ) {
        tracing::debug!(request_id, "local completion");
        let outcome = self.respond(prompt).await;
        for envelope in outcome.envelopes() {
            callback(request_id, envelope);
        }
    }

    fn clear_history(&mut self) {
        self.history.clear();
    }

    async fn upload_file(&self, path: &Path) -> Result<String> {
        Err(ChatBridgeError::UnsupportedOperation(format!(
            "file upload not supported for local model ({})",
            path.display()
        )))
    }
}

/// Pull `message.content` out of a response body
fn extract_reply(raw: &str) -> std::result::Result<String, ChatError> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
        ChatError::new(
            ErrorCode::MalformedResponse,
            format!("Invalid JSON in response: {e}"),
        )
    })?;

    serde_json::from_value::<ChatResponse>(value)
        .ok()
        .and_then(|response| response.message)
        .and_then(|message| message.content)
        .filter(|content| !content.is_empty())
        .ok_or_else(ChatError::invalid_response_format)
}

// Ollama chat API types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::models::{DEFAULT_API_URL, DEFAULT_MODEL, LOCAL_MODEL_API_URL_KEY, LOCAL_MODEL_NAME_KEY},
        messages::ResponseEnvelope,
        storage::MemoryStore,
    };
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::collections::VecDeque;

    /// Transport that replays canned results and records requests
    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<VecDeque<std::result::Result<String, ChatError>>>,
        requests: Mutex<Vec<(String, Value)>>,
    }

    impl ScriptedTransport {
        fn replying(replies: Vec<std::result::Result<String, ChatError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::default(),
            })
        }

        fn requests(&self) -> Vec<(String, Value)> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn post_json(&self, url: &str, body: &Value) -> std::result::Result<String, ChatError> {
            self.requests.lock().push((url.to_string(), body.clone()));
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(ChatError::new(ErrorCode::Unknown, "no scripted reply")))
        }
    }

    /// Store whose reads always fail
    struct BrokenStore;

    #[async_trait]
    impl SettingsStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<Value>> {
            Err(ChatBridgeError::Other("store offline".into()))
        }

        async fn set(&self, _key: &str, _value: Value) -> Result<()> {
            Err(ChatBridgeError::Other("store offline".into()))
        }
    }

    fn ok(content: &str) -> std::result::Result<String, ChatError> {
        Ok(json!({"model": "llama3", "message": {"role": "assistant", "content": content}, "done": true}).to_string())
    }

    async fn run(bot: &mut LocalBot, prompt: &str, rid: &str) -> Vec<(String, ResponseEnvelope)> {
        let mut seen = Vec::new();
        bot.completion(prompt, rid, &mut |id: &str, envelope: ResponseEnvelope| {
            seen.push((id.to_string(), envelope));
        })
        .await;
        seen
    }

    #[tokio::test]
    async fn test_successful_completion() {
        let transport = ScriptedTransport::replying(vec![ok("hello")]);
        let mut bot = LocalBot::new(Arc::new(MemoryStore::new()), transport.clone());

        let seen = run(&mut bot, "hi", "rid-1").await;

        assert_eq!(
            seen,
            vec![
                (
                    "rid-1".to_string(),
                    ResponseEnvelope::Generating {
                        message_text: "hello".into()
                    }
                ),
                (
                    "rid-1".to_string(),
                    ResponseEnvelope::Done {
                        message_text: "hello".into()
                    }
                ),
            ]
        );
        assert_eq!(
            bot.history().turns(),
            &[Turn::user("hi"), Turn::assistant("hello")]
        );
    }

    #[tokio::test]
    async fn test_request_body_and_default_config() {
        let transport = ScriptedTransport::replying(vec![ok("hello")]);
        let mut bot = LocalBot::new(Arc::new(MemoryStore::new()), transport.clone());

        run(&mut bot, "hi", "rid").await;

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let (url, body) = &requests[0];
        assert_eq!(url, DEFAULT_API_URL);
        assert_eq!(
            body,
            &json!({
                "model": DEFAULT_MODEL,
                "messages": [{"role": "user", "content": "hi"}],
                "stream": false
            })
        );
    }

    #[tokio::test]
    async fn test_transport_failure_emits_single_error() {
        let network_down = ChatError::new(ErrorCode::Network, "NetworkDown");
        let transport = ScriptedTransport::replying(vec![Err(network_down.clone())]);
        let mut bot = LocalBot::new(Arc::new(MemoryStore::new()), transport);

        let seen = run(&mut bot, "hi", "rid").await;

        assert_eq!(
            seen,
            vec![("rid".to_string(), ResponseEnvelope::Error { error: network_down })]
        );
        assert_eq!(bot.history().turns(), &[Turn::user("hi")]);
    }

    #[tokio::test]
    async fn test_missing_content_is_invalid_format() {
        let transport = ScriptedTransport::replying(vec![
            Ok(json!({"done": true}).to_string()),
            Ok(json!({"message": {"role": "assistant"}}).to_string()),
            Ok(json!({"message": {"content": ""}}).to_string()),
            Ok("null".to_string()),
        ]);
        let mut bot = LocalBot::new(Arc::new(MemoryStore::new()), transport);

        for prompt in ["a", "b", "c", "d"] {
            let seen = run(&mut bot, prompt, "rid").await;
            assert_eq!(
                seen,
                vec![(
                    "rid".to_string(),
                    ResponseEnvelope::Error {
                        error: ChatError::invalid_response_format()
                    }
                )]
            );
        }

        assert_eq!(
            bot.history().turns(),
            &[Turn::user("a"), Turn::user("b"), Turn::user("c"), Turn::user("d")]
        );
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let transport = ScriptedTransport::replying(vec![Ok("<html>oops</html>".into())]);
        let mut bot = LocalBot::new(Arc::new(MemoryStore::new()), transport);

        let outcome = bot.respond("hi").await;
        match outcome {
            CompletionOutcome::Failed(error) => assert_eq!(error.code, ErrorCode::MalformedResponse),
            CompletionOutcome::Reply(text) => panic!("unexpected reply {text}"),
        }
        assert_eq!(bot.history().len(), 1);
    }

    #[tokio::test]
    async fn test_adapter_usable_after_failure_and_sends_full_transcript() {
        let transport = ScriptedTransport::replying(vec![
            Err(ChatError::new(ErrorCode::Network, "down")),
            ok("second answer"),
        ]);
        let mut bot = LocalBot::new(Arc::new(MemoryStore::new()), transport.clone());

        assert!(!bot.respond("first").await.is_reply());
        assert_eq!(
            bot.respond("second").await,
            CompletionOutcome::Reply("second answer".into())
        );

        let (_, body) = &transport.requests()[1];
        assert_eq!(
            body["messages"],
            json!([
                {"role": "user", "content": "first"},
                {"role": "user", "content": "second"}
            ])
        );
    }

    #[tokio::test]
    async fn test_config_reloaded_before_every_call() {
        let store = Arc::new(MemoryStore::new());
        let transport = ScriptedTransport::replying(vec![ok("one"), ok("two")]);
        let mut bot = LocalBot::new(store.clone(), transport.clone());

        bot.respond("first").await;

        store
            .set(LOCAL_MODEL_API_URL_KEY, json!("http://gpu-box:11434/api/chat"))
            .await
            .unwrap();
        store.set(LOCAL_MODEL_NAME_KEY, json!("qwen2.5")).await.unwrap();

        bot.respond("second").await;

        let requests = transport.requests();
        assert_eq!(requests[0].0, DEFAULT_API_URL);
        assert_eq!(requests[1].0, "http://gpu-box:11434/api/chat");
        assert_eq!(requests[1].1["model"], "qwen2.5");
        assert_eq!(bot.config().model_name, "qwen2.5");
    }

    #[tokio::test]
    async fn test_setters_apply_when_nothing_persisted() {
        let transport = ScriptedTransport::replying(vec![ok("ok")]);
        let mut bot = LocalBot::new(Arc::new(MemoryStore::new()), transport.clone());
        bot.set_endpoint("http://localhost:11434/api/chat");
        bot.set_model("phi3");

        bot.respond("hi").await;

        let (url, body) = &transport.requests()[0];
        assert_eq!(url, "http://localhost:11434/api/chat");
        assert_eq!(body["model"], "phi3");
    }

    #[tokio::test]
    async fn test_store_failure_keeps_current_config() {
        let transport = ScriptedTransport::replying(vec![ok("fine")]);
        let mut bot = LocalBot::load(Arc::new(BrokenStore), transport.clone()).await;

        assert_eq!(bot.respond("hi").await, CompletionOutcome::Reply("fine".into()));
        assert_eq!(transport.requests()[0].0, DEFAULT_API_URL);
    }

    #[tokio::test]
    async fn test_load_reads_persisted_settings() {
        let store = Arc::new(MemoryStore::new());
        store.set(LOCAL_MODEL_NAME_KEY, json!("mistral")).await.unwrap();

        let bot = LocalBot::load(store, ScriptedTransport::replying(vec![])).await;
        assert_eq!(bot.config().model_name, "mistral");
        assert_eq!(bot.config().endpoint_url, DEFAULT_API_URL);
    }

    #[tokio::test]
    async fn test_clear_history() {
        let transport = ScriptedTransport::replying(vec![ok("hello")]);
        let mut bot = LocalBot::new(Arc::new(MemoryStore::new()), transport);

        bot.respond("hi").await;
        assert_eq!(bot.history().len(), 2);

        bot.clear_history();
        assert!(bot.history().is_empty());
    }

    #[tokio::test]
    async fn test_capabilities() {
        let bot = LocalBot::new(
            Arc::new(MemoryStore::new()),
            ScriptedTransport::replying(vec![]),
        );

        assert_eq!(bot.name(), "Local LLM");
        assert!(!bot.supports_file_upload());
        assert!(bot.start_auth().await.unwrap());
        assert!(bot.start_captcha().await.unwrap());
        assert_eq!(bot.info().max_token_limit, 4096);
        assert!(!bot.info().requires_login);
        assert!(bot.info().supported_upload_types.is_empty());

        let err = bot.upload_file(Path::new("notes.pdf")).await.unwrap_err();
        assert!(matches!(err, ChatBridgeError::UnsupportedOperation(_)));
        assert_eq!(ChatError::from(err).code, ErrorCode::UnsupportedOperation);
    }
}
