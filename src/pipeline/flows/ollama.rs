use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::ollama_types::{
    validate_base_url, validate_model_name, GenerationOptions, OllamaChatRequest,
    OllamaChatResponse, OllamaError,
};
use super::types::{ChatModel, ModelReply, ModelRequest};
use super::FlowError;
use crate::config::AppConfig;

/// Ollama HTTP client for the flows' chat calls.
///
/// Uses the blocking reqwest client: build it outside the async runtime and
/// call it from `spawn_blocking`.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    options: GenerationOptions,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, OllamaError> {
        validate_base_url(base_url)?;
        validate_model_name(model)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OllamaError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
            options: GenerationOptions::default(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, OllamaError> {
        Self::new(&config.ollama_url, &config.model, config.flow_timeout.as_secs())
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn send(&self, request: &ModelRequest) -> Result<ModelReply, OllamaError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = OllamaChatRequest::from_model_request(&self.model, request, self.options.clone());

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                OllamaError::NotReachable(self.base_url.clone())
            } else if e.is_timeout() {
                OllamaError::Timeout(self.timeout_secs)
            } else {
                OllamaError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(OllamaError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: OllamaChatResponse = response
            .json()
            .map_err(|e| OllamaError::ResponseParsing(e.to_string()))?;

        Ok(parsed.into())
    }
}

impl ChatModel for OllamaClient {
    fn chat(&self, request: &ModelRequest) -> Result<ModelReply, FlowError> {
        tracing::debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending chat request to Ollama"
        );
        let reply = self.send(request)?;
        tracing::debug!(tool_calls = reply.tool_calls.len(), "Ollama replied");
        Ok(reply)
    }
}

// ──────────────────────────────────────────────
// Mock for tests
// ──────────────────────────────────────────────

/// Scripted stand-in for the model.
///
/// Replies are consumed in order; once the script is exhausted the last
/// reply repeats. Every request is recorded.
pub struct MockChatModel {
    script: Mutex<VecDeque<Result<ModelReply, String>>>,
    last: Mutex<Option<Result<ModelReply, String>>>,
    requests: Mutex<Vec<ModelRequest>>,
    delay: Option<Duration>,
}

impl MockChatModel {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self::scripted(replies.into_iter().map(Ok).collect())
    }

    /// Model that always answers with `content`.
    pub fn answering(content: &str) -> Self {
        Self::new(vec![ModelReply::content(content)])
    }

    /// Model that always fails as if unreachable.
    pub fn failing(message: &str) -> Self {
        Self::scripted(vec![Err(message.to_string())])
    }

    pub fn scripted(script: Vec<Result<ModelReply, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before every reply (for timeout tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl ChatModel for MockChatModel {
    fn chat(&self, request: &ModelRequest) -> Result<ModelReply, FlowError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let next = {
            let mut script = self
                .script
                .lock()
                .map_err(|_| FlowError::Transport("mock lock poisoned".into()))?;
            let mut last = self
                .last
                .lock()
                .map_err(|_| FlowError::Transport("mock lock poisoned".into()))?;
            match script.pop_front() {
                Some(step) => {
                    *last = Some(step.clone());
                    Some(step)
                }
                None => last.clone(),
            }
        };

        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(FlowError::Transport(message)),
            None => Err(FlowError::Transport("mock model has no scripted reply".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::flows::types::ModelMessage;
    use serde_json::json;

    fn request() -> ModelRequest {
        ModelRequest {
            messages: vec![ModelMessage::user("hello", Vec::new())],
            format: json!({ "type": "object" }),
            tools: Vec::new(),
        }
    }

    #[test]
    fn mock_replays_script_then_repeats_last() {
        let mock = MockChatModel::new(vec![
            ModelReply::tool_call("findNearbyDoctors", json!({ "specialty": "Cardiology" })),
            ModelReply::content("{}"),
        ]);
        assert_eq!(mock.chat(&request()).unwrap().tool_calls.len(), 1);
        assert_eq!(mock.chat(&request()).unwrap().content, "{}");
        assert_eq!(mock.chat(&request()).unwrap().content, "{}");
        assert_eq!(mock.calls(), 3);
    }

    #[test]
    fn failing_mock_is_transport_failure() {
        let mock = MockChatModel::failing("connection refused");
        assert!(matches!(mock.chat(&request()), Err(FlowError::Transport(_))));
    }

    #[test]
    fn mock_records_requests() {
        let mock = MockChatModel::answering("{}");
        mock.chat(&request()).unwrap();
        assert_eq!(mock.requests()[0].messages[0].content, "hello");
    }

    #[test]
    fn ollama_client_trims_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/", "gemma3:4b", 30).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.model(), "gemma3:4b");
    }

    #[test]
    fn ollama_client_rejects_bad_model() {
        assert!(matches!(
            OllamaClient::new("http://localhost:11434", "../etc/passwd", 30),
            Err(OllamaError::InvalidModelName(_))
        ));
    }

    #[test]
    fn unreachable_ollama_is_transport_failure() {
        // Port 9 (discard) is not expected to run an HTTP server.
        let client = OllamaClient::new("http://127.0.0.1:9", "gemma3:4b", 2).unwrap();
        assert!(matches!(client.chat(&request()), Err(FlowError::Transport(_))));
    }
}
