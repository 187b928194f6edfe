//! Ollama `/api/chat` wire types, error taxonomy, and input validators.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{ModelMessage, ModelReply, ModelRequest, ModelRole, ToolCall, ToolDeclaration};
use super::FlowError;

// ──────────────────────────────────────────────
// Request body (POST /api/chat)
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<OllamaTool>,
    /// JSON Schema for structured output.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub format: Value,
    pub stream: bool,
    pub options: GenerationOptions,
}

impl OllamaChatRequest {
    pub fn from_model_request(model: &str, request: &ModelRequest, options: GenerationOptions) -> Self {
        Self {
            model: model.to_string(),
            messages: request.messages.iter().map(OllamaMessage::from).collect(),
            tools: request.tools.iter().map(OllamaTool::from).collect(),
            format: request.format.clone(),
            stream: false,
            options,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    /// Base64-encoded images (user messages only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<OllamaToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl From<&ModelMessage> for OllamaMessage {
    fn from(message: &ModelMessage) -> Self {
        let role = match message.role {
            ModelRole::System => "system",
            ModelRole::User => "user",
            ModelRole::Assistant => "assistant",
            ModelRole::Tool => "tool",
        };
        Self {
            role: role.to_string(),
            content: message.content.clone(),
            images: message.images.clone(),
            tool_calls: message.tool_calls.iter().map(OllamaToolCall::from).collect(),
            tool_name: message.tool_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaToolCall {
    pub function: OllamaFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaFunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl From<&ToolCall> for OllamaToolCall {
    fn from(call: &ToolCall) -> Self {
        Self {
            function: OllamaFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OllamaTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: OllamaFunctionDecl,
}

#[derive(Debug, Clone, Serialize)]
pub struct OllamaFunctionDecl {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl From<&ToolDeclaration> for OllamaTool {
    fn from(decl: &ToolDeclaration) -> Self {
        Self {
            kind: "function",
            function: OllamaFunctionDecl {
                name: decl.name.clone(),
                description: decl.description.clone(),
                parameters: decl.parameters.clone(),
            },
        }
    }
}

// ──────────────────────────────────────────────
// Response body
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaChatResponse {
    pub message: OllamaMessage,
    #[serde(default)]
    pub done: bool,
}

impl From<OllamaChatResponse> for ModelReply {
    fn from(response: OllamaChatResponse) -> Self {
        Self {
            content: response.message.content,
            tool_calls: response
                .message
                .tool_calls
                .into_iter()
                .map(|c| ToolCall {
                    name: c.function.name,
                    arguments: c.function.arguments,
                })
                .collect(),
        }
    }
}

/// Generation parameters sent as `options`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sampling temperature (0.0-1.0). Lower = more deterministic.
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
}

impl Default for GenerationOptions {
    /// Low temperature: triage answers should be reproducible.
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.9,
            top_k: 40,
            num_predict: None,
        }
    }
}

// ──────────────────────────────────────────────
// Error taxonomy
// ──────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum OllamaError {
    #[error("Ollama is not running at {0}")]
    NotReachable(String),

    #[error("Ollama returned an error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid model name: '{0}'")]
    InvalidModelName(String),

    #[error("Invalid URL format")]
    InvalidUrl,

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Could not parse Ollama response: {0}")]
    ResponseParsing(String),
}

/// Every client failure is a transport failure from the flow's point of view.
impl From<OllamaError> for FlowError {
    fn from(err: OllamaError) -> Self {
        FlowError::Transport(err.to_string())
    }
}

// ──────────────────────────────────────────────
// Validators
// ──────────────────────────────────────────────

/// Validate an Ollama base URL: http(s) scheme and a non-empty host.
///
/// Non-loopback hosts are allowed (a clinic may run Ollama on a LAN box)
/// but logged, since symptom text is sent there.
pub fn validate_base_url(url: &str) -> Result<(), OllamaError> {
    let after_scheme = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or(OllamaError::InvalidUrl)?;

    let host = if after_scheme.starts_with('[') {
        after_scheme
            .split(']')
            .next()
            .unwrap_or("")
            .trim_start_matches('[')
    } else {
        after_scheme
            .split(['/', ':'])
            .next()
            .unwrap_or("")
    };

    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(OllamaError::InvalidUrl);
    }

    if !matches!(host, "localhost" | "127.0.0.1" | "::1") {
        tracing::warn!(host, "Ollama endpoint is not on this machine");
    }
    Ok(())
}

/// Validate a model name against the Ollama naming convention.
///
/// Format: `[namespace/]model[:tag]`, at most one namespace segment, each
/// segment starting with an alphanumeric character.
/// Valid: `gemma3:4b`, `dcarrascosa/medgemma-1.5-4b-it`.
/// Invalid: `../etc/passwd`, `; rm -rf /`, `a/b/c`.
pub fn validate_model_name(name: &str) -> Result<(), OllamaError> {
    let invalid = || OllamaError::InvalidModelName(name.to_string());
    if name.is_empty() {
        return Err(invalid());
    }

    let valid = regex::Regex::new(
        r"^[a-zA-Z0-9][a-zA-Z0-9._-]*(/[a-zA-Z0-9][a-zA-Z0-9._-]*)?(:[a-zA-Z0-9._-]+)?$",
    )
    .map_err(|_| invalid())?;

    if !valid.is_match(name) {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_model_names() {
        for name in ["gemma3:4b", "llama3.1:8b", "dcarrascosa/medgemma-1.5-4b-it", "medgemma"] {
            assert!(validate_model_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn invalid_model_names() {
        for name in ["", "../etc/passwd", "; rm -rf /", "a/b/c", "/leading", "model:"] {
            assert!(validate_model_name(name).is_err(), "{name} should be invalid");
        }
    }

    #[test]
    fn base_url_accepts_local_and_lan() {
        assert!(validate_base_url("http://localhost:11434").is_ok());
        assert!(validate_base_url("http://127.0.0.1:11434/").is_ok());
        assert!(validate_base_url("http://[::1]:11434").is_ok());
        assert!(validate_base_url("http://192.168.1.20:11434").is_ok());
    }

    #[test]
    fn base_url_rejects_bad_scheme_or_host() {
        assert!(validate_base_url("ftp://localhost").is_err());
        assert!(validate_base_url("localhost:11434").is_err());
        assert!(validate_base_url("http://").is_err());
        assert!(validate_base_url("http://:11434").is_err());
    }

    #[test]
    fn chat_request_serializes_tools_and_format() {
        let request = ModelRequest {
            messages: vec![
                ModelMessage::system("sys"),
                ModelMessage::user("describe", vec!["AAAA".into()]),
            ],
            format: json!({ "type": "object" }),
            tools: vec![ToolDeclaration {
                name: "findNearbyDoctors".into(),
                description: "Find centers".into(),
                parameters: json!({ "type": "object" }),
            }],
        };
        let body = OllamaChatRequest::from_model_request("gemma3:4b", &request, GenerationOptions::default());
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["stream"], false);
        assert_eq!(value["format"]["type"], "object");
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], "findNearbyDoctors");
        assert_eq!(value["messages"][1]["images"][0], "AAAA");
        assert!(value["messages"][0].get("images").is_none());
    }

    #[test]
    fn chat_request_omits_empty_tools() {
        let request = ModelRequest {
            messages: vec![ModelMessage::user("hi", Vec::new())],
            format: json!({ "type": "object" }),
            tools: Vec::new(),
        };
        let body = OllamaChatRequest::from_model_request("gemma3:4b", &request, GenerationOptions::default());
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn tool_result_message_carries_tool_name() {
        let message = OllamaMessage::from(&ModelMessage::tool_result("findNearbyDoctors", "{}"));
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["tool_name"], "findNearbyDoctors");
    }

    #[test]
    fn response_with_tool_calls_maps_to_reply() {
        let response: OllamaChatResponse = serde_json::from_value(json!({
            "model": "gemma3:4b",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{
                    "function": {
                        "name": "findNearbyDoctors",
                        "arguments": { "specialty": "Cardiology", "location": "12.9,77.6" }
                    }
                }]
            },
            "done": true
        }))
        .unwrap();

        let reply = ModelReply::from(response);
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].name, "findNearbyDoctors");
        assert_eq!(reply.tool_calls[0].arguments["specialty"], "Cardiology");
    }

    #[test]
    fn response_without_tool_calls() {
        let response: OllamaChatResponse = serde_json::from_value(json!({
            "message": { "role": "assistant", "content": "{\"report\":\"ok\"}" },
            "done": true
        }))
        .unwrap();
        let reply = ModelReply::from(response);
        assert!(reply.tool_calls.is_empty());
        assert_eq!(reply.content, "{\"report\":\"ok\"}");
    }

    #[test]
    fn ollama_error_becomes_transport_failure() {
        let err: FlowError = OllamaError::Timeout(30).into();
        assert!(matches!(err, FlowError::Transport(msg) if msg.contains("30")));
    }
}
