use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::FlowError;

// ──────────────────────────────────────────────
// Flow inputs and outputs (camelCase on the wire)
// ──────────────────────────────────────────────

/// A patient's symptom submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisRequest {
    pub symptoms: String,
    pub language: String,
    /// Coarse "lat,long" position, if the patient shared one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// What the model itself returns for a diagnosis (no health centers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisAssessment {
    pub diagnosis: String,
    pub confidence_level: f64,
    pub urgency_alert: String,
    pub suggested_medicines: String,
    pub suggested_doctors: String,
}

/// Preliminary diagnosis returned to the caller.
///
/// `nearby_health_centers` only ever holds entries the tool bridge returned
/// during this generation, and only when a location was supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResult {
    pub diagnosis: String,
    pub confidence_level: f64,
    pub urgency_alert: String,
    pub suggested_medicines: String,
    pub suggested_doctors: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearby_health_centers: Option<Vec<HealthCenter>>,
}

impl DiagnosisResult {
    pub fn from_assessment(
        assessment: DiagnosisAssessment,
        nearby_health_centers: Option<Vec<HealthCenter>>,
    ) -> Self {
        Self {
            diagnosis: assessment.diagnosis,
            confidence_level: assessment.confidence_level,
            urgency_alert: assessment.urgency_alert,
            suggested_medicines: assessment.suggested_medicines,
            suggested_doctors: assessment.suggested_doctors,
            nearby_health_centers,
        }
    }
}

/// Client-computed triage category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: &'static [&'static str] = &["Low", "Medium", "High"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a report needs except the language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportContext {
    pub symptoms: String,
    pub diagnosis: String,
    pub risk_level: RiskLevel,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(flatten)]
    pub context: ReportContext,
    pub language: String,
}

impl ReportRequest {
    pub fn new(context: ReportContext, language: &str) -> Self {
        Self {
            context,
            language: language.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResult {
    pub report: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysisRequest {
    /// `data:<mime>;base64,<payload>`
    pub photo_data_uri: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysisResult {
    pub analysis: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCenter {
    pub name: String,
    pub address: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
}

// ──────────────────────────────────────────────
// Tool contract: findNearbyDoctors
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindNearbyDoctorsInput {
    pub specialty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindNearbyDoctorsOutput {
    pub health_centers: Vec<HealthCenter>,
}

// ──────────────────────────────────────────────
// Model boundary
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A model-initiated request to run a registered capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelMessage {
    pub role: ModelRole,
    pub content: String,
    /// Base64 image payloads (no data-URI prefix).
    pub images: Vec<String>,
    /// Tool calls made by the assistant in this turn.
    pub tool_calls: Vec<ToolCall>,
    /// For `Tool` messages: which capability produced the content.
    pub tool_name: Option<String>,
}

impl ModelMessage {
    fn plain(role: ModelRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: Vec::new(),
            tool_calls: Vec::new(),
            tool_name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(ModelRole::System, content)
    }

    pub fn user(content: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            images,
            ..Self::plain(ModelRole::User, content)
        }
    }

    pub fn assistant_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::plain(ModelRole::Assistant, content)
        }
    }

    pub fn tool_result(tool_name: &str, content: impl Into<String>) -> Self {
        Self {
            tool_name: Some(tool_name.to_string()),
            ..Self::plain(ModelRole::Tool, content)
        }
    }
}

/// Declaration of an invocable capability, as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments.
    pub parameters: Value,
}

/// One round-trip to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub messages: Vec<ModelMessage>,
    /// JSON Schema the final answer must conform to.
    pub format: Value,
    pub tools: Vec<ToolDeclaration>,
}

/// The model's reply: either tool calls to run, or final content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelReply {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl ModelReply {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_call(name: &str, arguments: Value) -> Self {
        Self {
            content: String::new(),
            tool_calls: vec![ToolCall {
                name: name.to_string(),
                arguments,
            }],
        }
    }
}

/// Generative model abstraction (allows mocking).
pub trait ChatModel {
    fn chat(&self, request: &ModelRequest) -> Result<ModelReply, FlowError>;
}
