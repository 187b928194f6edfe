//! Consultation chat session.
//!
//! An ordered queue of typed messages plus an idle/pending status. The
//! session never talks to the model directly; it hands work to `Actions`
//! and records the outcome. One submission at a time: while pending, new
//! submissions are refused.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::actions::{report_context, ActionError, Actions};
use crate::config::normalize_language;
use crate::pipeline::flows::{DiagnosisResult, HealthCenter, ReportContext, ReportResult, RiskLevel};

pub const WELCOME_MESSAGE: &str = "Welcome to Seva Health AI. I'm here to help you with a preliminary \
     health assessment. Please describe your symptoms in detail.";
pub const THINKING_PLACEHOLDER: &str = "Thinking...";
pub const GENERATING_REPORT: &str = "Generating your health report...";
pub const REPORT_OFFER: &str = "Would you like a detailed health report?";
pub const SEEK_ATTENTION: &str = "Please seek medical attention. Here are some nearby centers:";
pub const SEEK_ATTENTION_NO_CENTERS: &str =
    "Please seek medical attention promptly. Share your location to see nearby centers.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// What a message carries. The UI renders each kind differently.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessageBody {
    Text { text: String },
    #[serde(rename_all = "camelCase")]
    Diagnosis {
        result: DiagnosisResult,
        risk_level: RiskLevel,
    },
    ReportOffer { text: String },
    HealthCenters { text: String, centers: Vec<HealthCenter> },
    Report { report: String },
}

impl MessageBody {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Plain-text rendering, for transcripts and logs of message kinds.
    pub fn to_plain_text(&self) -> String {
        match self {
            Self::Text { text } | Self::ReportOffer { text } => text.clone(),
            Self::Diagnosis { result, .. } => format!(
                "Preliminary Diagnosis:\nCondition: {}\nConfidence: {:.0}%\n{}",
                result.diagnosis,
                result.confidence_level * 100.0,
                result.urgency_alert
            ),
            Self::HealthCenters { text, centers } => {
                let mut out = text.clone();
                for center in centers {
                    out.push_str(&format!("\n- {} ({}, {})", center.name, center.address, center.phone));
                }
                out
            }
            Self::Report { report } => format!("Your Health Report\n{report}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub body: MessageBody,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: MessageRole, body: MessageBody) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            body,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Please wait for the current request to finish")]
    Busy,

    #[error("Describe your symptoms first to get a health report")]
    NoReportContext,
}

pub struct ChatSession {
    id: Uuid,
    language: String,
    location: Option<String>,
    messages: Vec<ChatMessage>,
    status: SessionStatus,
    report_context: Option<ReportContext>,
    /// Symptom text of the in-flight submission.
    pending_symptoms: Option<String>,
    /// Id of the transient "Generating..." message while a report is pending.
    generating_message: Option<Uuid>,
}

impl ChatSession {
    pub fn new(language: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            language: normalize_language(language),
            location: None,
            messages: vec![ChatMessage::new(MessageRole::Assistant, MessageBody::text(WELCOME_MESSAGE))],
            status: SessionStatus::Idle,
            report_context: None,
            pending_symptoms: None,
            generating_message: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn set_language(&mut self, language: &str) {
        self.language = normalize_language(language);
    }

    /// Coarse "lat,long" sent with later submissions. Blank clears it.
    pub fn set_location(&mut self, location: Option<&str>) {
        self.location = location
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == SessionStatus::Pending
    }

    /// Context for the report offer of the latest diagnosis, if any.
    pub fn report_context(&self) -> Option<&ReportContext> {
        self.report_context.as_ref()
    }

    /// Placeholder shown after the last message while a request is in flight.
    pub fn placeholder(&self) -> Option<&'static str> {
        self.is_pending().then_some(THINKING_PLACEHOLDER)
    }

    /// Title from the first user message, at most 50 characters plus "...".
    pub fn title(&self) -> String {
        let first = self.messages.iter().find_map(|m| match (&m.role, &m.body) {
            (MessageRole::User, MessageBody::Text { text }) => Some(text.trim()),
            _ => None,
        });
        let Some(trimmed) = first.filter(|t| !t.is_empty()) else {
            return "New consultation".to_string();
        };

        let boundary = trimmed
            .char_indices()
            .take_while(|(i, _)| *i < 50)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(trimmed.len());

        if boundary >= trimmed.len() {
            trimmed.to_string()
        } else {
            format!("{}...", &trimmed[..boundary])
        }
    }

    fn push(&mut self, role: MessageRole, body: MessageBody) -> Uuid {
        let message = ChatMessage::new(role, body);
        let id = message.id;
        self.messages.push(message);
        id
    }

    // ── Symptom submission ───────────────────────

    /// Record the user's message and mark the session pending.
    /// Any earlier report offer is withdrawn.
    pub fn begin_submission(&mut self, symptoms: &str) -> Result<(), SessionError> {
        if self.is_pending() {
            return Err(SessionError::Busy);
        }
        self.push(MessageRole::User, MessageBody::text(symptoms));
        self.report_context = None;
        self.pending_symptoms = Some(symptoms.to_string());
        self.status = SessionStatus::Pending;
        Ok(())
    }

    /// Record the outcome of the submission started by `begin_submission`.
    pub fn complete_submission(&mut self, outcome: Result<DiagnosisResult, ActionError>) {
        let symptoms = self.pending_symptoms.take().unwrap_or_default();
        self.status = SessionStatus::Idle;

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                self.push(MessageRole::Assistant, MessageBody::text(format!("Error: {e}")));
                return;
            }
        };

        let context = report_context(&symptoms, &result);
        let risk_level = context.risk_level;
        let centers = result.nearby_health_centers.clone().unwrap_or_default();

        self.push(MessageRole::Assistant, MessageBody::Diagnosis { result, risk_level });
        self.push(
            MessageRole::Assistant,
            MessageBody::ReportOffer {
                text: REPORT_OFFER.to_string(),
            },
        );
        if risk_level == RiskLevel::High {
            let body = if centers.is_empty() {
                MessageBody::text(SEEK_ATTENTION_NO_CENTERS)
            } else {
                MessageBody::HealthCenters {
                    text: SEEK_ATTENTION.to_string(),
                    centers,
                }
            };
            self.push(MessageRole::Assistant, body);
        }
        self.report_context = Some(context);
    }

    /// Submit symptoms through `actions` and record the result.
    pub async fn submit(&mut self, actions: &Actions, symptoms: &str) -> Result<(), SessionError> {
        self.begin_submission(symptoms)?;
        let outcome = actions
            .submit_symptoms(symptoms, &self.language, self.location.as_deref())
            .await;
        self.complete_submission(outcome);
        Ok(())
    }

    // ── Report generation ────────────────────────

    /// Post the transient "Generating..." message and hand back the context to send.
    pub fn begin_report(&mut self) -> Result<ReportContext, SessionError> {
        if self.is_pending() {
            return Err(SessionError::Busy);
        }
        let context = self.report_context.clone().ok_or(SessionError::NoReportContext)?;
        self.generating_message = Some(self.push(MessageRole::System, MessageBody::text(GENERATING_REPORT)));
        self.status = SessionStatus::Pending;
        Ok(context)
    }

    pub fn complete_report(&mut self, outcome: Result<ReportResult, ActionError>) {
        if let Some(id) = self.generating_message.take() {
            self.messages.retain(|m| m.id != id);
        }
        self.status = SessionStatus::Idle;

        let body = match outcome {
            Ok(result) => MessageBody::Report { report: result.report },
            Err(e) => MessageBody::text(format!("Error generating report: {e}")),
        };
        self.push(MessageRole::Assistant, body);
    }

    pub async fn generate_report(&mut self, actions: &Actions) -> Result<(), SessionError> {
        let context = self.begin_report()?;
        let outcome = actions.request_report(context, &self.language).await;
        self.complete_report(outcome);
        Ok(())
    }

    /// Plain-text transcript of the conversation.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| {
                let who = match m.role {
                    MessageRole::User => "You",
                    MessageRole::Assistant => "Seva Health AI",
                    MessageRole::System => "System",
                };
                format!("[{}] {who}: {}", m.created_at.format("%H:%M"), m.body.to_plain_text())
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
