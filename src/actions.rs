//! Caller-facing actions: the boundary between the UI/HTTP layer and the flows.
//!
//! Each action validates what it can up front, runs its flow on the blocking
//! pool under a timeout, and turns every failure into a short user-facing
//! message. Internal detail is logged, never returned.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{normalize_language, AppConfig};
use crate::directory::HealthCenterDirectory;
use crate::pipeline::flows::contracts::MIN_SYMPTOM_CHARS;
use crate::pipeline::flows::media::validate_image_data_uri;
use crate::pipeline::flows::{
    CapabilityTable, ChatModel, DiagnosisRequest, DiagnosisResult, Flow, FlowError, FlowExecutor,
    HealthReportFlow, ImageAnalysisFlow, ImageAnalysisRequest, ImageAnalysisResult,
    PreliminaryDiagnosisFlow, ReportContext, ReportRequest, ReportResult, RiskLevel,
};

pub const SYMPTOMS_TOO_SHORT: &str = "Please describe your symptoms in more detail.";

pub const MEDICAL_DISCLAIMER: &str = "This is a preliminary AI assessment, not a medical diagnosis. \
     Always consult a qualified healthcare professional.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Diagnosis,
    Report,
    ImageAnalysis,
}

impl Operation {
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::Diagnosis => "There was an error processing your request. Please try again.",
            Self::Report => "There was an error generating the report. Please try again.",
            Self::ImageAnalysis => "There was an error analyzing the image. Please try again.",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Diagnosis => "diagnosis",
            Self::Report => "report",
            Self::ImageAnalysis => "image_analysis",
        })
    }
}

/// Action failure. `Display` is the text shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// The caller's own input was rejected. No model call was made.
    #[error("{0}")]
    InvalidInput(String),

    #[error("{}", .0.failure_message())]
    Failed(Operation),

    #[error("{}", .0.failure_message())]
    TimedOut(Operation),
}

#[derive(Clone)]
pub struct Actions {
    executor: Arc<FlowExecutor>,
    timeout: Duration,
    max_image_bytes: usize,
}

impl Actions {
    pub fn new(executor: Arc<FlowExecutor>, timeout: Duration, max_image_bytes: usize) -> Self {
        Self {
            executor,
            timeout,
            max_image_bytes,
        }
    }

    /// Wire the flows to `model`, with the diagnosis tools backed by `directory`.
    pub fn from_config(
        model: Arc<dyn ChatModel + Send + Sync>,
        directory: Arc<dyn HealthCenterDirectory + Send + Sync>,
        config: &AppConfig,
    ) -> Self {
        let executor = FlowExecutor::new(model, CapabilityTable::diagnostic(directory));
        Self::new(Arc::new(executor), config.flow_timeout, config.max_image_bytes)
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    /// Validate symptom text and run the preliminary diagnosis.
    pub async fn submit_symptoms(
        &self,
        symptoms: &str,
        language: &str,
        location: Option<&str>,
    ) -> Result<DiagnosisResult, ActionError> {
        let symptoms = symptoms.trim();
        if symptoms.chars().count() < MIN_SYMPTOM_CHARS {
            return Err(ActionError::InvalidInput(SYMPTOMS_TOO_SHORT.to_string()));
        }

        let request = DiagnosisRequest {
            symptoms: symptoms.to_string(),
            language: normalize_language(language),
            location: location
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from),
        };
        tracing::info!(
            symptom_chars = request.symptoms.chars().count(),
            language = %request.language,
            has_location = request.location.is_some(),
            "Symptoms submitted"
        );

        self.run::<PreliminaryDiagnosisFlow>(Operation::Diagnosis, request).await
    }

    pub async fn request_report(
        &self,
        context: ReportContext,
        language: &str,
    ) -> Result<ReportResult, ActionError> {
        let request = ReportRequest::new(context, &normalize_language(language));
        tracing::info!(risk = %request.context.risk_level, language = %request.language, "Report requested");
        self.run::<HealthReportFlow>(Operation::Report, request).await
    }

    /// Check the image (type, encoding, size) before it reaches the model.
    pub async fn analyze_image(
        &self,
        photo_data_uri: &str,
        language: &str,
    ) -> Result<ImageAnalysisResult, ActionError> {
        let size = validate_image_data_uri(photo_data_uri, self.max_image_bytes).map_err(|e| {
            tracing::info!(error = %e, "Image rejected");
            ActionError::InvalidInput(e.to_string())
        })?;
        tracing::info!(image_bytes = size, "Image analysis requested");

        let request = ImageAnalysisRequest {
            photo_data_uri: photo_data_uri.trim().to_string(),
            language: normalize_language(language),
        };
        self.run::<ImageAnalysisFlow>(Operation::ImageAnalysis, request).await
    }

    async fn run<F>(&self, operation: Operation, input: F::Input) -> Result<F::Output, ActionError>
    where
        F: Flow + 'static,
        F::Input: Send + 'static,
        F::Output: Send + 'static,
    {
        let executor = Arc::clone(&self.executor);
        let task = tokio::task::spawn_blocking(move || executor.run::<F>(&input));

        match tokio::time::timeout(self.timeout, task).await {
            Err(_) => {
                tracing::warn!(%operation, timeout_secs = self.timeout.as_secs_f64(), "Action timed out");
                Err(ActionError::TimedOut(operation))
            }
            Ok(Err(join_error)) => {
                tracing::error!(%operation, error = %join_error, "Flow task panicked");
                Err(ActionError::Failed(operation))
            }
            Ok(Ok(Err(FlowError::Validation(e)))) => Err(ActionError::InvalidInput(e.to_string())),
            Ok(Ok(Err(e))) => {
                tracing::error!(%operation, error = %e, "Action failed");
                Err(ActionError::Failed(operation))
            }
            Ok(Ok(Ok(output))) => Ok(output),
        }
    }
}

/// Triage category from a diagnosis: "immediate" in the urgency text wins,
/// then low confidence, else low risk.
pub fn derive_risk_level(confidence_level: f64, urgency_alert: &str) -> RiskLevel {
    if urgency_alert.to_lowercase().contains("immediate") {
        RiskLevel::High
    } else if confidence_level < 0.6 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

pub fn report_context(symptoms: &str, result: &DiagnosisResult) -> ReportContext {
    ReportContext {
        symptoms: symptoms.to_string(),
        diagnosis: result.diagnosis.clone(),
        risk_level: derive_risk_level(result.confidence_level, &result.urgency_alert),
        recommendation: result.urgency_alert.clone(),
    }
}

pub fn build_report_request(symptoms: &str, result: &DiagnosisResult, language: &str) -> ReportRequest {
    ReportRequest::new(report_context(symptoms, result), &normalize_language(language))
}
