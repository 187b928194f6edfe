//! Shared state and request/response bodies for the HTTP API.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::actions::Actions;
use crate::pipeline::flows::{DiagnosisResult, ReportContext, RiskLevel};
use crate::report::ReportFormat;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub actions: Actions,
    /// Where downloaded reports are archived.
    pub export_dir: PathBuf,
    /// Model name reported by the health check.
    pub model: String,
}

impl ApiContext {
    pub fn new(actions: Actions, export_dir: PathBuf, model: &str) -> Self {
        Self {
            actions,
            export_dir,
            model: model.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisBody {
    pub symptoms: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Diagnosis plus what the client needs for the follow-up report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResponse {
    #[serde(flatten)]
    pub result: DiagnosisResult,
    pub risk_level: RiskLevel,
    pub report_context: ReportContext,
    pub disclaimer: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBody {
    #[serde(flatten)]
    pub context: ReportContext,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDownloadBody {
    pub report: String,
    #[serde(default)]
    pub context: Option<ReportContext>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub format: Option<ReportFormat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysisBody {
    pub photo_data_uri: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Serialize)]
pub struct LanguageOption {
    pub tag: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub default: &'static str,
    pub languages: Vec<LanguageOption>,
}
