use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::{ApiContext, LanguageOption, LanguagesResponse};
use crate::config::{APP_VERSION, DEFAULT_LANGUAGE, SUPPORTED_LANGUAGES};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model: String,
}

/// `GET /api/health`
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: APP_VERSION,
        model: ctx.model.clone(),
    })
}

/// `GET /api/languages`: languages offered in the picker.
pub async fn languages() -> Json<LanguagesResponse> {
    Json(LanguagesResponse {
        default: DEFAULT_LANGUAGE,
        languages: SUPPORTED_LANGUAGES
            .iter()
            .map(|&(tag, label)| LanguageOption { tag, label })
            .collect(),
    })
}
