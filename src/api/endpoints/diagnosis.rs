use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::actions::{report_context, MEDICAL_DISCLAIMER};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, DiagnosisBody, DiagnosisResponse};

/// `POST /api/diagnosis`: preliminary diagnosis from free-text symptoms.
pub async fn submit(
    State(ctx): State<ApiContext>,
    payload: Result<Json<DiagnosisBody>, JsonRejection>,
) -> Result<Json<DiagnosisResponse>, ApiError> {
    let Json(body) = payload?;

    let result = ctx
        .actions
        .submit_symptoms(&body.symptoms, &body.language, body.location.as_deref())
        .await?;

    let context = report_context(body.symptoms.trim(), &result);
    Ok(Json(DiagnosisResponse {
        risk_level: context.risk_level,
        report_context: context,
        result,
        disclaimer: MEDICAL_DISCLAIMER,
    }))
}
