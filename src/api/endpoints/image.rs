use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ImageAnalysisBody};
use crate::pipeline::flows::ImageAnalysisResult;

/// `POST /api/image-analysis`: plain-language explanation of a medical image.
pub async fn analyze(
    State(ctx): State<ApiContext>,
    payload: Result<Json<ImageAnalysisBody>, JsonRejection>,
) -> Result<Json<ImageAnalysisResult>, ApiError> {
    let Json(body) = payload?;
    let result = ctx
        .actions
        .analyze_image(&body.photo_data_uri, &body.language)
        .await?;
    Ok(Json(result))
}
