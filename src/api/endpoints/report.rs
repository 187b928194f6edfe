use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ReportBody, ReportDownloadBody};
use crate::config::normalize_language;
use crate::pipeline::flows::ReportResult;
use crate::report::{HealthReportDocument, ReportExportError, ReportFormat};

/// `POST /api/report`: health report for an earlier diagnosis.
pub async fn generate(
    State(ctx): State<ApiContext>,
    payload: Result<Json<ReportBody>, JsonRejection>,
) -> Result<Json<ReportResult>, ApiError> {
    let Json(body) = payload?;
    let result = ctx.actions.request_report(body.context, &body.language).await?;
    Ok(Json(result))
}

/// `POST /api/report/pdf`: render a report for download and archive a copy
/// in the export directory. `format: "text"` returns plain text instead.
/// Without an explicit format, reports the PDF fonts cannot draw come back
/// as text; an explicit `"pdf"` for such a report is a 400.
pub async fn download(
    State(ctx): State<ApiContext>,
    payload: Result<Json<ReportDownloadBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload?;
    if body.report.trim().is_empty() {
        return Err(ApiError::BadRequest("The report is empty".into()));
    }

    let document = HealthReportDocument::new(
        ReportResult { report: body.report },
        body.context,
        &normalize_language(&body.language),
    );
    let format = match body.format {
        Some(format) => format,
        None if document.pdf_compatible() => ReportFormat::Pdf,
        None => {
            tracing::info!(language = %document.language, "Report script not covered by PDF fonts, sending text");
            ReportFormat::Text
        }
    };
    if format == ReportFormat::Pdf && !document.pdf_compatible() {
        return Err(ReportExportError::UnsupportedScript {
            language: document.language.clone(),
        }
        .into());
    }
    let filename = document.filename(format);
    let export_dir = ctx.export_dir.clone();

    let bytes = tokio::task::spawn_blocking(move || {
        let bytes = document.render(format)?;
        if let Err(e) = document.save_rendered(&export_dir, format, &bytes) {
            tracing::warn!(error = %e, "Could not archive report copy");
        }
        Ok::<_, ReportExportError>(bytes)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("report task failed: {e}")))??;

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
