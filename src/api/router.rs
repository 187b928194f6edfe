//! HTTP API router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//! Layers: CORS, request tracing, and a body limit sized for image uploads.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Headroom for the JSON envelope around a base64 image.
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// Largest request body accepted: a maximum-size image, base64-encoded, plus envelope.
pub fn body_limit(max_image_bytes: usize) -> usize {
    max_image_bytes
        .div_ceil(3)
        .saturating_mul(4)
        .saturating_add(BODY_OVERHEAD_BYTES)
}

pub fn api_router(ctx: ApiContext) -> Router {
    let limit = body_limit(ctx.actions.max_image_bytes());

    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/languages", get(endpoints::health::languages))
        .route("/diagnosis", post(endpoints::diagnosis::submit))
        .route("/report", post(endpoints::report::generate))
        .route("/report/pdf", post(endpoints::report::download))
        .route("/image-analysis", post(endpoints::image::analyze))
        .with_state(ctx);

    Router::new()
        .nest("/api", routes)
        .layer(DefaultBodyLimit::max(limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::actions::Actions;
    use crate::directory::StaticHealthCenterDirectory;
    use crate::pipeline::flows::ollama::MockChatModel;
    use crate::pipeline::flows::{CapabilityTable, FlowExecutor, ModelReply, FIND_NEARBY_DOCTORS};

    const DIAGNOSIS_JSON: &str = r#"{
        "diagnosis": "Possible angina",
        "confidenceLevel": 0.95,
        "urgencyAlert": "Seek a doctor immediately",
        "suggestedMedicines": "Aspirin",
        "suggestedDoctors": "Cardiologist"
    }"#;

    fn app_with(mock: Arc<MockChatModel>, export_dir: &std::path::Path) -> Router {
        let directory = Arc::new(StaticHealthCenterDirectory::with_default_centers());
        let executor = FlowExecutor::new(mock, CapabilityTable::diagnostic(directory));
        let actions = Actions::new(Arc::new(executor), Duration::from_secs(5), 1024);
        api_router(ApiContext::new(actions, export_dir.to_path_buf(), "gemma3:4b"))
    }

    fn app(mock: Arc<MockChatModel>) -> Router {
        app_with(mock, &std::env::temp_dir().join("seva-health-test-reports"))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn response_json(response: axum::http::Response<Body>) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 65536).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn body_limit_covers_encoded_image() {
        assert_eq!(body_limit(3), 4 + BODY_OVERHEAD_BYTES);
        assert!(body_limit(5 * 1024 * 1024) > 5 * 1024 * 1024 * 4 / 3);
        assert_eq!(body_limit(usize::MAX), usize::MAX);
    }

    #[tokio::test]
    async fn health_check() {
        let response = app(Arc::new(MockChatModel::answering("{}")))
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["model"], "gemma3:4b");
    }

    #[tokio::test]
    async fn languages_lists_six() {
        let response = app(Arc::new(MockChatModel::answering("{}")))
            .oneshot(Request::get("/api/languages").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["default"], "english");
        assert_eq!(json["languages"].as_array().unwrap().len(), 6);
        assert_eq!(json["languages"][1]["tag"], "hindi");
    }

    #[tokio::test]
    async fn diagnosis_returns_result_with_risk_and_context() {
        let mock = Arc::new(MockChatModel::new(vec![
            ModelReply::tool_call(
                FIND_NEARBY_DOCTORS,
                json!({ "specialty": "Cardiology", "location": "12.9,77.6" }),
            ),
            ModelReply::content(DIAGNOSIS_JSON),
        ]));
        let response = app(mock)
            .oneshot(post_json(
                "/api/diagnosis",
                json!({
                    "symptoms": "Crushing chest pain spreading to my left arm",
                    "language": "english",
                    "location": "12.9,77.6"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["confidenceLevel"], 0.95);
        assert_eq!(json["riskLevel"], "High");
        assert_eq!(json["reportContext"]["recommendation"], "Seek a doctor immediately");
        assert_eq!(json["nearbyHealthCenters"].as_array().unwrap().len(), 2);
        assert!(json["disclaimer"].as_str().unwrap().contains("not a medical diagnosis"));
    }

    #[tokio::test]
    async fn short_symptoms_return_400() {
        let mock = Arc::new(MockChatModel::answering(DIAGNOSIS_JSON));
        let response = app(mock.clone())
            .oneshot(post_json("/api/diagnosis", json!({ "symptoms": "ouch" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Please describe your symptoms in more detail.");
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_json_returns_400_error_shape() {
        let response = app(Arc::new(MockChatModel::answering("{}")))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/diagnosis")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn model_failure_returns_502() {
        let response = app(Arc::new(MockChatModel::failing("connection refused")))
            .oneshot(post_json(
                "/api/diagnosis",
                json!({ "symptoms": "I have had a persistent cough and fever for three days" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = response_json(response).await;
        assert_eq!(
            json["error"],
            "There was an error processing your request. Please try again."
        );
    }

    #[tokio::test]
    async fn report_endpoint() {
        let mock = Arc::new(MockChatModel::answering(r#"{"report": "Your symptoms suggest angina."}"#));
        let response = app(mock)
            .oneshot(post_json(
                "/api/report",
                json!({
                    "symptoms": "Chest pain",
                    "diagnosis": "Possible angina",
                    "riskLevel": "High",
                    "recommendation": "Seek a doctor immediately",
                    "language": "english"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await["report"], "Your symptoms suggest angina.");
    }

    #[tokio::test]
    async fn report_with_unknown_risk_level_is_400() {
        let mock = Arc::new(MockChatModel::answering(r#"{"report": "x"}"#));
        let response = app(mock.clone())
            .oneshot(post_json(
                "/api/report",
                json!({
                    "symptoms": "Chest pain",
                    "diagnosis": "Possible angina",
                    "riskLevel": "Extreme",
                    "recommendation": "Seek a doctor immediately"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn report_pdf_download_is_archived() {
        let dir = tempfile::tempdir().unwrap();
        let response = app_with(Arc::new(MockChatModel::answering("{}")), dir.path())
            .oneshot(post_json(
                "/api/report/pdf",
                json!({ "report": "Your symptoms suggest angina.", "language": "english" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains(".pdf"));

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[0..4], b"%PDF");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn hindi_report_download_falls_back_to_text() {
        let dir = tempfile::tempdir().unwrap();
        let response = app_with(Arc::new(MockChatModel::answering("{}")), dir.path())
            .oneshot(post_json(
                "/api/report/pdf",
                json!({ "report": "खांसी और बुखार तीन दिनों से", "language": "hindi" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains(".txt"));

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("खांसी और बुखार तीन दिनों से"));
    }

    #[tokio::test]
    async fn hindi_report_explicit_pdf_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let response = app_with(Arc::new(MockChatModel::answering("{}")), dir.path())
            .oneshot(post_json(
                "/api/report/pdf",
                json!({ "report": "खांसी और बुखार", "language": "hindi", "format": "pdf" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_report_download_is_400() {
        let response = app(Arc::new(MockChatModel::answering("{}")))
            .oneshot(post_json("/api/report/pdf", json!({ "report": "  " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn image_analysis_endpoint() {
        let mock = Arc::new(MockChatModel::answering(r#"{"analysis": "A clear chest X-ray."}"#));
        let uri = format!("data:image/png;base64,{}", STANDARD.encode([1u8, 2, 3, 4]));
        let response = app(mock)
            .oneshot(post_json(
                "/api/image-analysis",
                json!({ "photoDataUri": uri, "language": "english" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await["analysis"], "A clear chest X-ray.");
    }

    #[tokio::test]
    async fn image_of_wrong_type_is_400() {
        let mock = Arc::new(MockChatModel::answering(r#"{"analysis": "x"}"#));
        let uri = format!("data:application/pdf;base64,{}", STANDARD.encode(b"%PDF-1.4"));
        let response = app(mock.clone())
            .oneshot(post_json("/api/image-analysis", json!({ "photoDataUri": uri })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let mock = Arc::new(MockChatModel::answering(r#"{"analysis": "x"}"#));
        let uri = format!("data:image/png;base64,{}", STANDARD.encode(vec![0u8; 200 * 1024]));
        let response = app(mock.clone())
            .oneshot(post_json("/api/image-analysis", json!({ "photoDataUri": uri })))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let response = app(Arc::new(MockChatModel::answering("{}")))
            .oneshot(Request::get("/api/nonexistent").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
