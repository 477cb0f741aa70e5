//! Quality Handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;

use crate::application::ApplicationError;
use crate::domain::quality::WritingQualityReport;
use crate::infrastructure::http::dto::{ApiResponse, TextRequest};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 生成写作质量报告
pub async fn quality_report(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<WritingQualityReport>>, ApiError> {
    let Json(req) = payload?;
    let report = state
        .analyzer
        .generate_report(&req.text)
        .await
        .map_err(ApplicationError::from)?;
    Ok(Json(ApiResponse::success(report)))
}

#[cfg(test)]
mod tests {
    use crate::infrastructure::http::routes::create_routes;
    use crate::infrastructure::http::state::tests::test_state;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use tower::util::ServiceExt;

    async fn post_report(text: &str) -> serde_json::Value {
        let app = create_routes().with_state(test_state());
        let request = Request::builder()
            .method("POST")
            .uri("/api/quality/report")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::json!({ "text": text }).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_report_endpoint() {
        let json = post_report("She felt sad. The red door stood open under a red sky.").await;
        assert_eq!(json["errno"], 0);
        let report = &json["data"];
        assert_eq!(report["showTellIssues"].as_array().unwrap().len(), 1);
        assert_eq!(report["colorPalette"]["status"], "found");
        assert_eq!(report["colorPalette"]["dominant"][0]["name"], "red");
        assert!(report["warnings"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_report_rejects_blank_text() {
        let json = post_report(" \n ").await;
        assert_eq!(json["errno"], 400);
        assert!(json["data"].is_null());
    }
}
