//! Story Handlers
//!
//! 处理请求在接受后立即返回，流水线在后台任务中执行，
//! 客户端通过 status 轮询进度，完成后通过 audio 取回音频。

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::{ApplicationError, AudioOutput, ProcessOptions, ProcessingStatus};
use crate::domain::narrative::{Character, TextSegment};
use crate::domain::voice::VoiceAssignment;
use crate::infrastructure::http::dto::{ApiResponse, Empty, TextRequest};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ProcessStoryRequest {
    pub text: String,
    #[serde(default)]
    pub options: ProcessOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessAcceptedResponse {
    pub run_id: u64,
    pub status_poll_interval_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse<'a> {
    pub status: ProcessingStatus,
    pub busy: bool,
    /// 最近一次完成的输出（不含音频字节）
    pub result: Option<&'a AudioOutput>,
}

#[derive(Debug, Serialize)]
pub struct SegmentsResponse {
    pub total: usize,
    pub segments: Vec<TextSegment>,
}

#[derive(Debug, Serialize)]
pub struct CharactersResponse {
    pub characters: Vec<Character>,
    pub assignments: Vec<VoiceAssignment>,
}

// ============================================================================
// Handlers
// ============================================================================

/// 接受一次故事处理
pub async fn process_story(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProcessStoryRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ProcessAcceptedResponse>>, ApiError> {
    let Json(req) = payload?;
    let ticket = state.orchestrator.begin(&req.text, req.options)?;
    let run_id = ticket.run_id();

    let worker = state.clone();
    tokio::spawn(async move {
        match worker.orchestrator.run(ticket).await {
            Ok(output) => worker.store_output(output).await,
            Err(e) if e.is_cancelled() => {
                tracing::debug!(run_id, "Background run ended by cancellation");
            }
            // 失败已由编排器记录并写入状态
            Err(_) => {}
        }
    });

    Ok(Json(ApiResponse::success(ProcessAcceptedResponse {
        run_id,
        status_poll_interval_ms: state.status_poll_interval_ms,
    })))
}

/// 当前处理状态
pub async fn story_status(State(state): State<Arc<AppState>>) -> Response {
    let last = state.last_output().await;
    let body = StatusResponse {
        status: state.orchestrator.status(),
        busy: state.orchestrator.is_busy(),
        result: last.as_deref(),
    };
    Json(ApiResponse::success(body)).into_response()
}

/// 取消当前处理
pub async fn cancel_story(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state.orchestrator.cancel()?;
    Ok(Json(ApiResponse::ok()))
}

/// 最近一次完成输出的音频字节
pub async fn story_audio(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let output = state
        .last_output()
        .await
        .ok_or_else(|| ApiError::NotFound("No completed audio available".to_string()))?;

    let disposition = format!(
        "inline; filename=\"story.{}\"",
        output.format.extension()
    );
    Ok((
        [
            (header::CONTENT_TYPE, output.format.mime_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        output.audio.clone(),
    )
        .into_response())
}

/// 仅分段
pub async fn story_segments(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<SegmentsResponse>>, ApiError> {
    let Json(req) = payload?;
    let segments = state
        .segmenter
        .parse(&req.text)
        .map_err(ApplicationError::from)?;

    Ok(Json(ApiResponse::success(SegmentsResponse {
        total: segments.len(),
        segments,
    })))
}

/// 角色表与音色预览
pub async fn story_characters(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<CharactersResponse>>, ApiError> {
    let Json(req) = payload?;
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest("Story text is empty".to_string()));
    }

    let segments = state
        .segmenter
        .parse(&req.text)
        .map_err(ApplicationError::from)?;
    let characters = state.extractor.detect(&segments);
    let assignments = state
        .assigner
        .assign(&characters)
        .map_err(ApplicationError::from)?;

    Ok(Json(ApiResponse::success(CharactersResponse {
        characters,
        assignments,
    })))
}
