//! Ping Handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::infrastructure::http::state::AppState;

/// Ping 响应
#[derive(Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// 语音合成提供方
    pub provider: &'static str,
    pub busy: bool,
}

/// Ping endpoint - 健康检查
pub async fn ping(State(state): State<Arc<AppState>>) -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.orchestrator.synthesizer().name(),
        busy: state.orchestrator.is_busy(),
    })
}
