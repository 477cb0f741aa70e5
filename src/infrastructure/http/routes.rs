//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                GET   健康检查
//! - /api/story/process       POST  开始处理（后台执行，轮询 status）
//! - /api/story/status        GET   当前状态与最近一次输出
//! - /api/story/cancel        POST  取消当前处理
//! - /api/story/audio         GET   最近一次完成输出的音频
//! - /api/story/segments      POST  仅分段
//! - /api/story/characters    POST  角色表与音色预览
//! - /api/quality/report      POST  写作质量报告

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/api", api_routes())
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/story", story_routes())
        .route("/quality/report", post(handlers::quality_report))
}

/// Story 路由
fn story_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/process", post(handlers::process_story))
        .route("/status", get(handlers::story_status))
        .route("/cancel", post(handlers::cancel_story))
        .route("/audio", get(handlers::story_audio))
        .route("/segments", post(handlers::story_segments))
        .route("/characters", post(handlers::story_characters))
}
