//! Voxtale - 多角色有声故事
//!
//! 将一篇带对话的故事拆分为旁白 / 对话 / 内心独白，识别角色，
//! 为每个角色分配确定性的音色，逐段合成并合并音频，附带写作质量报告。
//!
//! 领域层 (domain/):
//! - narrative: 分段、说话人解析、角色表
//! - voice: 音色分配与校验
//! - quality: 写作质量分析
//! - tables: 版本化的规则表
//!
//! 应用层 (application/):
//! - pipeline: 带进度与协作式取消的流水线编排
//! - ports: 语音合成端口
//!
//! 基础设施层 (infrastructure/):
//! - adapters: 本地合成器、HTTP TTS 客户端、音频处理
//! - http: RESTful API

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
