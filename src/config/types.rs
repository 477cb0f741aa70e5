//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::narrative::{DEFAULT_ATTRIBUTION_WINDOW, DEFAULT_MAX_INPUT_CHARS};
use crate::domain::quality::DEFAULT_READABILITY_CHUNK_SIZE;
use crate::domain::voice::DEFAULT_MAX_SHARED_GENDER_AGE;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 语音合成配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// 流水线配置
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// 质量分析配置
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5060
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 语音合成提供方
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    /// 本地确定性合成
    #[default]
    Local,
    /// 托管 TTS HTTP 服务
    Http,
}

impl TtsProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Http => "http",
        }
    }
}

/// 语音合成配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    #[serde(default)]
    pub provider: TtsProvider,

    /// TTS 服务基础 URL（provider = http）
    #[serde(default = "default_tts_url")]
    pub url: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,

    /// 最大重试次数
    #[serde(default)]
    pub max_retries: u32,

    /// 本地合成采样率（Hz）
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_tts_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_tts_timeout() -> u64 {
    120
}

fn default_sample_rate() -> u32 {
    22050
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: TtsProvider::default(),
            url: default_tts_url(),
            timeout_secs: default_tts_timeout(),
            max_retries: 0,
            sample_rate: default_sample_rate(),
        }
    }
}

/// 流水线配置
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// 引号与归属动词之间的最大字符距离
    #[serde(default = "default_attribution_window")]
    pub attribution_window: usize,

    /// 单次输入的最大字符数
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    /// 合并时分段之间的静音（毫秒）
    #[serde(default = "default_segment_gap")]
    pub segment_gap_ms: u64,

    /// 同一 (性别, 年龄) 组合允许的最多角色数
    #[serde(default = "default_max_shared_gender_age")]
    pub max_shared_gender_age: usize,

    /// 建议的状态轮询间隔（毫秒）
    #[serde(default = "default_status_poll_interval")]
    pub status_poll_interval_ms: u64,
}

fn default_attribution_window() -> usize {
    DEFAULT_ATTRIBUTION_WINDOW
}

fn default_max_input_chars() -> usize {
    DEFAULT_MAX_INPUT_CHARS
}

fn default_segment_gap() -> u64 {
    250
}

fn default_max_shared_gender_age() -> usize {
    DEFAULT_MAX_SHARED_GENDER_AGE
}

fn default_status_poll_interval() -> u64 {
    500
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            attribution_window: default_attribution_window(),
            max_input_chars: default_max_input_chars(),
            segment_gap_ms: default_segment_gap(),
            max_shared_gender_age: default_max_shared_gender_age(),
            status_poll_interval_ms: default_status_poll_interval(),
        }
    }
}

/// 质量分析配置
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// 外部词表文件，缺省使用内置词表
    #[serde(default)]
    pub tables_path: Option<PathBuf>,

    /// 每个可读性分块包含的段落数
    #[serde(default = "default_readability_chunk_size")]
    pub readability_chunk_size: usize,

    /// 覆盖词表中的长句阈值
    #[serde(default)]
    pub long_sentence_chars: Option<usize>,
}

fn default_readability_chunk_size() -> usize {
    DEFAULT_READABILITY_CHUNK_SIZE
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tables_path: None,
            readability_chunk_size: default_readability_chunk_size(),
            long_sentence_chars: None,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl LogConfig {
    /// 默认的 EnvFilter 指令
    pub fn filter_directive(&self) -> String {
        format!("{},voxtale={},tower_http=debug", self.level, self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5060);
        assert_eq!(config.tts.provider, TtsProvider::Local);
        assert_eq!(config.tts.url, "http://localhost:8000");
        assert_eq!(config.pipeline.attribution_window, 50);
        assert_eq!(config.pipeline.max_shared_gender_age, 2);
        assert_eq!(config.analysis.readability_chunk_size, 1);
        assert!(config.analysis.tables_path.is_none());
    }

    #[test]
    fn test_server_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:5060");
    }

    #[test]
    fn test_log_filter_directive() {
        let config = LogConfig {
            level: "debug".to_string(),
            json: false,
        };
        assert_eq!(
            config.filter_directive(),
            "debug,voxtale=debug,tower_http=debug"
        );
    }

    #[test]
    fn test_partial_sections_from_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [tts]
            provider = "http"
            url = "http://tts:9000"

            [pipeline]
            attribution_window = 80
            "#,
        )
        .unwrap();
        assert_eq!(config.tts.provider, TtsProvider::Http);
        assert_eq!(config.tts.timeout_secs, 120);
        assert_eq!(config.pipeline.attribution_window, 80);
        assert_eq!(config.pipeline.segment_gap_ms, 250);
        assert_eq!(config.log.level, "info");
    }
}
