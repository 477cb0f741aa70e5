//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, TtsProvider};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `VOXTALE_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `VOXTALE_SERVER__PORT=8080`
/// - `VOXTALE_TTS__PROVIDER=http`
/// - `VOXTALE_TTS__URL=http://tts-server:8000`
/// - `VOXTALE_PIPELINE__ATTRIBUTION_WINDOW=80`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 未出现的键由各结构体的 serde 默认值补齐
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 例如: VOXTALE_TTS__URL=http://tts-server:8000
    // 注意: 环境变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix("VOXTALE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.tts.provider == TtsProvider::Http && config.tts.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "TTS URL cannot be empty when provider is http".to_string(),
        ));
    }

    if config.tts.sample_rate == 0 {
        return Err(ConfigError::ValidationError(
            "TTS sample rate cannot be 0".to_string(),
        ));
    }

    if config.pipeline.attribution_window == 0 {
        return Err(ConfigError::ValidationError(
            "Attribution window must be greater than 0".to_string(),
        ));
    }

    if config.pipeline.max_input_chars == 0 {
        return Err(ConfigError::ValidationError(
            "Max input chars must be greater than 0".to_string(),
        ));
    }

    if config.analysis.readability_chunk_size == 0 {
        return Err(ConfigError::ValidationError(
            "Readability chunk size must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    tracing::info!("TTS Provider: {}", config.tts.provider.as_str());
    if config.tts.provider == TtsProvider::Http {
        tracing::info!("TTS URL: {}", config.tts.url);
        tracing::info!("TTS Timeout: {}s", config.tts.timeout_secs);
        tracing::info!("TTS Max Retries: {}", config.tts.max_retries);
    } else {
        tracing::info!("TTS Sample Rate: {}Hz", config.tts.sample_rate);
    }
    tracing::info!("Attribution Window: {} chars", config.pipeline.attribution_window);
    tracing::info!("Max Input: {} chars", config.pipeline.max_input_chars);
    tracing::info!("Segment Gap: {}ms", config.pipeline.segment_gap_ms);
    tracing::info!("Max Shared Gender/Age: {}", config.pipeline.max_shared_gender_age);
    match &config.analysis.tables_path {
        Some(path) => tracing::info!("Pattern Tables: {:?}", path),
        None => tracing::info!("Pattern Tables: builtin"),
    }
    tracing::info!("Readability Chunk Size: {}", config.analysis.readability_chunk_size);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_url_only_matters_for_http_provider() {
        let mut config = AppConfig::default();
        config.tts.url = String::new();
        assert!(validate_config(&config).is_ok());

        config.tts.provider = TtsProvider::Http;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validation_error_for_zero_sizes() {
        let mut config = AppConfig::default();
        config.pipeline.attribution_window = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.analysis.readability_chunk_size = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.pipeline.max_input_chars = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 7070\n\n[tts]\nprovider = \"http\"\nurl = \"http://tts:9000\"\n\n[analysis]\nreadability_chunk_size = 3"
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 7070);
        assert_eq!(config.tts.provider, TtsProvider::Http);
        assert_eq!(config.tts.url, "http://tts:9000");
        assert_eq!(config.analysis.readability_chunk_size, 3);
        assert_eq!(config.pipeline.attribution_window, 50);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[pipeline]\nattribution_window = 0").unwrap();

        assert!(matches!(
            load_config_from_path(Some(file.path())),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
