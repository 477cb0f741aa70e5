//! Voxtale - 多角色有声故事服务
//!
//! 启动顺序: 配置 -> 日志 -> 规则表 -> 领域组件 -> 合成提供方 -> HTTP 服务

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use voxtale::application::SpeechSynthesisPort;
use voxtale::config::{load_config, print_config, AppConfig, TtsProvider};
use voxtale::domain::narrative::{CharacterExtractor, Segmenter, SegmenterConfig};
use voxtale::domain::quality::{AnalysisSettings, QualityAnalyzer};
use voxtale::domain::tables::PatternTables;
use voxtale::domain::voice::VoiceAssigner;
use voxtale::infrastructure::adapters::{
    HttpTtsClient, HttpTtsClientConfig, LocalSynthesizer, LocalSynthesizerConfig,
};
use voxtale::infrastructure::http::{AppState, HttpServer, ServerConfig};

/// 请求体中 JSON 包装的余量
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("Voxtale - multi-voice story narration");
    print_config(&config);

    let tables = PatternTables::load(config.analysis.tables_path.as_deref())?;
    tracing::info!(version = %tables.version(), "Pattern tables loaded");
    let tables = Arc::new(tables);

    let segmenter_config = SegmenterConfig {
        attribution_window: config.pipeline.attribution_window,
        max_input_chars: config.pipeline.max_input_chars,
    };
    let segmenter = Arc::new(Segmenter::new(tables.clone(), segmenter_config));
    let extractor = Arc::new(CharacterExtractor::new(
        tables.clone(),
        config.pipeline.attribution_window,
    ));
    let assigner = Arc::new(VoiceAssigner::new(
        tables.clone(),
        config.pipeline.max_shared_gender_age,
    ));
    let analyzer = Arc::new(QualityAnalyzer::new(
        segmenter.clone(),
        AnalysisSettings {
            readability_chunk_size: config.analysis.readability_chunk_size,
            long_sentence_chars: config.analysis.long_sentence_chars,
        },
    ));

    let synthesizer = build_synthesizer(&config)?;
    if !synthesizer.health_check().await {
        tracing::warn!(
            provider = synthesizer.name(),
            "Speech synthesis provider is not reachable yet"
        );
    }

    let state = Arc::new(AppState::new(
        segmenter,
        extractor,
        assigner,
        analyzer,
        synthesizer,
        config.pipeline.status_poll_interval_ms,
    ));

    // UTF-8 最多 4 字节一个字符
    let body_limit = config
        .pipeline
        .max_input_chars
        .saturating_mul(4)
        .saturating_add(BODY_OVERHEAD_BYTES);
    let server_config =
        ServerConfig::new(&config.server.host, config.server.port).with_body_limit(body_limit);
    let server = HttpServer::new(server_config, state);

    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                return;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.filter_directive()));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_synthesizer(config: &AppConfig) -> anyhow::Result<Arc<dyn SpeechSynthesisPort>> {
    let synthesizer: Arc<dyn SpeechSynthesisPort> = match config.tts.provider {
        TtsProvider::Local => Arc::new(LocalSynthesizer::new(LocalSynthesizerConfig {
            sample_rate: config.tts.sample_rate,
            segment_gap_ms: config.pipeline.segment_gap_ms,
            ..Default::default()
        })),
        TtsProvider::Http => {
            let client_config = HttpTtsClientConfig::new(&config.tts.url)
                .with_timeout(config.tts.timeout_secs)
                .with_retries(config.tts.max_retries)
                .with_segment_gap(config.pipeline.segment_gap_ms);
            Arc::new(HttpTtsClient::new(client_config)?)
        }
    };
    Ok(synthesizer)
}
