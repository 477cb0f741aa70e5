//! Application State
//!
//! HTTP 层共享的组件与最近一次完成的输出

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::application::{AudioOutput, PipelineOrchestrator, SpeechSynthesisPort};
use crate::domain::narrative::{CharacterExtractor, Segmenter};
use crate::domain::quality::QualityAnalyzer;
use crate::domain::voice::VoiceAssigner;

/// 应用状态
pub struct AppState {
    pub segmenter: Arc<Segmenter>,
    pub extractor: Arc<CharacterExtractor>,
    pub assigner: Arc<VoiceAssigner>,
    pub analyzer: Arc<QualityAnalyzer>,
    pub orchestrator: Arc<PipelineOrchestrator>,
    /// 客户端轮询状态的建议间隔
    pub status_poll_interval_ms: u64,
    last_output: RwLock<Option<Arc<AudioOutput>>>,
}

impl AppState {
    pub fn new(
        segmenter: Arc<Segmenter>,
        extractor: Arc<CharacterExtractor>,
        assigner: Arc<VoiceAssigner>,
        analyzer: Arc<QualityAnalyzer>,
        synthesizer: Arc<dyn SpeechSynthesisPort>,
        status_poll_interval_ms: u64,
    ) -> Self {
        let orchestrator = Arc::new(PipelineOrchestrator::new(
            segmenter.clone(),
            extractor.clone(),
            assigner.clone(),
            analyzer.clone(),
            synthesizer,
        ));

        Self {
            segmenter,
            extractor,
            assigner,
            analyzer,
            orchestrator,
            status_poll_interval_ms,
            last_output: RwLock::new(None),
        }
    }

    /// 最近一次完成的输出
    pub async fn last_output(&self) -> Option<Arc<AudioOutput>> {
        self.last_output.read().await.clone()
    }

    pub async fn store_output(&self, output: AudioOutput) {
        *self.last_output.write().await = Some(Arc::new(output));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::narrative::SegmenterConfig;
    use crate::domain::quality::AnalysisSettings;
    use crate::domain::tables::PatternTables;
    use crate::domain::voice::DEFAULT_MAX_SHARED_GENDER_AGE;
    use crate::infrastructure::adapters::LocalSynthesizer;

    /// 使用内置词表与本地合成器的状态
    pub(crate) fn test_state() -> Arc<AppState> {
        let tables = Arc::new(PatternTables::builtin().unwrap());
        let config = SegmenterConfig::default();
        let segmenter = Arc::new(Segmenter::new(tables.clone(), config));
        let extractor = Arc::new(CharacterExtractor::new(
            tables.clone(),
            config.attribution_window,
        ));
        let assigner = Arc::new(VoiceAssigner::new(
            tables,
            DEFAULT_MAX_SHARED_GENDER_AGE,
        ));
        let analyzer = Arc::new(QualityAnalyzer::new(
            segmenter.clone(),
            AnalysisSettings::default(),
        ));
        Arc::new(AppState::new(
            segmenter,
            extractor,
            assigner,
            analyzer,
            Arc::new(LocalSynthesizer::with_defaults()),
            500,
        ))
    }

    #[tokio::test]
    async fn test_store_output() {
        let state = test_state();
        assert!(state.last_output().await.is_none());
        assert!(!state.orchestrator.is_busy());
    }
}
