//! Speech Synthesis Port - 语音合成抽象
//!
//! 本地合成器与托管 TTS 服务的统一接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::narrative::TextSegment;
use crate::domain::voice::{AudioFormat, VoiceProfile};

/// 合成错误
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(AudioFormat),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    Service(String),

    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    #[error("Failed to combine audio: {0}")]
    Combine(String),

    #[error("Failed to optimize audio: {0}")]
    Optimize(String),

    #[error("Nothing to synthesize")]
    EmptyInput,
}

/// 单个分段的合成结果
#[derive(Debug, Clone)]
pub struct AudioSegment {
    pub segment_id: String,
    pub data: Vec<u8>,
    pub format: AudioFormat,
    pub duration_ms: u64,
    pub sample_rate: Option<u32>,
}

/// 合并后的音频
#[derive(Debug, Clone)]
pub struct CombinedAudio {
    pub data: Vec<u8>,
    pub format: AudioFormat,
    pub duration_ms: u64,
}

/// Speech Synthesis Port
///
/// 每次调用只合成一个分段；合并与优化也由提供方完成
#[async_trait]
pub trait SpeechSynthesisPort: Send + Sync {
    /// 提供方名称（用于日志）
    fn name(&self) -> &'static str;

    fn supports_format(&self, format: AudioFormat) -> bool;

    async fn generate_segment_audio(
        &self,
        segment: &TextSegment,
        voice: &VoiceProfile,
        format: AudioFormat,
    ) -> Result<AudioSegment, SynthesisError>;

    /// 按顺序合并分段音频
    async fn combine_audio_segments(
        &self,
        segments: Vec<AudioSegment>,
        format: AudioFormat,
    ) -> Result<CombinedAudio, SynthesisError>;

    /// 音量归一化等后处理，失败时调用方保留原始数据
    async fn optimize_audio(
        &self,
        data: Vec<u8>,
        format: AudioFormat,
    ) -> Result<Vec<u8>, SynthesisError>;

    /// 检查服务是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}
