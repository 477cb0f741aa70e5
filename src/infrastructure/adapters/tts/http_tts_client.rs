//! HTTP TTS Client - 调用托管 TTS HTTP 服务
//!
//! 实现 SpeechSynthesisPort trait，通过 HTTP 调用外部 TTS 服务
//!
//! 外部 TTS API:
//! POST http://localhost:8000/api/tts/infer
//! Request: {"text": "...", "voice_id": "...", "gender": "...", "pitch": 1.0, "speed": 1.0, "format": "wav"}
//! Response: audio binary, metadata in headers

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::application::ports::{
    AudioSegment, CombinedAudio, SpeechSynthesisPort, SynthesisError,
};
use crate::domain::narrative::TextSegment;
use crate::domain::voice::{AudioFormat, Gender, VoiceProfile};
use crate::infrastructure::adapters::audio;

/// TTS 推理请求体 (JSON)
#[derive(Debug, Serialize)]
struct TtsHttpRequest<'a> {
    /// 要合成的文本
    text: &'a str,
    voice_id: &'a str,
    gender: Gender,
    pitch: f64,
    speed: f64,
    format: AudioFormat,
}

/// HTTP TTS 客户端配置
#[derive(Debug, Clone)]
pub struct HttpTtsClientConfig {
    /// TTS 服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 网络错误 / 超时的重试次数
    pub max_retries: u32,
    /// 合并时分段之间的静音
    pub segment_gap_ms: u64,
}

impl Default for HttpTtsClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 120,
            max_retries: 0,
            segment_gap_ms: 250,
        }
    }
}

impl HttpTtsClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_segment_gap(mut self, gap_ms: u64) -> Self {
        self.segment_gap_ms = gap_ms;
        self
    }
}

/// HTTP TTS 客户端
///
/// 支持 WAV 与 MP3 输出
pub struct HttpTtsClient {
    client: Client,
    config: HttpTtsClientConfig,
}

impl HttpTtsClient {
    /// 创建新的 HTTP TTS 客户端
    pub fn new(config: HttpTtsClientConfig) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SynthesisError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// 获取推理 URL
    fn infer_url(&self) -> String {
        format!("{}/api/tts/infer", self.config.base_url.trim_end_matches('/'))
    }

    /// 获取健康检查 URL
    fn health_url(&self) -> String {
        format!("{}/health", self.config.base_url.trim_end_matches('/'))
    }

    async fn infer_once(
        &self,
        request: &TtsHttpRequest<'_>,
    ) -> Result<(Vec<u8>, Option<u64>, Option<u32>), SynthesisError> {
        let response = self
            .client
            .post(self.infer_url())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SynthesisError::Timeout
                } else if e.is_connect() {
                    SynthesisError::Network(format!("Cannot connect to TTS service: {}", e))
                } else {
                    SynthesisError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Service(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        // 从 headers 提取元数据
        let (duration_ms, sample_rate) = audio_metadata(response.headers());

        // 直接获取音频字节
        let data = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::InvalidAudio(format!("Failed to read audio: {}", e)))?
            .to_vec();

        Ok((data, duration_ms, sample_rate))
    }
}

/// 读取 X-TTS-Duration-Ms / X-TTS-Sample-Rate
fn audio_metadata(headers: &HeaderMap) -> (Option<u64>, Option<u32>) {
    let duration_ms = headers
        .get("X-TTS-Duration-Ms")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    let sample_rate = headers
        .get("X-TTS-Sample-Rate")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    (duration_ms, sample_rate)
}

/// 服务端未给出时长时，WAV 从文件头推算
fn resolve_duration(declared: Option<u64>, data: &[u8], format: AudioFormat) -> u64 {
    declared
        .or_else(|| match format {
            AudioFormat::Wav => audio::wav::parse_header(data).ok().map(|h| h.duration_ms()),
            AudioFormat::Mp3 => None,
        })
        .unwrap_or(0)
}

fn is_retryable(err: &SynthesisError) -> bool {
    matches!(err, SynthesisError::Network(_) | SynthesisError::Timeout)
}

#[async_trait]
impl SpeechSynthesisPort for HttpTtsClient {
    fn name(&self) -> &'static str {
        "http"
    }

    fn supports_format(&self, format: AudioFormat) -> bool {
        matches!(format, AudioFormat::Wav | AudioFormat::Mp3)
    }

    async fn generate_segment_audio(
        &self,
        segment: &TextSegment,
        voice: &VoiceProfile,
        format: AudioFormat,
    ) -> Result<AudioSegment, SynthesisError> {
        let request = TtsHttpRequest {
            text: &segment.content,
            voice_id: &voice.id,
            gender: voice.gender,
            pitch: voice.pitch,
            speed: voice.speed,
            format,
        };

        tracing::debug!(
            url = %self.infer_url(),
            segment_id = %segment.id,
            text_len = request.text.len(),
            voice_id = %request.voice_id,
            "Sending TTS infer request"
        );

        let mut attempt = 0;
        let (data, declared_ms, sample_rate) = loop {
            match self.infer_once(&request).await {
                Ok(result) => break result,
                Err(e) if is_retryable(&e) && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        segment_id = %segment.id,
                        attempt,
                        error = %e,
                        "TTS request failed, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        };

        if data.is_empty() {
            return Err(SynthesisError::InvalidAudio(
                "TTS service returned empty audio".to_string(),
            ));
        }
        let duration_ms = resolve_duration(declared_ms, &data, format);

        tracing::info!(
            segment_id = %segment.id,
            duration_ms,
            sample_rate = ?sample_rate,
            audio_size = data.len(),
            "TTS inference completed"
        );

        Ok(AudioSegment {
            segment_id: segment.id.clone(),
            data,
            format,
            duration_ms,
            sample_rate,
        })
    }

    async fn combine_audio_segments(
        &self,
        segments: Vec<AudioSegment>,
        format: AudioFormat,
    ) -> Result<CombinedAudio, SynthesisError> {
        audio::combine(segments, format, self.config.segment_gap_ms)
    }

    async fn optimize_audio(
        &self,
        data: Vec<u8>,
        format: AudioFormat,
    ) -> Result<Vec<u8>, SynthesisError> {
        audio::optimize(data, format)
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_config_default() {
        let config = HttpTtsClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_config_builder() {
        let config = HttpTtsClientConfig::new("http://example.com:9000/")
            .with_timeout(60)
            .with_retries(2)
            .with_segment_gap(100);
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.segment_gap_ms, 100);

        let client = HttpTtsClient::new(config).unwrap();
        assert_eq!(client.infer_url(), "http://example.com:9000/api/tts/infer");
        assert_eq!(client.health_url(), "http://example.com:9000/health");
        assert!(client.supports_format(AudioFormat::Mp3));
    }

    #[test]
    fn test_request_body() {
        let request = TtsHttpRequest {
            text: "Hello.",
            voice_id: "female_adult_warm",
            gender: Gender::Female,
            pitch: 1.05,
            speed: 0.9,
            format: AudioFormat::Mp3,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["voice_id"], "female_adult_warm");
        assert_eq!(json["gender"], "female");
        assert_eq!(json["format"], "mp3");
    }

    #[test]
    fn test_metadata_and_duration_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("X-TTS-Duration-Ms", HeaderValue::from_static("1500"));
        headers.insert("X-TTS-Sample-Rate", HeaderValue::from_static("24000"));
        assert_eq!(audio_metadata(&headers), (Some(1500), Some(24000)));
        assert_eq!(audio_metadata(&HeaderMap::new()), (None, None));

        let wav = audio::wav::encode_pcm16(&[0i16; 8000], 16000, 1);
        assert_eq!(resolve_duration(None, &wav, AudioFormat::Wav), 500);
        assert_eq!(resolve_duration(Some(42), &wav, AudioFormat::Wav), 42);
        assert_eq!(resolve_duration(None, &[0xff, 0xfb], AudioFormat::Mp3), 0);
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let client = HttpTtsClient::new(HttpTtsClientConfig::new("http://127.0.0.1:9").with_timeout(2)).unwrap();
        assert!(!client.health_check().await);
    }
}
