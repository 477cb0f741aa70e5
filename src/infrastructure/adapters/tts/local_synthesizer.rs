//! Local Synthesizer - 本地合成器
//!
//! 不依赖外部服务，按音色生成确定性的提示音 WAV：
//! 频率由性别与 pitch 决定，时长由词数与 speed 决定。

use async_trait::async_trait;
use std::f64::consts::TAU;

use crate::application::ports::{
    AudioSegment, CombinedAudio, SpeechSynthesisPort, SynthesisError,
};
use crate::domain::narrative::{SegmentType, TextSegment};
use crate::domain::text;
use crate::domain::voice::{AudioFormat, Gender, VoiceProfile};
use crate::infrastructure::adapters::audio;

/// 每段最短时长
const MIN_SEGMENT_MS: u64 = 200;
/// 淡入淡出
const FADE_MS: u64 = 10;

/// 本地合成器配置
#[derive(Debug, Clone)]
pub struct LocalSynthesizerConfig {
    pub sample_rate: u32,
    /// 分段之间的静音
    pub segment_gap_ms: u64,
    pub words_per_minute: f64,
    /// [0, 1]
    pub amplitude: f64,
}

impl Default for LocalSynthesizerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            segment_gap_ms: 250,
            words_per_minute: 160.0,
            amplitude: 0.3,
        }
    }
}

/// 本地合成器，只支持 WAV
pub struct LocalSynthesizer {
    config: LocalSynthesizerConfig,
}

impl LocalSynthesizer {
    pub fn new(config: LocalSynthesizerConfig) -> Self {
        tracing::info!(
            sample_rate = config.sample_rate,
            segment_gap_ms = config.segment_gap_ms,
            "LocalSynthesizer initialized"
        );
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(LocalSynthesizerConfig::default())
    }

    fn base_frequency(gender: Gender) -> f64 {
        match gender {
            Gender::Male => 120.0,
            Gender::Female => 210.0,
            Gender::Neutral => 165.0,
        }
    }

    /// 词数 / 每分钟词数 / speed
    pub fn duration_ms(&self, content: &str, speed: f64) -> u64 {
        let words = text::word_count(content).max(1) as f64;
        let minutes = words / self.config.words_per_minute;
        let ms = (minutes * 60_000.0 / speed.max(0.1)).round() as u64;
        ms.max(MIN_SEGMENT_MS)
    }

    fn render(&self, frequency: f64, amplitude: f64, duration_ms: u64) -> Vec<i16> {
        let rate = self.config.sample_rate as u64;
        let total = (rate * duration_ms / 1000) as usize;
        let fade = ((rate * FADE_MS / 1000) as usize).min(total / 2).max(1);

        (0..total)
            .map(|i| {
                let t = i as f64 / rate as f64;
                let envelope = if i < fade {
                    i as f64 / fade as f64
                } else if i >= total - fade {
                    (total - i) as f64 / fade as f64
                } else {
                    1.0
                };
                let value = (TAU * frequency * t).sin() * amplitude * envelope;
                (value * i16::MAX as f64) as i16
            })
            .collect()
    }
}

impl Default for LocalSynthesizer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[async_trait]
impl SpeechSynthesisPort for LocalSynthesizer {
    fn name(&self) -> &'static str {
        "local"
    }

    fn supports_format(&self, format: AudioFormat) -> bool {
        format == AudioFormat::Wav
    }

    async fn generate_segment_audio(
        &self,
        segment: &TextSegment,
        voice: &VoiceProfile,
        format: AudioFormat,
    ) -> Result<AudioSegment, SynthesisError> {
        if !self.supports_format(format) {
            return Err(SynthesisError::UnsupportedFormat(format));
        }

        let target_ms = self.duration_ms(&segment.content, voice.speed);
        let frequency = Self::base_frequency(voice.gender) * voice.pitch;
        // 内心独白音量更低
        let amplitude = match segment.segment_type {
            SegmentType::Thought => self.config.amplitude * 0.6,
            _ => self.config.amplitude,
        };
        let samples = self.render(frequency, amplitude, target_ms);
        let duration_ms = samples.len() as u64 * 1000 / self.config.sample_rate as u64;

        tracing::debug!(
            segment_id = %segment.id,
            voice_id = %voice.id,
            frequency,
            duration_ms,
            "LocalSynthesizer: segment rendered"
        );

        Ok(AudioSegment {
            segment_id: segment.id.clone(),
            data: audio::wav::encode_pcm16(&samples, self.config.sample_rate, 1),
            format,
            duration_ms,
            sample_rate: Some(self.config.sample_rate),
        })
    }

    async fn combine_audio_segments(
        &self,
        segments: Vec<AudioSegment>,
        format: AudioFormat,
    ) -> Result<CombinedAudio, SynthesisError> {
        if !self.supports_format(format) {
            return Err(SynthesisError::UnsupportedFormat(format));
        }
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
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::voice::{AgeGroup, Tone};

    fn segment(content: &str, kind: SegmentType) -> TextSegment {
        TextSegment {
            id: "seg_0000".to_string(),
            content: content.to_string(),
            speaker: "Alice".to_string(),
            segment_type: kind,
            start_position: 0,
            end_position: content.chars().count(),
            attribution_verb: None,
        }
    }

    fn voice(gender: Gender, speed: f64) -> VoiceProfile {
        VoiceProfile {
            id: "female_adult_warm".to_string(),
            name: "Warm".to_string(),
            gender,
            age: AgeGroup::Adult,
            tone: Tone::Warm,
            pitch: 1.0,
            speed,
        }
    }

    #[test]
    fn test_duration_follows_words_and_speed() {
        let synth = LocalSynthesizer::with_defaults();
        // 8 词 @ 160 wpm = 3 秒
        let content = "one two three four five six seven eight";
        assert_eq!(synth.duration_ms(content, 1.0), 3000);
        assert_eq!(synth.duration_ms(content, 1.5), 2000);
        assert_eq!(synth.duration_ms("", 1.0), 375);
        assert_eq!(synth.duration_ms("hi", 1.5), 250);
    }

    #[tokio::test]
    async fn test_generates_deterministic_wav() {
        let synth = LocalSynthesizer::with_defaults();
        let seg = segment("Hello there, friend.", SegmentType::Dialogue);
        let a = synth
            .generate_segment_audio(&seg, &voice(Gender::Female, 1.0), AudioFormat::Wav)
            .await
            .unwrap();
        let b = synth
            .generate_segment_audio(&seg, &voice(Gender::Female, 1.0), AudioFormat::Wav)
            .await
            .unwrap();
        assert_eq!(a.data, b.data);

        let header = audio::wav::parse_header(&a.data).unwrap();
        assert_eq!(header.format.sample_rate, 22050);
        assert_eq!(header.duration_ms(), a.duration_ms);
    }

    #[tokio::test]
    async fn test_mp3_unsupported() {
        let synth = LocalSynthesizer::with_defaults();
        assert!(!synth.supports_format(AudioFormat::Mp3));
        let seg = segment("Hello.", SegmentType::Narration);
        let err = synth
            .generate_segment_audio(&seg, &voice(Gender::Male, 1.0), AudioFormat::Mp3)
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::UnsupportedFormat(AudioFormat::Mp3)));
    }

    #[tokio::test]
    async fn test_combine_and_optimize() {
        let synth = LocalSynthesizer::with_defaults();
        let voice = voice(Gender::Male, 1.0);
        let mut clips = Vec::new();
        for content in ["One two.", "Three four five."] {
            let seg = segment(content, SegmentType::Dialogue);
            clips.push(
                synth
                    .generate_segment_audio(&seg, &voice, AudioFormat::Wav)
                    .await
                    .unwrap(),
            );
        }
        let expected: u64 = clips.iter().map(|c| c.duration_ms).sum::<u64>() + 250;

        let combined = synth
            .combine_audio_segments(clips, AudioFormat::Wav)
            .await
            .unwrap();
        // 逐段取整的误差
        assert!(combined.duration_ms.abs_diff(expected) <= 2);

        let optimized = synth
            .optimize_audio(combined.data.clone(), AudioFormat::Wav)
            .await
            .unwrap();
        let header = audio::wav::parse_header(&optimized).unwrap();
        assert_eq!(header.duration_ms(), combined.duration_ms);
    }
}
