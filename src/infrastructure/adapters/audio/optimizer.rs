//! 音频后处理: 基于 symphonia 解码后做峰值归一化

use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::wav;
use crate::application::ports::SynthesisError;

/// 归一化后的峰值
pub const TARGET_PEAK: f32 = 0.9;

/// 解码后的 PCM
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// 交错的 f32 样本
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / (self.sample_rate as u64 * self.channels as u64)
    }
}

/// 使用 symphonia 解码 WAV
pub fn decode_wav(data: &[u8]) -> Result<DecodedAudio, SynthesisError> {
    let cursor = Cursor::new(data.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("wav");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| optimize_error(format!("Probe failed: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| optimize_error("No audio track found"))?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| optimize_error("Unknown sample rate"))?;

    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .ok_or_else(|| optimize_error("Unknown channel count"))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| optimize_error(format!("Decoder creation failed: {}", e)))?;

    let track_id = track.id;
    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(optimize_error(format!("Packet read error: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, "Decode error, skipping packet");
                continue;
            }
        };

        let spec = *decoded.spec();
        let frames = decoded.frames();
        let mut buffer = SampleBuffer::<f32>::new(frames as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        let actual = frames * spec.channels.count();
        samples.extend(&buffer.samples()[..actual]);
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// 峰值归一化到 `target_peak`
///
/// 静音输入原样返回
pub fn normalize_wav(data: &[u8], target_peak: f32) -> Result<Vec<u8>, SynthesisError> {
    let decoded = decode_wav(data)?;
    let peak = decoded.peak();
    if peak <= f32::EPSILON {
        return Ok(data.to_vec());
    }

    let gain = target_peak / peak;
    let samples: Vec<i16> = decoded
        .samples
        .iter()
        .map(|&s| ((s * gain).clamp(-1.0, 1.0) * 32767.0) as i16)
        .collect();

    tracing::debug!(
        peak,
        gain,
        duration_ms = decoded.duration_ms(),
        "Audio normalized"
    );

    Ok(wav::encode_pcm16(
        &samples,
        decoded.sample_rate,
        decoded.channels,
    ))
}

fn optimize_error(message: impl Into<String>) -> SynthesisError {
    SynthesisError::Optimize(message.into())
}
