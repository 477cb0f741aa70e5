//! 音频工具: WAV / MP3 拼接与后处理

pub mod mp3;
pub mod optimizer;
pub mod wav;

use crate::application::ports::{AudioSegment, CombinedAudio, SynthesisError};
use crate::domain::voice::AudioFormat;

/// 按顺序合并分段音频
pub fn combine(
    segments: Vec<AudioSegment>,
    format: AudioFormat,
    gap_ms: u64,
) -> Result<CombinedAudio, SynthesisError> {
    if segments.is_empty() {
        return Err(SynthesisError::EmptyInput);
    }
    if let Some(other) = segments.iter().find(|s| s.format != format) {
        return Err(SynthesisError::Combine(format!(
            "Segment {} is {}, expected {}",
            other.segment_id, other.format, format
        )));
    }

    // MP3 不解析帧头，时长取分段之和
    let declared_ms: u64 = segments.iter().map(|s| s.duration_ms).sum();
    let parts: Vec<Vec<u8>> = segments.into_iter().map(|s| s.data).collect();
    match format {
        AudioFormat::Wav => {
            let (data, duration_ms) = wav::concat(&parts, gap_ms)?;
            Ok(CombinedAudio {
                data,
                format,
                duration_ms,
            })
        }
        AudioFormat::Mp3 => Ok(CombinedAudio {
            data: mp3::concat(&parts),
            duration_ms: declared_ms,
            format,
        }),
    }
}

/// WAV 做峰值归一化，MP3 原样返回
pub fn optimize(data: Vec<u8>, format: AudioFormat) -> Result<Vec<u8>, SynthesisError> {
    match format {
        AudioFormat::Wav => optimizer::normalize_wav(&data, optimizer::TARGET_PEAK),
        AudioFormat::Mp3 => Ok(data),
    }
}
