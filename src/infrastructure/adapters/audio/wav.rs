//! WAV 解析、写出与拼接

use crate::application::ports::SynthesisError;

/// fmt chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl WavFormat {
    /// 16 位 PCM
    pub fn pcm16(sample_rate: u32, channels: u16) -> Self {
        let block_align = channels * 2;
        Self {
            audio_format: 1,
            channels,
            sample_rate,
            byte_rate: sample_rate * block_align as u32,
            block_align,
            bits_per_sample: 16,
        }
    }

    fn same_layout(&self, other: &Self) -> bool {
        self.audio_format == other.audio_format
            && self.channels == other.channels
            && self.sample_rate == other.sample_rate
            && self.bits_per_sample == other.bits_per_sample
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub format: WavFormat,
    pub data_start: usize,
    pub data_size: usize,
}

impl WavHeader {
    pub fn duration_ms(&self) -> u64 {
        if self.format.byte_rate == 0 {
            return 0;
        }
        self.data_size as u64 * 1000 / self.format.byte_rate as u64
    }

    /// PCM 数据区
    pub fn pcm<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.data_start..self.data_start + self.data_size]
    }
}

/// 解析 WAV 文件头
///
/// data chunk 声明的大小超过实际数据时截断到实际长度
pub fn parse_header(data: &[u8]) -> Result<WavHeader, SynthesisError> {
    if data.len() < 44 {
        return Err(invalid("WAV data too short"));
    }
    if &data[0..4] != b"RIFF" {
        return Err(invalid("Invalid WAV: missing RIFF header"));
    }
    if &data[8..12] != b"WAVE" {
        return Err(invalid("Invalid WAV: missing WAVE identifier"));
    }

    let mut pos = 12;
    let mut format: Option<WavFormat> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size = u32_at(data, pos + 4) as usize;
        let body = pos + 8;

        match chunk_id {
            b"fmt " => {
                if chunk_size < 16 || body + 16 > data.len() {
                    return Err(invalid("Invalid fmt chunk size"));
                }
                format = Some(WavFormat {
                    audio_format: u16_at(data, body),
                    channels: u16_at(data, body + 2),
                    sample_rate: u32_at(data, body + 4),
                    byte_rate: u32_at(data, body + 8),
                    block_align: u16_at(data, body + 12),
                    bits_per_sample: u16_at(data, body + 14),
                });
            }
            b"data" => {
                let format = format.ok_or_else(|| invalid("Invalid WAV: missing fmt chunk"))?;
                let data_size = chunk_size.min(data.len() - body);
                if data_size == 0 {
                    return Err(invalid("Invalid WAV: empty data chunk"));
                }
                return Ok(WavHeader {
                    format,
                    data_start: body,
                    data_size,
                });
            }
            _ => {}
        }

        pos = body + chunk_size;
        // 对齐到偶数字节
        if chunk_size % 2 != 0 {
            pos += 1;
        }
    }

    Err(match format {
        Some(_) => invalid("Invalid WAV: missing data chunk"),
        None => invalid("Invalid WAV: missing fmt chunk"),
    })
}

/// 写出 RIFF/WAVE 文件
pub fn write(format: &WavFormat, pcm: &[u8]) -> Vec<u8> {
    let data_size = pcm.len();
    let mut wav = Vec::with_capacity(44 + data_size);

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&((36 + data_size) as u32).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    // fmt chunk
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&format.audio_format.to_le_bytes());
    wav.extend_from_slice(&format.channels.to_le_bytes());
    wav.extend_from_slice(&format.sample_rate.to_le_bytes());
    wav.extend_from_slice(&format.byte_rate.to_le_bytes());
    wav.extend_from_slice(&format.block_align.to_le_bytes());
    wav.extend_from_slice(&format.bits_per_sample.to_le_bytes());

    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(data_size as u32).to_le_bytes());
    wav.extend_from_slice(pcm);

    wav
}

/// 将 i16 样本编码为 WAV
pub fn encode_pcm16(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    write(&WavFormat::pcm16(sample_rate, channels), &pcm)
}

/// 按顺序拼接，片段之间插入 `gap_ms` 静音
///
/// 所有片段必须有相同的采样率、声道数与位深
pub fn concat(parts: &[Vec<u8>], gap_ms: u64) -> Result<(Vec<u8>, u64), SynthesisError> {
    let headers = parts
        .iter()
        .map(|p| parse_header(p))
        .collect::<Result<Vec<_>, _>>()?;
    let first = headers.first().ok_or(SynthesisError::EmptyInput)?.format;

    if let Some(other) = headers.iter().find(|h| !h.format.same_layout(&first)) {
        return Err(SynthesisError::Combine(format!(
            "Mismatched WAV layout: {} Hz / {} ch vs {} Hz / {} ch",
            first.sample_rate, first.channels, other.format.sample_rate, other.format.channels
        )));
    }

    let gap_frames = first.sample_rate as u64 * gap_ms / 1000;
    let gap = vec![0u8; gap_frames as usize * first.block_align as usize];

    let mut pcm = Vec::with_capacity(headers.iter().map(|h| h.data_size + gap.len()).sum());
    for (i, (part, header)) in parts.iter().zip(&headers).enumerate() {
        if i > 0 {
            pcm.extend_from_slice(&gap);
        }
        pcm.extend_from_slice(header.pcm(part));
    }

    let combined = write(&first, &pcm);
    let duration_ms = if first.byte_rate == 0 {
        0
    } else {
        pcm.len() as u64 * 1000 / first.byte_rate as u64
    };
    Ok((combined, duration_ms))
}

fn u16_at(data: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([data[pos], data[pos + 1]])
}

fn u32_at(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

fn invalid(message: &str) -> SynthesisError {
    SynthesisError::InvalidAudio(message.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 单声道静音 WAV
    pub(crate) fn silent_wav(sample_rate: u32, millis: u64) -> Vec<u8> {
        let samples = vec![0i16; (sample_rate as u64 * millis / 1000) as usize];
        encode_pcm16(&samples, sample_rate, 1)
    }

    #[test]
    fn test_parse_wav_header() {
        let wav = silent_wav(16000, 1000);
        let header = parse_header(&wav).unwrap();
        assert_eq!(header.format.sample_rate, 16000);
        assert_eq!(header.format.channels, 1);
        assert_eq!(header.format.bits_per_sample, 16);
        assert_eq!(header.data_start, 44);
        assert_eq!(header.duration_ms(), 1000);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            parse_header(b"not a wav"),
            Err(SynthesisError::InvalidAudio(_))
        ));
        let mut wav = silent_wav(16000, 100);
        wav[0..4].copy_from_slice(b"RIFX");
        assert!(parse_header(&wav).is_err());
    }

    #[test]
    fn test_truncated_data_chunk() {
        let mut wav = silent_wav(16000, 1000);
        wav.truncate(44 + 1600);
        let header = parse_header(&wav).unwrap();
        assert_eq!(header.data_size, 1600);
        assert_eq!(header.duration_ms(), 50);
    }

    #[test]
    fn test_concat_with_gap() {
        let parts = vec![silent_wav(16000, 500), silent_wav(16000, 250)];
        let (combined, duration) = concat(&parts, 100).unwrap();
        assert_eq!(duration, 850);
        let header = parse_header(&combined).unwrap();
        assert_eq!(header.duration_ms(), 850);
    }

    #[test]
    fn test_concat_mismatched_rates() {
        let parts = vec![silent_wav(16000, 100), silent_wav(22050, 100)];
        assert!(matches!(concat(&parts, 0), Err(SynthesisError::Combine(_))));
        assert!(matches!(concat(&[], 0), Err(SynthesisError::EmptyInput)));
    }
}
