//! Voice Context - Value Objects

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// 音调范围
pub const PITCH_RANGE: RangeInclusive<f64> = 0.5..=2.0;
/// 语速范围
pub const SPEED_RANGE: RangeInclusive<f64> = 0.5..=1.5;

/// 性别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Neutral,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Neutral => "neutral",
        }
    }
}

/// 年龄段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeGroup {
    Child,
    Young,
    Adult,
    Elderly,
}

impl AgeGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Child => "child",
            Self::Young => "young",
            Self::Adult => "adult",
            Self::Elderly => "elderly",
        }
    }
}

/// 音色基调
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Warm,
    Cold,
    Neutral,
    Dramatic,
}

/// 音频格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Mp3,
}

impl AudioFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "wav" => Some(Self::Wav),
            "mp3" => Some(Self::Mp3),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::Wav
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// 音色配置
///
/// 不变量:
/// - pitch 位于 [`PITCH_RANGE`]
/// - speed 位于 [`SPEED_RANGE`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceProfile {
    pub id: String,
    pub name: String,
    pub gender: Gender,
    pub age: AgeGroup,
    pub tone: Tone,
    pub pitch: f64,
    pub speed: f64,
}

impl VoiceProfile {
    /// 将 pitch/speed 收敛到合法范围
    pub fn clamped(mut self) -> Self {
        self.pitch = clamp_pitch(self.pitch);
        self.speed = clamp_speed(self.speed);
        self
    }
}

pub fn clamp_pitch(pitch: f64) -> f64 {
    round3(pitch.clamp(*PITCH_RANGE.start(), *PITCH_RANGE.end()))
}

pub fn clamp_speed(speed: f64) -> f64 {
    round3(speed.clamp(*SPEED_RANGE.start(), *SPEED_RANGE.end()))
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// 角色与音色的对应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceAssignment {
    /// 角色名
    pub character: String,
    pub voice: VoiceProfile,
    /// 置信度 [0, 1]
    pub confidence: f64,
}

/// 手动校正
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceOverride {
    /// 替换为指定模板
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub pitch: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_clamped() {
        let profile = VoiceProfile {
            id: "x".to_string(),
            name: "X".to_string(),
            gender: Gender::Male,
            age: AgeGroup::Adult,
            tone: Tone::Neutral,
            pitch: 2.7,
            speed: 0.1,
        }
        .clamped();
        assert_eq!(profile.pitch, 2.0);
        assert_eq!(profile.speed, 0.5);
    }

    #[test]
    fn test_enum_serialization() {
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), "\"female\"");
        assert_eq!(serde_json::to_string(&AgeGroup::Elderly).unwrap(), "\"elderly\"");
        assert_eq!(serde_json::to_string(&AudioFormat::Mp3).unwrap(), "\"mp3\"");
        assert_eq!(AudioFormat::from_extension("WAV"), Some(AudioFormat::Wav));
        assert_eq!(AudioFormat::from_extension("ogg"), None);
    }
}
