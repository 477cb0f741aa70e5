//! 处理选项与输出

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::narrative::{Character, TextSegment};
use crate::domain::quality::WritingQualityReport;
use crate::domain::voice::{AudioFormat, VoiceAssignment, VoiceOverride};

/// `process_story` 选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessOptions {
    /// 是否应用 `voice_overrides`
    pub enable_manual_correction: bool,
    pub output_format: AudioFormat,
    pub include_quality_analysis: bool,
    /// 角色名 -> 手动校正
    pub voice_overrides: HashMap<String, VoiceOverride>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            enable_manual_correction: false,
            output_format: AudioFormat::Wav,
            include_quality_analysis: true,
            voice_overrides: HashMap::new(),
        }
    }
}

/// 一次完整处理的产物
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioOutput {
    #[serde(skip)]
    pub audio: Vec<u8>,
    pub format: AudioFormat,
    pub duration_ms: u64,
    pub segment_count: usize,
    pub character_count: usize,
    pub processing_time_ms: u64,
    pub completed_at: DateTime<Utc>,
    pub segments: Vec<TextSegment>,
    pub characters: Vec<Character>,
    pub assignments: Vec<VoiceAssignment>,
    pub quality_report: Option<WritingQualityReport>,
}
