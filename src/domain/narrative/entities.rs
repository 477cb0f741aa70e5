//! Narrative Context - Entities

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 旁白说话人
pub const NARRATOR: &str = "Narrator";
/// 无法归属的说话人
pub const UNKNOWN_SPEAKER: &str = "Unknown";

/// 片段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentType {
    Dialogue,
    Narration,
    Thought,
}

/// 文本片段
///
/// 不变量（同一次解析内）:
/// - 按位置有序、首尾相接、互不重叠
/// - start_position / end_position 为源文本的字符偏移
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSegment {
    pub id: String,
    pub content: String,
    pub speaker: String,
    #[serde(rename = "type")]
    pub segment_type: SegmentType,
    pub start_position: usize,
    pub end_position: usize,
    /// 归属该片段的说话/思考动词
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution_verb: Option<String>,
}

impl TextSegment {
    pub fn is_narration(&self) -> bool {
        self.segment_type == SegmentType::Narration
    }

    /// 对话或内心独白
    pub fn is_spoken(&self) -> bool {
        !self.is_narration()
    }

    pub fn len_chars(&self) -> usize {
        self.end_position - self.start_position
    }
}

/// 引号/独白匹配的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// 引号括起的对话
    Quote,
    /// 由思考动词引出的内心独白，verb_start 为动词的字节偏移
    ThoughtClause { verb_start: usize },
}

/// 对话匹配（字节偏移）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueMatch {
    pub start: usize,
    pub end: usize,
    pub content_start: usize,
    pub content_end: usize,
    pub kind: MatchKind,
}

/// 说话动词匹配（字节偏移）
#[derive(Debug, Clone, PartialEq)]
pub struct AttributionMatch {
    pub verb: String,
    pub start: usize,
    pub end: usize,
    pub speaker: Option<String>,
    pub confidence: f64,
    pub is_thought: bool,
}

/// 角色
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub name: String,
    /// 片段计数
    pub frequency: usize,
    pub characteristics: BTreeSet<String>,
    pub emotional_states: BTreeSet<String>,
    pub is_main_character: bool,
    /// 首次出现的片段索引
    pub first_appearance: usize,
}

impl Character {
    pub fn new(name: impl Into<String>, first_appearance: usize) -> Self {
        Self {
            name: name.into(),
            frequency: 0,
            characteristics: BTreeSet::new(),
            emotional_states: BTreeSet::new(),
            is_main_character: false,
            first_appearance,
        }
    }

    pub fn is_narrator(&self) -> bool {
        self.name == NARRATOR
    }
}
