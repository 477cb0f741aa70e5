//! 规则表的原始（反序列化）结构
//!
//! 与 data/tables.toml 一一对应

use serde::Deserialize;

use crate::domain::quality::ShowTellKind;
use crate::domain::voice::{AgeGroup, Gender, Tone};

#[derive(Debug, Clone, Deserialize)]
pub struct RawTables {
    pub version: String,
    pub dialogue: DialogueTable,
    pub emotions: EmotionTable,
    #[serde(default)]
    pub traits: Vec<TraitRule>,
    pub speech_style: SpeechStyleTable,
    pub voice: VoiceTable,
    pub show_tell: ShowTellTable,
    pub trope_scoring: TropeScoring,
    #[serde(default)]
    pub tropes: Vec<TropeEntry>,
    pub purple_prose: PurpleProseTable,
    pub power: PowerTable,
    #[serde(default)]
    pub colors: Vec<ColorEntry>,
    pub words: WordsTable,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DialogueTable {
    pub speech_verbs: Vec<String>,
    pub thought_verbs: Vec<String>,
    pub name_stop_words: Vec<String>,
    pub quote_styles: Vec<QuoteStyle>,
}

/// 引号样式
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteStyle {
    pub name: String,
    pub open: String,
    pub close: String,
    /// 单引号需要检查边界，避免把撇号当成引号
    #[serde(default)]
    pub boundary_check: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmotionTable {
    pub exclamation: String,
    pub question: String,
    pub shouting: String,
    pub shouting_min_len: usize,
    #[serde(default)]
    pub keywords: Vec<EmotionKeywords>,
    #[serde(default)]
    pub verbs: Vec<EmotionVerb>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmotionKeywords {
    pub emotion: String,
    pub words: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmotionVerb {
    pub verb: String,
    pub emotion: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TraitRule {
    pub label: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechStyleTable {
    pub formal_words: Vec<String>,
    pub casual_words: Vec<String>,
    pub verbose_chars: usize,
    pub terse_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceTable {
    pub narrator_template: String,
    pub male_names: Vec<String>,
    pub female_names: Vec<String>,
    #[serde(default)]
    pub tone_rules: Vec<ToneRule>,
    #[serde(default)]
    pub deltas: Vec<EmotionDelta>,
    pub templates: Vec<VoiceTemplate>,
}

/// 按顺序匹配：越靠前优先级越高
#[derive(Debug, Clone, Deserialize)]
pub struct ToneRule {
    pub tone: Tone,
    pub emotions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmotionDelta {
    pub emotion: String,
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub speed: f64,
}

/// 音色模板
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VoiceTemplate {
    pub id: String,
    pub name: String,
    pub gender: Gender,
    pub age: AgeGroup,
    pub tone: Tone,
    pub pitch: f64,
    pub speed: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShowTellTable {
    pub intensifiers: Vec<String>,
    pub medium_length: usize,
    pub families: Vec<ShowTellFamily>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShowTellFamily {
    pub kind: ShowTellKind,
    pub patterns: Vec<String>,
    pub suggestion: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TropeScoring {
    pub base: f64,
    pub per_additional_trigger: f64,
    pub exact_name_bonus: f64,
    pub min_confidence: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TropeEntry {
    pub name: String,
    pub category: crate::domain::quality::TropeCategory,
    pub triggers: Vec<String>,
    #[serde(default)]
    pub subversions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurpleProseTable {
    pub adverb_min_run: usize,
    pub adverb_moderate_run: usize,
    pub adverb_severe_run: usize,
    pub adverb_exclusions: Vec<String>,
    pub adverb_hint: String,
    pub flowery_words: Vec<String>,
    pub flowery_hint: String,
    pub redundant_pairs: Vec<String>,
    pub adjective_stack_min: usize,
    pub adjective_stack_severe: usize,
    pub redundancy_hint: String,
    pub simile_patterns: Vec<String>,
    pub simile_moderate_words: usize,
    pub simile_severe_words: usize,
    pub simile_hint: String,
    pub long_sentence_chars: usize,
    pub long_sentence_severe_chars: usize,
    pub long_sentence_hint: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PowerTable {
    pub hedges: Vec<String>,
    pub intensifiers: Vec<String>,
    pub politeness: Vec<String>,
    pub ending_phrases: Vec<String>,
    pub leaving_cues: Vec<String>,
    pub pause_cues: Vec<String>,
    pub command_verbs: Vec<String>,
    pub pause_min_words: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColorEntry {
    pub name: String,
    pub hex: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WordsTable {
    pub stop_words: Vec<String>,
    pub min_term_len: usize,
}
