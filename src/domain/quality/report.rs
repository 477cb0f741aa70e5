//! 写作质量报告类型
//!
//! 每类问题都是带 `kind` 判别字段的封闭类型，便于穷尽处理。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// show-vs-tell 子类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowTellKind {
    Emotion,
    State,
    Trait,
    Thought,
}

impl ShowTellKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emotion => "emotion",
            Self::State => "state",
            Self::Trait => "trait",
            Self::Thought => "thought",
        }
    }
}

/// show-vs-tell 严重度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// show-vs-tell 问题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowTellIssue {
    pub kind: ShowTellKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub severity: Severity,
    pub suggestion: String,
}

/// 套路分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TropeCategory {
    Character,
    Plot,
    Setting,
}

/// 套路命中（每个套路一条）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TropeMatch {
    pub name: String,
    pub category: TropeCategory,
    pub confidence: f64,
    /// 首次命中的文本与位置
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub occurrences: usize,
    pub subversions: Vec<String>,
}

/// 辞藻堆砌子类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurpleProseKind {
    AdverbStacking,
    FloweryLanguage,
    RedundantDescription,
    OverwroughtSimile,
    LongSentence,
}

/// 辞藻堆砌严重度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProseSeverity {
    Mild,
    Moderate,
    Severe,
}

impl ProseSeverity {
    /// 清晰度扣分权重
    pub fn weight(&self) -> f64 {
        match self {
            Self::Mild => 2.0,
            Self::Moderate => 5.0,
            Self::Severe => 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurpleProseIssue {
    pub kind: PurpleProseKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub severity: ProseSeverity,
    pub suggestion: String,
}

/// 可读性等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadabilityBand {
    VeryEasy,
    Easy,
    FairlyEasy,
    Standard,
    FairlyDifficult,
    Difficult,
    VeryDifficult,
}

impl ReadabilityBand {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => Self::VeryEasy,
            s if s >= 80.0 => Self::Easy,
            s if s >= 70.0 => Self::FairlyEasy,
            s if s >= 60.0 => Self::Standard,
            s if s >= 50.0 => Self::FairlyDifficult,
            s if s >= 30.0 => Self::Difficult,
            _ => Self::VeryDifficult,
        }
    }
}

/// 一个段落块的可读性
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadabilityPoint {
    pub chunk_index: usize,
    pub start: usize,
    pub end: usize,
    pub score: f64,
    pub band: ReadabilityBand,
    pub word_count: usize,
    pub sentence_count: usize,
}

/// 多个角色共用的词
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoTerm {
    pub term: String,
    pub total: usize,
    pub speakers: BTreeMap<String, usize>,
}

/// 对话策略标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerTactic {
    Interruption,
    WeaponizedPoliteness,
    ExchangeTermination,
    NarrativePause,
}

/// 单轮对话的权力得分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerTurn {
    pub segment_id: String,
    pub speaker: String,
    /// [-5, 5]
    pub score: f64,
    pub is_question: bool,
    pub is_command: bool,
    pub was_interrupted: bool,
    pub hedges: usize,
    pub intensifiers: usize,
    /// 与上一轮的实词重合率
    pub topic_continuity: f64,
    pub tactics: Vec<PowerTactic>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerBalance {
    pub turns: Vec<PowerTurn>,
    pub speaker_averages: BTreeMap<String, f64>,
    pub dominant_speaker: Option<String>,
}

/// 颜色使用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorUsage {
    pub name: String,
    pub hex: String,
    pub frequency: usize,
    /// 占全部颜色词的比例
    pub prominence: f64,
    pub first_position: usize,
}

/// 色板
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ColorPalette {
    #[serde(rename_all = "camelCase")]
    Found {
        dominant: Vec<ColorUsage>,
        accent: Vec<ColorUsage>,
        total_mentions: usize,
    },
    NoColors,
}

impl ColorPalette {
    /// 全部颜色，频率降序
    pub fn colors(&self) -> Vec<&ColorUsage> {
        match self {
            Self::Found {
                dominant, accent, ..
            } => dominant.iter().chain(accent.iter()).collect(),
            Self::NoColors => Vec::new(),
        }
    }
}

/// 总分
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallScore {
    pub show_vs_tell: f64,
    pub trope_originality: f64,
    pub prose_clarity: f64,
}

/// 写作质量报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WritingQualityReport {
    pub readability_points: Vec<ReadabilityPoint>,
    pub show_tell_issues: Vec<ShowTellIssue>,
    pub trope_matches: Vec<TropeMatch>,
    pub purple_prose_issues: Vec<PurpleProseIssue>,
    pub echo_chamber: Vec<EchoTerm>,
    pub power_balance: PowerBalance,
    pub color_palette: ColorPalette,
    pub overall_score: OverallScore,
    pub word_count: usize,
    pub tables_version: String,
    pub generated_at: DateTime<Utc>,
    /// 失败的子分析
    pub warnings: Vec<String>,
}

/// 供界面高亮的统一问题视图
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "issueType", content = "issue", rename_all = "snake_case")]
pub enum QualityIssue<'a> {
    ShowTell(&'a ShowTellIssue),
    Trope(&'a TropeMatch),
    PurpleProse(&'a PurpleProseIssue),
}

impl QualityIssue<'_> {
    pub fn span(&self) -> (usize, usize) {
        match self {
            Self::ShowTell(i) => (i.start, i.end),
            Self::Trope(t) => (t.start, t.end),
            Self::PurpleProse(p) => (p.start, p.end),
        }
    }
}

impl WritingQualityReport {
    /// 所有问题按位置排序
    pub fn highlights(&self) -> Vec<QualityIssue<'_>> {
        let mut issues: Vec<QualityIssue<'_>> = self
            .show_tell_issues
            .iter()
            .map(QualityIssue::ShowTell)
            .chain(self.trope_matches.iter().map(QualityIssue::Trope))
            .chain(self.purple_prose_issues.iter().map(QualityIssue::PurpleProse))
            .collect();
        issues.sort_by_key(|i| i.span());
        issues
    }
}
