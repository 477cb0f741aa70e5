//! Quality Context - 写作质量限界上下文
//!
//! 职责:
//! - show vs tell、套路、紫色文风、可读性检测
//! - 对话权力关系与回声词
//! - 色板提取与总分

mod analyzer;
mod errors;
mod report;

pub mod echo;
pub mod palette;
pub mod power;
pub mod purple_prose;
pub mod readability;
pub mod show_tell;
pub mod tropes;

pub use analyzer::{
    overall_score, AnalysisSettings, QualityAnalyzer, DEFAULT_READABILITY_CHUNK_SIZE,
};
pub use errors::QualityError;
pub use purple_prose::PurpleProseOptions;
pub use report::{
    ColorPalette, ColorUsage, EchoTerm, OverallScore, PowerBalance, PowerTactic, PowerTurn,
    ProseSeverity, PurpleProseIssue, PurpleProseKind, QualityIssue, ReadabilityBand,
    ReadabilityPoint, Severity, ShowTellIssue, ShowTellKind, TropeCategory, TropeMatch,
    WritingQualityReport,
};
