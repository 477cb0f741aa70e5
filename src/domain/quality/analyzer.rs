//! 写作质量分析入口
//!
//! 各子分析只读输入文本，彼此独立，报告生成时并行执行。
//! 单个子分析失败只记入报告的 warnings，不影响其它分析。

use std::sync::Arc;

use chrono::Utc;

use super::errors::QualityError;
use super::purple_prose::PurpleProseOptions;
use super::readability::FALLBACK_SCORE;
use super::report::{
    ColorPalette, EchoTerm, OverallScore, PowerBalance, PurpleProseIssue, ReadabilityPoint,
    ShowTellIssue, TropeMatch, WritingQualityReport,
};
use super::{echo, palette, power, purple_prose, readability, show_tell, tropes};
use crate::domain::narrative::{NarrativeError, Segmenter, TextSegment};
use crate::domain::tables::PatternTables;
use crate::domain::text;

/// 默认每块段落数
pub const DEFAULT_READABILITY_CHUNK_SIZE: usize = 1;

/// 紫色文风罚分上限
const MAX_PROSE_PENALTY: f64 = 60.0;

#[derive(Debug, Clone, Copy)]
pub struct AnalysisSettings {
    pub readability_chunk_size: usize,
    pub long_sentence_chars: Option<usize>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            readability_chunk_size: DEFAULT_READABILITY_CHUNK_SIZE,
            long_sentence_chars: None,
        }
    }
}

/// 写作质量分析器
pub struct QualityAnalyzer {
    tables: Arc<PatternTables>,
    segmenter: Arc<Segmenter>,
    settings: AnalysisSettings,
}

impl QualityAnalyzer {
    pub fn new(segmenter: Arc<Segmenter>, settings: AnalysisSettings) -> Self {
        Self {
            tables: segmenter.tables().clone(),
            segmenter,
            settings,
        }
    }

    pub fn settings(&self) -> AnalysisSettings {
        self.settings
    }

    pub fn readability(&self, text: &str) -> Vec<ReadabilityPoint> {
        readability::analyze(text, self.settings.readability_chunk_size)
    }

    pub fn show_tell(&self, text: &str) -> Vec<ShowTellIssue> {
        show_tell::analyze(&self.tables, text)
    }

    pub fn tropes(&self, text: &str) -> Vec<TropeMatch> {
        tropes::detect(&self.tables, text)
    }

    pub fn purple_prose(&self, text: &str) -> Vec<PurpleProseIssue> {
        purple_prose::analyze(&self.tables, text, self.prose_options())
    }

    pub fn echo_chamber(&self, segments: &[TextSegment]) -> Vec<EchoTerm> {
        echo::analyze(&self.tables, segments)
    }

    pub fn power_balance(&self, segments: &[TextSegment]) -> PowerBalance {
        power::analyze(&self.tables, segments)
    }

    pub fn color_palette(&self, text: &str) -> ColorPalette {
        palette::extract(&self.tables, text)
    }

    fn prose_options(&self) -> PurpleProseOptions {
        PurpleProseOptions {
            long_sentence_chars: self.settings.long_sentence_chars,
        }
    }

    /// 生成完整报告
    ///
    /// 空文本是输入错误；子分析的失败记为 warning，对应部分留空
    pub async fn generate_report(&self, text: &str) -> Result<WritingQualityReport, QualityError> {
        if text.trim().is_empty() {
            return Err(QualityError::EmptyText);
        }
        let max = self.segmenter.config().max_input_chars;
        let len = text.chars().count();
        if len > max {
            return Err(QualityError::InputTooLarge { len, max });
        }

        let source: Arc<str> = Arc::from(text);
        let chunk_size = self.settings.readability_chunk_size;
        let prose_options = self.prose_options();

        let readability_task = isolated("readability", {
            let source = source.clone();
            move || Ok::<_, QualityError>(readability::analyze(&source, chunk_size))
        });
        let show_tell_task = isolated("show_tell", {
            let (tables, source) = (self.tables.clone(), source.clone());
            move || Ok(show_tell::analyze(&tables, &source))
        });
        let tropes_task = isolated("tropes", {
            let (tables, source) = (self.tables.clone(), source.clone());
            move || Ok(tropes::detect(&tables, &source))
        });
        let purple_task = isolated("purple_prose", {
            let (tables, source) = (self.tables.clone(), source.clone());
            move || Ok(purple_prose::analyze(&tables, &source, prose_options))
        });
        let dialogue_task = isolated("dialogue", {
            let (segmenter, source) = (self.segmenter.clone(), source.clone());
            move || {
                let segments = segmenter
                    .parse(&source)
                    .map_err(|e: NarrativeError| QualityError::AnalysisFailed(e.to_string()))?;
                let tables = segmenter.tables();
                Ok((
                    echo::analyze(tables, &segments),
                    power::analyze(tables, &segments),
                ))
            }
        });
        let palette_task = isolated("color_palette", {
            let (tables, source) = (self.tables.clone(), source.clone());
            move || Ok(palette::extract(&tables, &source))
        });

        let (readability_points, show_tell_issues, trope_matches, purple_prose_issues, dialogue, color_palette) = tokio::join!(
            readability_task,
            show_tell_task,
            tropes_task,
            purple_task,
            dialogue_task,
            palette_task
        );

        let mut warnings = Vec::new();
        let readability_points = settle(readability_points, &mut warnings).unwrap_or_default();
        let show_tell_issues = settle(show_tell_issues, &mut warnings).unwrap_or_default();
        let trope_matches = settle(trope_matches, &mut warnings).unwrap_or_default();
        let purple_prose_issues = settle(purple_prose_issues, &mut warnings).unwrap_or_default();
        let (echo_chamber, power_balance) = settle(dialogue, &mut warnings).unwrap_or_default();
        let color_palette =
            settle(color_palette, &mut warnings).unwrap_or(ColorPalette::NoColors);

        let word_count = text::word_count(text);
        let overall_score = overall_score(
            word_count,
            &show_tell_issues,
            &trope_matches,
            &purple_prose_issues,
            &readability_points,
        );

        tracing::info!(
            word_count,
            show_tell = show_tell_issues.len(),
            tropes = trope_matches.len(),
            purple_prose = purple_prose_issues.len(),
            warnings = warnings.len(),
            "Quality report generated"
        );

        Ok(WritingQualityReport {
            readability_points,
            show_tell_issues,
            trope_matches,
            purple_prose_issues,
            echo_chamber,
            power_balance,
            color_palette,
            overall_score,
            word_count,
            tables_version: self.tables.version().to_string(),
            generated_at: Utc::now(),
            warnings,
        })
    }
}

/// 在阻塞线程池上执行，panic 转成带名字的错误
async fn isolated<T, F>(name: &'static str, f: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, QualityError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{}: {}", name, e)),
        Err(e) => Err(format!("{}: {}", name, e)),
    }
}

fn settle<T>(result: Result<T, String>, warnings: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(message) => {
            tracing::warn!(error = %message, "Quality sub-analysis failed");
            warnings.push(message);
            None
        }
    }
}

/// 三项总分，均截断到 [0, 100]
///
/// - show vs tell: 每百词问题数 × 10 扣分
/// - 套路原创度: 每千词套路数 × 20 扣分
/// - 文风清晰度: 平均可读性减去加权紫色文风罚分（上限 60）
pub fn overall_score(
    word_count: usize,
    show_tell_issues: &[ShowTellIssue],
    trope_matches: &[TropeMatch],
    purple_prose_issues: &[PurpleProseIssue],
    readability_points: &[ReadabilityPoint],
) -> OverallScore {
    let avg_readability = if readability_points.is_empty() {
        FALLBACK_SCORE
    } else {
        readability_points.iter().map(|p| p.score).sum::<f64>() / readability_points.len() as f64
    };
    if word_count == 0 {
        return OverallScore {
            show_vs_tell: 100.0,
            trope_originality: 100.0,
            prose_clarity: bounded(avg_readability),
        };
    }

    let words = word_count as f64;
    let per_hundred = show_tell_issues.len() as f64 / words * 100.0;
    let per_thousand = trope_matches.len() as f64 / words * 1000.0;
    let weighted: f64 = purple_prose_issues
        .iter()
        .map(|i| i.severity.weight())
        .sum();
    let prose_penalty = (weighted * 100.0 / words).min(MAX_PROSE_PENALTY);

    OverallScore {
        show_vs_tell: bounded(100.0 - per_hundred * 10.0),
        trope_originality: bounded(100.0 - per_thousand * 20.0),
        prose_clarity: bounded(avg_readability - prose_penalty),
    }
}

fn bounded(score: f64) -> f64 {
    text::round2(score.clamp(0.0, 100.0))
}
