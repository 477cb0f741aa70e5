//! 辞藻堆砌检测
//!
//! 副词堆叠、华丽词、冗余修饰、冗长比喻、超长句。

use regex::Regex;
use std::sync::LazyLock;

use super::report::{ProseSeverity, PurpleProseIssue, PurpleProseKind};
use crate::domain::tables::{PatternTables, PurpleProseTable};
use crate::domain::text::{self, CharIndex, Word};

/// 逗号分隔的修饰词串，后接被修饰词
static ADJECTIVE_STACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[a-z]+(?:,\s+(?:and\s+)?[a-z]+)+\s+[a-z]+\b")
        .expect("Invalid adjective stack regex")
});

/// 分析配置
#[derive(Debug, Clone, Copy)]
pub struct PurpleProseOptions {
    /// 覆盖规则表中的超长句阈值
    pub long_sentence_chars: Option<usize>,
}

pub fn analyze(
    tables: &PatternTables,
    text: &str,
    options: PurpleProseOptions,
) -> Vec<PurpleProseIssue> {
    let index = CharIndex::new(text);
    let table = tables.purple_prose();
    let mut collector = Collector {
        text,
        index: &index,
        issues: Vec::new(),
    };

    let words = text::words(text);
    adverb_stacking(tables, table, text, &words, &mut collector);
    flowery_language(tables, table, text, &words, &mut collector);
    redundancy(tables, table, text, &mut collector);
    similes(tables, table, &mut collector);
    long_sentences(table, text, options, &mut collector);

    let mut issues = collector.issues;
    issues.sort_by_key(|i| (i.start, i.end));
    issues
}

struct Collector<'a> {
    text: &'a str,
    index: &'a CharIndex,
    issues: Vec<PurpleProseIssue>,
}

impl Collector<'_> {
    fn push(
        &mut self,
        kind: PurpleProseKind,
        start: usize,
        end: usize,
        severity: ProseSeverity,
        hint: &str,
    ) {
        self.issues.push(PurpleProseIssue {
            kind,
            text: self.text[start..end].to_string(),
            start: self.index.to_char(start),
            end: self.index.to_char(end),
            severity,
            suggestion: hint.to_string(),
        });
    }
}

fn is_adverb(tables: &PatternTables, word: &str) -> bool {
    let lower = word.to_lowercase();
    lower.len() > 3 && lower.ends_with("ly") && !tables.is_adverb_exclusion(&lower)
}

/// 两个词之间只隔空白、逗号或 and
fn joined(text: &str, prev: &Word<'_>, next: &Word<'_>) -> bool {
    let between = text[prev.end..next.start].replace(',', " ");
    let between = between.trim();
    between.is_empty() || between.eq_ignore_ascii_case("and")
}

fn adverb_stacking(
    tables: &PatternTables,
    table: &PurpleProseTable,
    text: &str,
    words: &[Word<'_>],
    out: &mut Collector<'_>,
) {
    let mut run: Vec<Word<'_>> = Vec::new();
    for w in words {
        if !is_adverb(tables, w.text) {
            // "quickly and quietly" 中的 and 不打断
            if !run.is_empty() && w.text.eq_ignore_ascii_case("and") {
                continue;
            }
            flush_adverbs(table, &run, out);
            run.clear();
            continue;
        }
        if let Some(prev) = run.last() {
            if !joined(text, prev, w) {
                flush_adverbs(table, &run, out);
                run.clear();
            }
        }
        run.push(*w);
    }
    flush_adverbs(table, &run, out);
}

fn flush_adverbs(table: &PurpleProseTable, run: &[Word<'_>], out: &mut Collector<'_>) {
    let (Some(first), Some(last)) = (run.first(), run.last()) else {
        return;
    };
    if run.len() < table.adverb_min_run {
        return;
    }
    let severity = if run.len() >= table.adverb_severe_run {
        ProseSeverity::Severe
    } else if run.len() >= table.adverb_moderate_run {
        ProseSeverity::Moderate
    } else {
        ProseSeverity::Mild
    };
    out.push(
        PurpleProseKind::AdverbStacking,
        first.start,
        last.end,
        severity,
        &table.adverb_hint,
    );
}

/// 同一句中的华丽词合并为一条: 1 个 mild，2 个 moderate，更多 severe
fn flowery_language(
    tables: &PatternTables,
    table: &PurpleProseTable,
    text: &str,
    words: &[Word<'_>],
    out: &mut Collector<'_>,
) {
    // 句子与单词都按位置排序，用同一个游标向前扫描
    let mut cursor = 0;
    for sentence in text::sentences(text) {
        while words.get(cursor).map_or(false, |w| w.start < sentence.start) {
            cursor += 1;
        }
        let mut hits: Vec<&Word<'_>> = Vec::new();
        while let Some(w) = words.get(cursor) {
            if w.start >= sentence.end {
                break;
            }
            if w.end <= sentence.end && tables.is_flowery(&w.text.to_lowercase()) {
                hits.push(w);
            }
            cursor += 1;
        }
        let (Some(first), Some(last)) = (hits.first(), hits.last()) else {
            continue;
        };
        let severity = match hits.len() {
            1 => ProseSeverity::Mild,
            2 => ProseSeverity::Moderate,
            _ => ProseSeverity::Severe,
        };
        out.push(
            PurpleProseKind::FloweryLanguage,
            first.start,
            last.end,
            severity,
            &table.flowery_hint,
        );
    }
}

fn redundancy(
    tables: &PatternTables,
    table: &PurpleProseTable,
    text: &str,
    out: &mut Collector<'_>,
) {
    if let Some(regex) = tables.redundancy_regex() {
        for m in regex.find_iter(text) {
            out.push(
                PurpleProseKind::RedundantDescription,
                m.start(),
                m.end(),
                ProseSeverity::Moderate,
                &table.redundancy_hint,
            );
        }
    }

    for m in ADJECTIVE_STACK.find_iter(text) {
        let items = m.as_str().matches(',').count() + 1;
        if items < table.adjective_stack_min {
            continue;
        }
        let severity = if items >= table.adjective_stack_severe {
            ProseSeverity::Severe
        } else {
            ProseSeverity::Moderate
        };
        out.push(
            PurpleProseKind::RedundantDescription,
            m.start(),
            m.end(),
            severity,
            &table.redundancy_hint,
        );
    }
}

fn similes(tables: &PatternTables, table: &PurpleProseTable, out: &mut Collector<'_>) {
    let text = out.text;
    for pattern in tables.similes() {
        for m in pattern.find_iter(text) {
            let words = text::word_count(m.as_str());
            let severity = if words >= table.simile_severe_words {
                ProseSeverity::Severe
            } else if words >= table.simile_moderate_words {
                ProseSeverity::Moderate
            } else {
                ProseSeverity::Mild
            };
            out.push(
                PurpleProseKind::OverwroughtSimile,
                m.start(),
                m.end(),
                severity,
                &table.simile_hint,
            );
        }
    }
}

fn long_sentences(
    table: &PurpleProseTable,
    text: &str,
    options: PurpleProseOptions,
    out: &mut Collector<'_>,
) {
    let threshold = options
        .long_sentence_chars
        .unwrap_or(table.long_sentence_chars);
    let severe = table.long_sentence_severe_chars.max(threshold);

    for sentence in text::sentences(text) {
        let len = sentence.slice(text).chars().count();
        if len <= threshold {
            continue;
        }
        let severity = if len > severe {
            ProseSeverity::Severe
        } else {
            ProseSeverity::Moderate
        };
        out.push(
            PurpleProseKind::LongSentence,
            sentence.start,
            sentence.end,
            severity,
            &table.long_sentence_hint,
        );
    }
}
