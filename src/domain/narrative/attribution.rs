//! 对话与归属扫描
//!
//! Segmenter 与 CharacterExtractor 共用的底层匹配。全部使用字节偏移。

use std::cmp::Reverse;

use super::entities::{AttributionMatch, DialogueMatch, MatchKind};
use crate::domain::tables::PatternTables;
use crate::domain::text::{self, CharIndex};

/// 紧跟动词的人名（`said Alice`）
const AFTER_VERB_CONFIDENCE: f64 = 0.9;
/// 回溯窗口内最近人名的基础置信度
const LOOKBACK_CONFIDENCE: f64 = 0.8;
/// 回溯距离带来的最大衰减
const LOOKBACK_DECAY: f64 = 0.3;

/// 扫描所有引号对话
pub(crate) fn find_quotes(tables: &PatternTables, text: &str) -> Vec<DialogueMatch> {
    let mut found = Vec::new();
    for quote in tables.quotes() {
        let spans = match &quote.regex {
            Some(regex) => regex.find_iter(text).map(|m| (m.start(), m.end())).collect(),
            None => scan_bounded(text, quote.open, quote.close),
        };
        for (start, end) in spans {
            found.push(DialogueMatch {
                start,
                end,
                content_start: start + quote.open.len_utf8(),
                content_end: end - quote.close.len_utf8(),
                kind: MatchKind::Quote,
            });
        }
    }
    merge_matches(found)
}

/// 单引号扫描
///
/// 左引号前、右引号后都不能是字母数字，以排除撇号（don't、students'）
fn scan_bounded(text: &str, open: char, close: char) -> Vec<(usize, usize)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let is_boundary = |idx: Option<usize>| match idx.and_then(|i| chars.get(i)) {
        None => true,
        Some(&(_, c)) => !c.is_alphanumeric(),
    };

    let mut spans = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let (byte, c) = chars[i];
        let opens = c == open
            && is_boundary(i.checked_sub(1))
            && chars.get(i + 1).map_or(false, |&(_, n)| !n.is_whitespace());
        if opens {
            let mut close_at = None;
            for j in (i + 2)..chars.len() {
                let (_, cj) = chars[j];
                if cj == '\n' {
                    break;
                }
                if cj == close && !chars[j - 1].1.is_whitespace() && is_boundary(Some(j + 1)) {
                    close_at = Some(j);
                    break;
                }
            }
            if let Some(j) = close_at {
                spans.push((byte, chars[j].0 + close.len_utf8()));
                i = j + 1;
                continue;
            }
        }
        i += 1;
    }
    spans
}

/// 合并匹配：按起点排序，去掉完全相同的区间，丢弃与已接受区间重叠的匹配
pub(crate) fn merge_matches(mut matches: Vec<DialogueMatch>) -> Vec<DialogueMatch> {
    matches.sort_by_key(|m| (m.start, Reverse(m.end)));
    let mut merged: Vec<DialogueMatch> = Vec::with_capacity(matches.len());
    for m in matches {
        match merged.last() {
            Some(last) if m.start < last.end => continue,
            _ => merged.push(m),
        }
    }
    merged
}

/// 位置是否落在某个引号内
///
/// `quotes` 须为 `merge_matches` 的输出：按起点排序且互不重叠，因此终点同样有序
pub(crate) fn inside_quote(quotes: &[DialogueMatch], pos: usize) -> bool {
    let i = quotes.partition_point(|q| q.start <= pos);
    i > 0 && pos < quotes[i - 1].end
}

/// 区间 [start, end) 是否与某个引号相交
fn overlaps_quote(quotes: &[DialogueMatch], start: usize, end: usize) -> bool {
    let i = quotes.partition_point(|q| q.end <= start);
    quotes.get(i).map_or(false, |q| q.start < end)
}

/// 由思考动词引出的内心独白（`He thought, this is wrong.`）
pub(crate) fn find_thought_clauses(
    tables: &PatternTables,
    text: &str,
    quotes: &[DialogueMatch],
) -> Vec<DialogueMatch> {
    let Some(regex) = tables.thought_clause_regex() else {
        return Vec::new();
    };

    regex
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let clause = caps.name("clause")?;
            let span = text::trim_span(text, clause.start(), clause.end())?;
            if overlaps_quote(quotes, whole.start(), span.end) {
                return None;
            }
            Some(DialogueMatch {
                start: span.start,
                end: span.end,
                content_start: span.start,
                content_end: span.end,
                kind: MatchKind::ThoughtClause {
                    verb_start: whole.start(),
                },
            })
        })
        .collect()
}

/// 扫描说话/思考动词并推断候选说话人
///
/// 引号内的动词不算归属
pub(crate) fn find_attributions(
    tables: &PatternTables,
    text: &str,
    index: &CharIndex,
    quotes: &[DialogueMatch],
    window: usize,
) -> Vec<AttributionMatch> {
    tables
        .attribution_verb_regex()
        .find_iter(text)
        .filter(|m| !inside_quote(quotes, m.start()))
        .map(|m| {
            let verb = m.as_str().to_lowercase();
            let is_thought = tables.is_thought_verb(&verb);
            let (speaker, confidence) = match speaker_after(tables, text, m.end()) {
                Some(name) => (Some(name), AFTER_VERB_CONFIDENCE),
                None => match speaker_before(tables, text, index, m.start(), window, quotes)
                {
                    Some((name, distance)) => {
                        let ratio = distance as f64 / window.max(1) as f64;
                        let confidence = (LOOKBACK_CONFIDENCE - LOOKBACK_DECAY * ratio).clamp(0.0, 1.0);
                        (Some(name), confidence)
                    }
                    None => (None, 0.0),
                },
            };
            AttributionMatch {
                verb,
                start: m.start(),
                end: m.end(),
                speaker,
                confidence,
                is_thought,
            }
        })
        .collect()
}

pub(crate) fn is_candidate_name(tables: &PatternTables, word: &str) -> bool {
    text::is_name_like(word)
        && !tables.is_name_stop_word(word)
        && !tables.is_speech_verb(word)
        && !tables.is_thought_verb(word)
}

/// 动词后紧跟的人名
fn speaker_after(tables: &PatternTables, text: &str, verb_end: usize) -> Option<String> {
    let rest = &text[verb_end..];
    let trimmed = rest.trim_start_matches([' ', '\t']);
    if trimmed.len() == rest.len() {
        return None;
    }
    let first = text::leading_word(trimmed)?;
    if !is_candidate_name(tables, first.text) {
        return None;
    }
    Some(first.text.to_string())
}

/// 回溯窗口内最近的人名，返回 (人名, 字符距离)
fn speaker_before(
    tables: &PatternTables,
    text: &str,
    index: &CharIndex,
    verb_start: usize,
    window: usize,
    quotes: &[DialogueMatch],
) -> Option<(String, usize)> {
    let verb_char = index.to_char(verb_start);
    let window_start = index.to_byte(verb_char.saturating_sub(window));
    let slice = &text[window_start..verb_start];

    text::words(slice)
        .into_iter()
        .rev()
        .filter(|w| !inside_quote(quotes, window_start + w.start))
        .find(|w| is_candidate_name(tables, w.text))
        .map(|w| {
            let distance = verb_char - index.to_char(window_start + w.end);
            (w.text.to_string(), distance)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> PatternTables {
        PatternTables::builtin().unwrap()
    }

    #[test]
    fn test_single_quotes_skip_apostrophes() {
        let text = "Tom's dog barked. 'I don't know,' she said.";
        let quotes = find_quotes(&tables(), text);
        assert_eq!(quotes.len(), 1);
        let q = &quotes[0];
        assert_eq!(&text[q.content_start..q.content_end], "I don't know,");
    }

    #[test]
    fn test_nested_quotes_keep_outer() {
        let text = "\"He told me 'run' and left,\" said Ann.";
        let quotes = find_quotes(&tables(), text);
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].start, 0);
    }

    #[test]
    fn test_smart_quotes() {
        let text = "“Hello,” said Mia.";
        let quotes = find_quotes(&tables(), text);
        assert_eq!(quotes.len(), 1);
        assert_eq!(&text[quotes[0].content_start..quotes[0].content_end], "Hello,");
    }

    #[test]
    fn test_attribution_after_verb_wins() {
        let t = tables();
        let text = "Peter waved. \"Hi,\" said Alice.";
        let index = CharIndex::new(text);
        let quotes = find_quotes(&t, text);
        let attrs = find_attributions(&t, text, &index, &quotes, 50);
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].speaker.as_deref(), Some("Alice"));
        assert_eq!(attrs[0].confidence, 0.9);
    }

    #[test]
    fn test_attribution_lookback_skips_quotes_and_pronouns() {
        let t = tables();
        let text = "Sarah looked up. \"Is Mark coming?\" she wondered.";
        let index = CharIndex::new(text);
        let quotes = find_quotes(&t, text);
        let attrs = find_attributions(&t, text, &index, &quotes, 50);
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].speaker.as_deref(), Some("Sarah"));
        assert!(attrs[0].is_thought);
        assert!(attrs[0].confidence > 0.5 && attrs[0].confidence < 0.8);
    }

    #[test]
    fn test_verbs_inside_quotes_ignored() {
        let t = tables();
        let text = "\"I said no!\"";
        let index = CharIndex::new(text);
        let quotes = find_quotes(&t, text);
        assert!(find_attributions(&t, text, &index, &quotes, 50).is_empty());
    }

    #[test]
    fn test_inside_quote_lookup() {
        let text = "\"One,\" he said. 'Two' and \"three.\"";
        let quotes = find_quotes(&tables(), text);
        assert_eq!(quotes.len(), 3);
        for q in &quotes {
            assert!(inside_quote(&quotes, q.start));
            assert!(inside_quote(&quotes, q.end - 1));
            assert!(!inside_quote(&quotes, q.end));
        }
        assert!(!inside_quote(&quotes, text.find("he").unwrap()));
        assert!(!inside_quote(&[], 0));
        assert!(overlaps_quote(&quotes, 0, 1));
        assert!(!overlaps_quote(&quotes, quotes[0].end, quotes[1].start));
    }

    #[test]
    fn test_thought_clause_detected() {
        let t = tables();
        let text = "Ben thought, this is a trap. He ran.";
        let quotes = find_quotes(&t, text);
        let clauses = find_thought_clauses(&t, text, &quotes);
        assert_eq!(clauses.len(), 1);
        assert_eq!(&text[clauses[0].start..clauses[0].end], "this is a trap.");
    }
}
