//! 回声词: 多个角色共用的词汇

use std::collections::{BTreeMap, HashMap};

use super::report::EchoTerm;
use crate::domain::narrative::{SegmentType, TextSegment, NARRATOR, UNKNOWN_SPEAKER};
use crate::domain::tables::PatternTables;
use crate::domain::text;

/// 按说话人统计对话用词，返回被不止一个角色使用的词
///
/// 排序: 总次数降序，再按字母序
pub fn analyze(tables: &PatternTables, segments: &[TextSegment]) -> Vec<EchoTerm> {
    let mut usage: HashMap<String, BTreeMap<String, usize>> = HashMap::new();

    for segment in segments {
        // 只统计说出口的对话，内心独白不算
        if segment.segment_type != SegmentType::Dialogue
            || segment.speaker == NARRATOR
            || segment.speaker == UNKNOWN_SPEAKER
        {
            continue;
        }
        for word in text::lowercase_words(&segment.content) {
            if !is_content_word(tables, &word) {
                continue;
            }
            *usage
                .entry(word)
                .or_default()
                .entry(segment.speaker.clone())
                .or_insert(0) += 1;
        }
    }

    let mut terms: Vec<EchoTerm> = usage
        .into_iter()
        .filter(|(_, speakers)| speakers.len() > 1)
        .map(|(term, speakers)| EchoTerm {
            total: speakers.values().sum(),
            term,
            speakers,
        })
        .collect();
    terms.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.term.cmp(&b.term)));
    terms
}

/// 非停用词、长度达标、非纯数字
pub(crate) fn is_content_word(tables: &PatternTables, word: &str) -> bool {
    word.chars().count() >= tables.min_term_len()
        && !tables.is_stop_word(word)
        && !word.chars().all(|c| c.is_numeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spoken(speaker: &str, content: &str) -> TextSegment {
        TextSegment {
            id: "seg".to_string(),
            content: content.to_string(),
            speaker: speaker.to_string(),
            segment_type: SegmentType::Dialogue,
            start_position: 0,
            end_position: 1,
            attribution_verb: None,
        }
    }

    #[test]
    fn test_shared_terms_sorted() {
        let tables = PatternTables::builtin().unwrap();
        let segments = vec![
            spoken("Alice", "Honestly, the treasure is honestly cursed."),
            spoken("Bob", "Honestly? The treasure is mine."),
            spoken("Bob", "Cursed treasure, cursed map."),
            spoken("Unknown", "treasure treasure treasure"),
            spoken("Alice", "The map is wet."),
        ];
        let terms = analyze(&tables, &segments);
        let summary: Vec<(&str, usize)> = terms.iter().map(|t| (t.term.as_str(), t.total)).collect();
        assert_eq!(
            summary,
            vec![("cursed", 3), ("honestly", 3), ("treasure", 3), ("map", 2)]
        );
        assert_eq!(terms[0].speakers["Bob"], 2);
    }

    #[test]
    fn test_thoughts_are_not_echoes() {
        let tables = PatternTables::builtin().unwrap();
        let mut thought = spoken("Bob", "The treasure is cursed.");
        thought.segment_type = SegmentType::Thought;
        let segments = vec![spoken("Alice", "The treasure is cursed."), thought];
        assert!(analyze(&tables, &segments).is_empty());
    }

    #[test]
    fn test_single_speaker_has_no_echo() {
        let tables = PatternTables::builtin().unwrap();
        let segments = vec![spoken("Alice", "Treasure treasure treasure.")];
        assert!(analyze(&tables, &segments).is_empty());
    }
}
