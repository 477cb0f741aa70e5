//! 套路检测

use super::report::TropeMatch;
use crate::domain::tables::PatternTables;
use crate::domain::text::{self, CharIndex};

/// 套路检测，每个套路最多一条
///
/// 置信度 = 基础分 + 每个额外命中的不同触发词加分 + 套路名原文出现加分，低于下限的丢弃。
/// 同一触发词重复出现只计入 occurrences
pub fn detect(tables: &PatternTables, text: &str) -> Vec<TropeMatch> {
    let index = CharIndex::new(text);
    let scoring = tables.trope_scoring();
    let lower = text.to_lowercase();
    let mut found = Vec::new();

    for trope in tables.tropes() {
        let mut hits: Vec<(usize, usize)> = Vec::new();
        let mut matched_triggers = 0usize;
        for trigger in &trope.triggers {
            let before = hits.len();
            hits.extend(trigger.find_iter(text).map(|m| (m.start(), m.end())));
            if hits.len() > before {
                matched_triggers += 1;
            }
        }
        if hits.is_empty() {
            continue;
        }
        hits.sort_unstable();
        hits.dedup();

        let mut confidence =
            scoring.base + scoring.per_additional_trigger * (matched_triggers - 1) as f64;
        if text::contains_phrase(&lower, &trope.entry.name.to_lowercase()) {
            confidence += scoring.exact_name_bonus;
        }
        let confidence = text::round2(confidence.min(1.0));
        if confidence < scoring.min_confidence {
            continue;
        }

        let (start, end) = hits[0];
        found.push(TropeMatch {
            name: trope.entry.name.clone(),
            category: trope.entry.category,
            confidence,
            text: text[start..end].to_string(),
            start: index.to_char(start),
            end: index.to_char(end),
            occurrences: hits.len(),
            subversions: trope.entry.subversions.clone(),
        });
    }

    found.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.name.cmp(&b.name)));
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quality::TropeCategory;

    #[test]
    fn test_single_trigger_base_confidence() {
        let tables = PatternTables::builtin().unwrap();
        let found = detect(&tables, "Thunder crashed over the hills.");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Dark and Stormy Night");
        assert_eq!(found[0].category, TropeCategory::Setting);
        assert_eq!(found[0].confidence, 0.5);
        assert_eq!(found[0].occurrences, 1);
    }

    #[test]
    fn test_repeated_trigger_keeps_base_confidence() {
        let tables = PatternTables::builtin().unwrap();
        let found = detect(&tables, "Thunder crashed. Thunder crashed. Thunder crashed.");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].confidence, 0.5);
        assert_eq!(found[0].occurrences, 3);
        assert_eq!(found[0].start, 0);
    }

    #[test]
    fn test_distinct_triggers_raise_confidence() {
        let tables = PatternTables::builtin().unwrap();
        let found = detect(&tables, "Thunder crashed and rain pounded the roof.");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].confidence, 0.7);
        assert_eq!(found[0].occurrences, 2);
    }

    #[test]
    fn test_additional_triggers_and_exact_name() {
        let tables = PatternTables::builtin().unwrap();
        let text = "The prophecy foretold a chosen one. He was destined to rule.";
        let found = detect(&tables, text);
        let chosen = found.iter().find(|t| t.name == "Chosen One").unwrap();
        // 3 个不同触发词 + 名称原文
        assert_eq!(chosen.occurrences, 3);
        assert_eq!(chosen.confidence, 1.0);
        assert_eq!(chosen.text, "prophecy foretold");
        assert!(!chosen.subversions.is_empty());
    }

    #[test]
    fn test_no_tropes() {
        let tables = PatternTables::builtin().unwrap();
        assert!(detect(&tables, "She fixed the bicycle and went to work.").is_empty());
    }
}
