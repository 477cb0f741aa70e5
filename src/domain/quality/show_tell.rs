//! Show vs tell

use super::report::{Severity, ShowTellIssue};
use crate::domain::tables::PatternTables;
use crate::domain::text::{self, CharIndex};

/// 检测直接"告诉"读者的写法
///
/// 严重度: 含强调词为 high，匹配长度超过阈值为 medium，否则 low
pub fn analyze(tables: &PatternTables, text: &str) -> Vec<ShowTellIssue> {
    let index = CharIndex::new(text);
    let table = tables.show_tell_table();
    let mut issues = Vec::new();
    let mut seen: Vec<(usize, usize)> = Vec::new();

    for family in tables.show_tell() {
        for pattern in &family.patterns {
            for m in pattern.find_iter(text) {
                if seen.iter().any(|&(s, e)| m.start() < e && s < m.end()) {
                    continue;
                }
                seen.push((m.start(), m.end()));

                let matched = m.as_str();
                let words = text::lowercase_words(matched);
                let severity = if words
                    .iter()
                    .any(|w| table.intensifiers.iter().any(|i| i == w))
                {
                    Severity::High
                } else if matched.chars().count() > table.medium_length {
                    Severity::Medium
                } else {
                    Severity::Low
                };

                issues.push(ShowTellIssue {
                    kind: family.kind,
                    text: matched.to_string(),
                    start: index.to_char(m.start()),
                    end: index.to_char(m.end()),
                    severity,
                    suggestion: family.suggestion.clone(),
                });
            }
        }
    }

    issues.sort_by_key(|i| i.start);
    issues
}
