//! 叙事分段器
//!
//! 将原始文本切分为有序、首尾相接的旁白/对话/独白片段，并解析说话人。
//!
//! 流程:
//! 1. 引号扫描 -> 对话匹配
//! 2. 说话/思考动词扫描 -> 归属匹配（附带候选说话人）
//! 3. 思考动词引出的独白 -> 额外的对话匹配
//! 4. 合并、排序、去重
//! 5. 从左到右输出片段，空隙为旁白
//!
//! 说话人解析: 引号之后窗口内最近的归属优先，其次引号之前窗口内最近的归属，
//! 都没有则为 "Unknown"。

use std::sync::Arc;

use super::attribution;
use super::entities::{
    AttributionMatch, DialogueMatch, MatchKind, SegmentType, TextSegment, NARRATOR,
    UNKNOWN_SPEAKER,
};
use super::errors::NarrativeError;
use crate::domain::tables::PatternTables;
use crate::domain::text::{self, CharIndex};

/// 默认归属窗口（字符）
pub const DEFAULT_ATTRIBUTION_WINDOW: usize = 50;
/// 默认输入上限（字符）
pub const DEFAULT_MAX_INPUT_CHARS: usize = 1_000_000;

/// 分段配置
#[derive(Debug, Clone, Copy)]
pub struct SegmenterConfig {
    /// 引号与归属动词之间允许的最大字符距离
    pub attribution_window: usize,
    pub max_input_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            attribution_window: DEFAULT_ATTRIBUTION_WINDOW,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }
}

/// 已解析的归属
struct Resolution<'a> {
    attribution: Option<&'a AttributionMatch>,
    /// 归属位于引号之后
    after: bool,
}

/// 叙事分段器
#[derive(Debug, Clone)]
pub struct Segmenter {
    tables: Arc<PatternTables>,
    config: SegmenterConfig,
}

impl Segmenter {
    pub fn new(tables: Arc<PatternTables>, config: SegmenterConfig) -> Self {
        Self { tables, config }
    }

    pub fn tables(&self) -> &Arc<PatternTables> {
        &self.tables
    }

    pub fn config(&self) -> SegmenterConfig {
        self.config
    }

    /// 解析文本
    ///
    /// 仅在输入超过上限时失败；空白文本返回空列表
    pub fn parse(&self, text: &str) -> Result<Vec<TextSegment>, NarrativeError> {
        let index = CharIndex::new(text);
        if index.char_len() > self.config.max_input_chars {
            return Err(NarrativeError::InputTooLarge {
                len: index.char_len(),
                max: self.config.max_input_chars,
            });
        }
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let quotes = attribution::find_quotes(&self.tables, text);
        let thoughts = attribution::find_thought_clauses(&self.tables, text, &quotes);
        let attributions = attribution::find_attributions(
            &self.tables,
            text,
            &index,
            &quotes,
            self.config.attribution_window,
        );

        let mut all = quotes;
        all.extend(thoughts);
        let mut matches = attribution::merge_matches(all);
        // 只含空白的引号没有可朗读的内容，留在旁白里
        matches.retain(|m| !text[m.content_start..m.content_end].trim().is_empty());

        let segments = self.emit(text, &index, &matches, &attributions);
        tracing::debug!(
            chars = index.char_len(),
            dialogue_matches = matches.len(),
            attributions = attributions.len(),
            segments = segments.len(),
            "Text segmented"
        );
        Ok(segments)
    }

    fn emit(
        &self,
        text: &str,
        index: &CharIndex,
        matches: &[DialogueMatch],
        attributions: &[AttributionMatch],
    ) -> Vec<TextSegment> {
        let mut builder = SegmentBuilder::new(text, index);
        let mut cursor = 0;
        let candidates: Vec<&AttributionMatch> =
            attributions.iter().filter(|a| a.speaker.is_some()).collect();

        for (i, m) in matches.iter().enumerate() {
            let next_start = matches.get(i + 1).map_or(text.len(), |n| n.start);
            let resolution = self.resolve(index, m, matches.get(i + 1), &candidates);

            let mut end = m.end;
            if let (true, Some(attr)) = (resolution.after, resolution.attribution) {
                if same_sentence(&text[m.end..attr.start]) {
                    end = extend_over_clause(text, attr.end, next_start);
                }
            }

            let start = if text[cursor..m.start].trim().is_empty() {
                cursor
            } else {
                builder.narration(cursor, m.start);
                m.start
            };

            let content = text[m.content_start..m.content_end].trim();
            let (speaker, verb) = match resolution.attribution {
                Some(attr) => (attr.speaker.clone(), Some(attr.verb.clone())),
                None => (None, None),
            };
            let is_thought = matches!(m.kind, MatchKind::ThoughtClause { .. })
                || resolution.attribution.map_or(false, |a| a.is_thought);
            let segment_type = if is_thought {
                SegmentType::Thought
            } else {
                SegmentType::Dialogue
            };

            builder.push(
                start,
                end,
                content,
                speaker.unwrap_or_else(|| UNKNOWN_SPEAKER.to_string()),
                segment_type,
                verb,
            );
            cursor = end;
        }

        if cursor < text.len() {
            if text[cursor..].trim().is_empty() {
                builder.extend_last(text.len());
            } else {
                builder.narration(cursor, text.len());
            }
        }

        builder.finish()
    }

    /// 为匹配选择归属
    ///
    /// `candidates` 为带说话人的归属，按起点排序且互不重叠
    fn resolve<'a>(
        &self,
        index: &CharIndex,
        m: &DialogueMatch,
        next: Option<&DialogueMatch>,
        candidates: &[&'a AttributionMatch],
    ) -> Resolution<'a> {
        let window = self.config.attribution_window;

        // 独白片段使用引出它的动词
        if let MatchKind::ThoughtClause { verb_start } = m.kind {
            let attribution = candidates
                .binary_search_by_key(&verb_start, |a| a.start)
                .ok()
                .map(|i| candidates[i]);
            return Resolution {
                attribution,
                after: false,
            };
        }

        // 引号之后第一个归属即距离最近者
        let limit = next.map_or(usize::MAX, |n| n.start);
        let first_after = candidates.partition_point(|a| a.start < m.end);
        if let Some(&attr) = candidates.get(first_after) {
            if attr.start < limit && index.to_char(attr.start) - index.to_char(m.end) <= window {
                return Resolution {
                    attribution: Some(attr),
                    after: true,
                };
            }
        }

        // 终点同样有序，引号之前的最后一个归属即距离最近者
        let before_end = candidates.partition_point(|a| a.end <= m.start);
        let before = before_end
            .checked_sub(1)
            .map(|i| candidates[i])
            .filter(|a| index.to_char(m.start) - index.to_char(a.end) <= window);
        Resolution {
            attribution: before,
            after: false,
        }
    }
}

/// 引号与其后归属之间没有句末标点或换行
fn same_sentence(between: &str) -> bool {
    !between
        .chars()
        .any(|c| matches!(c, '.' | '!' | '?' | '…' | '\n'))
}

/// 将对话片段延伸到归属子句的句末（不超过下一个匹配或换行）
fn extend_over_clause(text: &str, from: usize, limit: usize) -> usize {
    let region = &text[from..limit];
    let region = match region.find('\n') {
        Some(nl) => &region[..nl],
        None => region,
    };

    let mut chars = region.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?' | '…') {
            let mut end = i + c.len_utf8();
            while let Some(&(j, n)) = chars.peek() {
                if matches!(n, '.' | '!' | '?' | '…' | '"' | '”' | '\'' | '’' | ')') {
                    end = j + n.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            return from + end;
        }
    }
    from + region.trim_end().len()
}

/// 片段构建器：负责 id 编号和字节 -> 字符偏移换算
struct SegmentBuilder<'a> {
    text: &'a str,
    index: &'a CharIndex,
    segments: Vec<TextSegment>,
}

impl<'a> SegmentBuilder<'a> {
    fn new(text: &'a str, index: &'a CharIndex) -> Self {
        Self {
            text,
            index,
            segments: Vec::new(),
        }
    }

    fn narration(&mut self, start: usize, end: usize) {
        let content = self.text[start..end].trim();
        self.push(start, end, content, NARRATOR.to_string(), SegmentType::Narration, None);
    }

    fn push(
        &mut self,
        start: usize,
        end: usize,
        content: &str,
        speaker: String,
        segment_type: SegmentType,
        attribution_verb: Option<String>,
    ) {
        let id = format!("seg_{:04}", self.segments.len());
        self.segments.push(TextSegment {
            id,
            content: content.to_string(),
            speaker,
            segment_type,
            start_position: self.index.to_char(start),
            end_position: self.index.to_char(end),
            attribution_verb,
        });
    }

    /// 尾部空白并入最后一个片段
    fn extend_last(&mut self, end: usize) {
        let end = self.index.to_char(end);
        if let Some(last) = self.segments.last_mut() {
            last.end_position = end;
        }
    }

    fn finish(self) -> Vec<TextSegment> {
        self.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn segmenter() -> Segmenter {
        Segmenter::new(
            Arc::new(PatternTables::builtin().unwrap()),
            SegmenterConfig::default(),
        )
    }

    fn assert_coverage(text: &str, segments: &[TextSegment]) {
        let total = text.chars().count();
        assert_eq!(segments.first().unwrap().start_position, 0);
        assert_eq!(segments.last().unwrap().end_position, total);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end_position, pair[1].start_position);
        }
        for s in segments {
            assert!(s.start_position < s.end_position);
        }
    }

    #[test]
    fn test_thought_after_narration() {
        let text = "Sarah looked up. \"Is he coming?\" she wondered.";
        let segments = segmenter().parse(text).unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].segment_type, SegmentType::Narration);
        assert_eq!(segments[0].content, "Sarah looked up.");
        assert_eq!(segments[0].speaker, NARRATOR);

        assert_eq!(segments[1].segment_type, SegmentType::Thought);
        assert_eq!(segments[1].content, "Is he coming?");
        assert_eq!(segments[1].speaker, "Sarah");
        assert_eq!(segments[1].attribution_verb.as_deref(), Some("wondered"));
        assert_coverage(text, &segments);
    }

    #[test]
    fn test_plain_narration() {
        let text = "The rain fell all night.";
        let segments = segmenter().parse(text).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].speaker, NARRATOR);
        assert_eq!(segments[0].segment_type, SegmentType::Narration);
        assert_eq!(segments[0].start_position, 0);
        assert_eq!(segments[0].end_position, text.chars().count());
        assert_eq!(segments[0].content, text);
    }

    #[test]
    fn test_empty_text() {
        assert!(segmenter().parse("").unwrap().is_empty());
        assert!(segmenter().parse("  \n ").unwrap().is_empty());
    }

    #[test]
    fn test_conversation_coverage_and_speakers() {
        let text = "The door creaked open.\n\n\"Who's there?\" asked Tom. \
                    A long silence followed. \"Only me,\" Alice replied softly. \
                    \"Come in.\"";
        let segments = segmenter().parse(text).unwrap();
        assert_coverage(text, &segments);

        let spoken: Vec<(&str, &str)> = segments
            .iter()
            .filter(|s| s.is_spoken())
            .map(|s| (s.content.as_str(), s.speaker.as_str()))
            .collect();
        assert_eq!(
            spoken,
            vec![
                ("Who's there?", "Tom"),
                ("Only me,", "Alice"),
                ("Come in.", "Alice"),
            ]
        );
    }

    #[test]
    fn test_attribution_before_quote() {
        let text = "Bob said, \"Fine.\"";
        let segments = segmenter().parse(text).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].content, "Bob said,");
        assert_eq!(segments[1].speaker, "Bob");
        assert_eq!(segments[1].segment_type, SegmentType::Dialogue);
    }

    #[test]
    fn test_unattributed_quote_is_unknown() {
        let text = "\"Hello?\"";
        let segments = segmenter().parse(text).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].speaker, UNKNOWN_SPEAKER);
        assert!(segments[0].attribution_verb.is_none());
    }

    #[test]
    fn test_attribution_outside_window_ignored() {
        let text = format!("\"Hi.\"{} Tom said nothing.", " ".repeat(80));
        let segments = segmenter().parse(&text).unwrap();
        assert_eq!(segments[0].speaker, UNKNOWN_SPEAKER);
        assert_coverage(&text, &segments);
    }

    #[test]
    fn test_thought_clause_segment() {
        let text = "Ben thought, this is a trap. He ran.";
        let segments = segmenter().parse(text).unwrap();
        assert_coverage(text, &segments);
        let thought = segments
            .iter()
            .find(|s| s.segment_type == SegmentType::Thought)
            .unwrap();
        assert_eq!(thought.content, "this is a trap.");
        assert_eq!(thought.speaker, "Ben");
    }

    #[test]
    fn test_multibyte_offsets_are_chars() {
        let text = "Zoë smiled. “Voilà,” said Zoë.";
        let segments = segmenter().parse(text).unwrap();
        assert_coverage(text, &segments);
        let dialogue = &segments[1];
        assert_eq!(dialogue.content, "Voilà,");
        assert_eq!(dialogue.speaker, "Zoë");
    }

    #[test]
    fn test_blank_quote_stays_in_narration() {
        let text = "Tom paused. \" \" said Tom. \"Go.\"";
        let segments = segmenter().parse(text).unwrap();
        assert_coverage(text, &segments);
        assert!(segments.iter().all(|s| !s.content.is_empty()));

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].segment_type, SegmentType::Narration);
        assert_eq!(segments[0].content, "Tom paused. \" \" said Tom.");
        assert_eq!(segments[1].segment_type, SegmentType::Dialogue);
        assert_eq!(segments[1].content, "Go.");
        assert_eq!(segments[1].speaker, "Tom");
    }

    #[test]
    fn test_long_conversation_scales() {
        let text = "\"Hi there,\" said Tom. Ann looked over. ".repeat(20_000);
        let started = Instant::now();
        let segments = segmenter().parse(&text).unwrap();
        let elapsed = started.elapsed();

        assert_eq!(segments.len(), 40_000);
        assert_coverage(&text, &segments);
        let dialogue: Vec<&TextSegment> = segments
            .iter()
            .filter(|s| s.segment_type == SegmentType::Dialogue)
            .collect();
        assert_eq!(dialogue.len(), 20_000);
        assert!(dialogue.iter().all(|s| s.speaker == "Tom"));
        assert!(
            elapsed < Duration::from_secs(10),
            "segmenting took {:?}",
            elapsed
        );
    }

    #[test]
    fn test_input_too_large() {
        let segmenter = Segmenter::new(
            Arc::new(PatternTables::builtin().unwrap()),
            SegmenterConfig {
                attribution_window: 50,
                max_input_chars: 10,
            },
        );
        let err = segmenter.parse("This text is far too long.").unwrap_err();
        assert!(matches!(err, NarrativeError::InputTooLarge { max: 10, .. }));
    }
}
