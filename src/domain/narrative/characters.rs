//! 角色提取
//!
//! 从片段列表构建角色表，并推断特征与情绪。

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::attribution;
use super::entities::{Character, TextSegment, NARRATOR};
use crate::domain::tables::PatternTables;
use crate::domain::text::{self, CharIndex};

/// 主要角色的最低出场次数
const MAIN_MIN_FREQUENCY: f64 = 2.0;
/// 主要角色的出场占比
const MAIN_FREQUENCY_RATIO: f64 = 0.1;
/// 前几个片段内登场的角色视为主要角色
const MAIN_EARLY_APPEARANCE: usize = 3;
/// 构成"随意"口吻的缩略词数量
const CASUAL_CONTRACTIONS: usize = 2;

/// 角色提取器
#[derive(Debug, Clone)]
pub struct CharacterExtractor {
    tables: Arc<PatternTables>,
    attribution_window: usize,
}

impl CharacterExtractor {
    pub fn new(tables: Arc<PatternTables>, attribution_window: usize) -> Self {
        Self {
            tables,
            attribution_window,
        }
    }

    /// 构建角色表
    ///
    /// 旁白总是存在。输出顺序: 主要角色在前，出场次数降序，首次出现升序。
    pub fn detect(&self, segments: &[TextSegment]) -> Vec<Character> {
        let mut narrator = Character::new(
            NARRATOR,
            segments.iter().position(|s| s.is_narration()).unwrap_or(0),
        );
        narrator.frequency = segments.iter().filter(|s| s.speaker == NARRATOR).count();

        let mut roster: Vec<Character> = vec![narrator];
        let mut positions: HashMap<String, usize> = HashMap::new();

        for (i, segment) in segments.iter().enumerate() {
            if segment.speaker == NARRATOR {
                continue;
            }
            let slot = *positions.entry(segment.speaker.clone()).or_insert_with(|| {
                roster.push(Character::new(segment.speaker.clone(), i));
                roster.len() - 1
            });
            let character = &mut roster[slot];
            character.frequency += 1;

            character
                .emotional_states
                .extend(self.infer_emotions(&segment.content, segment.attribution_verb.as_deref()));
            character.characteristics.extend(self.infer_traits(&segment.content));
            character.characteristics.extend(self.speech_style(&segment.content));

            let name_lower = segment.speaker.to_lowercase();
            let neighbours = [i.checked_sub(1), Some(i + 1)];
            for neighbour in neighbours.into_iter().flatten() {
                let Some(n) = segments.get(neighbour) else {
                    continue;
                };
                if n.is_narration() && text::contains_phrase(&n.content.to_lowercase(), &name_lower)
                {
                    character.characteristics.extend(self.infer_traits(&n.content));
                }
            }
        }

        let threshold = MAIN_MIN_FREQUENCY.max(MAIN_FREQUENCY_RATIO * segments.len() as f64);
        for character in roster.iter_mut() {
            character.is_main_character = character.is_narrator()
                || character.frequency as f64 >= threshold
                || character.first_appearance < MAIN_EARLY_APPEARANCE;
        }

        roster.sort_by(|a, b| {
            b.is_main_character
                .cmp(&a.is_main_character)
                .then(b.frequency.cmp(&a.frequency))
                .then(a.first_appearance.cmp(&b.first_appearance))
        });

        tracing::debug!(
            segments = segments.len(),
            characters = roster.len(),
            "Characters detected"
        );
        roster
    }

    /// 直接从原始文本发现说话人（不做完整分段），按发现顺序去重
    pub fn identify_speakers(&self, text: &str) -> Vec<String> {
        let index = CharIndex::new(text);
        let quotes = attribution::find_quotes(&self.tables, text);
        let attributions = attribution::find_attributions(
            &self.tables,
            text,
            &index,
            &quotes,
            self.attribution_window,
        );

        let mut seen = BTreeSet::new();
        attributions
            .into_iter()
            .filter_map(|a| a.speaker)
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    /// 情绪推断：标点、全大写、关键词、说话动词
    pub fn infer_emotions(&self, content: &str, verb: Option<&str>) -> BTreeSet<String> {
        let table = self.tables.emotions();
        let mut emotions = BTreeSet::new();

        if content.contains('!') {
            emotions.insert(table.exclamation.clone());
        }
        if content.contains('?') {
            emotions.insert(table.question.clone());
        }
        let shouting = text::words(content).iter().any(|w| {
            let letters: Vec<char> = w.text.chars().filter(|c| c.is_alphabetic()).collect();
            letters.len() >= table.shouting_min_len && letters.iter().all(|c| c.is_uppercase())
        });
        if shouting {
            emotions.insert(table.shouting.clone());
        }

        let lower = content.to_lowercase();
        for group in &table.keywords {
            if group.words.iter().any(|w| text::contains_phrase(&lower, w)) {
                emotions.insert(group.emotion.clone());
            }
        }

        if let Some(verb) = verb {
            let verb = verb.to_lowercase();
            if let Some(entry) = table.verbs.iter().find(|v| v.verb == verb) {
                emotions.insert(entry.emotion.clone());
            }
        }
        emotions
    }

    /// 关键词特征（年龄、气质）
    pub fn infer_traits(&self, content: &str) -> BTreeSet<String> {
        let lower = content.to_lowercase();
        self.tables
            .traits()
            .iter()
            .filter(|rule| rule.keywords.iter().any(|k| text::contains_phrase(&lower, k)))
            .map(|rule| rule.label.clone())
            .collect()
    }

    /// 说话风格特征
    fn speech_style(&self, content: &str) -> Vec<String> {
        let style = self.tables.speech_style();
        let lower = content.to_lowercase();
        let words = text::lowercase_words(content);
        let mut traits = Vec::new();

        if style.formal_words.iter().any(|w| text::contains_phrase(&lower, w)) {
            traits.push("formal".to_string());
        }
        let contractions = words.iter().filter(|w| w.contains('\'')).count();
        if style.casual_words.iter().any(|w| text::contains_phrase(&lower, w))
            || contractions >= CASUAL_CONTRACTIONS
        {
            traits.push("casual".to_string());
        }

        let len = content.chars().count();
        if len > style.verbose_chars {
            traits.push("verbose".to_string());
        } else if len < style.terse_chars {
            traits.push("terse".to_string());
        }
        traits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::narrative::{SegmentType, Segmenter, SegmenterConfig};

    fn tables() -> Arc<PatternTables> {
        Arc::new(PatternTables::builtin().unwrap())
    }

    fn extractor() -> CharacterExtractor {
        CharacterExtractor::new(tables(), 50)
    }

    fn segment(i: usize, speaker: &str, content: &str) -> TextSegment {
        let segment_type = if speaker == NARRATOR {
            SegmentType::Narration
        } else {
            SegmentType::Dialogue
        };
        TextSegment {
            id: format!("seg_{:04}", i),
            content: content.to_string(),
            speaker: speaker.to_string(),
            segment_type,
            start_position: i * 10,
            end_position: i * 10 + 10,
            attribution_verb: None,
        }
    }

    #[test]
    fn test_two_main_characters_in_twenty_segments() {
        let mut segments = Vec::new();
        for i in 0..20 {
            let speaker = match i % 4 {
                0 => NARRATOR,
                1 => "Alice",
                2 => "Bob",
                _ => NARRATOR,
            };
            segments.push(segment(i, speaker, "We should go."));
        }
        let roster = extractor().detect(&segments);

        let alice = roster.iter().find(|c| c.name == "Alice").unwrap();
        let bob = roster.iter().find(|c| c.name == "Bob").unwrap();
        assert_eq!(alice.frequency, 5);
        assert_eq!(bob.frequency, 5);
        assert!(alice.is_main_character);
        assert!(bob.is_main_character);
        assert_eq!(roster[0].name, NARRATOR);
    }

    #[test]
    fn test_frequency_matches_segment_counts() {
        let text = "\"Hi,\" said Tom. \"Hello,\" said Ann. \"Bye,\" said Tom. Rain fell.";
        let segmenter = Segmenter::new(tables(), SegmenterConfig::default());
        let segments = segmenter.parse(text).unwrap();
        let roster = extractor().detect(&segments);

        for character in &roster {
            let count = segments.iter().filter(|s| s.speaker == character.name).count();
            assert_eq!(character.frequency, count, "{}", character.name);
        }
    }

    #[test]
    fn test_minor_character_ordering() {
        let mut segments: Vec<TextSegment> = (0..30).map(|i| segment(i, NARRATOR, "x")).collect();
        segments[0] = segment(0, "Early", "Hi.");
        segments[10] = segment(10, "Late", "Hi.");
        segments[20] = segment(20, "Later", "Hi.");
        let roster = extractor().detect(&segments);
        let names: Vec<&str> = roster.iter().map(|c| c.name.as_str()).collect();

        assert_eq!(names, vec![NARRATOR, "Early", "Late", "Later"]);
        assert!(roster[1].is_main_character);
        assert!(!roster[2].is_main_character);
    }

    #[test]
    fn test_emotion_inference() {
        let e = extractor();
        let emotions = e.infer_emotions("STOP right there!", Some("shouted"));
        assert!(emotions.contains("excited"));
        assert!(emotions.contains("angry"));

        let emotions = e.infer_emotions("Are you sad?", Some("sobbed"));
        assert!(emotions.contains("curious"));
        assert!(emotions.contains("sad"));

        assert!(e.infer_emotions("Fine.", None).is_empty());
    }

    #[test]
    fn test_traits_from_neighbouring_narration() {
        let segments = vec![
            segment(0, NARRATOR, "The old man, Walter, leaned on his cane."),
            segment(1, "Walter", "Indeed, I shall wait here for the others to arrive."),
        ];
        let roster = extractor().detect(&segments);
        let walter = roster.iter().find(|c| c.name == "Walter").unwrap();
        assert!(walter.characteristics.contains("elderly"));
        assert!(walter.characteristics.contains("formal"));
    }

    #[test]
    fn test_speech_style_traits() {
        let e = extractor();
        assert!(e.speech_style("Yeah.").contains(&"terse".to_string()));
        assert!(e.speech_style("I don't know, it's fine by me really.").contains(&"casual".to_string()));
        assert!(e.speech_style(&"word ".repeat(50)).contains(&"verbose".to_string()));
    }

    #[test]
    fn test_identify_speakers_in_discovery_order() {
        let text = "\"Run!\" shouted Mark. Lucy sighed. \"Why?\" she asked. \"Now,\" said Mark.";
        let speakers = extractor().identify_speakers(text);
        assert_eq!(speakers, vec!["Mark".to_string(), "Lucy".to_string()]);
    }

    #[test]
    fn test_narrator_always_present() {
        let roster = extractor().detect(&[]);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].name, NARRATOR);
        assert!(roster[0].is_main_character);
    }
}
