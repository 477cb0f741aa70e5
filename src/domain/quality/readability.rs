//! 可读性（Flesch reading ease）

use super::report::{ReadabilityBand, ReadabilityPoint};
use crate::domain::text::{self, CharIndex, Span};

/// 没有句末标点的段落块得分
pub const FALLBACK_SCORE: f64 = 30.0;

/// 按段落分块计算可读性
///
/// `chunk_size` 为每块包含的段落数
pub fn analyze(text: &str, chunk_size: usize) -> Vec<ReadabilityPoint> {
    let index = CharIndex::new(text);
    let paragraphs = text::paragraphs(text);
    let chunk_size = chunk_size.max(1);

    paragraphs
        .chunks(chunk_size)
        .map(|chunk| Span::new(chunk[0].start, chunk[chunk.len() - 1].end))
        .filter_map(|span| {
            let slice = span.slice(text);
            let words = text::words(slice);
            if words.is_empty() {
                return None;
            }
            let sentences = text::sentences(slice);
            let has_terminal = slice
                .chars()
                .any(|c| matches!(c, '.' | '!' | '?' | '…'));

            let score = if has_terminal {
                let syllables: usize = words.iter().map(|w| text::count_syllables(w.text)).sum();
                flesch(words.len(), sentences.len(), syllables)
            } else {
                FALLBACK_SCORE
            };
            Some((span, words.len(), sentences.len(), score))
        })
        .enumerate()
        .map(|(i, (span, word_count, sentence_count, score))| ReadabilityPoint {
            chunk_index: i,
            start: index.to_char(span.start),
            end: index.to_char(span.end),
            score,
            band: ReadabilityBand::from_score(score),
            word_count,
            sentence_count,
        })
        .collect()
}

/// 206.835 − 1.015 × (词/句) − 84.6 × (音节/词)，截断到 [0, 100]
pub fn flesch(words: usize, sentences: usize, syllables: usize) -> f64 {
    if words == 0 || sentences == 0 {
        return FALLBACK_SCORE;
    }
    let wps = words as f64 / sentences as f64;
    let spw = syllables as f64 / words as f64;
    text::round2((206.835 - 1.015 * wps - 84.6 * spw).clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_text_is_easy() {
        let points = analyze("The cat sat. The dog ran.", 1);
        assert_eq!(points.len(), 1);
        // 6 词 2 句 6 音节
        assert_eq!(points[0].score, 100.0);
        assert_eq!(points[0].band, ReadabilityBand::VeryEasy);
        assert_eq!(points[0].sentence_count, 2);
    }

    #[test]
    fn test_formula() {
        // 10 词 2 句 14 音节: 206.835 - 5.075 - 118.44
        assert_eq!(flesch(10, 2, 14), 83.32);
        assert_eq!(flesch(0, 0, 0), FALLBACK_SCORE);
    }

    #[test]
    fn test_fallback_without_terminal_punctuation() {
        let points = analyze("a heading without any punctuation", 1);
        assert_eq!(points[0].score, FALLBACK_SCORE);
    }

    #[test]
    fn test_chunking() {
        let text = "One. Two.\n\nThree.\n\nFour.\n\nFive.";
        assert_eq!(analyze(text, 1).len(), 4);
        let chunks = analyze(text, 2);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].chunk_index, 1);
        assert_eq!(chunks[1].end, text.chars().count());
    }

    #[test]
    fn test_empty_text() {
        assert!(analyze("", 1).is_empty());
        assert!(analyze("...", 1).is_empty());
    }
}
