//! 对话权力关系
//!
//! 对每个对话轮次打分，正分表示掌控对话，负分表示退让。

use std::collections::{BTreeMap, HashSet};

use super::echo::is_content_word;
use super::report::{PowerBalance, PowerTactic, PowerTurn};
use crate::domain::narrative::{SegmentType, TextSegment, NARRATOR, UNKNOWN_SPEAKER};
use crate::domain::tables::{PatternTables, PowerTable};
use crate::domain::text;

const SCORE_LIMIT: f64 = 5.0;
const QUESTION_PENALTY: f64 = -1.0;
const COMMAND_BONUS: f64 = 1.5;
const INTERRUPTION_BONUS: f64 = 1.0;
const INTERRUPTED_PENALTY: f64 = -0.5;
const PAUSE_BONUS: f64 = 0.5;
const POLITENESS_BONUS: f64 = 1.0;
const POLITENESS_THRESHOLD: f64 = 2.0;
const TERMINATION_BONUS: f64 = 1.5;

const FIRST_PERSON: &[&str] = &["i", "me", "my", "mine", "we", "us", "our", "ours"];
const SECOND_PERSON: &[&str] = &["you", "your", "yours"];
const CUT_OFF_MARKERS: &[&str] = &["...", "…", "—", "--", "-"];

pub fn analyze(tables: &PatternTables, segments: &[TextSegment]) -> PowerBalance {
    let table = tables.power();
    let mut turns: Vec<PowerTurn> = Vec::new();
    let mut previous: Option<(&TextSegment, HashSet<String>)> = None;
    let mut gap: Vec<&TextSegment> = Vec::new();

    for segment in segments {
        if segment.is_narration() {
            if previous.is_some() {
                gap.push(segment);
            }
            continue;
        }
        if segment.segment_type != SegmentType::Dialogue
            || segment.speaker == NARRATOR
            || segment.speaker == UNKNOWN_SPEAKER
        {
            continue;
        }

        let lower = segment.content.to_lowercase();
        let words = text::lowercase_words(&segment.content);
        let content_words: HashSet<String> = words
            .iter()
            .filter(|w| is_content_word(tables, w))
            .cloned()
            .collect();

        let is_question = segment.content.trim_end().ends_with('?');
        let is_command = !is_question
            && words
                .first()
                .is_some_and(|w| table.command_verbs.iter().any(|c| c == w));
        let hedges = count_any(&lower, &table.hedges);
        let intensifiers = count_any(&lower, &table.intensifiers);

        let mut score = ((words.len() as f64 - 10.0) / 10.0).clamp(-1.0, 1.5);
        if is_question {
            score += QUESTION_PENALTY;
        }
        if is_command {
            score += COMMAND_BONUS;
        }
        score += ((intensifiers as f64 - hedges as f64) * 0.5).clamp(-2.0, 2.0);

        let first = words.iter().filter(|w| FIRST_PERSON.contains(&w.as_str())).count();
        let second = words.iter().filter(|w| SECOND_PERSON.contains(&w.as_str())).count();
        score += ((second as f64 - first as f64) * 0.2).clamp(-1.0, 1.0);

        let mut tactics = Vec::new();
        let mut topic_continuity = 0.0;

        if let Some((prev_segment, prev_words)) = &previous {
            let switched = prev_segment.speaker != segment.speaker;

            if !content_words.is_empty() {
                let shared = content_words.intersection(prev_words).count();
                topic_continuity = text::round2(shared as f64 / content_words.len() as f64);
                if switched {
                    // 接话题是顺从，另起话题是掌控
                    if topic_continuity > 0.3 {
                        score -= 0.5;
                    } else if shared == 0 {
                        score += 0.5;
                    }
                }
            }

            if switched && is_cut_off(&prev_segment.content) {
                score += INTERRUPTION_BONUS;
                tactics.push(PowerTactic::Interruption);
                if let Some(prev_turn) = turns.last_mut() {
                    prev_turn.was_interrupted = true;
                    prev_turn.score = finalize(prev_turn.score + INTERRUPTED_PENALTY);
                }
            }

            if is_pause(table, &gap) {
                score += PAUSE_BONUS;
                tactics.push(PowerTactic::NarrativePause);
            }

            let prev_score = turns.last().map_or(0.0, |t| t.score);
            if switched
                && prev_score >= POLITENESS_THRESHOLD
                && count_any(&lower, &table.politeness) > 0
            {
                score += POLITENESS_BONUS;
                tactics.push(PowerTactic::WeaponizedPoliteness);
            }
        }

        turns.push(PowerTurn {
            segment_id: segment.id.clone(),
            speaker: segment.speaker.clone(),
            score: finalize(score),
            is_question,
            is_command,
            was_interrupted: false,
            hedges,
            intensifiers,
            topic_continuity,
            tactics,
        });
        previous = Some((segment, content_words));
        gap.clear();
    }

    // 最后一轮: 结束语或之后的离场描写
    if let (Some(last), Some((last_segment, _))) = (turns.last_mut(), &previous) {
        let lower = last_segment.content.to_lowercase();
        let ends = count_any(&lower, &table.ending_phrases) > 0;
        let leaves = gap.iter().any(|seg| {
            let narration = seg.content.to_lowercase();
            table
                .leaving_cues
                .iter()
                .any(|cue| text::contains_phrase(&narration, cue))
        });
        if ends || leaves {
            last.score = finalize(last.score + TERMINATION_BONUS);
            last.tactics.push(PowerTactic::ExchangeTermination);
        }
    }

    summarize(turns)
}

fn summarize(turns: Vec<PowerTurn>) -> PowerBalance {
    let mut totals: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for turn in &turns {
        let entry = totals.entry(turn.speaker.clone()).or_insert((0.0, 0));
        entry.0 += turn.score;
        entry.1 += 1;
    }
    let speaker_averages: BTreeMap<String, f64> = totals
        .into_iter()
        .map(|(speaker, (sum, n))| (speaker, text::round2(sum / n as f64)))
        .collect();

    // 平分时取字母序靠前者
    let mut dominant: Option<(&String, f64)> = None;
    for (speaker, avg) in &speaker_averages {
        if dominant.map_or(true, |(_, best)| *avg > best) {
            dominant = Some((speaker, *avg));
        }
    }
    let dominant_speaker = dominant.map(|(speaker, _)| speaker.clone());

    PowerBalance {
        turns,
        speaker_averages,
        dominant_speaker,
    }
}

fn finalize(score: f64) -> f64 {
    text::round2(score.clamp(-SCORE_LIMIT, SCORE_LIMIT))
}

fn count_any(lower: &str, phrases: &[String]) -> usize {
    phrases.iter().map(|p| text::count_phrase(lower, p)).sum()
}

fn is_cut_off(content: &str) -> bool {
    let trimmed = content.trim_end();
    CUT_OFF_MARKERS.iter().any(|m| trimmed.ends_with(m))
}

fn is_pause(table: &PowerTable, gap: &[&TextSegment]) -> bool {
    if gap.is_empty() {
        return false;
    }
    let words: usize = gap.iter().map(|s| text::word_count(&s.content)).sum();
    if words >= table.pause_min_words {
        return true;
    }
    gap.iter().any(|s| {
        let lower = s.content.to_lowercase();
        table
            .pause_cues
            .iter()
            .any(|cue| text::contains_phrase(&lower, cue))
    })
}
