//! 音色分配
//!
//! 按角色名、特征、情绪从模板表中确定性地选择音色，并保证同一批次内音色唯一。

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use super::errors::VoiceError;
use super::value_objects::{
    clamp_pitch, clamp_speed, AgeGroup, Gender, Tone, VoiceAssignment, VoiceOverride,
    VoiceProfile,
};
use crate::domain::narrative::{Character, UNKNOWN_SPEAKER};
use crate::domain::tables::{PatternTables, VoiceTemplate};

/// 非旁白角色共享同一 性别+年龄 的默认上限
pub const DEFAULT_MAX_SHARED_GENDER_AGE: usize = 2;

const BASE_CONFIDENCE: f64 = 0.7;
const NARRATOR_BONUS: f64 = 0.25;
const GENDER_BONUS: f64 = 0.1;
const MAIN_BONUS: f64 = 0.1;
const FREQUENT_BONUS: f64 = 0.05;
const FREQUENT_THRESHOLD: usize = 5;
/// 变体音色每一级的音调偏移
const VARIANT_PITCH_STEP: f64 = 0.04;

/// 音色分配器
#[derive(Debug, Clone)]
pub struct VoiceAssigner {
    tables: Arc<PatternTables>,
    max_shared_gender_age: usize,
}

impl VoiceAssigner {
    pub fn new(tables: Arc<PatternTables>, max_shared_gender_age: usize) -> Self {
        Self {
            tables,
            max_shared_gender_age,
        }
    }

    /// 为角色表分配音色
    ///
    /// 任一角色生成失败或批次校验失败时整体失败
    pub fn assign(&self, characters: &[Character]) -> Result<Vec<VoiceAssignment>, VoiceError> {
        if characters.is_empty() {
            return Err(VoiceError::EmptyRoster);
        }

        let mut ordered: Vec<&Character> = characters.iter().collect();
        ordered.sort_by(|a, b| {
            b.is_main_character
                .cmp(&a.is_main_character)
                .then(b.frequency.cmp(&a.frequency))
        });

        let mut used: HashSet<String> = HashSet::new();
        let mut assignments = Vec::with_capacity(ordered.len());
        for character in ordered {
            let profile = self.generate_profile(character)?;
            let profile = self.ensure_unique(profile, character, &used);
            used.insert(profile.id.clone());

            let confidence = self.confidence(character, &profile);
            assignments.push(VoiceAssignment {
                character: character.name.clone(),
                voice: profile,
                confidence,
            });
        }

        self.validate(&assignments)?;

        tracing::info!(
            characters = assignments.len(),
            tables_version = %self.tables.version(),
            "Voices assigned"
        );
        Ok(assignments)
    }

    /// 生成单个角色的音色
    pub fn generate_profile(&self, character: &Character) -> Result<VoiceProfile, VoiceError> {
        let voice = self.tables.voice();
        if voice.templates.is_empty() {
            return Err(VoiceError::NoTemplates);
        }

        if character.is_narrator() {
            let template = self
                .template(&voice.narrator_template)
                .ok_or_else(|| VoiceError::TemplateNotFound(voice.narrator_template.clone()))?;
            return Ok(profile_from(template, 0.0, 0.0));
        }

        let gender = self.infer_gender(&character.name);
        let age = infer_age(&character.characteristics);
        let tone = self.infer_tone(&character.emotional_states);
        let template = self.select_template(gender, age, tone).ok_or_else(|| {
            VoiceError::TemplateNotFound(format!("{}/{}", gender.as_str(), age.as_str()))
        })?;

        let (pitch, speed) = self.emotion_deltas(&character.emotional_states);
        Ok(profile_from(template, pitch, speed))
    }

    /// 名字 -> 性别
    pub fn infer_gender(&self, name: &str) -> Gender {
        let lower = name.to_lowercase();
        if name == UNKNOWN_SPEAKER || lower.is_empty() || !lower.chars().all(char::is_alphabetic) {
            return Gender::Neutral;
        }

        let voice = self.tables.voice();
        if voice.male_names.iter().any(|n| *n == lower) {
            return Gender::Male;
        }
        if voice.female_names.iter().any(|n| *n == lower) {
            return Gender::Female;
        }
        match lower.chars().last() {
            Some('a' | 'e' | 'i' | 'y') => Gender::Female,
            _ => Gender::Male,
        }
    }

    /// 情绪 -> 基调，按规则表顺序取第一条命中的规则
    pub fn infer_tone(&self, emotions: &BTreeSet<String>) -> Tone {
        self.tables
            .voice()
            .tone_rules
            .iter()
            .find(|rule| rule.emotions.iter().any(|e| emotions.contains(e)))
            .map_or(Tone::Neutral, |rule| rule.tone)
    }

    /// 应用手动校正并重新校验
    pub fn apply_overrides(
        &self,
        mut assignments: Vec<VoiceAssignment>,
        overrides: &HashMap<String, VoiceOverride>,
    ) -> Result<Vec<VoiceAssignment>, VoiceError> {
        let mut names: Vec<&String> = overrides.keys().collect();
        names.sort();

        for name in names {
            let patch = &overrides[name];
            let assignment = assignments
                .iter_mut()
                .find(|a| a.character == *name)
                .ok_or_else(|| VoiceError::UnknownCharacter(name.clone()))?;

            if let Some(voice_id) = &patch.voice_id {
                let template = self
                    .template(voice_id)
                    .ok_or_else(|| VoiceError::TemplateNotFound(voice_id.clone()))?;
                assignment.voice = profile_from(template, 0.0, 0.0);
            }
            if let Some(pitch) = patch.pitch {
                assignment.voice.pitch = clamp_pitch(pitch);
            }
            if let Some(speed) = patch.speed {
                assignment.voice.speed = clamp_speed(speed);
            }
            assignment.confidence = 1.0;

            tracing::debug!(
                character = %name,
                voice_id = %assignment.voice.id,
                "Voice override applied"
            );
        }

        self.validate(&assignments)?;
        Ok(assignments)
    }

    /// 批次校验
    pub fn validate(&self, assignments: &[VoiceAssignment]) -> Result<(), VoiceError> {
        let mut ids = HashSet::new();
        for a in assignments {
            if !ids.insert(a.voice.id.as_str()) {
                return Err(VoiceError::DuplicateVoiceId(a.voice.id.clone()));
            }
            if !(0.0..=1.0).contains(&a.confidence) {
                return Err(VoiceError::ConfidenceOutOfRange {
                    character: a.character.clone(),
                    confidence: a.confidence,
                });
            }
        }

        for a in assignments.iter().filter(|a| is_narrator_name(&a.character)) {
            if !a.voice.id.contains("narrator") {
                return Err(VoiceError::NarratorVoiceMismatch(a.voice.id.clone()));
            }
        }

        let mut groups: HashMap<(Gender, AgeGroup), usize> = HashMap::new();
        for a in assignments.iter().filter(|a| !is_narrator_name(&a.character)) {
            let count = groups.entry((a.voice.gender, a.voice.age)).or_insert(0);
            *count += 1;
            if *count > self.max_shared_gender_age {
                return Err(VoiceError::InsufficientDiversity {
                    gender: a.voice.gender,
                    age: a.voice.age,
                    count: *count,
                });
            }
        }
        Ok(())
    }

    fn template(&self, id: &str) -> Option<&VoiceTemplate> {
        self.tables.voice().templates.iter().find(|t| t.id == id)
    }

    fn is_narrator_template(&self, template: &VoiceTemplate) -> bool {
        template.id == self.tables.voice().narrator_template || template.id.contains("narrator")
    }

    /// 非旁白模板
    fn character_templates(&self) -> impl Iterator<Item = &VoiceTemplate> {
        self.tables
            .voice()
            .templates
            .iter()
            .filter(|t| !self.is_narrator_template(t))
    }

    /// 模板选择: 性别+年龄 > 性别+成年 > 性别 > 任意，同层内基调匹配优先
    fn select_template(&self, gender: Gender, age: AgeGroup, tone: Tone) -> Option<&VoiceTemplate> {
        let tiers: [&dyn Fn(&VoiceTemplate) -> bool; 4] = [
            &|t: &VoiceTemplate| t.gender == gender && t.age == age,
            &|t: &VoiceTemplate| t.gender == gender && t.age == AgeGroup::Adult,
            &|t: &VoiceTemplate| t.gender == gender,
            &|_: &VoiceTemplate| true,
        ];

        for tier in tiers {
            let survivors: Vec<&VoiceTemplate> =
                self.character_templates().filter(|t| tier(t)).collect();
            if let Some(&first) = survivors.first() {
                return Some(survivors.iter().copied().find(|t| t.tone == tone).unwrap_or(first));
            }
        }
        None
    }

    fn emotion_deltas(&self, emotions: &BTreeSet<String>) -> (f64, f64) {
        self.tables
            .voice()
            .deltas
            .iter()
            .filter(|d| emotions.contains(&d.emotion))
            .fold((0.0, 0.0), |(p, s), d| (p + d.pitch, s + d.speed))
    }

    /// 音色 id 已被占用时替换: 同性别+年龄的未用模板 > 任意未用模板 > 变体
    fn ensure_unique(
        &self,
        profile: VoiceProfile,
        character: &Character,
        used: &HashSet<String>,
    ) -> VoiceProfile {
        if !used.contains(&profile.id) {
            return profile;
        }

        let (pitch, speed) = self.emotion_deltas(&character.emotional_states);
        let mut unused = self.character_templates().filter(|t| !used.contains(&t.id));
        let same_group = self
            .character_templates()
            .filter(|t| !used.contains(&t.id))
            .find(|t| t.gender == profile.gender && t.age == profile.age);

        if let Some(template) = same_group.or_else(|| unused.next()) {
            tracing::debug!(
                character = %character.name,
                wanted = %profile.id,
                substituted = %template.id,
                "Voice substituted for uniqueness"
            );
            return profile_from(template, pitch, speed);
        }

        let mut n = 2;
        let id = loop {
            let candidate = format!("{}_variant_{}", profile.id, n);
            if !used.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        VoiceProfile {
            id,
            name: format!("{} {}", profile.name, n),
            pitch: profile.pitch + VARIANT_PITCH_STEP * (n - 1) as f64,
            ..profile
        }
        .clamped()
    }

    fn confidence(&self, character: &Character, profile: &VoiceProfile) -> f64 {
        let mut confidence = BASE_CONFIDENCE;
        if character.is_narrator() {
            if profile.id.contains("narrator") {
                confidence += NARRATOR_BONUS;
            }
        } else if profile.gender == self.infer_gender(&character.name) {
            confidence += GENDER_BONUS;
        }
        if character.is_main_character {
            confidence += MAIN_BONUS;
        }
        if character.frequency > FREQUENT_THRESHOLD {
            confidence += FREQUENT_BONUS;
        }
        (confidence.min(1.0) * 100.0).round() / 100.0
    }
}

fn is_narrator_name(name: &str) -> bool {
    name == crate::domain::narrative::NARRATOR
}

/// 特征 -> 年龄段
fn infer_age(characteristics: &BTreeSet<String>) -> AgeGroup {
    if characteristics.contains("child") {
        AgeGroup::Child
    } else if characteristics.contains("elderly") {
        AgeGroup::Elderly
    } else if characteristics.contains("young") {
        AgeGroup::Young
    } else {
        AgeGroup::Adult
    }
}

fn profile_from(template: &VoiceTemplate, pitch_delta: f64, speed_delta: f64) -> VoiceProfile {
    VoiceProfile {
        id: template.id.clone(),
        name: template.name.clone(),
        gender: template.gender,
        age: template.age,
        tone: template.tone,
        pitch: template.pitch + pitch_delta,
        speed: template.speed + speed_delta,
    }
    .clamped()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::narrative::NARRATOR;

    fn tables() -> Arc<PatternTables> {
        Arc::new(PatternTables::builtin().unwrap())
    }

    fn assigner() -> VoiceAssigner {
        VoiceAssigner::new(tables(), DEFAULT_MAX_SHARED_GENDER_AGE)
    }

    fn character(name: &str, frequency: usize, main: bool) -> Character {
        let mut c = Character::new(name, 0);
        c.frequency = frequency;
        c.is_main_character = main;
        c
    }

    fn narrator() -> Character {
        character(NARRATOR, 10, true)
    }

    #[test]
    fn test_two_main_characters_get_distinct_voices() {
        let roster = vec![narrator(), character("Alice", 5, true), character("Bob", 5, true)];
        let assignments = assigner().assign(&roster).unwrap();

        let alice = assignments.iter().find(|a| a.character == "Alice").unwrap();
        let bob = assignments.iter().find(|a| a.character == "Bob").unwrap();
        assert_ne!(alice.voice.id, bob.voice.id);
        assert!(!alice.voice.id.contains("narrator"));
        assert!(!bob.voice.id.contains("narrator"));
        assert_eq!(alice.voice.gender, Gender::Female);
        assert_eq!(bob.voice.gender, Gender::Male);
    }

    #[test]
    fn test_narrator_uses_narrator_template() {
        let assignments = assigner().assign(&[narrator()]).unwrap();
        assert_eq!(assignments[0].voice.id, "narrator_default");
        assert_eq!(assignments[0].confidence, 1.0);
    }

    #[test]
    fn test_empty_roster_fails() {
        assert!(matches!(assigner().assign(&[]), Err(VoiceError::EmptyRoster)));
    }

    #[test]
    fn test_empty_template_table_fails() {
        let mut raw = PatternTables::builtin().unwrap().raw().clone();
        raw.voice.templates.clear();
        let tables = Arc::new(PatternTables::compile(raw).unwrap());
        let assigner = VoiceAssigner::new(tables, 2);
        assert!(matches!(
            assigner.assign(&[narrator()]),
            Err(VoiceError::NoTemplates)
        ));
    }

    #[test]
    fn test_gender_inference() {
        let a = assigner();
        assert_eq!(a.infer_gender("Sarah"), Gender::Female);
        assert_eq!(a.infer_gender("John"), Gender::Male);
        assert_eq!(a.infer_gender("Kira"), Gender::Female);
        assert_eq!(a.infer_gender("Drek"), Gender::Male);
        assert_eq!(a.infer_gender(UNKNOWN_SPEAKER), Gender::Neutral);
        assert_eq!(a.infer_gender("R2D2"), Gender::Neutral);
    }

    #[test]
    fn test_tone_precedence() {
        let a = assigner();
        let set = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>();
        assert_eq!(a.infer_tone(&set(&["happy", "angry"])), Tone::Cold);
        assert_eq!(a.infer_tone(&set(&["happy", "sad"])), Tone::Dramatic);
        assert_eq!(a.infer_tone(&set(&["excited"])), Tone::Warm);
        assert_eq!(a.infer_tone(&set(&["curious"])), Tone::Neutral);
    }

    #[test]
    fn test_emotion_perturbation_and_age() {
        let mut c = character("John", 3, true);
        c.emotional_states.insert("angry".to_string());
        let profile = assigner().generate_profile(&c).unwrap();
        assert_eq!(profile.id, "male_adult_cold");
        assert_eq!(profile.pitch, 0.95);
        assert_eq!(profile.speed, 1.1);

        let mut c = character("Mary", 1, false);
        c.characteristics.insert("elderly".to_string());
        let profile = assigner().generate_profile(&c).unwrap();
        assert_eq!(profile.gender, Gender::Female);
        assert_eq!(profile.age, AgeGroup::Elderly);
    }

    #[test]
    fn test_uniqueness_with_large_roster() {
        let assigner = VoiceAssigner::new(tables(), 100);
        let mut roster = vec![narrator()];
        for name in ["John", "James", "Robert", "Michael", "William", "David", "Richard"] {
            roster.push(character(name, 2, false));
        }
        for i in 0..20 {
            roster.push(character(&format!("Guard{}", i), 1, false));
        }
        let assignments = assigner.assign(&roster).unwrap();

        let ids: HashSet<&str> = assignments.iter().map(|a| a.voice.id.as_str()).collect();
        assert_eq!(ids.len(), assignments.len());
        assert!(ids.iter().any(|id| id.contains("_variant_")));
        for a in &assignments {
            assert!((0.0..=1.0).contains(&a.confidence));
        }
    }

    #[test]
    fn test_insufficient_diversity() {
        let roster = vec![
            narrator(),
            character("John", 3, true),
            character("James", 3, true),
            character("Robert", 3, true),
        ];
        let err = assigner().assign(&roster).unwrap_err();
        assert!(matches!(
            err,
            VoiceError::InsufficientDiversity {
                gender: Gender::Male,
                age: AgeGroup::Adult,
                count: 3
            }
        ));
    }

    #[test]
    fn test_confidence_rules() {
        let roster = vec![narrator(), character("Alice", 8, true), character("Zed", 1, false)];
        let assignments = assigner().assign(&roster).unwrap();
        let find = |n: &str| assignments.iter().find(|a| a.character == n).unwrap().confidence;
        assert_eq!(find("Alice"), 0.95);
        assert_eq!(find("Zed"), 0.8);
    }

    #[test]
    fn test_overrides_are_clamped_and_revalidated() {
        let a = assigner();
        let roster = vec![narrator(), character("Alice", 5, true), character("Bob", 5, true)];
        let assignments = a.assign(&roster).unwrap();

        let mut overrides = HashMap::new();
        overrides.insert(
            "Bob".to_string(),
            VoiceOverride {
                voice_id: Some("male_elderly_warm".to_string()),
                pitch: Some(3.0),
                speed: None,
            },
        );
        let patched = a.apply_overrides(assignments.clone(), &overrides).unwrap();
        let bob = patched.iter().find(|x| x.character == "Bob").unwrap();
        assert_eq!(bob.voice.id, "male_elderly_warm");
        assert_eq!(bob.voice.pitch, 2.0);

        let alice_voice = patched
            .iter()
            .find(|x| x.character == "Alice")
            .unwrap()
            .voice
            .id
            .clone();
        let mut clash = HashMap::new();
        clash.insert(
            "Bob".to_string(),
            VoiceOverride {
                voice_id: Some(alice_voice),
                ..Default::default()
            },
        );
        assert!(matches!(
            a.apply_overrides(assignments.clone(), &clash),
            Err(VoiceError::DuplicateVoiceId(_))
        ));

        let mut unknown = HashMap::new();
        unknown.insert("Nobody".to_string(), VoiceOverride::default());
        assert!(matches!(
            a.apply_overrides(assignments, &unknown),
            Err(VoiceError::UnknownCharacter(_))
        ));
    }
}
