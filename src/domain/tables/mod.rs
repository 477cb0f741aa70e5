//! 规则表
//!
//! 所有启发式规则（引号样式、说话动词、情绪词表、套路词典、辞藻规则、音色模板……）
//! 都来自带版本号的 TOML 数据表，而不是写死在代码里。
//!
//! - 内置表：编译期嵌入的 `data/tables.toml`
//! - 外部表：通过配置 `analysis.tables_path` 覆盖
//!
//! 加载时一次性编译全部正则，之后只读共享（`Arc<PatternTables>`）。

mod raw;

pub use raw::{
    ColorEntry, DialogueTable, EmotionDelta, EmotionTable, PowerTable, PurpleProseTable,
    QuoteStyle, RawTables, ShowTellTable, SpeechStyleTable, ToneRule, TraitRule, TropeEntry,
    TropeScoring, VoiceTable, VoiceTemplate,
};

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

use crate::domain::quality::ShowTellKind;

/// 内置规则表
const BUILTIN_TABLES: &str = include_str!("../../../data/tables.toml");

/// 规则表错误
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Failed to read tables: {0}")]
    Io(String),

    #[error("Failed to parse tables: {0}")]
    Parse(String),

    #[error("Invalid pattern in {entry}: {message}")]
    InvalidPattern { entry: String, message: String },

    #[error("Invalid table entry: {0}")]
    Invalid(String),
}

/// 编译后的引号样式
///
/// 需要边界检查的样式（单引号）不能用正则表达，由调用方逐字符扫描
#[derive(Debug, Clone)]
pub struct CompiledQuote {
    pub style: QuoteStyle,
    pub open: char,
    pub close: char,
    pub regex: Option<Regex>,
}

/// 编译后的 show-vs-tell 规则族
#[derive(Debug, Clone)]
pub struct CompiledShowTell {
    pub kind: ShowTellKind,
    pub patterns: Vec<Regex>,
    pub suggestion: String,
}

/// 编译后的套路条目
#[derive(Debug, Clone)]
pub struct CompiledTrope {
    pub entry: TropeEntry,
    pub triggers: Vec<Regex>,
}

/// 已编译的规则表
#[derive(Debug, Clone)]
pub struct PatternTables {
    raw: RawTables,
    quotes: Vec<CompiledQuote>,
    attribution_verb: Regex,
    thought_clause: Option<Regex>,
    show_tell: Vec<CompiledShowTell>,
    tropes: Vec<CompiledTrope>,
    similes: Vec<Regex>,
    redundancy: Option<Regex>,
    speech_verbs: HashSet<String>,
    thought_verbs: HashSet<String>,
    name_stop_words: HashSet<String>,
    stop_words: HashSet<String>,
    adverb_exclusions: HashSet<String>,
    flowery_words: HashSet<String>,
    colors: HashMap<String, String>,
}

impl PatternTables {
    /// 加载内置规则表
    pub fn builtin() -> Result<Self, TableError> {
        Self::from_toml_str(BUILTIN_TABLES)
    }

    /// 从 TOML 文本加载
    pub fn from_toml_str(content: &str) -> Result<Self, TableError> {
        let raw: RawTables = toml::from_str(content).map_err(|e| TableError::Parse(e.to_string()))?;
        Self::compile(raw)
    }

    /// 从文件加载
    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TableError::Io(format!("{}: {}", path.display(), e)))?;
        let tables = Self::from_toml_str(&content)?;
        tracing::info!(
            path = %path.display(),
            version = %tables.version(),
            "Pattern tables loaded from file"
        );
        Ok(tables)
    }

    /// 加载外部表，未配置时使用内置表
    pub fn load(path: Option<&Path>) -> Result<Self, TableError> {
        match path {
            Some(p) => Self::from_path(p),
            None => Self::builtin(),
        }
    }

    /// 编译原始表
    pub fn compile(raw: RawTables) -> Result<Self, TableError> {
        let mut quotes = Vec::with_capacity(raw.dialogue.quote_styles.len());
        for style in &raw.dialogue.quote_styles {
            let (open, close) = match (single_char(&style.open), single_char(&style.close)) {
                (Some(open), Some(close)) => (open, close),
                _ => {
                    return Err(TableError::Invalid(format!(
                        "quote style '{}' must use single-character delimiters",
                        style.name
                    )))
                }
            };
            let regex = if style.boundary_check {
                None
            } else {
                let pattern = format!(
                    "{open}[^{close}\\n]+{close}",
                    open = regex::escape(&style.open),
                    close = regex::escape(&style.close),
                );
                Some(compile_pattern(
                    &format!("quote style '{}'", style.name),
                    &pattern,
                )?)
            };
            quotes.push(CompiledQuote {
                style: style.clone(),
                open,
                close,
                regex,
            });
        }

        let all_verbs: Vec<&String> = raw
            .dialogue
            .speech_verbs
            .iter()
            .chain(raw.dialogue.thought_verbs.iter())
            .collect();
        if all_verbs.is_empty() {
            return Err(TableError::Invalid("no speech or thought verbs".to_string()));
        }
        let attribution_verb = compile_pattern(
            "attribution verbs",
            &format!("(?i)\\b(?:{})\\b", alternation(all_verbs.iter().map(|s| s.as_str()))),
        )?;

        let thought_clause = if raw.dialogue.thought_verbs.is_empty() {
            None
        } else {
            Some(compile_pattern(
                "thought verbs",
                &format!(
                    "(?i)\\b(?:{})(?:\\s+to\\s+(?:himself|herself|themselves|myself|themself))?\\s*[,:]\\s*(?P<clause>[^.!?\\n\"“”]+[.!?]?)",
                    alternation(raw.dialogue.thought_verbs.iter().map(|s| s.as_str()))
                ),
            )?)
        };

        let mut show_tell = Vec::with_capacity(raw.show_tell.families.len());
        for family in &raw.show_tell.families {
            let patterns = family
                .patterns
                .iter()
                .map(|p| compile_pattern(&format!("show_tell.{}", family.kind.as_str()), p))
                .collect::<Result<Vec<_>, _>>()?;
            show_tell.push(CompiledShowTell {
                kind: family.kind,
                patterns,
                suggestion: family.suggestion.clone(),
            });
        }

        let mut tropes = Vec::with_capacity(raw.tropes.len());
        for entry in &raw.tropes {
            let triggers = entry
                .triggers
                .iter()
                .map(|p| compile_pattern(&format!("trope '{}'", entry.name), p))
                .collect::<Result<Vec<_>, _>>()?;
            tropes.push(CompiledTrope {
                entry: entry.clone(),
                triggers,
            });
        }

        let similes = raw
            .purple_prose
            .simile_patterns
            .iter()
            .map(|p| compile_pattern("purple_prose.simile_patterns", p))
            .collect::<Result<Vec<_>, _>>()?;

        let redundancy = if raw.purple_prose.redundant_pairs.is_empty() {
            None
        } else {
            Some(compile_pattern(
                "purple_prose.redundant_pairs",
                &format!(
                    "(?i)\\b(?:{})\\b",
                    alternation(raw.purple_prose.redundant_pairs.iter().map(|s| s.as_str()))
                ),
            )?)
        };

        let colors = raw
            .colors
            .iter()
            .map(|c| (c.name.to_lowercase(), c.hex.clone()))
            .collect();

        Ok(Self {
            quotes,
            attribution_verb,
            thought_clause,
            show_tell,
            tropes,
            similes,
            redundancy,
            speech_verbs: lower_set(&raw.dialogue.speech_verbs),
            thought_verbs: lower_set(&raw.dialogue.thought_verbs),
            name_stop_words: raw.dialogue.name_stop_words.iter().cloned().collect(),
            stop_words: lower_set(&raw.words.stop_words),
            adverb_exclusions: lower_set(&raw.purple_prose.adverb_exclusions),
            flowery_words: lower_set(&raw.purple_prose.flowery_words),
            colors,
            raw,
        })
    }

    pub fn version(&self) -> &str {
        &self.raw.version
    }

    pub fn raw(&self) -> &RawTables {
        &self.raw
    }

    pub fn quotes(&self) -> &[CompiledQuote] {
        &self.quotes
    }

    /// 说话/思考动词（大小写不敏感）
    pub fn attribution_verb_regex(&self) -> &Regex {
        &self.attribution_verb
    }

    /// `thought, <clause>` 形式的内心独白
    pub fn thought_clause_regex(&self) -> Option<&Regex> {
        self.thought_clause.as_ref()
    }

    pub fn show_tell(&self) -> &[CompiledShowTell] {
        &self.show_tell
    }

    pub fn tropes(&self) -> &[CompiledTrope] {
        &self.tropes
    }

    pub fn similes(&self) -> &[Regex] {
        &self.similes
    }

    /// 冗余修饰短语
    pub fn redundancy_regex(&self) -> Option<&Regex> {
        self.redundancy.as_ref()
    }

    pub fn is_speech_verb(&self, word: &str) -> bool {
        self.speech_verbs.contains(&word.to_lowercase())
    }

    pub fn is_thought_verb(&self, word: &str) -> bool {
        self.thought_verbs.contains(&word.to_lowercase())
    }

    /// 大写但不是人名的词（大小写敏感）
    pub fn is_name_stop_word(&self, word: &str) -> bool {
        self.name_stop_words.contains(word)
    }

    pub fn is_stop_word(&self, word_lower: &str) -> bool {
        self.stop_words.contains(word_lower)
    }

    pub fn is_adverb_exclusion(&self, word_lower: &str) -> bool {
        self.adverb_exclusions.contains(word_lower)
    }

    pub fn is_flowery(&self, word_lower: &str) -> bool {
        self.flowery_words.contains(word_lower)
    }

    pub fn color_hex(&self, word_lower: &str) -> Option<&str> {
        self.colors.get(word_lower).map(|s| s.as_str())
    }

    pub fn emotions(&self) -> &EmotionTable {
        &self.raw.emotions
    }

    pub fn traits(&self) -> &[TraitRule] {
        &self.raw.traits
    }

    pub fn speech_style(&self) -> &SpeechStyleTable {
        &self.raw.speech_style
    }

    pub fn voice(&self) -> &VoiceTable {
        &self.raw.voice
    }

    pub fn show_tell_table(&self) -> &ShowTellTable {
        &self.raw.show_tell
    }

    pub fn trope_scoring(&self) -> TropeScoring {
        self.raw.trope_scoring
    }

    pub fn purple_prose(&self) -> &PurpleProseTable {
        &self.raw.purple_prose
    }

    pub fn power(&self) -> &PowerTable {
        &self.raw.power
    }

    pub fn min_term_len(&self) -> usize {
        self.raw.words.min_term_len
    }
}

fn compile_pattern(entry: &str, pattern: &str) -> Result<Regex, TableError> {
    Regex::new(pattern).map_err(|e| TableError::InvalidPattern {
        entry: entry.to_string(),
        message: e.to_string(),
    })
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn alternation<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.map(regex::escape).collect::<Vec<_>>().join("|")
}

fn lower_set(items: &[String]) -> HashSet<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_tables_compile() {
        let tables = PatternTables::builtin().unwrap();
        assert!(!tables.version().is_empty());
        assert_eq!(tables.quotes().len(), 4);
        assert!(tables.is_speech_verb("Said"));
        assert!(tables.is_thought_verb("wondered"));
        assert!(tables.is_name_stop_word("The"));
        assert!(!tables.is_name_stop_word("Sarah"));
        assert_eq!(tables.color_hex("red"), Some("#FF0000"));
        assert!(tables
            .voice()
            .templates
            .iter()
            .any(|t| t.id == tables.voice().narrator_template));
    }

    #[test]
    fn test_thought_clause_pattern() {
        let tables = PatternTables::builtin().unwrap();
        let text = "He thought, this cannot be right. Then he left.";
        let regex = tables.thought_clause_regex().unwrap();
        let caps = regex.captures(text).unwrap();
        assert_eq!(&caps["clause"], "this cannot be right.");
        assert!(regex
            .captures("\"Is he coming?\" she wondered.")
            .is_none());
    }

    #[test]
    fn test_invalid_pattern_reports_entry() {
        let content = BUILTIN_TABLES.replace(r"'(?i)\bamnesia\b'", r"'(?i)\bamnesia('");
        let err = PatternTables::from_toml_str(&content).unwrap_err();
        match err {
            TableError::InvalidPattern { entry, .. } => assert!(entry.contains("Amnesia")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let content = BUILTIN_TABLES.replace("version = \"2024.1\"", "version = \"custom-1\"");
        file.write_all(content.as_bytes()).unwrap();

        let tables = PatternTables::load(Some(file.path())).unwrap();
        assert_eq!(tables.version(), "custom-1");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = PatternTables::from_path(Path::new("/nonexistent/tables.toml")).unwrap_err();
        assert!(matches!(err, TableError::Io(_)));
    }
}
