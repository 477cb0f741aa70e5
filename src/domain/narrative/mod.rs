//! Narrative Context - 叙事限界上下文
//!
//! 职责:
//! - 文本分段与说话人解析
//! - 角色表与特征推断

mod attribution;
mod characters;
mod entities;
mod errors;
mod segmenter;

pub use characters::CharacterExtractor;
pub use entities::{
    AttributionMatch, Character, DialogueMatch, MatchKind, SegmentType, TextSegment, NARRATOR,
    UNKNOWN_SPEAKER,
};
pub use errors::NarrativeError;
pub use segmenter::{
    Segmenter, SegmenterConfig, DEFAULT_ATTRIBUTION_WINDOW, DEFAULT_MAX_INPUT_CHARS,
};
