//! Narrative Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("文本过长: {len} 字符，上限 {max}")]
    InputTooLarge { len: usize, max: usize },
}
