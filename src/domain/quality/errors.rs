//! Quality Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QualityError {
    #[error("文本为空")]
    EmptyText,

    #[error("文本过长: {len} 字符，上限 {max}")]
    InputTooLarge { len: usize, max: usize },

    #[error("分析失败: {0}")]
    AnalysisFailed(String),
}
