//! Voice Context - Errors

use thiserror::Error;

use super::{AgeGroup, Gender};

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("角色列表为空")]
    EmptyRoster,

    #[error("音色模板表为空")]
    NoTemplates,

    #[error("音色模板不存在: {0}")]
    TemplateNotFound(String),

    #[error("角色不存在: {0}")]
    UnknownCharacter(String),

    #[error("音色 ID 重复: {0}")]
    DuplicateVoiceId(String),

    #[error("置信度越界: {character} = {confidence}")]
    ConfidenceOutOfRange { character: String, confidence: f64 },

    #[error("旁白音色不正确: {0}")]
    NarratorVoiceMismatch(String),

    #[error("音色多样性不足: {count} 个角色共享 {gender:?}/{age:?}")]
    InsufficientDiversity {
        gender: Gender,
        age: AgeGroup,
        count: usize,
    },
}
