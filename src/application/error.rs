//! 应用层错误定义
//!
//! 调用方可见的统一错误类型

use thiserror::Error;

use crate::application::ports::SynthesisError;
use crate::application::pipeline::CANCELLED_MESSAGE;
use crate::domain::narrative::NarrativeError;
use crate::domain::quality::QualityError;
use crate::domain::voice::VoiceError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 输入校验失败
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 已有处理在进行
    #[error("Busy: {0}")]
    Busy(String),

    /// 状态无效（例如没有可取消的处理）
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 无法解析说话人 / 音色
    #[error("Resolution failure: {0}")]
    ResolutionFailure(String),

    /// 协作式取消
    #[error("{}", CANCELLED_MESSAGE)]
    Cancelled,

    /// 外部服务错误
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    pub fn busy(message: impl Into<String>) -> Self {
        Self::Busy(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::ResolutionFailure(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<NarrativeError> for ApplicationError {
    fn from(err: NarrativeError) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<VoiceError> for ApplicationError {
    fn from(err: VoiceError) -> Self {
        Self::ResolutionFailure(err.to_string())
    }
}

impl From<QualityError> for ApplicationError {
    fn from(err: QualityError) -> Self {
        match err {
            QualityError::EmptyText | QualityError::InputTooLarge { .. } => {
                Self::ValidationError(err.to_string())
            }
            QualityError::AnalysisFailed(_) => Self::InternalError(err.to_string()),
        }
    }
}

impl From<SynthesisError> for ApplicationError {
    fn from(err: SynthesisError) -> Self {
        match err {
            SynthesisError::UnsupportedFormat(_) | SynthesisError::EmptyInput => {
                Self::ValidationError(err.to_string())
            }
            _ => Self::ExternalServiceError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::voice::AudioFormat;

    #[test]
    fn test_cancelled_message() {
        assert_eq!(ApplicationError::Cancelled.to_string(), "Processing cancelled");
        assert!(ApplicationError::Cancelled.is_cancelled());
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            ApplicationError::from(VoiceError::EmptyRoster),
            ApplicationError::ResolutionFailure(_)
        ));
        assert!(matches!(
            ApplicationError::from(QualityError::EmptyText),
            ApplicationError::ValidationError(_)
        ));
        assert!(matches!(
            ApplicationError::from(SynthesisError::UnsupportedFormat(AudioFormat::Mp3)),
            ApplicationError::ValidationError(_)
        ));
        assert!(matches!(
            ApplicationError::from(SynthesisError::Timeout),
            ApplicationError::ExternalServiceError(_)
        ));
    }
}
