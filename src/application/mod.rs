//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（SpeechSynthesis）
//! - pipeline: 故事处理流水线（状态机、取消、进度）
//! - error: 应用层错误定义

pub mod error;
pub mod pipeline;
pub mod ports;

pub use error::ApplicationError;

pub use pipeline::{
    AudioOutput, Checkpoint, PipelineOrchestrator, ProcessOptions, ProcessingStatus, RunTicket,
    Stage, CANCELLED_MESSAGE,
};

pub use ports::{AudioSegment, CombinedAudio, SpeechSynthesisPort, SynthesisError};
