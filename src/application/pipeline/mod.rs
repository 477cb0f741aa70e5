//! 故事处理流水线

mod options;
mod orchestrator;
mod status;

pub use options::{AudioOutput, ProcessOptions};
pub use orchestrator::{PipelineOrchestrator, RunTicket};
pub use status::{Checkpoint, ProcessingStatus, Stage, CANCELLED_MESSAGE};
