//! 处理状态

use serde::{Deserialize, Serialize};

/// 取消时的固定消息
pub const CANCELLED_MESSAGE: &str = "Processing cancelled";

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// 尚未运行
    Idle,
    Analyzing,
    Detecting,
    Assigning,
    Generating,
    QualityCheck,
    Complete,
    Error,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Analyzing => "analyzing",
            Self::Detecting => "detecting",
            Self::Assigning => "assigning",
            Self::Generating => "generating",
            Self::QualityCheck => "quality_check",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// 进入该阶段时的进度
    pub fn milestone(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Analyzing => 10,
            Self::Detecting => 25,
            Self::Assigning => 40,
            Self::Generating => 40,
            Self::QualityCheck => 97,
            Self::Complete => 100,
            Self::Error => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 对外可轮询的处理状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStatus {
    pub stage: Stage,
    /// [0, 100]
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_item: Option<String>,
}

impl ProcessingStatus {
    pub fn idle() -> Self {
        Self {
            stage: Stage::Idle,
            progress: 0,
            message: "Ready".to_string(),
            current_item: None,
        }
    }

    pub fn new(stage: Stage, progress: u8, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress: progress.min(100),
            message: message.into(),
            current_item: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Stage::Error, 0, message)
    }

    pub fn cancelled() -> Self {
        Self::error(CANCELLED_MESSAGE)
    }

    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.current_item = Some(item.into());
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.stage == Stage::Error && self.message == CANCELLED_MESSAGE
    }
}

impl Default for ProcessingStatus {
    fn default() -> Self {
        Self::idle()
    }
}

/// 协作式取消的检查点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// 进入阶段
    StageEntry(Stage),
    /// 合成第 n 个分段之前
    BeforeSegment(usize),
}
