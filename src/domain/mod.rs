//! Domain Layer - 领域层
//!
//! 包含三个限界上下文:
//! - Narrative Context: 分段、说话人、角色
//! - Voice Context: 音色分配
//! - Quality Context: 写作质量分析
//!
//! 以及共享的文本工具与规则表

pub mod narrative;
pub mod quality;
pub mod tables;
pub mod text;
pub mod voice;
