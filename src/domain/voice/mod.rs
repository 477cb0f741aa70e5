//! Voice Context - 音色限界上下文
//!
//! 职责:
//! - 角色 -> 音色的确定性分配
//! - 音色唯一性与多样性校验
//! - 手动校正

mod assigner;
mod errors;
mod value_objects;

pub use assigner::{VoiceAssigner, DEFAULT_MAX_SHARED_GENDER_AGE};
pub use errors::VoiceError;
pub use value_objects::{
    clamp_pitch, clamp_speed, AgeGroup, AudioFormat, Gender, Tone, VoiceAssignment,
    VoiceOverride, VoiceProfile, PITCH_RANGE, SPEED_RANGE,
};
