//! Infrastructure Layer
//!
//! - adapters: 语音合成提供方与音频处理
//! - http: RESTful API

pub mod adapters;
pub mod http;
