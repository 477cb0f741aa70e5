//! TTS Adapter - 语音合成实现
//!
//! - LocalSynthesizer: 本地确定性合成（WAV）
//! - HttpTtsClient: 托管 TTS 服务（WAV / MP3）

mod http_tts_client;
mod local_synthesizer;

pub use http_tts_client::{HttpTtsClient, HttpTtsClientConfig};
pub use local_synthesizer::{LocalSynthesizer, LocalSynthesizerConfig};
