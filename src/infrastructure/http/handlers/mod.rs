//! HTTP Handlers

mod ping;
mod quality;
mod story;

pub use ping::*;
pub use quality::*;
pub use story::*;
