//! Jarvis - wake-word voice assistant
//!
//! This library provides the pieces of a hands-free assistant loop:
//! - Speech capture with energy-based endpointing
//! - Speech-to-text and text-to-speech adapters
//! - A tool-calling agent backed by a local Ollama model
//! - The session state machine that ties them together
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     Assistant                        │
//! │   Session (wake waiting | conversation)  │ Shutdown  │
//! └────────────────────┬────────────────────────────────┘
//!                      │ one cycle at a time
//! ┌────────────────────▼────────────────────────────────┐
//! │  Capture  ->  Transcriber  ->  Responder  ->  Speaker │
//! │  (cpal)      (Whisper/DG)     (Ollama)     (TTS)     │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod assistant;
pub mod config;
pub mod error;
pub mod session;
pub mod shutdown;
pub mod tools;
pub mod voice;

pub use agent::{OllamaAgent, Responder};
pub use assistant::{Assistant, Utterance};
pub use config::Config;
pub use error::{Error, Result};
pub use session::{Mode, Session};
pub use shutdown::Shutdown;
pub use tools::{CurrentTime, Tool, ToolRegistry};
