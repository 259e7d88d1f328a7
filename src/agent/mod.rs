//! Response generation
//!
//! The assistant loop only sees [`Responder`]; which model answers and how it
//! uses tools is the adapter's business.

mod ollama;

use async_trait::async_trait;

use crate::Result;

pub use ollama::{ChatMessage, DEFAULT_OLLAMA_URL, OllamaAgent, clean_reply};

/// Default persona instruction for the agent
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Jarvis, an intelligent, conversational AI assistant. \
Your goal is to be helpful, friendly, and informative. You can respond in natural, human-like \
language and use tools when needed to answer questions more accurately. Always explain your \
reasoning simply when appropriate, and keep your responses conversational and concise.";

/// Produces a reply to a spoken command
#[async_trait]
pub trait Responder: Send + Sync {
    /// Answer `command`
    ///
    /// # Errors
    ///
    /// Returns `Error::Agent` if no reply could be produced
    async fn respond(&self, command: &str) -> Result<String>;
}
