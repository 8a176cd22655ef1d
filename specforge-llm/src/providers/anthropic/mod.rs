//! Anthropic provider

mod client;
mod types;

pub use client::{AnthropicClient, DEFAULT_MODEL, DEFAULT_TIMEOUT_MS};
pub use types::{ContentBlock, Message, MessageRequest, MessageResponse, Usage};
