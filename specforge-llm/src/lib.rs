//! specforge llm - the external model collaborator seam
//!
//! The core protocol treats the language model as an opaque function from
//! text to text; `DesignModel` is that seam. The Anthropic provider is the
//! stock implementation; tests and alternative backends supply their own.

use async_trait::async_trait;
use specforge_core::SpecForgeResult;

pub mod prompts;
pub mod providers;

mod analyze;
mod oneshot;

pub use analyze::{analyze_system, AnalysisReport, AnalysisResult, Report, ShortReport};
pub use oneshot::{extract_spec, propose_spec, SpecMode, SpecResult};
pub use providers::anthropic::{AnthropicClient, DEFAULT_MODEL, DEFAULT_TIMEOUT_MS};

/// Blocking request/response call to the model collaborator. No streaming:
/// the text is assembled in full before the session classifies it.
#[async_trait]
pub trait DesignModel: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> SpecForgeResult<String>;
}
