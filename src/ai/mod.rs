//! Generative AI service integration
//!
//! Defines the seam between the fallback dispatcher and the hosted
//! multimodal model. Each call targets one candidate model identifier.

pub mod gemini;
pub mod mime;
pub mod mock;
pub mod response;

pub use gemini::GeminiClient;
pub use mock::{MockGenerativeClient, MockReply};
pub use response::GenerationOutput;

use crate::models::GenerationRequest;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Issue exactly one generation request against `model`.
    async fn generate(&self, model: &str, request: &GenerationRequest)
        -> Result<GenerationOutput>;

    /// Model identifiers the credential can use for content generation.
    async fn list_models(&self) -> Result<Vec<String>>;
}
