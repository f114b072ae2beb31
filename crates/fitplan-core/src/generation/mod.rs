//! Generation client interface.
//!
//! The core only needs one capability from a text-generation provider:
//! turn a system prompt and a user prompt into raw text. [`PlanGenerator`]
//! is that seam; [`GroqClient`] is the production implementation and tests
//! substitute scripted fakes.

pub mod groq;

use async_trait::async_trait;

use crate::error::ProviderError;

pub use groq::{GroqClient, GroqConfig};

/// A text-generation provider.
///
/// Object-safe so the service can hold an `Arc<dyn PlanGenerator>`.
/// Implementations make exactly one attempt per call.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    /// Short provider name for logs (e.g. "groq").
    fn name(&self) -> &str;

    /// Complete `user_prompt` under the `system_prompt` persona and return
    /// the model's raw text.
    async fn generate(&self, system_prompt: &str, user_prompt: &str)
    -> Result<String, ProviderError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn PlanGenerator) {}
};
