//! Collaborator seam for the external model provider.

use crate::error::ProviderError;
use crate::shared::{ChatTurn, ModelParams};

/// External LLM collaborator. One call attempt per request; failures carry
/// the upstream's HTTP-like status and surface immediately — no retries.
#[async_trait::async_trait]
pub trait ModelProvider: Send + Sync {
    /// Sends `[system_prompt, ...history]` to the model and returns the
    /// reply text.
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatTurn],
        params: &ModelParams,
    ) -> Result<String, ProviderError>;
}
