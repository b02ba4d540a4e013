//! Error taxonomy for the chat pipeline.
//!
//! Three kinds cover everything that can go wrong per request:
//! validation (caller fixable), provider (upstream model call failed), and
//! store (passage lookup failed — swallowed by the pipeline, never surfaced
//! to the caller). Crisis short-circuit and ineligibility are deliberate
//! success paths, not errors; see `ChatOutcome`.

use thiserror::Error;

/// Failure from the external model provider, carrying the HTTP-like status
/// the upstream reported.
#[derive(Debug, Clone, Error)]
#[error("provider error ({status}): {message}")]
pub struct ProviderError {
    pub status: u16,
    pub message: String,
}

impl ProviderError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// True when the upstream signal indicates rate limiting, either by
    /// status code or by message text (some providers report 200-adjacent
    /// transport errors with "rate limit" in the body).
    pub fn is_rate_limited(&self) -> bool {
        self.status == 429 || self.message.to_lowercase().contains("rate limit")
    }
}

/// Per-request pipeline failure, surfaced to the HTTP boundary.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or missing required input; the message is corrective and
    /// safe to show the caller.
    #[error("{0}")]
    Validation(String),
    /// The external model call failed. No retry is attempted.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Passage-store failure. Callers in the pipeline treat this as "no
/// results"; it never propagates past the lookup step.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("corrupt passage record: {0}")]
    Codec(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_detected_by_status() {
        assert!(ProviderError::new(429, "slow down").is_rate_limited());
        assert!(!ProviderError::new(500, "boom").is_rate_limited());
    }

    #[test]
    fn rate_limit_detected_by_message() {
        let err = ProviderError::new(500, "Rate limit reached for requests");
        assert!(err.is_rate_limited());
    }

    #[test]
    fn validation_message_is_displayed_verbatim() {
        let err = PipelineError::Validation("message is required".into());
        assert_eq!(err.to_string(), "message is required");
    }
}
