//! Deterministic mock provider for keyless operation and tests.

use haven_core::{ChatTurn, ModelParams, ModelProvider, ProviderError, Role};

/// Returns a canned supportive reply that echoes a short preview of the
/// user's message, so callers can see their input flowed through. Never
/// emits URLs, keeping mock-mode output stable under sanitization.
#[derive(Debug, Default)]
pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }

    fn preview(text: &str) -> String {
        let mut preview: String = text.chars().take(80).collect();
        if text.chars().count() > 80 {
            preview.push('…');
        }
        preview
    }
}

#[async_trait::async_trait]
impl ModelProvider for MockProvider {
    async fn complete(
        &self,
        _system_prompt: &str,
        history: &[ChatTurn],
        _params: &ModelParams,
    ) -> Result<String, ProviderError> {
        let last_user = history
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
            .unwrap_or("");
        Ok(format!(
            "Thanks for sharing that with me ({}). That sounds like a lot to carry. \
One small step you could try today: write down what's weighing on you, then talk it \
over with a trusted adult. I'm here whenever you want to keep talking.",
            Self::preview(last_user)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_preview_of_last_user_turn() {
        let provider = MockProvider::new();
        let history = vec![ChatTurn::user("I feel anxious about school")];
        let reply = provider
            .complete("persona", &history, &ModelParams::default())
            .await
            .unwrap();
        assert!(reply.contains("I feel anxious about school"));
        assert!(!reply.contains("http"));
    }

    #[tokio::test]
    async fn long_messages_are_truncated_with_ellipsis() {
        let provider = MockProvider::new();
        let long = "x".repeat(200);
        let reply = provider
            .complete("persona", &[ChatTurn::user(long)], &ModelParams::default())
            .await
            .unwrap();
        assert!(reply.contains('…'));
    }
}
