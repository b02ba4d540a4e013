//! Live OpenAI-compatible chat completions client.

use haven_core::{ChatTurn, ModelParams, ModelProvider, ProviderError, Role};
use serde::{Deserialize, Serialize};

// OpenAI-compatible request/response structures.
#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Error body shape `{ "error": { "message": ... } }` used by OpenAI-style
/// APIs; tolerated loosely so other upstreams still map to something useful.
#[derive(Deserialize)]
struct UpstreamErrorBody {
    error: Option<UpstreamErrorDetail>,
}

#[derive(Deserialize)]
struct UpstreamErrorDetail {
    message: Option<String>,
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Calls an OpenAI-compatible `chat/completions` endpoint with bearer auth.
/// Holds its own `reqwest::Client`; construct once and share.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl OpenAiProvider {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
        }
    }

    fn wire_messages(system_prompt: &str, history: &[ChatTurn]) -> Vec<WireMessage> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(WireMessage {
            role: "system",
            content: system_prompt.to_string(),
        });
        for turn in history {
            // The conversation must start with exactly one system message;
            // caller-supplied system turns are folded into user content.
            let role = match turn.role {
                Role::System => "user",
                other => role_str(other),
            };
            messages.push(WireMessage {
                role,
                content: turn.content.clone(),
            });
        }
        messages
    }
}

#[async_trait::async_trait]
impl ModelProvider for OpenAiProvider {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatTurn],
        params: &ModelParams,
    ) -> Result<String, ProviderError> {
        let body = CompletionRequest {
            model: params.model.clone(),
            messages: Self::wire_messages(system_prompt, history),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::new(502, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<UpstreamErrorBody>(&text)
                .ok()
                .and_then(|b| b.error)
                .and_then(|d| d.message)
                .unwrap_or(text);
            tracing::warn!(
                target: "haven::provider",
                status = status.as_u16(),
                "Model API returned error"
            );
            return Err(ProviderError::new(status.as_u16(), message));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new(502, format!("unreadable completion: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::new(502, "completion contained no choices"))
    }
}
