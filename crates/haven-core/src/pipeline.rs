//! Per-request chat pipeline: validate → age gate → crisis check → passage
//! lookup → compose → model call → citation sanitize.
//!
//! Strictly linear; no step fans out. Each request is stateless apart from
//! the caller-supplied history. The only shared values are the read-only
//! policy/sanitizer/detector and the collaborator handles.

use crate::error::PipelineError;
use crate::knowledge::{stub_embedding, PassageStore};
use crate::provider::ModelProvider;
use crate::safety::{assess_birth_year, CitationSanitizer, CrisisDetector, SafetyPolicy};
use crate::shared::{ChatRequest, ModelParams};
use chrono::Datelike;
use std::sync::Arc;

/// How many passages the lookup step contributes to the prompt.
const PASSAGE_LIMIT: usize = 3;

/// Model-backed reply after post-processing.
#[derive(Debug, Clone)]
pub struct ChatReply {
    /// Sanitized reply text (untrusted URLs redacted).
    pub text: String,
    /// Model that produced the reply.
    pub model: String,
    /// Titles of retrieved passages, in retrieval order.
    pub citations: Vec<String>,
}

/// Result of a handled request. `Ineligible` and `Crisis` are deliberate
/// alternate success paths: the model is never invoked for them.
#[derive(Debug, Clone)]
pub enum ChatOutcome {
    Reply(ChatReply),
    Ineligible { message: String },
    Crisis { message: String },
}

/// The orchestrator. Built once at startup from explicit values — no
/// environment reads — so tests can construct it deterministically.
pub struct ChatPipeline {
    provider: Arc<dyn ModelProvider>,
    passages: Option<Arc<PassageStore>>,
    policy: SafetyPolicy,
    sanitizer: CitationSanitizer,
    detector: CrisisDetector,
    defaults: ModelParams,
}

impl ChatPipeline {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        passages: Option<Arc<PassageStore>>,
        policy: SafetyPolicy,
        defaults: ModelParams,
    ) -> Self {
        let sanitizer = CitationSanitizer::new(policy.trusted_domains.clone());
        let detector = CrisisDetector::new(policy.crisis_phrases.clone());
        Self {
            provider,
            passages,
            policy,
            sanitizer,
            detector,
            defaults,
        }
    }

    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    /// Runs the full pipeline for one request.
    pub async fn handle(&self, req: &ChatRequest) -> Result<ChatOutcome, PipelineError> {
        let free_text = req
            .latest_user_text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PipelineError::Validation("message is required".to_string()))?;

        if let Some(birth_year) = req.birth_year {
            let current_year = chrono::Utc::now().year();
            let eligibility =
                assess_birth_year(birth_year, current_year, &self.policy.ineligible_message)?;
            if !eligibility.eligible {
                tracing::info!(target: "haven::pipeline", "Request gated: outside age band");
                return Ok(ChatOutcome::Ineligible {
                    message: eligibility.message,
                });
            }
        }

        if self.detector.detect(free_text) {
            tracing::info!(target: "haven::pipeline", "Crisis phrase detected; short-circuiting");
            return Ok(ChatOutcome::Crisis {
                message: self.policy.crisis_message.clone(),
            });
        }

        let retrieved = self.lookup_passages(free_text);
        let citations: Vec<String> = retrieved.iter().map(|(title, _)| title.clone()).collect();
        let system_prompt = self.compose_system_prompt(req, &retrieved);

        let params = ModelParams {
            model: req.model.clone().unwrap_or_else(|| self.defaults.model.clone()),
            temperature: req.temperature.unwrap_or(self.defaults.temperature),
            max_tokens: req.max_tokens.unwrap_or(self.defaults.max_tokens),
        };

        let raw = self
            .provider
            .complete(&system_prompt, &req.messages, &params)
            .await?;
        let sanitized = self.sanitizer.sanitize(&raw);

        Ok(ChatOutcome::Reply(ChatReply {
            text: sanitized,
            model: params.model,
            citations,
        }))
    }

    /// Best-effort lookup: embed the free text, search the store, and treat
    /// every failure as zero results.
    fn lookup_passages(&self, free_text: &str) -> Vec<(String, String)> {
        let Some(store) = self.passages.as_deref() else {
            return Vec::new();
        };
        let query = stub_embedding(free_text);
        match store.search(&query, PASSAGE_LIMIT) {
            Ok(found) => found.into_iter().map(|p| (p.title, p.text)).collect(),
            Err(e) => {
                tracing::warn!(target: "haven::pipeline", error = %e, "Passage lookup failed; continuing without context");
                Vec::new()
            }
        }
    }

    /// System prompt: request override or configured persona, followed by
    /// any retrieved passages as a reference block.
    fn compose_system_prompt(&self, req: &ChatRequest, retrieved: &[(String, String)]) -> String {
        let persona = req
            .system_override
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.policy.persona_prompt);

        if retrieved.is_empty() {
            return persona.to_string();
        }

        let mut prompt = String::from(persona);
        prompt.push_str("\n\nReference passages you may draw on:\n");
        for (i, (title, text)) in retrieved.iter().enumerate() {
            prompt.push_str(&format!("{}. {}: {}\n", i + 1, title, text));
        }
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::knowledge::Passage;
    use crate::shared::ChatTurn;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test double: counts invocations and returns a canned reply.
    struct ScriptedProvider {
        reply: String,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(reply: impl Into<String>) -> Self {
            Self {
                reply: reply.into(),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl ModelProvider for ScriptedProvider {
        async fn complete(
            &self,
            _system_prompt: &str,
            _history: &[ChatTurn],
            _params: &ModelParams,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    struct FailingProvider;

    #[async_trait::async_trait]
    impl ModelProvider for FailingProvider {
        async fn complete(
            &self,
            _system_prompt: &str,
            _history: &[ChatTurn],
            _params: &ModelParams,
        ) -> Result<String, ProviderError> {
            Err(ProviderError::new(429, "rate limit exceeded"))
        }
    }

    fn pipeline_with(provider: Arc<dyn ModelProvider>) -> ChatPipeline {
        ChatPipeline::new(provider, None, SafetyPolicy::default(), ModelParams::default())
    }

    #[tokio::test]
    async fn ordinary_request_calls_provider_once_and_sanitizes() {
        let provider = Arc::new(ScriptedProvider::new(
            "Try journaling. More at https://randomsite.com/x and https://www.focusonthefamily.com/article",
        ));
        let pipeline = pipeline_with(Arc::clone(&provider) as Arc<dyn ModelProvider>);

        let req = ChatRequest {
            birth_year: Some(chrono::Utc::now().year() - 16),
            ..ChatRequest::from_message("I feel anxious about school")
        };
        let outcome = pipeline.handle(&req).await.unwrap();
        let ChatOutcome::Reply(reply) = outcome else {
            panic!("expected a model-backed reply");
        };
        assert_eq!(provider.call_count(), 1);
        assert!(!reply.text.is_empty());
        assert!(reply.text.contains("https://www.focusonthefamily.com/article"));
        assert!(reply.text.contains(crate::safety::REDACTED_URL_PLACEHOLDER));
        assert!(!reply.text.contains("randomsite.com"));
    }

    #[tokio::test]
    async fn crisis_request_short_circuits_before_provider() {
        let provider = Arc::new(ScriptedProvider::new("should never be seen"));
        let pipeline = pipeline_with(Arc::clone(&provider) as Arc<dyn ModelProvider>);

        let req = ChatRequest {
            birth_year: Some(chrono::Utc::now().year() - 16),
            ..ChatRequest::from_message("I want to kill myself")
        };
        let outcome = pipeline.handle(&req).await.unwrap();
        let ChatOutcome::Crisis { message } = outcome else {
            panic!("expected the crisis short-circuit");
        };
        assert!(message.contains("988"));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn ineligible_birth_year_skips_provider_regardless_of_message() {
        let provider = Arc::new(ScriptedProvider::new("should never be seen"));
        let pipeline = pipeline_with(Arc::clone(&provider) as Arc<dyn ModelProvider>);

        let req = ChatRequest {
            birth_year: Some(1990),
            ..ChatRequest::from_message("hello there")
        };
        let outcome = pipeline.handle(&req).await.unwrap();
        assert!(matches!(outcome, ChatOutcome::Ineligible { .. }));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn blank_message_fails_validation() {
        let pipeline = pipeline_with(Arc::new(ScriptedProvider::new("unused")));
        let req = ChatRequest::from_message("   ");
        let err = pipeline.handle(&req).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));

        let empty = ChatRequest::default();
        let err = pipeline.handle(&empty).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[tokio::test]
    async fn provider_failure_propagates_with_status() {
        let pipeline = pipeline_with(Arc::new(FailingProvider));
        let req = ChatRequest::from_message("hi");
        let err = pipeline.handle(&req).await.unwrap_err();
        match err {
            PipelineError::Provider(p) => assert!(p.is_rate_limited()),
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn retrieved_passage_titles_become_citations() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(PassageStore::open_path(dir.path().join("passages")).unwrap());
        store
            .insert("stress", &Passage::new("On exam stress", "Break revision into small steps."))
            .unwrap();

        let provider = Arc::new(ScriptedProvider::new("Small steps help."));
        let pipeline = ChatPipeline::new(
            provider,
            Some(store),
            SafetyPolicy::default(),
            ModelParams::default(),
        );
        let req = ChatRequest::from_message("exams are stressing me out");
        let ChatOutcome::Reply(reply) = pipeline.handle(&req).await.unwrap() else {
            panic!("expected reply");
        };
        assert_eq!(reply.citations, vec!["On exam stress".to_string()]);
    }

    #[tokio::test]
    async fn request_overrides_replace_model_params() {
        struct CapturingProvider {
            seen_model: std::sync::Mutex<Option<String>>,
        }

        #[async_trait::async_trait]
        impl ModelProvider for CapturingProvider {
            async fn complete(
                &self,
                _system_prompt: &str,
                _history: &[ChatTurn],
                params: &ModelParams,
            ) -> Result<String, ProviderError> {
                *self.seen_model.lock().unwrap() = Some(params.model.clone());
                Ok("ok".to_string())
            }
        }

        let provider = Arc::new(CapturingProvider {
            seen_model: std::sync::Mutex::new(None),
        });
        let pipeline = pipeline_with(Arc::clone(&provider) as Arc<dyn ModelProvider>);
        let req = ChatRequest {
            model: Some("gpt-4o-mini".to_string()),
            ..ChatRequest::from_message("hi")
        };
        let ChatOutcome::Reply(reply) = pipeline.handle(&req).await.unwrap() else {
            panic!("expected reply");
        };
        assert_eq!(reply.model, "gpt-4o-mini");
        assert_eq!(
            provider.seen_model.lock().unwrap().as_deref(),
            Some("gpt-4o-mini")
        );
    }
}
