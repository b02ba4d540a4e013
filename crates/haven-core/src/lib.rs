//! haven-core: support-chat core library (shared types, safety pipeline, passage store).
//!
//! Re-exports the public surface so the provider crate and the gateway keep a
//! consistent API: request/config types, the error taxonomy, the safety
//! components (eligibility gate, crisis detector, citation sanitizer), the
//! sled-backed passage store, and the `ModelProvider` seam consumed by the
//! [`ChatPipeline`].

mod error;
mod knowledge;
mod pipeline;
mod provider;
mod safety;
mod shared;

pub use shared::{ChatRequest, ChatTurn, CoreConfig, ModelParams, Role};

pub use error::{PipelineError, ProviderError, StoreError};

pub use safety::{
    assess_birth_year, CitationSanitizer, CrisisDetector, Eligibility, SafetyPolicy,
    ELIGIBLE_AGE_MAX, ELIGIBLE_AGE_MIN, REDACTED_URL_PLACEHOLDER,
};

pub use knowledge::{cosine_similarity, stub_embedding, Passage, PassageStore, EMBEDDING_DIMS};

pub use provider::ModelProvider;

pub use pipeline::{ChatOutcome, ChatPipeline, ChatReply};
