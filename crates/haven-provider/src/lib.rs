//! Model-provider implementations behind the `haven_core::ModelProvider` seam.

mod mock;
mod openai;

pub use mock::MockProvider;
pub use openai::OpenAiProvider;
