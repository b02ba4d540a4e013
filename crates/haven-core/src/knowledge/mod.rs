//! Optional knowledge lookup: passage store plus placeholder embeddings.

mod store;

pub use store::{cosine_similarity, stub_embedding, Passage, PassageStore, EMBEDDING_DIMS};
