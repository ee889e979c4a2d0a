//! Infrastructure layer wiring concrete adapters (embeddings, storage, corpus, generation).

pub mod corpus;
pub mod embeddings;
pub mod generation;
pub mod storage;

pub use corpus::JsonlCorpusReader;
#[cfg(feature = "fastembed-engine")]
pub use embeddings::FastEmbedEngine;
pub use embeddings::SimpleEmbedEngine;
pub use generation::{GeminiGenerator, NoOpGenerator};
pub use storage::FileKnowledgeBaseStore;
