//! Domain layer: knowledge base entities and the similarity search engine.

pub mod errors;
pub mod models;
pub mod search;
pub mod vector;

pub use errors::DomainError;
pub use models::{
    Document, KnowledgeBase, KnowledgeBaseMetadata, KnowledgeBaseSnapshot, SnapshotView,
    SNAPSHOT_FORMAT_VERSION,
};
pub use search::{SearchEngine, SearchHit, SelectionStrategy};
