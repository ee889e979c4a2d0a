//! Storage adapters for the knowledge base.
//!
//! The knowledge base is written once by the offline build and read whole at
//! start-up, so a single file blob is all the persistence it needs.

pub mod file_store;

pub use file_store::FileKnowledgeBaseStore;
