//! Corpus ingestion for the offline knowledge base build.

pub mod jsonl_reader;

pub use jsonl_reader::JsonlCorpusReader;
