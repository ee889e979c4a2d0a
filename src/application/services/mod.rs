//! Service layer orchestrating domain operations and infrastructure adapters.

mod advisor_service;
mod knowledge_base_builder;

pub use advisor_service::{
    AdvisorService, KnowledgeBaseStore, ServiceConfig, TextEncoder, TextGenerator,
};
pub use knowledge_base_builder::KnowledgeBaseBuilder;
