//! Application layer wiring DTOs, persona prompting and services.

pub mod dtos;
pub mod persona;
pub mod services;

pub use dtos::{
    AnswerResponse, AskRequest, HealthStatusResponse, KnowledgeBaseInfo, SearchRequest,
    SearchResponse, SearchResultDto, SourceRef,
};
pub use services::{AdvisorService, KnowledgeBaseBuilder, ServiceConfig};
