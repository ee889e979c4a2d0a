use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{KnowledgeBase, SearchHit};

/// Retrieval-only request: find the corpus chunks closest to a question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub question: String,
    /// Falls back to the configured default when absent.
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Full RAG request: retrieve context, then answer in character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl AskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: None,
        }
    }
}

/// Result row returned from semantic retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultDto {
    pub rank: usize,
    pub id: String,
    pub title: String,
    pub category: String,
    pub content: String,
    pub score: f32,
}

impl From<&SearchHit<'_>> for SearchResultDto {
    fn from(hit: &SearchHit<'_>) -> Self {
        Self {
            rank: hit.rank,
            id: hit.document.id.clone(),
            title: hit.document.title.clone(),
            category: hit.document.category.clone(),
            content: hit.document.content.clone(),
            score: hit.score,
        }
    }
}

/// Response envelope for search operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub total_documents: usize,
    pub results: Vec<SearchResultDto>,
}

/// Compact citation for a document that fed the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub rank: usize,
    pub id: String,
    pub title: String,
    pub score: f32,
}

impl From<&SearchHit<'_>> for SourceRef {
    fn from(hit: &SearchHit<'_>) -> Self {
        Self {
            rank: hit.rank,
            id: hit.document.id.clone(),
            title: hit.document.title.clone(),
            score: hit.score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub question: String,
    pub answer: String,
    /// Formatted retrieval context that was sent to the generator.
    pub context: String,
    pub sources: Vec<SourceRef>,
    pub model: String,
}

/// Shape of the loaded knowledge base, for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseInfo {
    pub documents: usize,
    pub dimensions: usize,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

impl From<&KnowledgeBase> for KnowledgeBaseInfo {
    fn from(kb: &KnowledgeBase) -> Self {
        Self {
            documents: kb.len(),
            dimensions: kb.dimensions(),
            model: kb.metadata().model.clone(),
            created_at: kb.metadata().created_at,
        }
    }
}

/// Health/readiness report for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatusResponse {
    pub ok: bool,
    pub message: String,
    pub details: Option<String>,
    pub knowledge_base: KnowledgeBaseInfo,
}
