use ahash::AHashSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Version tag written into every persisted knowledge base blob.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A single corpus chunk (scraped article section, regulation page, etc).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub category: String,
    pub content: String,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category: category.into(),
            content: content.into(),
        }
    }
}

/// Provenance recorded when the knowledge base was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseMetadata {
    /// Encoder model label used for every stored embedding.
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl KnowledgeBaseMetadata {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            created_at: Utc::now(),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Immutable collection of documents and their unit-length embeddings.
///
/// Embeddings are kept as one row-major `len() x dimensions()` matrix so the
/// similarity scan walks contiguous memory. Row `i` belongs to `documents()[i]`.
///
/// Every row is expected to be L2-normalized by whoever produced it; the
/// knowledge base does not re-check norms.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    documents: Vec<Document>,
    embeddings: Vec<f32>,
    dimensions: usize,
    metadata: KnowledgeBaseMetadata,
}

impl KnowledgeBase {
    /// Build from one embedding row per document.
    pub fn new(
        dimensions: usize,
        documents: Vec<Document>,
        embeddings: Vec<Vec<f32>>,
        metadata: KnowledgeBaseMetadata,
    ) -> Result<Self, DomainError> {
        if documents.len() != embeddings.len() {
            return Err(DomainError::invalid_argument(format!(
                "{} documents but {} embeddings",
                documents.len(),
                embeddings.len()
            )));
        }

        let mut matrix = Vec::with_capacity(documents.len() * dimensions);
        for (idx, row) in embeddings.into_iter().enumerate() {
            if row.len() != dimensions {
                return Err(DomainError::invalid_argument(format!(
                    "embedding {idx} has {} dimensions, expected {dimensions}",
                    row.len()
                )));
            }
            matrix.extend_from_slice(&row);
        }

        Self::from_matrix(dimensions, documents, matrix, metadata)
    }

    /// Build from an already flattened row-major matrix.
    pub fn from_matrix(
        dimensions: usize,
        documents: Vec<Document>,
        embeddings: Vec<f32>,
        metadata: KnowledgeBaseMetadata,
    ) -> Result<Self, DomainError> {
        if dimensions == 0 {
            return Err(DomainError::invalid_argument(
                "embedding dimensionality must be greater than zero",
            ));
        }

        let expected_len = documents.len().checked_mul(dimensions).ok_or_else(|| {
            DomainError::invalid_argument("embedding matrix size overflows usize")
        })?;
        if embeddings.len() != expected_len {
            return Err(DomainError::invalid_argument(format!(
                "embedding matrix holds {} values, expected {} documents x {} dimensions",
                embeddings.len(),
                documents.len(),
                dimensions
            )));
        }

        if let Some(pos) = embeddings.iter().position(|v| !v.is_finite()) {
            return Err(DomainError::invalid_argument(format!(
                "embedding {} contains a non-finite value",
                pos / dimensions
            )));
        }

        let mut seen = AHashSet::with_capacity(documents.len());
        for doc in &documents {
            if doc.id.trim().is_empty() {
                return Err(DomainError::invalid_argument("document id cannot be empty"));
            }
            if !seen.insert(doc.id.as_str()) {
                return Err(DomainError::invalid_argument(format!(
                    "duplicate document id `{}`",
                    doc.id
                )));
            }
        }

        Ok(Self {
            documents,
            embeddings,
            dimensions,
            metadata,
        })
    }

    pub fn empty(dimensions: usize, metadata: KnowledgeBaseMetadata) -> Result<Self, DomainError> {
        Self::from_matrix(dimensions, Vec::new(), Vec::new(), metadata)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn embedding(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.dimensions)?;
        let end = start.checked_add(self.dimensions)?;
        self.embeddings.get(start..end)
    }

    /// Row-major embedding matrix.
    pub fn matrix(&self) -> &[f32] {
        &self.embeddings
    }

    pub fn metadata(&self) -> &KnowledgeBaseMetadata {
        &self.metadata
    }

    /// Borrowed view with the persisted field layout.
    pub fn snapshot(&self) -> SnapshotView<'_> {
        SnapshotView {
            format_version: SNAPSHOT_FORMAT_VERSION,
            document_count: self.documents.len() as u64,
            dimensions: self.dimensions as u64,
            embeddings: &self.embeddings,
            documents: &self.documents,
            metadata: &self.metadata,
        }
    }
}

/// Persisted form of a knowledge base, as read back from storage.
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeBaseSnapshot {
    pub format_version: u32,
    pub document_count: u64,
    pub dimensions: u64,
    pub embeddings: Vec<f32>,
    pub documents: Vec<Document>,
    pub metadata: KnowledgeBaseMetadata,
}

/// Serialize-side twin of [`KnowledgeBaseSnapshot`] that borrows instead of cloning.
#[derive(Debug, Serialize)]
pub struct SnapshotView<'a> {
    pub format_version: u32,
    pub document_count: u64,
    pub dimensions: u64,
    pub embeddings: &'a [f32],
    pub documents: &'a [Document],
    pub metadata: &'a KnowledgeBaseMetadata,
}

impl TryFrom<KnowledgeBaseSnapshot> for KnowledgeBase {
    type Error = DomainError;

    fn try_from(snapshot: KnowledgeBaseSnapshot) -> Result<Self, Self::Error> {
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(DomainError::invalid_argument(format!(
                "unsupported knowledge base format version {} (expected {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        if snapshot.document_count != snapshot.documents.len() as u64 {
            return Err(DomainError::invalid_argument(format!(
                "header declares {} documents but {} are present",
                snapshot.document_count,
                snapshot.documents.len()
            )));
        }

        let dimensions = usize::try_from(snapshot.dimensions).map_err(|_| {
            DomainError::invalid_argument("declared dimensionality does not fit in usize")
        })?;

        Self::from_matrix(
            dimensions,
            snapshot.documents,
            snapshot.embeddings,
            snapshot.metadata,
        )
    }
}
