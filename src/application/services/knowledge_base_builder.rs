use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::{
    application::services::TextEncoder,
    domain::{vector, Document, DomainError, KnowledgeBase, KnowledgeBaseMetadata},
};

const DEFAULT_BATCH_SIZE: usize = 32;
const PROGRESS_EVERY_BATCHES: usize = 10;

/// Offline pipeline turning corpus documents into a searchable knowledge base.
///
/// Every embedding row is L2-normalized here, which is what lets the search
/// engine score with a plain dot product.
pub struct KnowledgeBaseBuilder {
    encoder: Arc<dyn TextEncoder>,
    model: String,
    batch_size: usize,
    notes: Option<String>,
}

impl KnowledgeBaseBuilder {
    pub fn new(encoder: Arc<dyn TextEncoder>, model: impl Into<String>) -> Self {
        Self {
            encoder,
            model: model.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            notes: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn build(&self, documents: Vec<Document>) -> Result<KnowledgeBase, DomainError> {
        let total_input = documents.len();
        let documents: Vec<Document> = documents
            .into_iter()
            .filter(|doc| !doc.content.trim().is_empty())
            .collect();
        let skipped = total_input - documents.len();
        if skipped > 0 {
            warn!(
                target: "rickover::build",
                skipped,
                "dropping documents with empty content"
            );
        }

        let mut metadata = KnowledgeBaseMetadata::new(&self.model);
        metadata.notes = self.notes.clone();

        if documents.is_empty() {
            let dims = self.encoder.dims(&self.model).ok_or_else(|| {
                DomainError::invalid_argument(
                    "no documents to encode and the encoder does not declare its dimensionality",
                )
            })?;
            return KnowledgeBase::empty(dims, metadata);
        }

        let total_batches = documents.len().div_ceil(self.batch_size);
        info!(
            target: "rickover::build",
            documents = documents.len(),
            batches = total_batches,
            batch_size = self.batch_size,
            model = %self.model,
            "encoding corpus"
        );

        let started = Instant::now();
        let mut rows: Vec<Vec<f32>> = Vec::with_capacity(documents.len());

        for (batch_idx, batch) in documents.chunks(self.batch_size).enumerate() {
            let texts: Vec<&str> = batch.iter().map(|doc| doc.content.as_str()).collect();
            let mut vectors = self.encoder.encode_batch(&self.model, &texts)?;

            if vectors.len() != batch.len() {
                return Err(DomainError::encoder(format!(
                    "encoder returned {} embeddings for a batch of {}",
                    vectors.len(),
                    batch.len()
                )));
            }

            for (vector, doc) in vectors.iter_mut().zip(batch) {
                if !vector::l2_normalize(vector) {
                    return Err(DomainError::encoder(format!(
                        "embedding for document `{}` cannot be normalized",
                        doc.id
                    )));
                }
            }
            rows.extend(vectors);

            let done = batch_idx + 1;
            if done % PROGRESS_EVERY_BATCHES == 0 {
                let elapsed = started.elapsed().as_secs_f64();
                let remaining = elapsed * (total_batches - done) as f64 / done as f64;
                info!(
                    target: "rickover::build",
                    batch = done,
                    of = total_batches,
                    remaining_secs = remaining.round() as u64,
                    "encoding progress"
                );
            }
        }

        let dimensions = rows[0].len();
        let knowledge_base = KnowledgeBase::new(dimensions, documents, rows, metadata)?;

        info!(
            target: "rickover::build",
            documents = knowledge_base.len(),
            dimensions,
            elapsed_secs = started.elapsed().as_secs(),
            "knowledge base built"
        );

        Ok(knowledge_base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unnormalized two-dimensional encoder: (length, vowel count).
    struct CountingEncoder;

    impl TextEncoder for CountingEncoder {
        fn encode(&self, _model: &str, text: &str) -> Result<Vec<f32>, DomainError> {
            let vowels = text.chars().filter(|c| "aeiou".contains(*c)).count();
            Ok(vec![text.len() as f32, vowels as f32])
        }

        fn dims(&self, _model: &str) -> Option<usize> {
            Some(2)
        }
    }

    fn doc(id: &str, content: &str) -> Document {
        Document::new(id, id, "test", content)
    }

    #[test]
    fn rows_are_normalized_and_blank_documents_dropped() {
        let builder = KnowledgeBaseBuilder::new(Arc::new(CountingEncoder), "counting")
            .with_batch_size(2)
            .with_notes("unit test");

        let kb = builder
            .build(vec![
                doc("a", "reactor"),
                doc("b", "   "),
                doc("c", "coolant pump"),
                doc("d", "scram"),
            ])
            .unwrap();

        assert_eq!(kb.len(), 3);
        assert_eq!(
            kb.documents().iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "c", "d"]
        );
        for i in 0..kb.len() {
            assert!(vector::is_unit_length(kb.embedding(i).unwrap(), 1e-5));
        }
        assert_eq!(kb.metadata().model, "counting");
        assert_eq!(kb.metadata().notes.as_deref(), Some("unit test"));
    }

    #[test]
    fn empty_corpus_uses_declared_dimensions() {
        let kb = KnowledgeBaseBuilder::new(Arc::new(CountingEncoder), "counting")
            .build(Vec::new())
            .unwrap();
        assert!(kb.is_empty());
        assert_eq!(kb.dimensions(), 2);
    }

    #[test]
    fn zero_vectors_are_rejected() {
        struct ZeroEncoder;
        impl TextEncoder for ZeroEncoder {
            fn encode(&self, _model: &str, _text: &str) -> Result<Vec<f32>, DomainError> {
                Ok(vec![0.0; 4])
            }
        }

        let err = KnowledgeBaseBuilder::new(Arc::new(ZeroEncoder), "zero")
            .build(vec![doc("a", "text")])
            .unwrap_err();
        assert!(matches!(err, DomainError::Encoder(_)));
    }
}
