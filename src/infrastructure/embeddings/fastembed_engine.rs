use std::str::FromStr;

use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};
use parking_lot::Mutex;

use crate::{
    application::services::TextEncoder,
    domain::{vector, DomainError},
};

/// Sentence-embedding encoder backed by `fastembed`'s `TextEmbedding`.
///
/// The engine keeps a single `TextEmbedding` instance behind a `Mutex`, which
/// allows us to reuse the loaded model without cloning heavyweight resources.
/// Outputs are L2-normalized before they leave the engine.
pub struct FastEmbedEngine {
    model_label: String,
    dimensions: usize,
    inner: Mutex<TextEmbedding>,
}

impl FastEmbedEngine {
    /// Create a new engine for the given model (for example `Qdrant/all-MiniLM-L6-v2-onnx`).
    pub fn try_new(model_name: impl AsRef<str>) -> Result<Self, DomainError> {
        let label = model_name.as_ref().trim();
        if label.is_empty() {
            return Err(DomainError::invalid_argument(
                "fastembed model name cannot be empty",
            ));
        }

        let embedding_model = EmbeddingModel::from_str(label).map_err(|err| {
            DomainError::encoder(format!("failed to parse fastembed model `{label}`: {err}"))
        })?;

        let model_info = TextEmbedding::get_model_info(&embedding_model).map_err(|err| {
            DomainError::encoder(format!(
                "unable to read metadata for fastembed model `{label}`: {err}"
            ))
        })?;

        let init_options = TextInitOptions::new(embedding_model.clone());
        let text_embedding = TextEmbedding::try_new(init_options).map_err(|err| {
            DomainError::encoder(format!(
                "failed to initialise fastembed model `{label}`: {err}"
            ))
        })?;

        Ok(Self {
            model_label: label.to_string(),
            dimensions: model_info.dim,
            inner: Mutex::new(text_embedding),
        })
    }

    fn check_model(&self, model: &str) -> Result<(), DomainError> {
        if model.eq_ignore_ascii_case(&self.model_label) {
            Ok(())
        } else {
            Err(DomainError::encoder(format!(
                "engine initialised for `{}` but `{}` requested",
                self.model_label, model
            )))
        }
    }

    fn finish(&self, mut vector: Vec<f32>) -> Result<Vec<f32>, DomainError> {
        if vector.len() != self.dimensions {
            return Err(DomainError::encoder(format!(
                "unexpected embedding dimension (expected {}, got {})",
                self.dimensions,
                vector.len()
            )));
        }
        if !vector::l2_normalize(&mut vector) {
            return Err(DomainError::encoder("fastembed returned a zero vector"));
        }
        Ok(vector)
    }
}

impl TextEncoder for FastEmbedEngine {
    fn encode(&self, model: &str, text: &str) -> Result<Vec<f32>, DomainError> {
        self.check_model(model)?;

        if text.trim().is_empty() {
            return Err(DomainError::invalid_argument("text payload cannot be empty"));
        }

        let mut embedder = self.inner.lock();
        let embeddings = embedder
            .embed(vec![text], None)
            .map_err(|err| DomainError::encoder(format!("fastembed inference failed: {err}")))?;
        let vector = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::encoder("fastembed returned no embedding"))?;

        self.finish(vector)
    }

    fn encode_batch(&self, model: &str, texts: &[&str]) -> Result<Vec<Vec<f32>>, DomainError> {
        self.check_model(model)?;

        let mut embedder = self.inner.lock();
        let embeddings = embedder
            .embed(texts.to_vec(), Some(texts.len().max(1)))
            .map_err(|err| DomainError::encoder(format!("fastembed inference failed: {err}")))?;

        embeddings
            .into_iter()
            .map(|vector| self.finish(vector))
            .collect()
    }

    fn dims(&self, _model: &str) -> Option<usize> {
        Some(self.dimensions)
    }
}
