use crate::{
    application::services::TextEncoder,
    domain::{vector, DomainError},
};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// A lightweight, deterministic encoder that hashes tokens into a fixed-size vector.
///
/// Not meant for production-grade semantic search, but it keeps the assistant
/// functional without downloading models. Hashing is FNV-1a so vectors stay
/// identical between the process that built a knowledge base and the one
/// serving it.
pub struct SimpleEmbedEngine {
    model_name: String,
    dimensions: usize,
}

impl SimpleEmbedEngine {
    pub fn try_new(model_name: impl Into<String>, dimensions: usize) -> Result<Self, DomainError> {
        if dimensions == 0 {
            return Err(DomainError::invalid_argument(
                "embedding dimensions must be greater than zero",
            ));
        }
        let dims = dimensions.clamp(8, 4096);
        Ok(Self {
            model_name: model_name.into(),
            dimensions: dims,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn tokenize(text: &str) -> impl Iterator<Item = &str> {
        text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
            .filter(|token| !token.is_empty())
    }

    fn hash_token(token: &str) -> u64 {
        token
            .chars()
            .flat_map(char::to_lowercase)
            .fold(FNV_OFFSET, |hash, c| {
                let mut buf = [0u8; 4];
                c.encode_utf8(&mut buf).bytes().fold(hash, |h, b| {
                    (h ^ u64::from(b)).wrapping_mul(FNV_PRIME)
                })
            })
    }

    fn embed_internal(&self, text: &str) -> Vec<f32> {
        let signed = self.bag_of_tokens(text, true);
        match signed {
            Some(vector) => vector,
            // Every bucket cancelled out; count tokens unsigned instead.
            None => self
                .bag_of_tokens(text, false)
                .unwrap_or_else(|| vec![0.0; self.dimensions]),
        }
    }

    /// Hash every token into its bucket and normalize. `None` when the
    /// accumulated vector has no length.
    fn bag_of_tokens(&self, text: &str, signed: bool) -> Option<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];

        let mut any = false;
        for token in Self::tokenize(text) {
            self.accumulate(&mut vector, token, signed);
            any = true;
        }
        // Punctuation-only input still needs a direction.
        if !any {
            self.accumulate(&mut vector, text.trim(), signed);
        }

        vector::l2_normalize(&mut vector).then_some(vector)
    }

    fn accumulate(&self, vector: &mut [f32], token: &str, signed: bool) {
        let hash = Self::hash_token(token);
        let idx = (hash % self.dimensions as u64) as usize;
        // High bit picks the sign so collisions partly cancel instead of piling up.
        let sign = if signed && hash >> 63 != 0 { -1.0 } else { 1.0 };
        vector[idx] += sign;
    }
}

impl Default for SimpleEmbedEngine {
    fn default() -> Self {
        Self {
            model_name: "rickover/simple-hash".to_string(),
            dimensions: 384,
        }
    }
}

impl TextEncoder for SimpleEmbedEngine {
    fn encode(&self, model: &str, text: &str) -> Result<Vec<f32>, DomainError> {
        if !model.eq_ignore_ascii_case(&self.model_name) {
            return Err(DomainError::encoder(format!(
                "engine initialised for `{}` but `{}` requested",
                self.model_name, model
            )));
        }
        if text.trim().is_empty() {
            return Err(DomainError::invalid_argument("text payload cannot be empty"));
        }
        Ok(self.embed_internal(text))
    }

    fn dims(&self, _model: &str) -> Option<usize> {
        Some(self.dimensions)
    }
}
