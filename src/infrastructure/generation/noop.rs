//! Generator used when no Gemini API key is configured.
//!
//! Retrieval and search keep working; only `ask` fails, with a message that
//! tells the user which environment variable to set.

use crate::{application::services::TextGenerator, domain::DomainError};

pub struct NoOpGenerator {
    api_key_env: String,
}

impl NoOpGenerator {
    pub fn new(api_key_env: impl Into<String>) -> Self {
        Self {
            api_key_env: api_key_env.into(),
        }
    }
}

impl Default for NoOpGenerator {
    fn default() -> Self {
        Self::new("GOOGLE_API_KEY")
    }
}

impl TextGenerator for NoOpGenerator {
    fn generate(&self, _prompt: &str) -> Result<String, DomainError> {
        Err(DomainError::generation(format!(
            "no API key configured; set {} to enable answers",
            self.api_key_env
        )))
    }

    fn model_name(&self) -> &str {
        "none"
    }
}
