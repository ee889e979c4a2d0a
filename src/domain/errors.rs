use thiserror::Error;

/// Domain-level errors shared across application components.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A caller-supplied argument or a loaded knowledge base violated its invariants.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Query vector length does not match the knowledge base dimensionality.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Knowledge base file I/O or (de)serialization failure.
    #[error("storage failure: {0}")]
    Storage(String),

    /// The text encoder could not produce an embedding.
    #[error("encoder failure: {0}")]
    Encoder(String),

    /// The text generator could not produce an answer.
    #[error("generation failure: {0}")]
    Generation(String),
}

impl DomainError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Stable short label for the error variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::Storage(_) => "storage",
            Self::Encoder(_) => "encoder",
            Self::Generation(_) => "generation",
        }
    }

    /// Text shown to the person asking the question.
    pub fn user_message(&self) -> String {
        match self {
            Self::Generation(msg) => format!("Error generating response: {msg}"),
            Self::Encoder(msg) => format!("Error encoding your question: {msg}"),
            Self::InvalidArgument(msg) => format!("Invalid request: {msg}"),
            other => format!("Error: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_mismatch_reports_both_sides() {
        let err = DomainError::dimension_mismatch(384, 768);
        assert_eq!(err.to_string(), "dimension mismatch: expected 384, got 768");
        assert_eq!(err.kind(), "dimension_mismatch");
    }

    #[test]
    fn generation_errors_become_user_visible_messages() {
        let err = DomainError::generation("quota exhausted");
        assert_eq!(err.user_message(), "Error generating response: quota exhausted");
    }
}
