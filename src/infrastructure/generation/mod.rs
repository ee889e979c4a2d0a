//! Answer generation backends.

pub mod gemini;
pub mod noop;

pub use gemini::GeminiGenerator;
pub use noop::NoOpGenerator;
