use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    application::{
        dtos::{
            AnswerResponse, AskRequest, HealthStatusResponse, KnowledgeBaseInfo, SearchRequest,
            SearchResponse, SearchResultDto, SourceRef,
        },
        persona,
    },
    domain::{DomainError, KnowledgeBase, SearchEngine, SearchHit, SelectionStrategy},
};

const MAX_QUESTION_CHARS: usize = 4_000;
const MAX_TOP_K: usize = 50;

/// High level configuration shared by the service and its adapters.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub encoder_model: String,
    pub default_top_k: usize,
    pub strategy: SelectionStrategy,
    pub max_excerpt_chars: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            encoder_model: "rickover/simple-hash".into(),
            default_top_k: 5,
            strategy: SelectionStrategy::Auto,
            max_excerpt_chars: 800,
        }
    }
}

impl ServiceConfig {
    pub fn new(encoder_model: impl Into<String>, default_top_k: usize) -> Self {
        Self {
            encoder_model: encoder_model.into(),
            default_top_k: default_top_k.clamp(1, MAX_TOP_K),
            ..Self::default()
        }
    }

    pub fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_excerpt_chars(mut self, max_excerpt_chars: usize) -> Self {
        self.max_excerpt_chars = max_excerpt_chars.max(1);
        self
    }

    pub fn encoder_model(&self) -> &str {
        &self.encoder_model
    }
}

/// Abstraction over any text encoder (local hash, FastEmbed, hosted API, etc).
///
/// Implementations must return L2-normalized vectors; the search engine
/// scores with a bare dot product and never re-normalizes.
pub trait TextEncoder: Send + Sync {
    fn encode(&self, model: &str, text: &str) -> Result<Vec<f32>, DomainError>;

    fn encode_batch(&self, model: &str, texts: &[&str]) -> Result<Vec<Vec<f32>>, DomainError> {
        texts.iter().map(|text| self.encode(model, text)).collect()
    }

    fn dims(&self, _model: &str) -> Option<usize> {
        None
    }
}

/// Abstraction over the hosted model that writes the final answer.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, DomainError>;

    fn model_name(&self) -> &str;
}

/// Contract for persisting and loading the whole knowledge base.
///
/// `load` either returns a fully validated knowledge base or fails.
pub trait KnowledgeBaseStore: Send + Sync {
    fn load(&self) -> Result<KnowledgeBase, DomainError>;

    fn save(&self, knowledge_base: &KnowledgeBase) -> Result<(), DomainError>;
}

/// Orchestrates validation, query encoding, retrieval and answer generation.
pub struct AdvisorService {
    encoder: Arc<dyn TextEncoder>,
    generator: Arc<dyn TextGenerator>,
    knowledge_base: Arc<KnowledgeBase>,
    engine: SearchEngine,
    config: ServiceConfig,
}

impl AdvisorService {
    pub fn new(
        encoder: Arc<dyn TextEncoder>,
        generator: Arc<dyn TextGenerator>,
        knowledge_base: Arc<KnowledgeBase>,
        config: ServiceConfig,
    ) -> Result<Self, DomainError> {
        if let Some(dims) = encoder.dims(config.encoder_model()) {
            if dims != knowledge_base.dimensions() {
                return Err(DomainError::dimension_mismatch(
                    knowledge_base.dimensions(),
                    dims,
                ));
            }
        }

        let built_with = &knowledge_base.metadata().model;
        if !built_with.eq_ignore_ascii_case(config.encoder_model()) {
            warn!(
                target: "rickover::advisor",
                knowledge_base_model = %built_with,
                encoder_model = %config.encoder_model(),
                "knowledge base was built with a different encoder; scores may be meaningless"
            );
        }

        Ok(Self {
            encoder,
            generator,
            knowledge_base,
            engine: SearchEngine::new(config.strategy),
            config,
        })
    }

    pub fn knowledge_base(&self) -> &Arc<KnowledgeBase> {
        &self.knowledge_base
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Encode `question` and return the closest corpus chunks.
    pub fn retrieve(
        &self,
        question: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<SearchHit<'_>>, DomainError> {
        let question = validate_question(question)?;
        let k = top_k.unwrap_or(self.config.default_top_k).min(MAX_TOP_K);

        let query = self
            .encoder
            .encode(&self.config.encoder_model, question)
            .map_err(into_encoder_error)?;

        self.engine.search(&query, &self.knowledge_base, k)
    }

    pub fn search(&self, request: SearchRequest) -> Result<SearchResponse, DomainError> {
        let hits = self.retrieve(&request.question, request.top_k)?;
        let results = hits.iter().map(SearchResultDto::from).collect();

        Ok(SearchResponse {
            query: request.question.trim().to_string(),
            total_documents: self.knowledge_base.len(),
            results,
        })
    }

    /// Retrieve context for the question and have the generator answer in character.
    ///
    /// Generator failures come back as [`DomainError::Generation`] and are not retried.
    pub fn answer(&self, request: AskRequest) -> Result<AnswerResponse, DomainError> {
        let hits = self.retrieve(&request.question, request.top_k)?;
        let question = request.question.trim();

        let context = persona::format_context(
            question,
            &hits,
            self.knowledge_base.len(),
            self.config.max_excerpt_chars,
        );
        let prompt = persona::build_prompt(&context, question);

        let started = Instant::now();
        let answer = self.generator.generate(&prompt).map_err(|err| {
            let err = into_generation_error(err);
            warn!(target: "rickover::advisor", error = %err, "answer generation failed");
            err
        })?;
        debug!(
            target: "rickover::advisor",
            model = %self.generator.model_name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            hits = hits.len(),
            "answer generated"
        );

        Ok(AnswerResponse {
            question: question.to_string(),
            answer: answer.trim().to_string(),
            context,
            sources: hits.iter().map(SourceRef::from).collect(),
            model: self.generator.model_name().to_string(),
        })
    }

    pub fn health(&self) -> HealthStatusResponse {
        let info = KnowledgeBaseInfo::from(self.knowledge_base.as_ref());
        let message = if self.knowledge_base.is_empty() {
            "knowledge base is empty"
        } else {
            "ready"
        };

        HealthStatusResponse {
            ok: true,
            message: message.into(),
            details: Some(format!(
                "encoder: {}, generator: {}, checked_at: {}",
                self.config.encoder_model,
                self.generator.model_name(),
                Utc::now()
            )),
            knowledge_base: info,
        }
    }
}

fn validate_question(question: &str) -> Result<&str, DomainError> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_argument("question cannot be empty"));
    }
    if trimmed.chars().count() > MAX_QUESTION_CHARS {
        return Err(DomainError::invalid_argument(format!(
            "question cannot exceed {MAX_QUESTION_CHARS} characters"
        )));
    }
    Ok(trimmed)
}

fn into_encoder_error(err: DomainError) -> DomainError {
    match err {
        DomainError::Encoder(_) => err,
        other => DomainError::encoder(other.to_string()),
    }
}

fn into_generation_error(err: DomainError) -> DomainError {
    match err {
        DomainError::Generation(_) => err,
        other => DomainError::generation(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::domain::{Document, KnowledgeBaseMetadata};

    /// Maps known phrases onto fixed unit vectors.
    struct LookupEncoder;

    impl TextEncoder for LookupEncoder {
        fn encode(&self, _model: &str, text: &str) -> Result<Vec<f32>, DomainError> {
            match text {
                "control rods" => Ok(vec![1.0, 0.0]),
                "decay heat" => Ok(vec![0.0, 1.0]),
                "offline" => Err(DomainError::storage("socket closed")),
                _ => Ok(vec![0.6, 0.8]),
            }
        }

        fn dims(&self, _model: &str) -> Option<usize> {
            Some(2)
        }
    }

    struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingGenerator {
        fn new(fail: bool) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl TextGenerator for RecordingGenerator {
        fn generate(&self, prompt: &str) -> Result<String, DomainError> {
            self.prompts.lock().push(prompt.to_string());
            if self.fail {
                Err(DomainError::generation("upstream returned 503"))
            } else {
                Ok("  Follow the procedure.  ".into())
            }
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    fn knowledge_base() -> Arc<KnowledgeBase> {
        Arc::new(
            KnowledgeBase::new(
                2,
                vec![
                    Document::new("rods", "Control rod", "Reactor Physics", "Rods absorb neutrons."),
                    Document::new("heat", "Decay heat", "Thermal Hydraulics", "Heat after shutdown."),
                ],
                vec![vec![1.0, 0.0], vec![0.0, 1.0]],
                KnowledgeBaseMetadata::new("rickover/simple-hash"),
            )
            .unwrap(),
        )
    }

    fn service(generator: Arc<RecordingGenerator>) -> AdvisorService {
        AdvisorService::new(
            Arc::new(LookupEncoder),
            generator,
            knowledge_base(),
            ServiceConfig::new("rickover/simple-hash", 2),
        )
        .unwrap()
    }

    #[test]
    fn search_ranks_closest_document_first() {
        let svc = service(Arc::new(RecordingGenerator::new(false)));
        let response = svc
            .search(SearchRequest {
                question: "control rods".into(),
                top_k: Some(1),
            })
            .unwrap();

        assert_eq!(response.total_documents, 2);
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].id, "rods");
        assert_eq!(response.results[0].rank, 1);
    }

    #[test]
    fn answer_sends_context_to_generator() {
        let generator = Arc::new(RecordingGenerator::new(false));
        let svc = service(Arc::clone(&generator));

        let response = svc.answer(AskRequest::new("decay heat")).unwrap();

        assert_eq!(response.answer, "Follow the procedure.");
        assert_eq!(response.sources[0].id, "heat");
        assert_eq!(response.model, "recording");

        let prompts = generator.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Title: Decay heat"));
        assert!(prompts[0].contains("QUESTION: decay heat"));
    }

    #[test]
    fn generation_failure_is_surfaced_and_knowledge_base_survives() {
        let svc = service(Arc::new(RecordingGenerator::new(true)));

        let err = svc.answer(AskRequest::new("control rods")).unwrap_err();
        assert!(matches!(err, DomainError::Generation(_)));
        assert_eq!(
            err.user_message(),
            "Error generating response: upstream returned 503"
        );

        assert_eq!(svc.knowledge_base().len(), 2);
        assert_eq!(svc.retrieve("control rods", Some(1)).unwrap()[0].document.id, "rods");
    }

    #[test]
    fn encoder_failures_keep_their_own_kind() {
        let svc = service(Arc::new(RecordingGenerator::new(false)));
        let err = svc.retrieve("offline", None).unwrap_err();
        assert!(matches!(err, DomainError::Encoder(_)));
    }

    #[test]
    fn blank_question_and_zero_k_are_rejected() {
        let svc = service(Arc::new(RecordingGenerator::new(false)));
        assert!(matches!(
            svc.retrieve("   ", None).unwrap_err(),
            DomainError::InvalidArgument(_)
        ));
        assert!(matches!(
            svc.retrieve("control rods", Some(0)).unwrap_err(),
            DomainError::InvalidArgument(_)
        ));
    }

    #[test]
    fn encoder_dimensions_must_match_knowledge_base() {
        let kb = Arc::new(
            KnowledgeBase::empty(3, KnowledgeBaseMetadata::new("rickover/simple-hash")).unwrap(),
        );
        let result = AdvisorService::new(
            Arc::new(LookupEncoder),
            Arc::new(RecordingGenerator::new(false)),
            kb,
            ServiceConfig::default(),
        );
        assert!(matches!(
            result,
            Err(DomainError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn empty_retrieval_still_produces_an_answer() {
        let generator = Arc::new(RecordingGenerator::new(false));
        let svc = AdvisorService::new(
            Arc::new(LookupEncoder),
            Arc::clone(&generator) as Arc<dyn TextGenerator>,
            Arc::new(
                KnowledgeBase::empty(2, KnowledgeBaseMetadata::new("rickover/simple-hash"))
                    .unwrap(),
            ),
            ServiceConfig::default(),
        )
        .unwrap();

        let response = svc.answer(AskRequest::new("control rods")).unwrap();
        assert!(response.sources.is_empty());
        assert_eq!(response.context, persona::NO_RELEVANT_INFORMATION);
        assert_eq!(svc.health().message, "knowledge base is empty");
    }
}
