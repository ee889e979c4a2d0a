//! Retrieval-augmented nuclear training assistant that answers in the voice of
//! Admiral Hyman G. Rickover.
//!
//! The crate is split the usual way: `domain` holds the knowledge base and the
//! exact similarity search, `application` orchestrates retrieval and prompting,
//! `infrastructure` provides encoders, storage, corpus reading and the hosted
//! generator, and `settings` persists the user-editable configuration.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod settings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use crate::{
    application::services::{
        AdvisorService, KnowledgeBaseStore, ServiceConfig, TextEncoder, TextGenerator,
    },
    domain::KnowledgeBase,
    infrastructure::{FileKnowledgeBaseStore, GeminiGenerator, NoOpGenerator, SimpleEmbedEngine},
    settings::{AppConfig, ConfigManager, EncoderBackend, GeneratorSettings},
};

#[cfg(feature = "fastembed-engine")]
use crate::infrastructure::FastEmbedEngine;

/// Everything a front-end needs once start-up has succeeded.
#[derive(Clone)]
pub struct AppHandles {
    pub service: Arc<AdvisorService>,
    pub knowledge_base: Arc<KnowledgeBase>,
    pub config: Arc<ConfigManager>,
    pub data_dir: PathBuf,
}

/// Install the global tracing subscriber, writing to stderr.
///
/// The filter comes from `RICKOVER_LOG` (default `info`). Safe to call more
/// than once; only the first call installs anything.
pub fn init_tracing() {
    init_tracing_with_writer(std::io::stderr);
}

fn init_tracing_with_writer<W>(make_writer: fn() -> W)
where
    W: std::io::Write + Send + Sync + 'static,
{
    static INIT: std::sync::OnceLock<()> = std::sync::OnceLock::new();

    let _ = INIT.get_or_init(|| {
        let filter = std::env::var("RICKOVER_LOG").unwrap_or_else(|_| "info".into());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(make_writer)
            .compact()
            .try_init();
    });
}

/// Load config, knowledge base, encoder and generator, and wire the service.
pub fn build_environment() -> Result<AppHandles> {
    let data_dir = resolve_data_dir()?;
    let config = Arc::new(ConfigManager::load(&data_dir).context("failed to load config file")?);
    let active = config.current();

    let store = FileKnowledgeBaseStore::new(config.knowledge_base_path());
    let knowledge_base = Arc::new(store.load().context("failed to load knowledge base")?);

    let (encoder, model) =
        init_encoder(&active.encoder).context("failed to initialise query encoder")?;
    let generator = init_generator(&active.generator).context("failed to initialise generator")?;

    let service = AdvisorService::new(
        encoder,
        generator,
        Arc::clone(&knowledge_base),
        service_config(&active, model),
    )
    .context("knowledge base does not match the configured encoder")?;

    info!(
        target: "rickover::startup",
        data_dir = %data_dir.display(),
        documents = knowledge_base.len(),
        dimensions = knowledge_base.dimensions(),
        "environment ready"
    );

    Ok(AppHandles {
        service: Arc::new(service),
        knowledge_base,
        config,
        data_dir,
    })
}

/// Open the config for tools that do not need a loaded knowledge base.
pub fn load_config() -> Result<(Arc<ConfigManager>, PathBuf)> {
    let data_dir = resolve_data_dir()?;
    let config = Arc::new(ConfigManager::load(&data_dir).context("failed to load config file")?);
    Ok((config, data_dir))
}

/// Instantiate the configured encoder, returning it with its model label.
pub fn init_encoder(backend: &EncoderBackend) -> Result<(Arc<dyn TextEncoder>, String)> {
    match backend {
        EncoderBackend::Simple { model, dimensions } => {
            let engine = SimpleEmbedEngine::try_new(model.clone(), *dimensions)?;
            Ok((Arc::new(engine), model.clone()))
        }
        #[cfg(feature = "fastembed-engine")]
        EncoderBackend::FastEmbed { model } => {
            let engine = FastEmbedEngine::try_new(model)?;
            Ok((Arc::new(engine), model.clone()))
        }
    }
}

/// Gemini when an API key is available, otherwise a generator that refuses
/// every request so retrieval still works offline.
pub fn init_generator(settings: &GeneratorSettings) -> Result<Arc<dyn TextGenerator>> {
    match settings.api_key() {
        Some(key) => {
            let generator = GeminiGenerator::new(
                key,
                settings.model.clone(),
                settings.endpoint.clone(),
                Duration::from_secs(settings.timeout_secs.max(1)),
            )?;
            Ok(Arc::new(generator))
        }
        None => {
            warn!(
                target: "rickover::startup",
                env = %settings.api_key_env,
                "no API key found; answers are disabled, search still works"
            );
            Ok(Arc::new(NoOpGenerator::new(settings.api_key_env.clone())))
        }
    }
}

fn service_config(config: &AppConfig, model: String) -> ServiceConfig {
    ServiceConfig::new(model, config.retrieval.top_k)
        .with_strategy(config.retrieval.strategy)
        .with_max_excerpt_chars(config.retrieval.max_excerpt_chars)
}

fn resolve_data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("RICKOVER_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => directories::ProjectDirs::from("dev", "rickover", "Rickover")
            .ok_or_else(|| anyhow!("unable to determine OS data dir"))?
            .data_dir()
            .to_path_buf(),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create data directory {}", dir.display()))?;
    Ok(dir)
}
