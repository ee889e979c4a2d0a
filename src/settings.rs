use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::SelectionStrategy;
use crate::infrastructure::generation::gemini;

/// Default filename used to persist configuration within the data directory.
const CONFIG_FILENAME: &str = "config.json";

/// Default filename of the knowledge base blob within the data directory.
pub const KNOWLEDGE_BASE_FILENAME: &str = "knowledge_base.bin";

/// Query/corpus encoders compiled into the binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum EncoderBackend {
    /// Deterministic hash encoder (always available, no model download).
    Simple {
        #[serde(default = "default_simple_model")]
        model: String,
        #[serde(default = "default_simple_dim")]
        dimensions: usize,
    },
    /// Sentence embeddings powered by FastEmbed (feature gated).
    #[cfg(feature = "fastembed-engine")]
    #[serde(rename = "fastembed")]
    FastEmbed { model: String },
}

impl EncoderBackend {
    pub fn id(&self) -> &'static str {
        match self {
            EncoderBackend::Simple { .. } => "simple",
            #[cfg(feature = "fastembed-engine")]
            EncoderBackend::FastEmbed { .. } => "fastembed",
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            EncoderBackend::Simple { model, .. } => model,
            #[cfg(feature = "fastembed-engine")]
            EncoderBackend::FastEmbed { model } => model,
        }
    }
}

impl Default for EncoderBackend {
    fn default() -> Self {
        #[cfg(feature = "fastembed-engine")]
        {
            EncoderBackend::FastEmbed {
                model: default_fastembed_model(),
            }
        }
        #[cfg(not(feature = "fastembed-engine"))]
        {
            EncoderBackend::Simple {
                model: default_simple_model(),
                dimensions: default_simple_dim(),
            }
        }
    }
}

/// Remote answer generator settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneratorSettings {
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Name of the environment variable holding the API key. The key itself
    /// is never written to the config file.
    pub api_key_env: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            model: gemini::DEFAULT_MODEL.to_string(),
            endpoint: gemini::DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 60,
            api_key_env: "GOOGLE_API_KEY".to_string(),
        }
    }
}

impl GeneratorSettings {
    /// The API key from the environment, if set and non-blank.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub strategy: SelectionStrategy,
    pub max_excerpt_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            strategy: SelectionStrategy::Auto,
            max_excerpt_chars: 800,
        }
    }
}

/// Complete persisted configuration payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub encoder: EncoderBackend,
    #[serde(default)]
    pub generator: GeneratorSettings,
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_base_path: Option<PathBuf>,
}

/// Thread-safe manager responsible for loading and persisting `AppConfig`.
pub struct ConfigManager {
    path: PathBuf,
    data_dir: PathBuf,
    state: RwLock<AppConfig>,
}

impl ConfigManager {
    /// Create a manager rooted at `data_dir`. The JSON file lives at
    /// `<data_dir>/config.json` and is written with defaults when missing.
    /// An unreadable file falls back to defaults and is left untouched.
    pub fn load(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let path = data_dir.join(CONFIG_FILENAME);

        let manager = if path.exists() {
            let bytes = fs::read(&path)?;
            let config = serde_json::from_slice::<AppConfig>(&bytes).unwrap_or_else(|err| {
                warn!(
                    target: "rickover::settings",
                    path = %path.display(),
                    error = %err,
                    "invalid config file, using defaults"
                );
                AppConfig::default()
            });
            Self {
                path,
                data_dir,
                state: RwLock::new(config),
            }
        } else {
            let manager = Self {
                path,
                data_dir,
                state: RwLock::new(AppConfig::default()),
            };
            manager.persist_locked(&manager.state.read())?;
            info!(
                target: "rickover::settings",
                path = %manager.path.display(),
                "wrote default config"
            );
            manager
        };

        Ok(manager)
    }

    /// Snapshot of the current configuration.
    pub fn current(&self) -> AppConfig {
        self.state.read().clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the knowledge base blob is read from and written to.
    pub fn knowledge_base_path(&self) -> PathBuf {
        self.state
            .read()
            .knowledge_base_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(KNOWLEDGE_BASE_FILENAME))
    }

    /// Apply `change` to the configuration and persist the result.
    pub fn update(&self, change: impl FnOnce(&mut AppConfig)) -> std::io::Result<AppConfig> {
        let mut guard = self.state.write();
        change(&mut guard);
        self.persist_locked(&guard)?;
        Ok(guard.clone())
    }

    fn persist_locked(&self, config: &AppConfig) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_vec_pretty(config)?;
        fs::write(&self.path, payload)
    }
}

const fn default_simple_dim() -> usize {
    384
}

fn default_simple_model() -> String {
    "rickover/simple-hash".to_string()
}

#[cfg(feature = "fastembed-engine")]
fn default_fastembed_model() -> String {
    "Qdrant/all-MiniLM-L6-v2-onnx".to_string()
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn missing_config_is_written_with_defaults() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::load(dir.path()).unwrap();

        assert!(manager.path().exists());
        let config = manager.current();
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.generator.model, "gemini-1.5-flash");
        assert_eq!(
            manager.knowledge_base_path(),
            dir.path().join(KNOWLEDGE_BASE_FILENAME)
        );
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            r#"{"encoder":{"backend":"simple","dimensions":64},"retrieval":{"top_k":3,"strategy":"partial-select"}}"#,
        )
        .unwrap();

        let config = ConfigManager::load(dir.path()).unwrap().current();

        assert_eq!(
            config.encoder,
            EncoderBackend::Simple {
                model: "rickover/simple-hash".into(),
                dimensions: 64
            }
        );
        assert_eq!(config.encoder.id(), "simple");
        assert_eq!(config.encoder.model_name(), "rickover/simple-hash");
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.strategy, SelectionStrategy::PartialSelect);
        assert_eq!(config.retrieval.max_excerpt_chars, 800);
        assert_eq!(config.generator.api_key_env, "GOOGLE_API_KEY");
    }

    #[test]
    fn update_persists_changes() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::load(dir.path()).unwrap();
        manager
            .update(|config| config.knowledge_base_path = Some("/srv/kb.bin".into()))
            .unwrap();

        let reloaded = ConfigManager::load(dir.path()).unwrap();
        assert_eq!(reloaded.knowledge_base_path(), PathBuf::from("/srv/kb.bin"));
    }

    #[test]
    fn garbage_config_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), b"{not json").unwrap();

        let manager = ConfigManager::load(dir.path()).unwrap();
        assert_eq!(manager.current(), AppConfig::default());
    }
}
