use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bincode::Options;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::{
    application::services::KnowledgeBaseStore,
    domain::{DomainError, KnowledgeBase, KnowledgeBaseSnapshot},
};

/// Knowledge base persisted as a single bincode blob on local disk.
///
/// The whole file is read and validated on `load`; a truncated or malformed
/// blob never produces a partially populated knowledge base. `save` writes to
/// a sibling temp file first and renames it into place.
pub struct FileKnowledgeBaseStore {
    path: PathBuf,
}

impl FileKnowledgeBaseStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, DomainError> {
        bincode::options()
            .with_fixint_encoding()
            .serialize(value)
            .map_err(|err| DomainError::storage(format!("serialization error: {err}")))
    }

    fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DomainError> {
        bincode::options()
            .with_fixint_encoding()
            .deserialize(bytes)
            .map_err(|err| DomainError::storage(format!("deserialization error: {err}")))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "knowledge_base.bin".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl KnowledgeBaseStore for FileKnowledgeBaseStore {
    fn load(&self) -> Result<KnowledgeBase, DomainError> {
        let bytes = fs::read(&self.path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => DomainError::storage(format!(
                "knowledge base not found at {}; run `build-knowledge-base` first",
                self.path.display()
            )),
            _ => DomainError::storage(format!(
                "failed to read knowledge base {}: {err}",
                self.path.display()
            )),
        })?;

        let snapshot: KnowledgeBaseSnapshot = Self::deserialize(&bytes)?;
        let knowledge_base = KnowledgeBase::try_from(snapshot)?;

        info!(
            target: "rickover::storage",
            path = %self.path.display(),
            documents = knowledge_base.len(),
            dimensions = knowledge_base.dimensions(),
            model = %knowledge_base.metadata().model,
            size_mb = bytes.len() as f64 / (1024.0 * 1024.0),
            "knowledge base loaded"
        );

        Ok(knowledge_base)
    }

    fn save(&self, knowledge_base: &KnowledgeBase) -> Result<(), DomainError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                DomainError::storage(format!("failed to create directory {:?}: {err}", parent))
            })?;
        }

        let bytes = Self::serialize(&knowledge_base.snapshot())?;
        let temp = self.temp_path();

        fs::write(&temp, &bytes).map_err(|err| {
            DomainError::storage(format!("failed to write {}: {err}", temp.display()))
        })?;
        fs::rename(&temp, &self.path).map_err(|err| {
            DomainError::storage(format!(
                "failed to move knowledge base into {}: {err}",
                self.path.display()
            ))
        })?;

        info!(
            target: "rickover::storage",
            path = %self.path.display(),
            documents = knowledge_base.len(),
            size_mb = bytes.len() as f64 / (1024.0 * 1024.0),
            "knowledge base saved"
        );

        Ok(())
    }
}
