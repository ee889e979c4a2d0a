use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::{Document, DomainError};

const PROGRESS_EVERY: usize = 1_000;

/// One scraped chunk as it appears in the corpus file. Extra fields
/// (url, scraped_at, ...) are ignored.
#[derive(Debug, Deserialize)]
struct CorpusRecord {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// Reads corpus chunks from a JSON Lines file, one object per line.
///
/// Blank lines are ignored and malformed lines are skipped with a warning.
/// Missing fields get defaults: `doc_{n}` for the id (n counts parsed
/// documents), `No title`, `Unknown` and empty content.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonlCorpusReader;

impl JsonlCorpusReader {
    pub fn read_path(&self, path: impl AsRef<Path>) -> Result<Vec<Document>, DomainError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| {
            DomainError::storage(format!("failed to open corpus {}: {err}", path.display()))
        })?;
        self.read(BufReader::new(file))
    }

    pub fn read<R: BufRead>(&self, reader: R) -> Result<Vec<Document>, DomainError> {
        let mut documents = Vec::new();
        let mut skipped = 0usize;

        for (line_idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|err| {
                DomainError::storage(format!("failed to read corpus line {}: {err}", line_idx + 1))
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let record: CorpusRecord = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(err) => {
                    warn!(
                        target: "rickover::corpus",
                        line = line_idx + 1,
                        error = %err,
                        "skipping unreadable corpus line"
                    );
                    skipped += 1;
                    continue;
                }
            };

            documents.push(Self::into_document(record, documents.len()));

            if documents.len() % PROGRESS_EVERY == 0 {
                info!(target: "rickover::corpus", parsed = documents.len(), "reading corpus");
            }
        }

        info!(
            target: "rickover::corpus",
            documents = documents.len(),
            skipped,
            "corpus loaded"
        );

        Ok(documents)
    }

    fn into_document(record: CorpusRecord, position: usize) -> Document {
        let id = match record.id {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => format!("doc_{position}"),
        };

        Document::new(
            id,
            record.title.unwrap_or_else(|| "No title".to_string()),
            record.category.unwrap_or_else(|| "Unknown".to_string()),
            record.content.unwrap_or_default(),
        )
    }
}
