//! Offline step: encode a JSON Lines corpus into the knowledge base blob the
//! assistant loads at start-up.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use rickover_lib::{
    application::{services::KnowledgeBaseStore, KnowledgeBaseBuilder},
    infrastructure::{FileKnowledgeBaseStore, JsonlCorpusReader},
    init_encoder, init_tracing, load_config,
};

#[derive(Parser)]
#[command(
    name = "build-knowledge-base",
    version,
    about = "Encode a scraped corpus into the Rickover knowledge base"
)]
struct Args {
    /// Corpus file, one JSON object per line
    #[arg(short, long)]
    corpus: PathBuf,

    /// Destination blob (defaults to the configured knowledge base path)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Documents per encoder call
    #[arg(short, long, default_value_t = 32)]
    batch_size: usize,

    /// Free-form note stored in the knowledge base metadata
    #[arg(long)]
    notes: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let started = Instant::now();
    let (config, _data_dir) = load_config()?;
    let active = config.current();

    let documents = JsonlCorpusReader
        .read_path(&args.corpus)
        .with_context(|| format!("failed to read corpus {}", args.corpus.display()))?;

    let (encoder, model) =
        init_encoder(&active.encoder).context("failed to initialise corpus encoder")?;

    let notes = args
        .notes
        .unwrap_or_else(|| format!("corpus: {}", args.corpus.display()));
    let knowledge_base = KnowledgeBaseBuilder::new(encoder, model)
        .with_batch_size(args.batch_size)
        .with_notes(notes)
        .build(documents)
        .context("failed to build knowledge base")?;

    let output = args.output.unwrap_or_else(|| config.knowledge_base_path());
    FileKnowledgeBaseStore::new(&output)
        .save(&knowledge_base)
        .with_context(|| format!("failed to save knowledge base to {}", output.display()))?;

    info!(
        target: "rickover::build",
        documents = knowledge_base.len(),
        dimensions = knowledge_base.dimensions(),
        output = %output.display(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "knowledge base ready"
    );

    Ok(())
}
