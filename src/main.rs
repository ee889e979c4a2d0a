//! # Rickover
//!
//! Ask the Admiral about naval reactors, regulation and nuclear history.
//!
//! Usage:
//!   rickover                              # Interactive chat (default)
//!   rickover ask "What is a SCRAM?"       # One question, one answer
//!   rickover search "decay heat" -k 3     # Show the retrieved chunks only
//!   rickover info                         # Knowledge base diagnostics

use std::io::{self, BufRead, Write};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use rickover_lib::{
    application::{persona, AdvisorService, AnswerResponse, AskRequest, SearchRequest},
    build_environment, init_tracing,
};

#[derive(Parser)]
#[command(
    name = "rickover",
    version,
    about = "Nuclear training assistant answering as Admiral Rickover"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive question and answer session
    Chat,
    /// Answer a single question
    Ask {
        question: String,
        /// Number of corpus chunks used as context
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Print the retrieved context before the answer
        #[arg(long)]
        show_context: bool,
    },
    /// Retrieve the closest corpus chunks without generating an answer
    Search {
        question: String,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print knowledge base and service diagnostics
    Info {
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let handles = build_environment()?;
    let service = handles.service.as_ref();

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat(service),
        Command::Ask {
            question,
            top_k,
            show_context,
        } => {
            let response = match service.answer(AskRequest { question, top_k }) {
                Ok(response) => response,
                Err(err) => bail!(err.user_message()),
            };
            if show_context {
                println!("{}\n", response.context);
            }
            print_answer(&response);
            Ok(())
        }
        Command::Search {
            question,
            top_k,
            json,
        } => {
            let response = match service.search(SearchRequest { question, top_k }) {
                Ok(response) => response,
                Err(err) => bail!(err.user_message()),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
                return Ok(());
            }
            println!(
                "{} result(s) for \"{}\" out of {} chunks",
                response.results.len(),
                response.query,
                response.total_documents
            );
            for result in &response.results {
                println!(
                    "{:>3}. [{:.3}] {} ({}) {}",
                    result.rank,
                    result.score,
                    result.title,
                    result.category,
                    persona::excerpt(&result.content, 120).replace('\n', " ")
                );
            }
            Ok(())
        }
        Command::Info { json } => {
            let health = service.health();
            if json {
                println!("{}", serde_json::to_string_pretty(&health)?);
            } else {
                let kb = &health.knowledge_base;
                println!("status:      {}", health.message);
                println!("documents:   {}", kb.documents);
                println!("dimensions:  {}", kb.dimensions);
                println!("built with:  {}", kb.model);
                println!("built at:    {}", kb.created_at);
                let encoder = handles.config.current().encoder;
                println!("encoder:     {} ({})", encoder.id(), encoder.model_name());
                let retrieval = service.config();
                println!(
                    "retrieval:   top {} via {:?}, excerpts up to {} chars",
                    retrieval.default_top_k, retrieval.strategy, retrieval.max_excerpt_chars
                );
                println!("config:      {}", handles.config.path().display());
                println!("data dir:    {}", handles.data_dir.display());
                if let Some(details) = health.details {
                    println!("details:     {details}");
                }
            }
            Ok(())
        }
    }
}

fn chat(service: &AdvisorService) -> Result<()> {
    println!("{}", persona::OPENING_MESSAGE);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        print!("\nYou: ");
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_ascii_lowercase().as_str(), "quit" | "exit" | "dismissed") {
            break;
        }

        match service.answer(AskRequest::new(question)) {
            Ok(response) => print_answer(&response),
            Err(err) => println!("\nAdmiral Rickover: {}", err.user_message()),
        }
    }

    println!("\nDismissed.");
    Ok(())
}

fn print_answer(response: &AnswerResponse) {
    println!("\nAdmiral Rickover: {}", response.answer);
    if !response.sources.is_empty() {
        println!("\nSources:");
        for source in &response.sources {
            println!("  {}. {} [{:.3}]", source.rank, source.title, source.score);
        }
    }
}
