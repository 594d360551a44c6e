//! # Report Analyst CLI (`analyst`)
//!
//! Ask questions about a corpus of market reports from the terminal, or
//! serve the same answers over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! analyst --config ./config/analyst.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `analyst status` | Show whether grounding is available |
//! | `analyst documents` | List documents and extraction results |
//! | `analyst context` | Print the assembled context |
//! | `analyst prompt "<q>"` | Print the prompt that would be sent |
//! | `analyst ask "<q>"` | Answer one question |
//! | `analyst chat` | Interactive question session |
//! | `analyst serve` | Start the HTTP server |
//! | `analyst completions <shell>` | Print shell completions |

use anyhow::Context as _;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use report_analyst::answer::AnswerService;
use report_analyst::config::{self, Config};
use report_analyst::models::{AnswerSource, ChatTurn};
use report_analyst::{logging, server};

const GREETING: &str = "Hello! I'm your Telecom AI Analyst. I can answer questions about \
market data, operator performance, and trends from INTT reports. How can I assist you?";

const CLEARED: &str = "Conversation cleared. How can I help you?";

const SAMPLE_QUESTIONS: [&str; 4] = [
    "What are the current market shares?",
    "How has Orange's revenue evolved?",
    "Compare operator investments",
    "Show data service growth trends",
];

/// Report Analyst: document-grounded answers over market reports.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/analyst.example.toml` for a full example. Without a
/// config file, documents are read from `./pdf` and no model is configured.
#[derive(Parser)]
#[command(
    name = "analyst",
    about = "Report Analyst: document-grounded answers over market reports",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/analyst.toml")]
    config: PathBuf,

    /// Enable debug logging (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Show whether grounding is available.
    ///
    /// Builds the context if needed and prints document counts and the
    /// corpus fingerprint.
    Status,

    /// List documents with extracted character counts and errors.
    Documents,

    /// Print the assembled context exactly as it is embedded in prompts.
    Context,

    /// Print the prompt that would be sent for a question.
    Prompt {
        /// The question.
        query: String,
    },

    /// Answer one question.
    Ask {
        /// The question.
        query: String,

        /// Print the full answer result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Interactive session.
    ///
    /// Commands: `/history` prints the conversation so far, `/reload`
    /// re-reads documents, `/clear` clears the conversation, `/quit` exits.
    Chat,

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Print shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "analyst", &mut io::stdout());
        return Ok(());
    }

    let cfg = resolve_config(&cli.config)?;
    let service = Arc::new(AnswerService::from_config(&cfg)?);

    match cli.command {
        Commands::Status => {
            let status = service.status().await;
            println!(
                "Context:   {}",
                if status.has_context {
                    "available"
                } else {
                    "unavailable"
                }
            );
            println!("Documents: {}", status.documents);
            println!("Failed:    {}", status.failed_documents);
            if let Some(fingerprint) = status.fingerprint {
                println!("Corpus:    {}", fingerprint);
            }
            if let Some(built_at) = status.built_at {
                println!("Built at:  {}", built_at.to_rfc3339());
            }
            println!("Model:     {}", service.model_name().unwrap_or("not configured"));
        }
        Commands::Documents => {
            let documents = service.documents().await?;
            if documents.is_empty() {
                println!("No documents found.");
            }
            for doc in documents {
                match doc.error {
                    Some(error) => println!("{}  FAILED  {}", doc.name, error),
                    None => println!("{}  {} chars", doc.name, doc.chars),
                }
            }
        }
        Commands::Context => {
            let context = service.cache().get_or_build().await?;
            print!("{}", context.text);
        }
        Commands::Prompt { query } => {
            let context = service.cache().get_or_build().await?;
            print!("{}", service.composer().compose(&context.text, &query).as_str());
        }
        Commands::Ask { query, json } => {
            let result = service.answer(&query).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.text);
                if result.source != AnswerSource::ModelGenerated {
                    eprintln!("(source: {})", result.source.as_str());
                }
            }
        }
        Commands::Chat => {
            run_chat(&service).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg, service).await?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
        }
    }

    Ok(())
}

/// Loads the config file, or the defaults when none exists.
fn resolve_config(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        Ok(Config::minimal())
    }
}

/// Line-oriented chat loop. History lives here, not in the service.
async fn run_chat(service: &AnswerService) -> anyhow::Result<()> {
    let mut history = vec![ChatTurn::assistant(GREETING)];
    let status = service.status().await;

    println!("{}", GREETING);
    if status.has_context {
        println!("({} documents loaded)", status.documents);
    } else {
        println!("(no documents loaded, answers use the market overview)");
    }
    println!();
    println!("Try asking:");
    for question in SAMPLE_QUESTIONS {
        println!("  - {}", question);
    }
    println!("Commands: /history, /reload, /clear, /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                history.clear();
                history.push(ChatTurn::assistant(CLEARED));
                println!("{}", CLEARED);
            }
            "/history" => {
                for turn in &history {
                    println!("[{}] {}", turn.role.as_str(), turn.content);
                }
            }
            "/reload" => {
                service.reload();
                let status = service.status().await;
                println!("Reloaded {} documents.", status.documents);
            }
            query => {
                history.push(ChatTurn::user(query));
                let result = service.answer(query).await;
                println!("{}", result.text);
                history.push(ChatTurn::assistant(result.text));
            }
        }
    }

    tracing::debug!(turns = history.len(), "chat session ended");
    Ok(())
}
