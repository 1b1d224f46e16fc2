//! # Equipment Assist CLI (`eqa`)
//!
//! ## Usage
//!
//! ```bash
//! eqa --config ./config/eqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `eqa resolve "<query>"` | Resolve an equipment name |
//! | `eqa resolve-id <id>` | Resolve an equipment ID |
//! | `eqa keywords "<question>"` | Extract search keywords with the language model |
//! | `eqa ask <id> "<question>"` | Answer a question about one equipment |
//! | `eqa chat` | Interactive selection and question loop |
//! | `eqa serve` | Start the HTTP API |
//! | `eqa stats` | Catalog summary |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).
//! A `.env` file in the working directory is loaded first, so the API key
//! may be kept there.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use equipment_assist::answer::answer;
use equipment_assist::catalog::Catalog;
use equipment_assist::config::{self, Config};
use equipment_assist::console::{render_outcome, run_console};
use equipment_assist::disambiguation::{classify, classify_id, SearchResponse};
use equipment_assist::keywords::{extract_keywords, search_terms};
use equipment_assist::llm::create_model;
use equipment_assist::resolve::{resolve_by_id, resolve_by_name, MatchParams};
use equipment_assist::server;

/// Equipment Assist: find equipment by approximate name and ask questions about it.
#[derive(Parser)]
#[command(name = "eqa", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/eqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a free-text equipment name.
    ///
    /// Prints the outcome: no match, a list of suggested names, a list of
    /// IDs sharing the name, or the resolved equipment.
    Resolve {
        query: String,

        /// Extract keywords with the language model before resolving.
        #[arg(long)]
        extract: bool,

        /// Print the `{code, message, data}` JSON response instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Resolve an equipment ID (case-insensitive).
    ResolveId {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Extract search keywords from a question.
    Keywords { question: String },

    /// Answer a question about the equipment with this exact ID.
    Ask { id: String, question: String },

    /// Interactive console: select an equipment, then ask questions.
    Chat,

    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Print catalog counts.
    Stats,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_response(response: &SearchResponse) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let cfg: Config = config::load_config(&cli.config)?;
    let params = MatchParams::from(&cfg.matching);

    match cli.command {
        Commands::Resolve {
            query,
            extract,
            json,
        } => {
            let catalog = Catalog::load(&cfg.data)?;
            let terms = if extract {
                let model = create_model(&cfg.llm)?;
                search_terms(model.as_ref(), &query).await
            } else {
                query
            };
            let outcome = classify(&resolve_by_name(&catalog, &terms, &params));
            if json {
                print_response(&SearchResponse::from_name_outcome(&outcome))?;
            } else {
                println!("{}", render_outcome(&outcome));
            }
        }
        Commands::ResolveId { id, json } => {
            let catalog = Catalog::load(&cfg.data)?;
            let outcome = classify_id(&resolve_by_id(&catalog, &id));
            if json {
                print_response(&SearchResponse::from_id_outcome(&outcome))?;
            } else {
                println!("{}", render_outcome(&outcome));
            }
        }
        Commands::Keywords { question } => {
            let model = create_model(&cfg.llm)?;
            println!("{}", extract_keywords(model.as_ref(), &question).await?);
        }
        Commands::Ask { id, question } => {
            let catalog = Catalog::load(&cfg.data)?;
            let model = create_model(&cfg.llm)?;
            let reply = answer(&catalog, model.as_ref(), &question, &id).await;
            println!("{}", reply.text());
        }
        Commands::Chat => {
            let catalog = Catalog::load(&cfg.data)?;
            let model = create_model(&cfg.llm)?;
            let stdin = std::io::stdin();
            run_console(
                &catalog,
                model.as_ref(),
                params,
                stdin.lock(),
                std::io::stdout(),
            )
            .await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Stats => {
            let stats = Catalog::load(&cfg.data)?.stats();
            println!("{:<20} {}", "equipments", stats.equipments);
            println!("{:<20} {}", "distinct names", stats.distinct_names);
            println!("{:<20} {}", "duplicated names", stats.duplicated_names);
            println!("{:<20} {}", "interventions", stats.interventions);
        }
    }

    Ok(())
}
