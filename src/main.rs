//! # docchat CLI
//!
//! ## Usage
//!
//! ```bash
//! docchat --config ./docchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docchat init` | Create the SQLite database and schema |
//! | `docchat ingest` | Load, segment, embed and store documents |
//! | `docchat search "<query>"` | Show relevant passages without generating |
//! | `docchat ask "<query>"` | Answer a question with citations |
//! | `docchat stats` | Index size and per-source chunk counts |
//! | `docchat completions <shell>` | Print a shell completion script |

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use docchat::progress::ProgressMode;
use docchat::{ask, config, ingest, migrate, stats};

/// Answer questions about local documents, with citations.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. If the file does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "docchat",
    about = "Answer questions about local documents, with citations",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./docchat.toml")]
    config: PathBuf,

    /// Pipeline event output on stderr. Defaults to `human` when stderr is
    /// a terminal, otherwise `off`.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Ingest documents from the configured directory.
    Ingest {
        /// Show document and chunk counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Retrieve relevant passages without generating an answer.
    Search {
        query: String,

        /// Number of neighbours to request (defaults to retrieval.top_k).
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Answer a question from the indexed documents.
    Ask {
        query: String,

        /// Print the answer as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show index statistics.
    Stats,

    /// Print a shell completion script.
    Completions {
        shell: Shell,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "docchat", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing();

    let cfg = config::load_config_or_default(&cli.config)?;
    let observer = cli
        .progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .observer();

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { dry_run } => {
            ingest::run_ingest(&cfg, observer, dry_run).await?;
        }
        Commands::Search { query, k } => {
            ask::run_search(&cfg, observer, &query, k).await?;
        }
        Commands::Ask { query, json } => {
            ask::run_ask(&cfg, observer, &query, json).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
