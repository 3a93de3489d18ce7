//! # chatvec CLI
//!
//! ```bash
//! chatvec --config ./config/chatvec.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `chatvec build` | Embed every chat export into the index |
//! | `chatvec search "<query>"` | Nearest messages to a query |
//! | `chatvec get <id>` | Show one entry |
//! | `chatvec stats` | Index summary |
//! | `chatvec sources` | List discovered exports |
//! | `chatvec classify <file>` | Show how each line of a file is classified |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (default `chatvec=info,chatvec_core=warn`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use chatvec::config;
use chatvec::ingest::{self, BuildOptions};
use chatvec::progress::ProgressMode;
use chatvec::{classify, get, search, sources, stats};

/// Build and query a vector index over exported chat logs.
#[derive(Parser)]
#[command(name = "chatvec", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/chatvec.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify, embed, and index every chat export under [input].root.
    Build {
        /// Add to the existing index instead of replacing it.
        #[arg(long)]
        append: bool,

        /// Count lines and messages without embedding or writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Stop after this many entries have been committed.
        #[arg(long)]
        limit: Option<usize>,

        /// Progress on stderr: auto, off, human, or json.
        #[arg(long, default_value = "auto")]
        progress: String,
    },

    /// Find the messages nearest to a query.
    Search {
        query: String,

        /// Number of results (defaults to [retrieval].top_k).
        #[arg(short, long)]
        k: Option<usize>,

        /// Only return messages from this source.
        #[arg(long)]
        source: Option<String>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show one stored entry by id.
    Get {
        id: u64,

        #[arg(long)]
        json: bool,
    },

    /// Summarise the index.
    Stats,

    /// List the chat exports that a build would read.
    Sources,

    /// Print how each line of a file is classified and the messages it yields.
    Classify { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Works without a config file.
    if let Commands::Classify { file } = &cli.command {
        let cfg = if cli.config.exists() {
            config::load_config(&cli.config)?
        } else {
            config::Config::minimal()
        };
        return classify::run_classify(&cfg, file);
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Build {
            append,
            dry_run,
            limit,
            progress,
        } => {
            let reporter = ProgressMode::parse(&progress)?.reporter();
            let options = BuildOptions {
                append,
                dry_run,
                limit,
            };
            ingest::run_build(&cfg, options, reporter.as_ref()).await?;
        }
        Commands::Search {
            query,
            k,
            source,
            json,
        } => {
            search::run_search(&cfg, &query, k, source, json).await?;
        }
        Commands::Get { id, json } => {
            get::run_get(&cfg, id, json)?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg)?;
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Classify { .. } => {}
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("chatvec=info,chatvec_core=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
