//! # netconfig-audit CLI (`nca`)
//!
//! The `nca` binary is the primary interface for netconfig-audit. It provides
//! commands for database initialization, configuration ingestion, inspection,
//! question answering, comparison, and starting the HTTP API server.
//!
//! ## Usage
//!
//! ```bash
//! nca --config ./config/nca.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `nca init` | Write a starter config (if missing) and run schema migrations |
//! | `nca ingest <path>` | Ingest a configuration file or directory |
//! | `nca files` | List ingested files with inferred metadata |
//! | `nca show <filename>` | Print the stored blocks of one ingested file |
//! | `nca ask "<query>"` | Answer a question over the ingested corpus |
//! | `nca compare "<query>"` | Compare candidate configuration against golden |
//! | `nca serve` | Start the JSON HTTP API server |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize config and database
//! nca init
//!
//! # Ingest the reference and the device export under comparison roles
//! nca ingest ./backups/core-sw1-golden.cfg --role golden
//! nca ingest ./backups/core-sw1-today.cfg --role candidate
//!
//! # Deterministic diff table
//! nca compare "Compare 'core-sw1-today.cfg' against 'core-sw1-golden.cfg'. \
//!              Focus on VLANs, Interfaces, and Routes."
//!
//! # Narrative analysis (requires narrative.provider = "ollama")
//! nca compare "Audit the candidate for drift" --mode deep \
//!     --golden core-sw1-golden.cfg --candidate core-sw1-today.cfg
//!
//! # Question answering
//! nca ask "What VLANs are configured on the core switch?"
//!
//! # HTTP API
//! nca serve
//! ```

mod chat;
mod compare;
mod config;
mod db;
mod extract;
mod files;
mod ingest;
mod metadata;
mod migrate;
mod models;
mod narrative;
mod parser;
mod redact;
mod server;
mod show;
mod store;

use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// netconfig-audit CLI — a local-first ingestion and comparison harness
/// for network device configurations.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. `nca init` writes a commented starter config if none exists.
#[derive(Parser)]
#[command(
    name = "nca",
    about = "netconfig-audit — a local-first ingestion and comparison harness for network device configurations",
    version,
    long_about = "netconfig-audit ingests network device configuration exports (Cisco IOS/IOS-XE, \
    Aruba AOS-CX and similar), splits them into indentation-delimited blocks with secrets masked, \
    and aligns golden against candidate configurations into deterministic diff tables or \
    narrative audit reports, via a CLI and a JSON HTTP API."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/nca.toml`. Database, retrieval, narrative,
    /// server, and ingestion settings are read from this file.
    #[arg(long, global = true, default_value = "./config/nca.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the configuration and database schema.
    ///
    /// Writes a commented starter config to `--config` when the file does
    /// not exist, then creates the SQLite database and all required tables
    /// (files, blocks, blocks_fts). Idempotent — running it multiple times
    /// is safe.
    Init,

    /// Ingest a configuration file or directory.
    ///
    /// Extracts text (plain or PDF), masks secrets, splits the content into
    /// indentation-delimited blocks, infers vendor/hostname metadata, and
    /// stores everything in SQLite. Re-ingesting a filename replaces its
    /// previous blocks.
    Ingest {
        /// File or directory to ingest. Directories are scanned with the
        /// `[ingest]` include/exclude globs.
        path: PathBuf,

        /// Comparison role recorded on every block (conventionally
        /// `golden` or `candidate`).
        #[arg(long)]
        role: Option<String>,

        /// Extra tag recorded on every block, as `key=value`. Repeatable.
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Dry run — show file and block counts without writing to the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// List ingested files with their inferred metadata.
    Files,

    /// Print the stored blocks of one ingested file.
    ///
    /// Blocks are shown post-redaction, with their source line spans.
    Show {
        /// Ingested filename (as shown by `nca files`).
        filename: String,
    },

    /// Answer a question over the ingested corpus.
    ///
    /// Retrieves the most relevant blocks and asks the configured narrative
    /// generator. Requires `narrative.provider = "ollama"`.
    Ask {
        /// The question to answer.
        query: String,

        /// Number of blocks to retrieve as context.
        #[arg(long)]
        k: Option<i64>,
    },

    /// Compare candidate configuration against golden.
    ///
    /// Aligns blocks ingested under the `golden` and `candidate` roles by
    /// their header line and classifies each as MATCH, DIFF, MISSING, or
    /// EXTRA. Words like `vlan`, `interface`, `route`, `acl`, `qos`, and
    /// `hostname` in the query focus the result on those features.
    Compare {
        /// Free-text comparison request; drives retrieval and focus.
        query: String,

        /// Presentation mode: `quick` (deterministic Markdown table) or
        /// `deep` (narrative analysis; requires a narrative generator).
        #[arg(long, default_value = "quick")]
        mode: String,

        /// Restrict the golden side to one ingested filename.
        #[arg(long)]
        golden: Option<String>,

        /// Restrict the candidate side to one ingested filename.
        #[arg(long)]
        candidate: Option<String>,

        /// Per-side retrieval depth (default: `retrieval.compare_k`).
        #[arg(long)]
        k: Option<i64>,

        /// Align every stored block of both files instead of the ranked
        /// top-k. Requires --golden and --candidate.
        #[arg(long)]
        exhaustive: bool,
    },

    /// Start the JSON HTTP API server.
    ///
    /// Binds to the address configured in `[server].bind` and serves
    /// /health, /files, /ask, and /compare.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // init may run before a config file exists
    if matches!(cli.command, Commands::Init) {
        if !cli.config.exists() {
            config::write_starter_config(&cli.config)?;
            println!("Wrote starter config to {}", cli.config.display());
        }
        let cfg = config::load_config(&cli.config)?;
        migrate::run_migrations(&cfg).await?;
        println!("Database initialized successfully.");
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            // Handled above (before config loading)
            unreachable!()
        }
        Commands::Ingest {
            path,
            role,
            tags,
            dry_run,
        } => {
            let extra_tags = tags
                .iter()
                .map(|spec| ingest::parse_tag(spec))
                .collect::<anyhow::Result<Vec<_>>>()?;
            ingest::run_ingest(&cfg, &path, role.as_deref(), &extra_tags, dry_run).await?;
        }
        Commands::Files => {
            files::run_files(&cfg).await?;
        }
        Commands::Show { filename } => {
            show::run_show(&cfg, &filename).await?;
        }
        Commands::Ask { query, k } => {
            chat::run_ask_cli(&cfg, &query, k).await?;
        }
        Commands::Compare {
            query,
            mode,
            golden,
            candidate,
            k,
            exhaustive,
        } => {
            let Some(mode) = models::CompareMode::parse(&mode) else {
                bail!("Unknown compare mode: {}. Use quick or deep.", mode);
            };
            let req = chat::CompareRequest {
                query,
                mode,
                golden,
                candidate,
                k,
                exhaustive,
            };
            chat::run_compare_cli(&cfg, &req).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
