//! `mnemon` — operator CLI for the memory engine. Every subcommand
//! prints exactly one JSON document to stdout; diagnostics go to
//! stderr via `tracing`.

mod commands;
mod context;
mod error;
mod output;

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use context::Context;
use error::CliError;

#[derive(Parser)]
#[command(name = "mnemon", version = env!("CARGO_PKG_VERSION"), about = "Persistent memory substrate for autonomous agents")]
struct Cli {
    /// Override the base data directory (defaults to $MNEMON_DATA_DIR or ~/.mnemon).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Operate on a named store other than the active one.
    #[arg(long, global = true)]
    store: Option<String>,

    /// Open the store read-only; write commands will fail.
    #[arg(long, global = true)]
    readonly: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a new insight.
    Remember {
        content: String,
        #[arg(long, default_value = "fact")]
        category: String,
        #[arg(long, default_value_t = 3)]
        importance: u8,
        #[arg(long, default_value = "")]
        tags: String,
        #[arg(long, default_value = "")]
        entities: String,
        #[arg(long, default_value = "cli")]
        source: String,
        /// Skip the diff/dedup pass and insert unconditionally.
        #[arg(long)]
        no_diff: bool,
    },
    /// Intent-aware retrieval over the memory graph.
    Recall {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: i64,
        /// Force WHY/WHEN/ENTITY/GENERAL instead of auto-detecting.
        #[arg(long)]
        intent: Option<String>,
        /// Plain keyword/filter query, no graph traversal or reranking.
        #[arg(long)]
        basic: bool,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = 0)]
        min_importance: u8,
        #[arg(long)]
        source: Option<String>,
    },
    /// Keyword/token-overlap search, no graph traversal.
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Soft-delete an insight.
    Forget { id: String },
    /// Create a manual, bidirectional edge between two insights.
    Link {
        source_id: String,
        target_id: String,
        #[arg(long = "type", default_value = "semantic")]
        edge_type: String,
        #[arg(long, default_value_t = 0.5)]
        weight: f64,
        /// Extra edge metadata as a JSON object.
        #[arg(long)]
        meta: Option<String>,
    },
    /// Breadth-first traversal outward from an insight.
    Related {
        id: String,
        #[arg(long, default_value_t = 2)]
        depth: usize,
        #[arg(long = "type")]
        edge_type: Option<String>,
    },
    /// Aggregate store statistics.
    Status,
    /// Recent oplog entries.
    Log {
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// List retention-pruning candidates, or retain one by id.
    Gc {
        #[arg(long)]
        keep: Option<String>,
        #[arg(long, default_value_t = 0.3)]
        threshold: f64,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Embedding coverage, backfill, or single-insight embedding.
    Embed {
        id: Option<String>,
        #[arg(long)]
        status: bool,
        #[arg(long)]
        all: bool,
    },
    /// Manage named stores.
    Store {
        #[command(subcommand)]
        command: StoreCommands,
    },
    /// Graph visualization export (not implemented by this engine build).
    Viz,
    /// Interactive LLM-host setup (not implemented by this engine build).
    Setup,
}

#[derive(Subcommand)]
enum StoreCommands {
    /// List every store under the base data directory.
    List,
    /// Create a new, empty store.
    Create { name: String },
    /// Switch the active store.
    Set { name: String },
    /// Delete a store and all of its data.
    Remove { name: String },
}

fn run(cli: Cli) -> Result<serde_json::Value, CliError> {
    let ctx = Context::resolve(cli.data_dir, cli.store, cli.readonly);

    match cli.command {
        Commands::Remember { content, category, importance, tags, entities, source, no_diff } => {
            commands::remember::run(&ctx, content, category, importance, tags, entities, source, no_diff)
        }
        Commands::Recall { query, limit, intent, basic, category, min_importance, source } => {
            commands::recall::run(&ctx, query, limit, intent, basic, category, min_importance, source)
        }
        Commands::Search { query, limit } => commands::search::run(&ctx, query, limit),
        Commands::Forget { id } => commands::forget::run(&ctx, id),
        Commands::Link { source_id, target_id, edge_type, weight, meta } => {
            commands::link::run(&ctx, source_id, target_id, edge_type, weight, meta)
        }
        Commands::Related { id, depth, edge_type } => commands::related::run(&ctx, id, depth, edge_type),
        Commands::Status => commands::status::run(&ctx),
        Commands::Log { limit } => commands::log::run(&ctx, limit),
        Commands::Gc { keep, threshold, limit } => commands::gc::run(&ctx, keep, threshold, limit),
        Commands::Embed { id, status, all } => commands::embed::run(&ctx, status, all, id),
        Commands::Store { command } => match command {
            StoreCommands::List => commands::store_cmd::list(&ctx),
            StoreCommands::Create { name } => commands::store_cmd::create(&ctx, name),
            StoreCommands::Set { name } => commands::store_cmd::set(&ctx, name),
            StoreCommands::Remove { name } => commands::store_cmd::remove(&ctx, name),
        },
        Commands::Viz => Ok(commands::stub::not_implemented("viz")),
        Commands::Setup => Ok(commands::stub::not_implemented("setup")),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(value) => output::print_json(&value),
        Err(err) => {
            output::print_error(&err);
            std::process::exit(1);
        }
    }
}
