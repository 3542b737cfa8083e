//! Clap CLI definitions for `countersctl`.
//!
//! `countersctl` is a thin command-line harness around the ingestion
//! engine: it exercises `InboundMessage -> IngestionResult ->
//! OutboundResponse` end to end against a local SQLite store, standing in
//! for the HTTP transport this engine is otherwise meant to sit behind.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// countersctl -- fact/index/counter ingestion engine harness.
#[derive(Parser, Debug)]
#[command(
    name = "countersctl",
    about = "Ingestion engine command-line harness",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to the SQLite store (default: ./counters.sqlite).
    #[arg(long, global = true, env = "COUNTERS_DB", default_value = "counters.sqlite")]
    pub db: PathBuf,

    /// Path to the message mapping config JSON.
    #[arg(long, global = true, env = "MESSAGE_CONFIG_PATH")]
    pub message_config: Option<PathBuf>,

    /// Path to the index field config JSON.
    #[arg(long, global = true, env = "INDEX_CONFIG_PATH")]
    pub index_config: Option<PathBuf>,

    /// Path to the counter definition config JSON.
    #[arg(long, global = true, env = "COUNTER_CONFIG_PATH")]
    pub counter_config: Option<PathBuf>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug logging on stderr.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the SQLite store and run schema migrations.
    Init(InitArgs),

    /// Generate a synthetic example message for a message type.
    ExampleMessage(ExampleMessageArgs),

    /// Run one message through the full ingestion pipeline.
    Ingest(IngestArgs),

    /// Look up a previously persisted fact by id.
    ShowFact(ShowFactArgs),

    /// Print summary statistics about the store.
    Stats,

    /// Generate shell completion scripts.
    Completion(CompletionArgs),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Re-initialize even if the store already exists.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ExampleMessageArgs {
    /// Numeric message type to generate a sample for.
    pub message_type: i32,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Read the inbound message from this file instead of stdin.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Number of dispatcher worker threads to evaluate counters with.
    /// When 0 (the default) counters run inline against the store's own
    /// connection instead of through a `QueryDispatcher`.
    #[arg(long, default_value_t = 0)]
    pub dispatch_workers: usize,
}

#[derive(Args, Debug)]
pub struct ShowFactArgs {
    /// The fact id to look up.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct CompletionArgs {
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
