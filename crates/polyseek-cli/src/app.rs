//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "polyseek")]
#[command(
    author,
    version,
    about = "Cross-language hybrid search over embedded document chunks"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path
    #[arg(long, global = true, default_value = "polyseek.sqlite")]
    pub database: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search a knowledge base
    Search(SearchArgs),

    /// Load items from a JSON-lines file
    Load(LoadArgs),

    /// Show corpus counts
    Status(StatusArgs),
}

#[derive(Args)]
pub struct SearchArgs {
    /// Query text
    pub query: Vec<String>,

    /// Workspace id
    #[arg(long)]
    pub workspace: String,

    /// Knowledge base id
    #[arg(long = "kb")]
    pub knowledge_base: String,

    /// Plain substring search instead of AI search
    #[arg(long)]
    pub no_ai: bool,

    /// Rows per store page (defaults to the configured batch size)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Number of store pages to consume
    #[arg(long, default_value_t = 1)]
    pub pages: usize,

    /// Resume cursor as "<document_key>:<chunk_index>"
    #[arg(long)]
    pub cursor: Option<String>,
}

#[derive(Args)]
pub struct LoadArgs {
    /// JSON-lines file, one item per line
    pub file: PathBuf,

    /// Workspace id the items belong to
    #[arg(long)]
    pub workspace: String,

    /// Knowledge base id the items belong to
    #[arg(long = "kb")]
    pub knowledge_base: String,

    /// Store vectors as full-precision f32 instead of f16
    #[arg(long)]
    pub full_precision: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Workspace id
    #[arg(long)]
    pub workspace: String,

    /// Knowledge base id
    #[arg(long = "kb")]
    pub knowledge_base: String,
}
