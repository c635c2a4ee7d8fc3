mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{cost, generate, query, stats, update};

#[derive(Parser)]
#[command(name = "doc-indexer")]
#[command(about = "Incremental AI documentation indexer with semantic search")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Estimate what a full run would cost
    doc-indexer cost

    # Analyze and index every changed file
    doc-indexer generate --concurrency 8

    # Re-index what changed since the last indexed commit
    doc-indexer update

    # Search the index
    doc-indexer query "where are sessions validated" --type function

    # Show index statistics
    doc-indexer stats
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Estimate the cost of indexing without calling any service
    Cost,

    /// Analyze and index the project
    Generate {
        /// Re-analyze files even when their hash is unchanged
        #[arg(long)]
        force: bool,

        /// Maximum concurrent analysis calls
        #[arg(long)]
        concurrency: Option<usize>,

        /// Proceed even when the estimate exceeds the configured budget
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Incrementally update the index from version control changes
    Update {
        /// Re-process every file
        #[arg(long)]
        force: bool,

        /// Maximum concurrent analysis calls
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Semantic search over the index
    Query {
        /// Search text
        text: String,

        /// Maximum number of results
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Filter by document type (file, function, class, module, architecture, dependency)
        #[arg(long = "type")]
        doc_type: Option<String>,

        /// Filter by language
        #[arg(long)]
        language: Option<String>,

        /// Filter by file path
        #[arg(long)]
        file: Option<String>,
    },

    /// Show index statistics
    Stats,
}
