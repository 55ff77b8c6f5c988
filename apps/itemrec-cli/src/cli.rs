use clap::{Parser, Subcommand};

/// Top-level CLI parser for the `itemrec` binary.
#[derive(Debug, Parser)]
#[command(name = "itemrec", version, about = "Catalog item recommendations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Max results to return (default and upper bound come from config)
    #[arg(short, long, global = true)]
    pub limit: Option<usize>,

    /// Override `catalog.path`
    #[arg(long, global = true)]
    pub catalog: Option<String>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Recommend items for a free-text query
    Recommend {
        query: String,
        /// JSON metadata filter forwarded to the remote index
        #[arg(long)]
        filter: Option<String>,
    },
    /// Items similar to a catalog item
    Similar { item_id: String },
    /// Items whose categories contain the given text
    Category { category: String },
    /// Group the catalog into clusters
    Cluster {
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Catalog summary statistics
    Stats,
    /// Embedder, cache and remote index status
    Status,
    /// Most frequent keywords of a text
    Keywords {
        text: String,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Upsert every catalog vector into the remote index
    Populate {
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        no_progress: bool,
    },
    /// Remote index statistics
    IndexStats,
}
