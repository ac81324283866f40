use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use searcher_core::{DocId, QueryOptions, Searcher, SearcherConfig};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "searcher-admin")]
#[command(about = "Register, index and search documents", long_about = None)]
struct Cli {
    /// Config file (TOML). Falls back to $SEARCHER_CONFIG, then built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize datastores
    Init {
        /// Remove existing documents and index first
        #[arg(short, long, default_value_t = false)]
        force: bool,
    },
    /// Import every file below a directory as a document
    Register {
        root: PathBuf,
    },
    /// Index all stored documents. Takes a while on large collections
    Index,
    /// Search the index
    Search {
        query: String,
        /// Print the first line of each hit instead of its id
        #[arg(short, long, default_value_t = false)]
        preview: bool,
        /// Print how long the query took
        #[arg(short, long, default_value_t = false)]
        measure: bool,
        /// Maximum number of results (defaults to query_limit from the config)
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Print stored documents
    Show {
        #[arg(required = true)]
        document_ids: Vec<DocId>,
        /// Only the first line
        #[arg(short, long, default_value_t = false)]
        preview: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let config = SearcherConfig::load(cli.config.as_deref())?;
    tracing::debug!(datastore = %config.datastore, stemmer = %config.stemmer, "opening stores");
    let mut searcher = Searcher::open(config)?;

    match cli.command {
        Commands::Init { force } => searcher.init(force)?,
        Commands::Register { root } => {
            if !root.exists() {
                bail!("{} does not exist", root.display());
            }
            let count = searcher.register_path(&root)?;
            println!("Done registering {count} documents from {}", root.display());
        }
        Commands::Index => {
            let stats = searcher.index()?;
            println!(
                "Done indexing {} documents ({} empty, {} postings)",
                stats.documents, stats.empty_documents, stats.postings
            );
        }
        Commands::Search { query, preview, measure, limit } => {
            let options = QueryOptions { limit, preview, measure };
            let response = searcher.query(&query, &options)?;
            if preview {
                for line in &response.previews {
                    println!("{line}");
                }
            } else {
                let ids: Vec<String> = response.document_ids.iter().map(|id| id.to_string()).collect();
                println!("{}", ids.join(" "));
            }
            if let Some(took) = response.took {
                println!("Took {:.6}s to execute", took.as_secs_f64());
            }
        }
        Commands::Show { document_ids, preview } => {
            for text in searcher.show(&document_ids, preview)? {
                println!("{text}");
            }
        }
    }
    Ok(())
}
