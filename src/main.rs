mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use recollect::config::RecollectConfig;

#[derive(Parser)]
#[command(name = "recollect", version, about = "Embedded associative memory store")]
struct Cli {
    /// Path to a config file (defaults to ~/.recollect/config.toml)
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a memory and link it to similar memories in its section
    Add {
        content: String,
        #[arg(short, long)]
        section: String,
        #[arg(long)]
        subsection: Option<String>,
        /// Comma-separated tags
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(short, long, default_value_t = 5)]
        importance: i64,
        /// Skip automatic linking
        #[arg(long)]
        no_link: bool,
    },
    /// Ranked hybrid search
    Search {
        query: String,
        #[arg(short, long)]
        section: Option<String>,
        /// Comma-separated tags; all must be present
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// List memories linked to a memory
    Related { id: String },
    /// Print the link graph as JSON
    Graph {
        #[arg(short, long)]
        section: Option<String>,
    },
    /// Find near-duplicate memories, optionally deleting the older of each pair
    Duplicates {
        #[arg(long)]
        threshold: Option<f32>,
        #[arg(long)]
        merge: bool,
    },
    /// Show aggregate statistics
    Stats {
        #[arg(short, long)]
        section: Option<String>,
    },
    /// Delete a memory and its links
    Delete { id: String },
    /// Run database diagnostics
    Doctor {
        /// Recompute stored link counts from link rows
        #[arg(long)]
        repair: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RecollectConfig::load_from(path)?,
        None => RecollectConfig::load()?,
    };

    // Log to stderr so stdout stays clean for JSON output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Add {
            content,
            section,
            subsection,
            tags,
            importance,
            no_link,
        } => {
            let mut new = recollect::memory::types::NewMemory::new(content, section)
                .tags(tags)
                .importance(importance)
                .auto_link(!no_link);
            if let Some(subsection) = subsection {
                new = new.subsection(subsection);
            }
            cli::store::add(config, &new)?;
        }
        Command::Search {
            query,
            section,
            tags,
            top_k,
        } => {
            let filter = recollect::memory::search::SearchFilter { section, tags };
            cli::search::search(config, &query, &filter, top_k)?;
        }
        Command::Related { id } => cli::search::related(config, &id)?,
        Command::Graph { section } => cli::export::graph(config, section.as_deref())?,
        Command::Duplicates { threshold, merge } => {
            cli::maintenance::duplicates(config, threshold, merge)?
        }
        Command::Stats { section } => cli::stats::stats(config, section.as_deref())?,
        Command::Delete { id } => cli::store::delete(config, &id)?,
        Command::Doctor { repair } => cli::doctor::doctor(config, repair)?,
    }

    Ok(())
}
