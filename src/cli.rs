//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use url::Url;

use shelfgraph_core::{EngineConfig, RetryPolicy};

/// Thin command-line consumer of the shelfgraph engine.
#[derive(Parser, Debug)]
#[command(name = "shelfgraph", version, about = "Acquisition engine for a book-cataloging site")]
pub struct Args {
    /// Root URL of the source site.
    #[arg(long)]
    pub base_url: Url,

    /// Cache directory (defaults to a shared directory under the system
    /// temp root).
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Cache TTL in days.
    #[arg(long, default_value_t = 31)]
    pub cache_ttl_days: u64,

    /// Path to a file holding the login cookie string.
    #[arg(long)]
    pub credential: Option<PathBuf>,

    /// Minimum spacing between requests, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    pub rate_limit: u64,

    /// Maximum attempts per page before giving up.
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the authors on a user's shelves.
    Authors {
        /// The shelf owner's user ID.
        #[arg(long)]
        user: u64,

        /// Shelf name; repeat for several shelves.
        #[arg(long = "shelf", default_values_t = vec!["read".to_string()])]
        shelves: Vec<String>,
    },

    /// List an author's books.
    Books {
        /// The author ID.
        #[arg(long)]
        author: u64,

        /// Stop after this many books.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Enumerate a book's reviewers.
    Reviews {
        /// The book (edition) ID.
        #[arg(long)]
        book: u64,

        /// The book's author ID, when known.
        #[arg(long)]
        author: Option<u64>,

        /// The book's total rating count, when known (drives escalation).
        #[arg(long)]
        ratings_count: Option<u64>,

        /// Rigor level (1 = star partition, >= 2 adds dictionary search).
        #[arg(long, default_value_t = 1)]
        rigor: u32,

        /// Dictionary word list for the rigor >= 2 fallback.
        #[arg(long)]
        dictionary: Option<PathBuf>,
    },

    /// Show a user's profile.
    User {
        /// The user ID.
        #[arg(long)]
        user: u64,
    },
}

impl Args {
    /// Builds the engine configuration from the parsed arguments.
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::new(self.base_url.clone())
            .with_cache_ttl_days(self.cache_ttl_days);
        if let Some(dir) = &self.cache_dir {
            config.cache_root = dir.clone();
        }
        if let Some(path) = &self.credential {
            config.credential_path = Some(path.clone());
        }
        config.min_request_interval = std::time::Duration::from_millis(self.rate_limit);
        config.retry = RetryPolicy::with_max_attempts(self.max_retries);
        config
    }
}
