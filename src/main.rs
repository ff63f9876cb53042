//! CLI entry point for the shelfgraph tool.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use shelfgraph_core::{Book, Engine, Progress};
use tracing::{debug, info};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let config = args.engine_config();
    let mut engine = Engine::new(config)?;

    let bar = ProgressBar::new(0);
    bar.set_style(ProgressStyle::with_template(
        "{bar:40} {pos}/{len} ({elapsed})",
    )?);
    let on_progress = {
        let bar = bar.clone();
        move |p: Progress| {
            if let Some(total) = p.total {
                bar.set_length(total);
            }
            bar.set_position(p.completed);
        }
    };

    match &args.command {
        Command::Authors { user, shelves } => {
            let authors = engine.read_authors(*user, shelves, on_progress).await?;
            bar.finish_and_clear();
            let mut names: Vec<&str> = authors
                .values()
                .filter_map(|a| a.name.as_deref())
                .collect();
            names.sort_unstable();
            for name in names {
                println!("{name}");
            }
            info!(authors = authors.len(), "done");
        }
        Command::Books { author, limit } => {
            let books = engine
                .read_author_books(*author, *limit, |_| {}, on_progress)
                .await?;
            bar.finish_and_clear();
            let mut titles: Vec<&str> =
                books.values().filter_map(|b| b.title.as_deref()).collect();
            titles.sort_unstable();
            for title in titles {
                println!("{title}");
            }
            info!(books = books.len(), "done");
        }
        Command::Reviews {
            book,
            author,
            ratings_count,
            rigor,
            dictionary,
        } => {
            let book = Book {
                author_id: *author,
                ratings_count: *ratings_count,
                ..Book::bare(*book)
            };
            let reviews = engine
                .read_reviews(&book, *rigor, dictionary.as_deref(), on_progress)
                .await?;
            bar.finish_and_clear();
            let mut ids: Vec<u64> = reviews.keys().copied().collect();
            ids.sort_unstable();
            for id in ids {
                println!("{id}");
            }
            info!(reviewers = reviews.len(), "done");
        }
        Command::User { user } => {
            let record = engine.read_user(*user).await?;
            bar.finish_and_clear();
            println!(
                "{} library={} private={}",
                record.name.as_deref().unwrap_or("<unknown>"),
                record
                    .library_size
                    .map_or_else(|| "?".to_string(), |n| n.to_string()),
                record.private
            );
        }
    }

    info!(
        cache_hits = engine.cache_hits(),
        cache_misses = engine.cache_misses(),
        "run complete"
    );
    Ok(())
}
