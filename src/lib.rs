//! Shelfgraph Core Library
//!
//! The shared acquisition engine behind several personal reporting tools
//! for a book-cataloging site. It turns the site's paginated, rate-limited,
//! login-gated HTML interface into a resumable, deduplicated in-memory
//! entity graph (authors, books, users, reviewers).
//!
//! # Architecture
//!
//! - [`cache`] - disk-backed, TTL-expiring store for raw fetched pages
//! - [`session`] - credential, request pacing, backoff
//! - [`fetch`] - logical page requests and the cache-first fetcher
//! - [`extract`] - schema-specific HTML extraction into partial records
//! - [`walker`] - pagination traversal with progress events
//! - [`store`] - deduplicating entity store with merge-on-write
//! - [`rigor`] - reviewer enumeration under the source's result cap
//! - [`engine`] - the operations consumed by the reporting tools
//! - [`ranking`] - similarity and match-score computation

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod config;
pub mod engine;
pub mod extract;
pub mod fetch;
pub mod model;
pub mod ranking;
pub mod rigor;
pub mod session;
pub mod store;
pub mod walker;

// Re-export commonly used types
pub use cache::{DEFAULT_TTL_DAYS, PageCache};
pub use config::{ConfigError, EngineConfig, RigorThresholds};
pub use engine::{Engine, EngineError};
pub use fetch::{Fetcher, PageRequest};
pub use model::{Author, Book, Merge, Review, User};
pub use ranking::{RankedCandidate, commonality_pct, match_score, rank};
pub use rigor::{DictionaryPass, ReviewPlan, RigorError, load_dictionary};
pub use session::{Credential, FetchError, RetryPolicy, Session, SessionError};
pub use store::EntityStore;
pub use walker::{FetchSource, PageSource, Progress, Walker};
