//! The engine's public operations.
//!
//! An [`Engine`] owns the page cache, the session, and the entity store for
//! one run. Every operation goes through the same path — cache first, then
//! the paced, retrying session — and merges extracted records into the
//! store through explicit upserts, so the merge point is a first-class,
//! testable step rather than a side effect buried in iteration.
//!
//! Execution is strictly sequential: one outstanding network operation at a
//! time, by design.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::cache::PageCache;
use crate::config::{ConfigError, EngineConfig};
use crate::extract::{
    AuthorBooksExtractor, ReviewsExtractor, ShelfExtractor, extract_user,
};
use crate::fetch::{Fetcher, PageRequest};
use crate::model::{Author, Book, Review, User};
use crate::rigor::{ReviewPlan, RigorError, load_dictionary};
use crate::session::{Credential, FetchError, Session, SessionError};
use crate::store::EntityStore;
use crate::walker::{FetchSource, Progress, Walker};

/// Errors surfaced by engine operations.
///
/// Recoverable conditions (parse drift, cache misses, cache corruption) are
/// absorbed below this level; what reaches the caller is fatal for the run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The configuration cannot work.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The session could not be constructed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A page fetch failed terminally.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The requested rigor level is unsupported.
    #[error(transparent)]
    Rigor(#[from] RigorError),

    /// The page cache directory could not be opened.
    #[error("failed to open page cache at {path}: {source}")]
    Cache {
        /// The cache root that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// No authors were extracted from any requested shelf. Continuing
    /// would produce an empty, misleading report.
    #[error("no authors found for user {user_id} on shelves {shelves:?}")]
    NoAuthorsFound {
        /// The shelf owner.
        user_id: u64,
        /// The shelves that were walked.
        shelves: Vec<String>,
    },

    /// The plan calls for a dictionary pass but no word list is configured.
    #[error("rigor level {level} requires a dictionary word list; none was configured")]
    DictionaryMissing {
        /// The requested rigor level.
        level: u32,
    },

    /// The dictionary file could not be read.
    #[error("failed to read dictionary {path}: {source}")]
    Dictionary {
        /// The dictionary path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// The acquisition engine: one instance per run.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    fetcher: Fetcher,
    store: EntityStore,
}

impl Engine {
    /// Builds an engine from a validated configuration: loads the
    /// credential if one is configured, opens the page cache, and
    /// constructs the HTTP session.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when validation fails, the credential
    /// cannot be loaded, or the cache root cannot be created.
    #[instrument(skip(config), fields(base_url = %config.base_url))]
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let credential = match &config.credential_path {
            Some(path) => Some(Credential::load(path)?),
            None => None,
        };

        let cache =
            PageCache::open(&config.cache_root, config.cache_ttl).map_err(|source| {
                EngineError::Cache {
                    path: config.cache_root.clone(),
                    source,
                }
            })?;

        let session = Session::new(
            credential,
            config.min_request_interval,
            config.retry.clone(),
            &config.user_agent,
        )?;

        let fetcher = Fetcher::new(config.base_url.clone(), cache, session);

        info!(cache_root = %config.cache_root.display(), "engine ready");
        Ok(Self {
            config,
            fetcher,
            store: EntityStore::new(),
        })
    }

    /// The entity store accumulated so far this run.
    #[must_use]
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Pages served from the cache so far this run.
    #[must_use]
    pub fn cache_hits(&self) -> u64 {
        self.fetcher.cache_hits()
    }

    /// Pages that required network traffic so far this run.
    #[must_use]
    pub fn cache_misses(&self) -> u64 {
        self.fetcher.cache_misses()
    }

    /// Reads the authors represented on a user's shelves.
    ///
    /// Walks each shelf listing in turn, upserting every book and author
    /// encountered, and returns the merged author records.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoAuthorsFound`] when every shelf came back
    /// authorless — a precondition violation for the reports built on this
    /// operation — or a fatal [`EngineError::Fetch`].
    #[instrument(skip(self, on_progress))]
    pub async fn read_authors(
        &mut self,
        user_id: u64,
        shelves: &[String],
        mut on_progress: impl FnMut(Progress),
    ) -> Result<HashMap<u64, Author>, EngineError> {
        let walker = Walker::new(self.config.max_pages);
        let started = Instant::now();
        let mut processed = 0u64;
        let mut author_ids = Vec::new();

        for shelf in shelves {
            let template = PageRequest::Shelf {
                user_id,
                shelf: shelf.clone(),
                page: 1,
            };
            let source = FetchSource::new(&self.fetcher, template);
            let rows = walker
                .walk(&source, &ShelfExtractor::new(), |p| {
                    on_progress(Progress {
                        completed: processed + p.completed,
                        total: p.total,
                        elapsed: started.elapsed(),
                    });
                })
                .await?;
            processed += rows.len() as u64;
            debug!(shelf, rows = rows.len(), "shelf walked");

            for row in rows {
                self.store.upsert_book(row.book);
                if let Some(author) = row.author {
                    author_ids.push(author.id);
                    self.store.upsert_author(author);
                }
            }
        }

        let authors: HashMap<u64, Author> = author_ids
            .into_iter()
            .filter_map(|id| self.store.author(id).cloned().map(|a| (id, a)))
            .collect();

        if authors.is_empty() {
            return Err(EngineError::NoAuthorsFound {
                user_id,
                shelves: shelves.to_vec(),
            });
        }

        info!(user_id, authors = authors.len(), "authors read");
        Ok(authors)
    }

    /// Reads an author's book listing, up to `limit` books.
    ///
    /// `on_book` fires for each book in discovery order. When a page
    /// reveals the author's portrait, it is applied to the author record
    /// through an explicit store upsert.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`EngineError::Fetch`] when the listing cannot be
    /// retrieved.
    #[instrument(skip(self, on_book, on_progress))]
    pub async fn read_author_books(
        &mut self,
        author_id: u64,
        limit: Option<usize>,
        mut on_book: impl FnMut(&Book),
        mut on_progress: impl FnMut(Progress),
    ) -> Result<HashMap<u64, Book>, EngineError> {
        let mut walker = Walker::new(self.config.max_pages);
        if let Some(limit) = limit {
            walker = walker.with_item_limit(limit);
        }

        let template = PageRequest::AuthorBooks { author_id, page: 1 };
        let source = FetchSource::new(&self.fetcher, template);
        let rows = walker
            .walk(&source, &AuthorBooksExtractor::new(author_id), &mut on_progress)
            .await?;

        let mut books = HashMap::new();
        for row in rows {
            self.store.upsert_book(row.book.clone());
            if let Some(image_url) = row.author_image {
                // The richer author view arrives mid-iteration; the merge
                // happens here, as a store operation.
                self.store.upsert_author(Author {
                    id: author_id,
                    name: None,
                    image_url: Some(image_url),
                });
            }
            on_book(&row.book);
            books.insert(row.book.id, row.book);
        }

        info!(author_id, books = books.len(), "author books read");
        Ok(books)
    }

    /// Enumerates a book's reviewers at the given rigor level.
    ///
    /// Executes the star-partition sub-queries and, when the plan calls for
    /// it, the dictionary-search fallback under its wall-clock budget. The
    /// returned map is deduplicated at reviewer-ID granularity.
    ///
    /// # Errors
    ///
    /// Returns [`RigorError::UnsupportedLevel`] for level 0 (wrapped),
    /// [`EngineError::DictionaryMissing`] when a required word list is
    /// absent, or a fatal [`EngineError::Fetch`].
    #[instrument(skip(self, book, on_progress), fields(book_id = book.id, rigor))]
    pub async fn read_reviews(
        &mut self,
        book: &Book,
        rigor: u32,
        dictionary_path: Option<&Path>,
        mut on_progress: impl FnMut(Progress),
    ) -> Result<HashMap<u64, Review>, EngineError> {
        let plan = ReviewPlan::build(rigor, book.ratings_count, &self.config.thresholds)?;

        // The source truncates each filtered view anyway; there is no point
        // paging past its ceiling.
        let cap = usize::try_from(self.config.thresholds.result_cap).unwrap_or(usize::MAX);
        let walker = Walker::new(self.config.max_pages).with_item_limit(cap);

        let started = Instant::now();
        let mut processed = 0u64;
        let mut found: HashMap<u64, Review> = HashMap::new();

        for stars in &plan.star_filters {
            let template = PageRequest::ReviewsByStar {
                book_id: book.id,
                stars: *stars,
                page: 1,
            };
            let source = FetchSource::new(&self.fetcher, template);
            let extractor = ReviewsExtractor::new(book.id, book.author_id);
            let reviews = walker
                .walk(&source, &extractor, |p| {
                    on_progress(Progress {
                        completed: processed + p.completed,
                        total: book.ratings_count,
                        elapsed: started.elapsed(),
                    });
                })
                .await?;
            processed += reviews.len() as u64;
            debug!(stars, reviewers = reviews.len(), "star sub-query walked");

            for review in reviews {
                self.store.upsert_review(review.clone());
                found.entry(review.user_id).or_insert(review);
            }
        }

        if let Some(pass) = plan.dictionary {
            let path = dictionary_path
                .map(Path::to_path_buf)
                .or_else(|| self.config.dictionary_path.clone())
                .ok_or(EngineError::DictionaryMissing { level: rigor })?;
            let words = load_dictionary(&path).map_err(|source| EngineError::Dictionary {
                path: path.clone(),
                source,
            })?;

            let pass_started = Instant::now();
            let mut words_issued = 0usize;
            let total_words = words.len();
            for word in words {
                if pass_started.elapsed() >= pass.budget {
                    info!(
                        words_issued,
                        words_skipped = total_words - words_issued,
                        "dictionary budget elapsed, keeping partial coverage"
                    );
                    break;
                }
                words_issued += 1;

                let template = PageRequest::ReviewSearch {
                    book_id: book.id,
                    term: word.clone(),
                    page: 1,
                };
                let source = FetchSource::new(&self.fetcher, template);
                let extractor = ReviewsExtractor::new(book.id, book.author_id);
                let reviews = walker
                    .walk(&source, &extractor, |p| {
                        on_progress(Progress {
                            completed: processed + p.completed,
                            total: book.ratings_count,
                            elapsed: started.elapsed(),
                        });
                    })
                    .await?;
                processed += reviews.len() as u64;
                debug!(word = %word, reviewers = reviews.len(), "dictionary sub-query walked");

                for review in reviews {
                    self.store.upsert_review(review.clone());
                    found.entry(review.user_id).or_insert(review);
                }
            }
        }

        info!(
            book_id = book.id,
            rigor,
            reviewers = found.len(),
            "reviewers enumerated"
        );
        Ok(found)
    }

    /// Reads one user's profile.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`EngineError::Fetch`] when the profile cannot be
    /// retrieved. A drifted or private page still yields a record; missing
    /// fields are simply unknown.
    #[instrument(skip(self))]
    pub async fn read_user(&mut self, user_id: u64) -> Result<User, EngineError> {
        let body = self
            .fetcher
            .fetch(&PageRequest::UserProfile { user_id })
            .await?;
        let user = extract_user(user_id, &body);
        if user.name.is_none() && user.library_size.is_none() && !user.private {
            warn!(user_id, "user profile yielded no fields beyond identity");
        }
        self.store.upsert_user(user.clone());
        Ok(user)
    }
}
