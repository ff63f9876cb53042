//! Lazy, restartable pagination traversal with progress reporting.
//!
//! The walker drives one page-schema extractor over a [`PageSource`],
//! following "next page" links until none remain, an optional item limit is
//! reached, or a hard safety bound on page count trips (a guard against
//! malformed next-links that loop). After each item it emits a
//! [`Progress`] event with a monotonically increasing completed count.
//!
//! A walk is restartable from scratch, never resumable mid-sequence:
//! resumption guarantees come from the page cache, not from walker state.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::extract::Extract;
use crate::fetch::{Fetcher, PageRequest};
use crate::session::FetchError;

/// A structured progress event, emitted after each extracted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Items yielded so far. Strictly increasing within one walk.
    pub completed: u64,
    /// The source's estimate of total items, when a page stated one.
    pub total: Option<u64>,
    /// Wall-clock time since the walk started.
    pub elapsed: Duration,
}

/// Supplies raw page bodies by 1-indexed page number.
///
/// The production implementation is [`FetchSource`]; tests drive the walker
/// with in-memory sources.
#[async_trait]
pub trait PageSource {
    /// Retrieves the raw content of one page.
    async fn page(&self, page: u32) -> Result<String, FetchError>;
}

/// A [`PageSource`] backed by the cache-first fetcher and a request
/// template whose page number is swapped per call.
#[derive(Debug)]
pub struct FetchSource<'a> {
    fetcher: &'a Fetcher,
    template: PageRequest,
}

impl<'a> FetchSource<'a> {
    /// Creates a source for all pages of `template`'s logical listing.
    #[must_use]
    pub fn new(fetcher: &'a Fetcher, template: PageRequest) -> Self {
        Self { fetcher, template }
    }
}

#[async_trait]
impl PageSource for FetchSource<'_> {
    async fn page(&self, page: u32) -> Result<String, FetchError> {
        self.fetcher.fetch(&self.template.with_page(page)).await
    }
}

/// Drives paginated extraction into a finite record sequence.
#[derive(Debug, Clone)]
pub struct Walker {
    max_pages: u32,
    item_limit: Option<usize>,
}

impl Walker {
    /// Creates a walker with a hard page-count safety bound.
    #[must_use]
    pub fn new(max_pages: u32) -> Self {
        Self {
            max_pages: max_pages.max(1),
            item_limit: None,
        }
    }

    /// Caps the number of items yielded.
    #[must_use]
    pub fn with_item_limit(mut self, limit: usize) -> Self {
        self.item_limit = Some(limit);
        self
    }

    /// Walks all pages, collecting extracted records in discovery order.
    ///
    /// `on_progress` fires once per item.
    ///
    /// # Errors
    ///
    /// Propagates the first [`FetchError`] from the source; pages already
    /// extracted are lost (the walk is restartable, and their fetches are
    /// cached).
    pub async fn walk<S, E, F>(
        &self,
        source: &S,
        extractor: &E,
        mut on_progress: F,
    ) -> Result<Vec<E::Record>, FetchError>
    where
        S: PageSource + Sync,
        E: Extract,
        F: FnMut(Progress),
    {
        let started = Instant::now();
        let mut records = Vec::new();
        let mut total = None;
        let mut page = 1u32;
        let mut pages_walked = 0u32;

        loop {
            let html = source.page(page).await?;
            let extracted = extractor.extract(&html);
            pages_walked += 1;

            if extracted.total_estimate.is_some() {
                total = extracted.total_estimate;
            }

            for record in extracted.records {
                records.push(record);
                on_progress(Progress {
                    completed: records.len() as u64,
                    total,
                    elapsed: started.elapsed(),
                });
                if self
                    .item_limit
                    .is_some_and(|limit| records.len() >= limit)
                {
                    debug!(items = records.len(), "item limit reached");
                    return Ok(records);
                }
            }

            if pages_walked >= self.max_pages {
                warn!(
                    pages = pages_walked,
                    "page safety bound reached, stopping walk"
                );
                break;
            }

            match extracted.next_page {
                Some(next) if next > page => page = next,
                Some(next) => {
                    warn!(page, next, "next-page link does not advance, stopping walk");
                    break;
                }
                None => break,
            }
        }

        debug!(items = records.len(), pages = pages_walked, "walk complete");
        Ok(records)
    }
}
