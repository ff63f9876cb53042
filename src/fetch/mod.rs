//! Logical page requests and the cache-first fetcher.
//!
//! A [`PageRequest`] names one logical page of the source site. Its rendered
//! path-and-query string is canonical: parameters appear in a fixed sorted
//! order with percent-encoded values, so the same logical request always
//! renders identically. That rendering doubles as the cache key.
//!
//! [`Fetcher::fetch`] consults the page cache first; on a miss it goes
//! through the session (pacing, credential, backoff) and writes the
//! successful response back before returning it.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, instrument};
use url::Url;

use crate::cache::PageCache;
use crate::session::{FetchError, Session};

/// One logical page of the source site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// A page of a user's shelf listing.
    Shelf {
        /// The shelf owner.
        user_id: u64,
        /// Shelf name, e.g. `read`.
        shelf: String,
        /// 1-indexed page number.
        page: u32,
    },

    /// A page of an author's book listing.
    AuthorBooks {
        /// The author.
        author_id: u64,
        /// 1-indexed page number.
        page: u32,
    },

    /// A page of a book's reviews filtered to one star value.
    ReviewsByStar {
        /// The book (edition).
        book_id: u64,
        /// Star value, 1..=5.
        stars: u8,
        /// 1-indexed page number.
        page: u32,
    },

    /// A page of a book's reviews matching a review-text search term.
    ReviewSearch {
        /// The book (edition).
        book_id: u64,
        /// The search term.
        term: String,
        /// 1-indexed page number.
        page: u32,
    },

    /// A user's profile page.
    UserProfile {
        /// The user.
        user_id: u64,
    },
}

impl PageRequest {
    /// Renders the canonical path-and-query for this request.
    ///
    /// Query parameters are emitted in alphabetical order with encoded
    /// values; this string is also the cache key.
    #[must_use]
    pub fn path_and_query(&self) -> String {
        match self {
            Self::Shelf {
                user_id,
                shelf,
                page,
            } => format!(
                "/review/list/{user_id}?page={page}&shelf={}",
                urlencoding::encode(shelf)
            ),
            Self::AuthorBooks { author_id, page } => {
                format!("/author/list/{author_id}?page={page}")
            }
            Self::ReviewsByStar {
                book_id,
                stars,
                page,
            } => format!("/book/reviews/{book_id}?page={page}&rating={stars}"),
            Self::ReviewSearch {
                book_id,
                term,
                page,
            } => format!(
                "/book/reviews/{book_id}?page={page}&text={}",
                urlencoding::encode(term)
            ),
            Self::UserProfile { user_id } => format!("/user/show/{user_id}"),
        }
    }

    /// The cache key: identical to the canonical rendering.
    #[must_use]
    pub fn cache_key(&self) -> String {
        self.path_and_query()
    }

    /// Resolves the request against the configured base URL.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] when the join fails.
    pub fn url(&self, base: &Url) -> Result<Url, FetchError> {
        let path = self.path_and_query();
        base.join(&path)
            .map_err(|_| FetchError::invalid_url(format!("{base}{path}")))
    }

    /// The same request pointed at a different page. Unpaginated requests
    /// are returned unchanged.
    #[must_use]
    pub fn with_page(&self, page: u32) -> Self {
        let mut request = self.clone();
        match &mut request {
            Self::Shelf { page: p, .. }
            | Self::AuthorBooks { page: p, .. }
            | Self::ReviewsByStar { page: p, .. }
            | Self::ReviewSearch { page: p, .. } => *p = page,
            Self::UserProfile { .. } => {}
        }
        request
    }
}

/// Retrieves logical pages, cache-first.
#[derive(Debug)]
pub struct Fetcher {
    base: Url,
    cache: PageCache,
    session: Session,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl Fetcher {
    /// Wires a fetcher over its cache and session.
    #[must_use]
    pub fn new(base: Url, cache: PageCache, session: Session) -> Self {
        Self {
            base,
            cache,
            session,
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    /// Fetches one logical page: cache on hit, network (via the session) on
    /// miss, writing the response back to the cache.
    ///
    /// # Errors
    ///
    /// Propagates terminal [`FetchError`]s from the session; cache write
    /// failures are downgraded to warnings.
    #[instrument(skip(self), fields(key = %request.cache_key()))]
    pub async fn fetch(&self, request: &PageRequest) -> Result<String, FetchError> {
        let key = request.cache_key();

        if let Some(body) = self.cache.get(&key) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(body);
        }
        self.cache_misses.fetch_add(1, Ordering::Relaxed);

        let url = request.url(&self.base)?;
        debug!(url = %url, "cache miss, fetching");
        let body = self.session.get(&url).await?;
        self.cache.put_best_effort(&key, &body);
        Ok(body)
    }

    /// Pages served from the cache so far.
    #[must_use]
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Pages that required network traffic so far.
    #[must_use]
    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shelf_rendering_is_canonical() {
        let request = PageRequest::Shelf {
            user_id: 9,
            shelf: "to read".to_string(),
            page: 3,
        };
        assert_eq!(request.path_and_query(), "/review/list/9?page=3&shelf=to%20read");
        assert_eq!(request.cache_key(), request.path_and_query());
    }

    #[test]
    fn test_reviews_by_star_rendering() {
        let request = PageRequest::ReviewsByStar {
            book_id: 42,
            stars: 5,
            page: 1,
        };
        assert_eq!(request.path_and_query(), "/book/reviews/42?page=1&rating=5");
    }

    #[test]
    fn test_review_search_encodes_term() {
        let request = PageRequest::ReviewSearch {
            book_id: 42,
            term: "page turner".to_string(),
            page: 1,
        };
        assert_eq!(
            request.path_and_query(),
            "/book/reviews/42?page=1&text=page%20turner"
        );
    }

    #[test]
    fn test_user_profile_has_no_query() {
        let request = PageRequest::UserProfile { user_id: 555 };
        assert_eq!(request.path_and_query(), "/user/show/555");
    }

    #[test]
    fn test_with_page_advances_only_the_page() {
        let request = PageRequest::AuthorBooks {
            author_id: 7,
            page: 1,
        };
        assert_eq!(
            request.with_page(4),
            PageRequest::AuthorBooks {
                author_id: 7,
                page: 4
            }
        );

        let profile = PageRequest::UserProfile { user_id: 555 };
        assert_eq!(profile.with_page(4), profile);
    }

    #[test]
    fn test_identical_requests_share_a_cache_key() {
        let a = PageRequest::ReviewSearch {
            book_id: 42,
            term: "love".to_string(),
            page: 2,
        };
        let b = a.clone();
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_url_joins_against_base() {
        let base = Url::parse("https://books.example").unwrap();
        let request = PageRequest::UserProfile { user_id: 555 };
        assert_eq!(
            request.url(&base).unwrap().as_str(),
            "https://books.example/user/show/555"
        );
    }
}
