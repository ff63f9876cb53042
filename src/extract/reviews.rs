//! Review listing extraction.
//!
//! A review page (star-filtered or text-search) lists reviews as:
//!
//! ```html
//! <div class="review">
//!   <a class="user" href="/user/show/555-jane">Jane</a>
//!   ...
//! </div>
//! ```
//!
//! Only the reviewer identity matters here: reviews are a rater signal, not
//! long-term content. A review block without a recoverable user ID is
//! dropped with a warning.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::warn;

use crate::model::Review;

use super::{Extract, ExtractedPage, id_from_href, next_page_of, total_estimate_of};

#[allow(clippy::expect_used)]
static REVIEW_BLOCK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.review").expect("review block selector is valid"));

#[allow(clippy::expect_used)]
static USER_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.user[href]").expect("review user selector is valid"));

/// Extractor for a book's review pages.
#[derive(Debug)]
pub struct ReviewsExtractor {
    book_id: u64,
    author_id: Option<u64>,
}

impl ReviewsExtractor {
    /// Creates an extractor associating every reviewer with `book_id` (and
    /// transitively its author, when known).
    #[must_use]
    pub fn new(book_id: u64, author_id: Option<u64>) -> Self {
        Self { book_id, author_id }
    }
}

impl Extract for ReviewsExtractor {
    type Record = Review;

    fn extract(&self, html: &str) -> ExtractedPage<Review> {
        let document = Html::parse_document(html);
        let mut records = Vec::new();

        for (index, block) in document.select(&REVIEW_BLOCK).enumerate() {
            let user_id = block
                .select(&USER_LINK)
                .next()
                .and_then(|el| el.value().attr("href"))
                .and_then(id_from_href);

            match user_id {
                Some(user_id) => records.push(Review {
                    user_id,
                    book_id: self.book_id,
                    author_id: self.author_id,
                }),
                None => warn!(
                    book_id = self.book_id,
                    block = index,
                    "review block has no user ID, skipping"
                ),
            }
        }

        ExtractedPage {
            records,
            next_page: next_page_of(&document),
            total_estimate: total_estimate_of(&document),
        }
    }
}
