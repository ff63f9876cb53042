//! Schema-specific HTML extraction into typed partial records.
//!
//! One extractor per page schema turns raw markup into records with
//! `Option` fields. The source markup evolves outside this system's
//! control, so extraction is tolerant by construction: a missing or moved
//! field becomes `None`, and only a row with no recoverable numeric ID is
//! dropped (with a logged warning, never an error).
//!
//! Numeric entity IDs are always parsed from hrefs of the form
//! `/author/show/7.Jane_Doe`, `/book/show/42-title`, `/user/show/555-jane`;
//! they are never derived from display names.
//!
//! All listing schemas share two page-level elements:
//! - `a.next_page[href]` — link to the next page, carrying `page=N`
//! - `span.total-count` — the source's own estimate of total items

mod author_books;
mod reviews;
mod shelf;
mod user;

pub use author_books::{AuthorBookRow, AuthorBooksExtractor};
pub use reviews::ReviewsExtractor;
pub use shelf::{ShelfExtractor, ShelfRow};
pub use user::extract_user;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

/// Matches the numeric ID segment of an entity href.
#[allow(clippy::expect_used)]
static ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(?:author|book|user)/(?:show|list)/(\d+)").expect("ID regex is valid")
});

/// Matches the page parameter of a pagination href.
#[allow(clippy::expect_used)]
static PAGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]page=(\d+)").expect("page regex is valid"));

/// Matches the first comma-grouped integer in a text run.
#[allow(clippy::expect_used)]
static COUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d,]*)").expect("count regex is valid"));

#[allow(clippy::expect_used)]
static NEXT_PAGE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.next_page[href]").expect("next-page selector is valid"));

#[allow(clippy::expect_used)]
static TOTAL_COUNT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.total-count").expect("total-count selector is valid"));

/// One extracted page: its records plus pagination facts.
#[derive(Debug)]
pub struct ExtractedPage<R> {
    /// Records recovered from this page, in document order.
    pub records: Vec<R>,
    /// Page number the "next" link points at, if any.
    pub next_page: Option<u32>,
    /// The source's own estimate of total items across all pages.
    pub total_estimate: Option<u64>,
}

/// A page-schema extractor, driven by the pagination walker.
pub trait Extract {
    /// The record type this schema yields.
    type Record;

    /// Extracts all recoverable records and pagination facts from raw HTML.
    fn extract(&self, html: &str) -> ExtractedPage<Self::Record>;
}

/// Pulls the numeric entity ID out of an href.
pub(crate) fn id_from_href(href: &str) -> Option<u64> {
    ID_PATTERN
        .captures(href)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Pulls the `page=N` target out of a pagination href.
pub(crate) fn page_from_href(href: &str) -> Option<u32> {
    PAGE_PATTERN
        .captures(href)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parses the first comma-grouped count in a text run ("12,345 ratings").
pub(crate) fn parse_count(text: &str) -> Option<u64> {
    COUNT_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
}

/// Trims element-ish text, mapping empty to `None` so the store's merge
/// never sees an empty string as a known value.
pub(crate) fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Shared pagination facts for listing pages.
pub(crate) fn next_page_of(document: &Html) -> Option<u32> {
    document
        .select(&NEXT_PAGE_SELECTOR)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(page_from_href)
}

pub(crate) fn total_estimate_of(document: &Html) -> Option<u64> {
    document
        .select(&TOTAL_COUNT_SELECTOR)
        .next()
        .and_then(|el| parse_count(&el.text().collect::<String>()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_href_variants() {
        assert_eq!(id_from_href("/author/show/7.Jane_Doe"), Some(7));
        assert_eq!(id_from_href("/book/show/42-the-title"), Some(42));
        assert_eq!(id_from_href("/user/show/555-jane"), Some(555));
        assert_eq!(id_from_href("/review/list/9?shelf=read"), None);
        assert_eq!(id_from_href("/author/show/not-a-number"), None);
    }

    #[test]
    fn test_page_from_href() {
        assert_eq!(page_from_href("/author/list/7?page=4"), Some(4));
        assert_eq!(page_from_href("/review/list/9?shelf=read&page=12"), Some(12));
        assert_eq!(page_from_href("/author/list/7"), None);
    }

    #[test]
    fn test_parse_count_handles_commas() {
        assert_eq!(parse_count("12,345 ratings"), Some(12345));
        assert_eq!(parse_count("(1,234)"), Some(1234));
        assert_eq!(parse_count("532"), Some(532));
        assert_eq!(parse_count("no numbers here"), None);
    }

    #[test]
    fn test_non_empty_maps_blank_to_none() {
        assert_eq!(non_empty("  ".to_string()), None);
        assert_eq!(non_empty(" Jane ".to_string()).as_deref(), Some("Jane"));
    }

    #[test]
    fn test_shared_pagination_facts() {
        let html = Html::parse_document(
            r#"<div><span class="total-count">1,532</span>
               <a class="next_page" href="/author/list/7?page=2">next</a></div>"#,
        );
        assert_eq!(next_page_of(&html), Some(2));
        assert_eq!(total_estimate_of(&html), Some(1532));
    }
}
