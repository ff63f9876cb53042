//! Author book-listing extraction.
//!
//! An author page lists that author's editions:
//!
//! ```html
//! <img class="authorPhoto" src="https://img.example/authors/7.jpg">
//! <tr itemtype="http://schema.org/Book">
//!   <td><img class="bookCover" src="https://img.example/books/42.jpg"></td>
//!   <td>
//!     <a class="bookTitle" href="/book/show/42-title"><span itemprop="name">Title</span></a>
//!     <span class="minirating">4.11 avg rating — 12,345 ratings</span>
//!   </td>
//! </tr>
//! ```
//!
//! The author's portrait is a page-level element; each extracted row carries
//! it so the caller can apply it to the author record through an explicit
//! store upsert (a first-class merge point, not a fix-up closure).

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::model::Book;

use super::{Extract, ExtractedPage, id_from_href, next_page_of, non_empty, total_estimate_of};

#[allow(clippy::expect_used)]
static ROW: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"tr[itemtype="http://schema.org/Book"]"#).expect("book row selector is valid")
});

#[allow(clippy::expect_used)]
static TITLE_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.bookTitle[href]").expect("book title selector is valid"));

#[allow(clippy::expect_used)]
static COVER_IMG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img.bookCover[src]").expect("book cover selector is valid"));

#[allow(clippy::expect_used)]
static MINIRATING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.minirating").expect("minirating selector is valid"));

#[allow(clippy::expect_used)]
static AUTHOR_PHOTO: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("img.authorPhoto[src]").expect("author photo selector is valid")
});

/// Matches the ratings count inside a minirating text run.
#[allow(clippy::expect_used)]
static RATINGS_COUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d,]*)\s+ratings").expect("ratings-count regex is valid"));

/// One author-page row: the edition plus the page-level author portrait.
#[derive(Debug, Clone)]
pub struct AuthorBookRow {
    /// The listed edition, attributed to the extractor's author.
    pub book: Book,
    /// The author's portrait URL, when the page shows one.
    pub author_image: Option<String>,
}

/// Extractor for an author's book listing pages.
#[derive(Debug)]
pub struct AuthorBooksExtractor {
    author_id: u64,
}

impl AuthorBooksExtractor {
    /// Creates an extractor attributing every row to `author_id`.
    #[must_use]
    pub fn new(author_id: u64) -> Self {
        Self { author_id }
    }

    fn extract_row(&self, row: ElementRef<'_>, author_image: Option<&str>) -> Option<AuthorBookRow> {
        let title_link = row.select(&TITLE_LINK).next();
        let book_id = title_link
            .and_then(|el| el.value().attr("href"))
            .and_then(id_from_href)?;

        let title = title_link.and_then(|el| non_empty(el.text().collect::<String>()));

        let image_url = row
            .select(&COVER_IMG)
            .next()
            .and_then(|el| el.value().attr("src"))
            .map(str::to_string);

        let ratings_count = row.select(&MINIRATING).next().and_then(|el| {
            let text = el.text().collect::<String>();
            RATINGS_COUNT_PATTERN
                .captures(&text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().replace(',', "").parse().ok())
        });

        Some(AuthorBookRow {
            book: Book {
                id: book_id,
                title,
                author_id: Some(self.author_id),
                image_url,
                ratings_count,
            },
            author_image: author_image.map(str::to_string),
        })
    }
}

impl Extract for AuthorBooksExtractor {
    type Record = AuthorBookRow;

    fn extract(&self, html: &str) -> ExtractedPage<AuthorBookRow> {
        let document = Html::parse_document(html);

        let author_image = document
            .select(&AUTHOR_PHOTO)
            .next()
            .and_then(|el| el.value().attr("src"));

        let mut records = Vec::new();
        for (index, row) in document.select(&ROW).enumerate() {
            match self.extract_row(row, author_image) {
                Some(record) => records.push(record),
                None => warn!(
                    author_id = self.author_id,
                    row = index,
                    "author book row has no book ID, skipping"
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
