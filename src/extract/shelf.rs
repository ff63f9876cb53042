//! Shelf listing extraction.
//!
//! A shelf page lists the owner's books as table rows:
//!
//! ```html
//! <tr class="bookalike">
//!   <td class="field title"><a href="/book/show/42-title" title="Title">Title</a></td>
//!   <td class="field author"><a href="/author/show/7.Jane_Doe">Doe, Jane</a></td>
//!   <td class="field cover"><img src="https://img.example/books/42.jpg"></td>
//!   <td class="field num_ratings">12,345</td>
//! </tr>
//! ```
//!
//! The book ID is the row's identity; a row without one is dropped. The
//! author cell is optional (some editions are listed unattributed).

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::model::{Author, Book};

use super::{Extract, ExtractedPage, id_from_href, next_page_of, non_empty, parse_count, total_estimate_of};

#[allow(clippy::expect_used)]
static ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr.bookalike").expect("shelf row selector is valid"));

#[allow(clippy::expect_used)]
static TITLE_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("td.field.title a[href]").expect("shelf title selector is valid")
});

#[allow(clippy::expect_used)]
static AUTHOR_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("td.field.author a[href]").expect("shelf author selector is valid")
});

#[allow(clippy::expect_used)]
static COVER_IMG: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("td.field.cover img[src]").expect("shelf cover selector is valid")
});

#[allow(clippy::expect_used)]
static NUM_RATINGS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("td.field.num_ratings").expect("shelf ratings selector is valid")
});

/// One shelf row: the edition plus its author, when attributed.
#[derive(Debug, Clone)]
pub struct ShelfRow {
    /// The listed edition.
    pub book: Book,
    /// The owning author, when the row carries an author link with an ID.
    pub author: Option<Author>,
}

/// Extractor for shelf listing pages.
#[derive(Debug, Default)]
pub struct ShelfExtractor;

impl ShelfExtractor {
    /// Creates the extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn extract_row(row: ElementRef<'_>) -> Option<ShelfRow> {
        let title_link = row.select(&TITLE_LINK).next();
        let book_id = title_link
            .and_then(|el| el.value().attr("href"))
            .and_then(id_from_href)?;

        let title = title_link.and_then(|el| {
            el.value()
                .attr("title")
                .map(str::to_string)
                .or_else(|| Some(el.text().collect::<String>()))
                .and_then(non_empty)
        });

        let author = row.select(&AUTHOR_LINK).next().and_then(|el| {
            let id = id_from_href(el.value().attr("href")?)?;
            Some(Author {
                id,
                name: non_empty(el.text().collect::<String>()),
                image_url: None,
            })
        });

        let image_url = row
            .select(&COVER_IMG)
            .next()
            .and_then(|el| el.value().attr("src"))
            .map(str::to_string);

        let ratings_count = row
            .select(&NUM_RATINGS)
            .next()
            .and_then(|el| parse_count(&el.text().collect::<String>()));

        Some(ShelfRow {
            book: Book {
                id: book_id,
                title,
                author_id: author.as_ref().map(|a| a.id),
                image_url,
                ratings_count,
            },
            author,
        })
    }
}

impl Extract for ShelfExtractor {
    type Record = ShelfRow;

    fn extract(&self, html: &str) -> ExtractedPage<ShelfRow> {
        let document = Html::parse_document(html);
        let mut records = Vec::new();

        for (index, row) in document.select(&ROW).enumerate() {
            match Self::extract_row(row) {
                Some(record) => records.push(record),
                None => warn!(row = index, "shelf row has no book ID, skipping"),
            }
        }

        ExtractedPage {
            records,
            next_page: next_page_of(&document),
            total_estimate: total_estimate_of(&document),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <span class="total-count">532</span>
        <table>
          <tr class="bookalike">
            <td class="field title"><a href="/book/show/42-title" title="The Title">The Title</a></td>
            <td class="field author"><a href="/author/show/7.Jane_Doe">Doe, Jane</a></td>
            <td class="field cover"><img src="https://img.example/books/42.jpg"></td>
            <td class="field num_ratings">12,345</td>
          </tr>
          <tr class="bookalike">
            <td class="field title"><a href="/book/show/broken">Broken row</a></td>
          </tr>
          <tr class="bookalike">
            <td class="field title"><a href="/book/show/43-other">Other</a></td>
          </tr>
        </table>
        <a class="next_page" href="/review/list/9?page=2&shelf=read">next</a>
        </body></html>
    "#;

    #[test]
    fn test_extracts_full_row() {
        let page = ShelfExtractor::new().extract(PAGE);
        let row = &page.records[0];

        assert_eq!(row.book.id, 42);
        assert_eq!(row.book.title.as_deref(), Some("The Title"));
        assert_eq!(row.book.author_id, Some(7));
        assert_eq!(row.book.image_url.as_deref(), Some("https://img.example/books/42.jpg"));
        assert_eq!(row.book.ratings_count, Some(12345));

        let author = row.author.as_ref().unwrap();
        assert_eq!(author.id, 7);
        assert_eq!(author.name.as_deref(), Some("Doe, Jane"));
    }

    #[test]
    fn test_row_without_book_id_is_dropped() {
        let page = ShelfExtractor::new().extract(PAGE);
        assert_eq!(page.records.len(), 2);
    }

    #[test]
    fn test_sparse_row_fields_are_none() {
        let page = ShelfExtractor::new().extract(PAGE);
        let sparse = &page.records[1];
        assert_eq!(sparse.book.id, 43);
        assert!(sparse.author.is_none());
        assert!(sparse.book.image_url.is_none());
        assert!(sparse.book.ratings_count.is_none());
    }

    #[test]
    fn test_pagination_facts() {
        let page = ShelfExtractor::new().extract(PAGE);
        assert_eq!(page.next_page, Some(2));
        assert_eq!(page.total_estimate, Some(532));
    }

    #[test]
    fn test_title_falls_back_to_link_text() {
        let html = r#"<tr class="bookalike">
            <td class="field title"><a href="/book/show/50-x">Fallback Title</a></td>
        </tr>"#;
        let page = ShelfExtractor::new().extract(html);
        assert_eq!(page.records[0].book.title.as_deref(), Some("Fallback Title"));
    }
}
