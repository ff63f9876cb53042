//! Typed entity records for the acquisition graph.
//!
//! Every record is identified by the source-assigned numeric ID; identity is
//! never re-derived from names or titles. All non-identity fields are
//! `Option` because the source markup evolves outside our control and any
//! field may be missing from any given page. The [`Merge`] trait gives the
//! fill-only semantics the [`crate::store::EntityStore`] relies on: a field
//! that is already known is never overwritten by a later, emptier view of
//! the same entity.

/// Fill-only merge between two views of the same entity.
///
/// `merge_from` takes a newer partial view and fills in fields that are
/// still unknown on `self`. It never clears or replaces a known field, so
/// applying views in any order converges to the same record (merge is
/// monotone).
pub trait Merge {
    /// Fills unknown fields of `self` from `newer`.
    fn merge_from(&mut self, newer: Self);
}

/// Fills `slot` only when it holds no value yet.
fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

/// An author as listed by the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    /// Source-assigned author ID.
    pub id: u64,
    /// Display name, as printed on listing pages.
    pub name: Option<String>,
    /// Portrait URL. Often discovered later, via an author's book listing.
    pub image_url: Option<String>,
}

impl Author {
    /// Creates an author record with only the identity known.
    #[must_use]
    pub fn bare(id: u64) -> Self {
        Self {
            id,
            name: None,
            image_url: None,
        }
    }
}

impl Merge for Author {
    fn merge_from(&mut self, newer: Self) {
        fill(&mut self.name, newer.name);
        fill(&mut self.image_url, newer.image_url);
    }
}

/// A catalog edition. Multiple `Book` IDs may represent the same work;
/// editions are deliberately not merged and callers must tolerate
/// duplicates (spelled out in the data model contract).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    /// Source-assigned book (edition) ID.
    pub id: u64,
    /// Edition title.
    pub title: Option<String>,
    /// Owning author's ID.
    pub author_id: Option<u64>,
    /// Cover image URL.
    pub image_url: Option<String>,
    /// Total rating count shown on listing pages. Drives the dictionary
    /// trigger in [`crate::rigor::ReviewPlan`].
    pub ratings_count: Option<u64>,
}

impl Book {
    /// Creates a book record with only the identity known.
    #[must_use]
    pub fn bare(id: u64) -> Self {
        Self {
            id,
            title: None,
            author_id: None,
            image_url: None,
            ratings_count: None,
        }
    }
}

impl Merge for Book {
    fn merge_from(&mut self, newer: Self) {
        fill(&mut self.title, newer.title);
        fill(&mut self.author_id, newer.author_id);
        fill(&mut self.image_url, newer.image_url);
        fill(&mut self.ratings_count, newer.ratings_count);
    }
}

/// A site member. Private or empty-library users are held transiently but
/// excluded from ranked reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Source-assigned user ID.
    pub id: u64,
    /// Display name.
    pub name: Option<String>,
    /// Avatar URL.
    pub image_url: Option<String>,
    /// Total number of books in the user's library.
    pub library_size: Option<u64>,
    /// Whether the profile is private. Once observed private, stays private.
    pub private: bool,
}

impl User {
    /// Creates a user record with only the identity known.
    #[must_use]
    pub fn bare(id: u64) -> Self {
        Self {
            id,
            name: None,
            image_url: None,
            library_size: None,
            private: false,
        }
    }
}

impl Merge for User {
    fn merge_from(&mut self, newer: Self) {
        fill(&mut self.name, newer.name);
        fill(&mut self.image_url, newer.image_url);
        fill(&mut self.library_size, newer.library_size);
        self.private = self.private || newer.private;
    }
}

/// A rater/reviewer signal: user X rated book Y. Keyed at reviewer-ID
/// granularity, so the same reviewer reached through two different
/// sub-queries (or two editions of the same work) collapses to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    /// The reviewer's user ID (the record key).
    pub user_id: u64,
    /// The book that was rated.
    pub book_id: u64,
    /// The book's owning author, when known.
    pub author_id: Option<u64>,
}

impl Merge for Review {
    fn merge_from(&mut self, newer: Self) {
        fill(&mut self.author_id, newer.author_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Merge Monotonicity Tests ====================

    #[test]
    fn test_author_merge_fills_unknown_fields() {
        let mut author = Author {
            id: 7,
            name: Some("Jane Doe".to_string()),
            image_url: None,
        };
        author.merge_from(Author {
            id: 7,
            name: None,
            image_url: Some("https://img.example/7.jpg".to_string()),
        });

        assert_eq!(author.name.as_deref(), Some("Jane Doe"));
        assert_eq!(author.image_url.as_deref(), Some("https://img.example/7.jpg"));
    }

    #[test]
    fn test_author_merge_never_clears_known_field() {
        let mut author = Author {
            id: 7,
            name: Some("Jane Doe".to_string()),
            image_url: Some("https://img.example/7.jpg".to_string()),
        };
        author.merge_from(Author::bare(7));

        assert_eq!(author.name.as_deref(), Some("Jane Doe"));
        assert_eq!(author.image_url.as_deref(), Some("https://img.example/7.jpg"));
    }

    #[test]
    fn test_author_merge_keeps_first_value_on_conflict() {
        let mut author = Author {
            id: 7,
            name: Some("Jane Doe".to_string()),
            image_url: None,
        };
        author.merge_from(Author {
            id: 7,
            name: Some("J. Doe".to_string()),
            image_url: None,
        });

        assert_eq!(author.name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_book_merge_order_independent_end_state() {
        let full = Book {
            id: 42,
            title: Some("Title".to_string()),
            author_id: Some(7),
            image_url: Some("https://img.example/42.jpg".to_string()),
            ratings_count: Some(5400),
        };
        let partial = Book {
            id: 42,
            title: Some("Title".to_string()),
            author_id: None,
            image_url: None,
            ratings_count: None,
        };

        let mut a = full.clone();
        a.merge_from(partial.clone());
        let mut b = partial;
        b.merge_from(full.clone());

        assert_eq!(a, full);
        assert_eq!(b, full);
    }

    #[test]
    fn test_user_private_flag_is_sticky() {
        let mut user = User {
            private: true,
            ..User::bare(9)
        };
        user.merge_from(User::bare(9));
        assert!(user.private);

        let mut user = User::bare(9);
        user.merge_from(User {
            private: true,
            ..User::bare(9)
        });
        assert!(user.private);
    }

    #[test]
    fn test_review_merge_fills_author_id() {
        let mut review = Review {
            user_id: 555,
            book_id: 42,
            author_id: None,
        };
        review.merge_from(Review {
            user_id: 555,
            book_id: 42,
            author_id: Some(7),
        });
        assert_eq!(review.author_id, Some(7));
    }
}
