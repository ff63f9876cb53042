//! In-memory, deduplicating entity store.
//!
//! One [`EntityStore`] lives for one run. Records are keyed by the
//! source-assigned numeric ID per entity kind, inserted with merge-on-write
//! semantics ([`crate::model::Merge`]), and never evicted: contents grow
//! monotonically until process exit. Only raw pages are persisted (by the
//! page cache); entity state is always re-derived from extractions.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::model::{Author, Book, Merge, Review, User};

/// Deduplicating mapping from entity ID to merged record, per entity kind.
#[derive(Debug, Default)]
pub struct EntityStore {
    authors: HashMap<u64, Author>,
    books: HashMap<u64, Book>,
    users: HashMap<u64, User>,
    reviews: HashMap<u64, Review>,
}

/// Applies merge-on-write into one kind's map.
fn upsert_into<T: Merge>(map: &mut HashMap<u64, T>, id: u64, record: T) {
    match map.entry(id) {
        Entry::Occupied(mut occupied) => occupied.get_mut().merge_from(record),
        Entry::Vacant(vacant) => {
            vacant.insert(record);
        }
    }
}

impl EntityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or merges an author record.
    pub fn upsert_author(&mut self, author: Author) {
        upsert_into(&mut self.authors, author.id, author);
    }

    /// Inserts or merges a book record.
    pub fn upsert_book(&mut self, book: Book) {
        upsert_into(&mut self.books, book.id, book);
    }

    /// Inserts or merges a user record.
    pub fn upsert_user(&mut self, user: User) {
        upsert_into(&mut self.users, user.id, user);
    }

    /// Inserts or merges a review record, keyed by reviewer ID.
    pub fn upsert_review(&mut self, review: Review) {
        upsert_into(&mut self.reviews, review.user_id, review);
    }

    /// Looks up an author by ID.
    #[must_use]
    pub fn author(&self, id: u64) -> Option<&Author> {
        self.authors.get(&id)
    }

    /// Looks up a book by ID.
    #[must_use]
    pub fn book(&self, id: u64) -> Option<&Book> {
        self.books.get(&id)
    }

    /// Looks up a user by ID.
    #[must_use]
    pub fn user(&self, id: u64) -> Option<&User> {
        self.users.get(&id)
    }

    /// Looks up a review by reviewer ID.
    #[must_use]
    pub fn review(&self, user_id: u64) -> Option<&Review> {
        self.reviews.get(&user_id)
    }

    /// All known authors.
    #[must_use]
    pub fn authors(&self) -> &HashMap<u64, Author> {
        &self.authors
    }

    /// All known books.
    #[must_use]
    pub fn books(&self) -> &HashMap<u64, Book> {
        &self.books
    }

    /// All known users.
    #[must_use]
    pub fn users(&self) -> &HashMap<u64, User> {
        &self.users
    }

    /// All known reviews, keyed by reviewer ID.
    #[must_use]
    pub fn reviews(&self) -> &HashMap<u64, Review> {
        &self.reviews
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_then_get() {
        let mut store = EntityStore::new();
        store.upsert_author(Author {
            id: 7,
            name: Some("Jane Doe".to_string()),
            image_url: None,
        });

        let author = store.author(7).unwrap();
        assert_eq!(author.name.as_deref(), Some("Jane Doe"));
        assert!(store.author(8).is_none());
    }

    #[test]
    fn test_upsert_merges_instead_of_replacing() {
        let mut store = EntityStore::new();
        store.upsert_book(Book {
            title: Some("Title".to_string()),
            ..Book::bare(42)
        });
        store.upsert_book(Book {
            ratings_count: Some(3200),
            ..Book::bare(42)
        });

        let book = store.book(42).unwrap();
        assert_eq!(book.title.as_deref(), Some("Title"));
        assert_eq!(book.ratings_count, Some(3200));
        assert_eq!(store.books().len(), 1);
    }

    #[test]
    fn test_upsert_never_nulls_known_field() {
        let mut store = EntityStore::new();
        store.upsert_user(User {
            name: Some("Jane".to_string()),
            library_size: Some(120),
            ..User::bare(9)
        });
        store.upsert_user(User::bare(9));

        let user = store.user(9).unwrap();
        assert_eq!(user.name.as_deref(), Some("Jane"));
        assert_eq!(user.library_size, Some(120));
    }

    #[test]
    fn test_reviews_dedup_by_reviewer_id() {
        let mut store = EntityStore::new();
        // Same reviewer reached through two different editions of a work.
        store.upsert_review(Review {
            user_id: 555,
            book_id: 42,
            author_id: Some(7),
        });
        store.upsert_review(Review {
            user_id: 555,
            book_id: 43,
            author_id: Some(7),
        });

        assert_eq!(store.reviews().len(), 1);
        assert_eq!(store.review(555).unwrap().book_id, 42);
    }
}
