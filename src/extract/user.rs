//! User profile extraction.
//!
//! A profile page looks like:
//!
//! ```html
//! <h1 class="userProfileName">Jane</h1>
//! <img class="profilePicture" src="https://img.example/users/555.jpg">
//! <a class="library-link" href="/review/list/555">Jane's books (1,234)</a>
//! ```
//!
//! A private profile instead carries `<div class="privateNotice">`. The
//! user ID comes from the request, so a profile record always has identity;
//! everything else degrades to `None`.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::model::User;

use super::non_empty;

#[allow(clippy::expect_used)]
static NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1.userProfileName").expect("profile name selector is valid"));

#[allow(clippy::expect_used)]
static AVATAR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("img.profilePicture[src]").expect("profile avatar selector is valid")
});

#[allow(clippy::expect_used)]
static LIBRARY_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.library-link").expect("library link selector is valid"));

#[allow(clippy::expect_used)]
static PRIVATE_NOTICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.privateNotice").expect("private notice selector is valid"));

/// Matches the parenthesized library size in the library link text.
#[allow(clippy::expect_used)]
static LIBRARY_SIZE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d[\d,]*)\)").expect("library-size regex is valid"));

/// Extracts a user record from a profile page.
///
/// `user_id` comes from the request that fetched the page.
#[must_use]
pub fn extract_user(user_id: u64, html: &str) -> User {
    let document = Html::parse_document(html);

    let name = document
        .select(&NAME)
        .next()
        .and_then(|el| non_empty(el.text().collect::<String>()));

    let image_url = document
        .select(&AVATAR)
        .next()
        .and_then(|el| el.value().attr("src"))
        .map(str::to_string);

    let library_size = document.select(&LIBRARY_LINK).next().and_then(|el| {
        let text = el.text().collect::<String>();
        LIBRARY_SIZE_PATTERN
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().replace(',', "").parse().ok())
    });

    let private = document.select(&PRIVATE_NOTICE).next().is_some();

    User {
        id: user_id,
        name,
        image_url,
        library_size,
        private,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_profile() {
        let html = r#"
            <h1 class="userProfileName">Jane</h1>
            <img class="profilePicture" src="https://img.example/users/555.jpg">
            <a class="library-link" href="/review/list/555">Jane's books (1,234)</a>
        "#;
        let user = extract_user(555, html);
        assert_eq!(user.id, 555);
        assert_eq!(user.name.as_deref(), Some("Jane"));
        assert_eq!(user.image_url.as_deref(), Some("https://img.example/users/555.jpg"));
        assert_eq!(user.library_size, Some(1234));
        assert!(!user.private);
    }

    #[test]
    fn test_private_profile() {
        let html = r#"
            <h1 class="userProfileName">Jane</h1>
            <div class="privateNotice">This profile is private</div>
        "#;
        let user = extract_user(555, html);
        assert!(user.private);
        assert!(user.library_size.is_none());
    }

    #[test]
    fn test_drifted_markup_degrades_to_none_fields() {
        let user = extract_user(555, "<html><body><p>redesigned page</p></body></html>");
        assert_eq!(user.id, 555);
        assert!(user.name.is_none());
        assert!(user.image_url.is_none());
        assert!(user.library_size.is_none());
        assert!(!user.private);
    }

    #[test]
    fn test_zero_library_size_is_parsed() {
        let html = r#"<a class="library-link" href="/review/list/9">books (0)</a>"#;
        let user = extract_user(9, html);
        assert_eq!(user.library_size, Some(0));
    }
}
