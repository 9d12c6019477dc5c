//! URL slug derivation for posts.
//!
//! A slug is the post's identity in the store, so derivation must be
//! deterministic and idempotent: feeding an existing slug back through
//! [`slugify`] returns it unchanged.

/// Lowercase `text`, collapse every run of non-alphanumeric characters into a
/// single hyphen, and drop leading/trailing hyphens.
///
/// Only ASCII letters and digits survive; anything else (punctuation,
/// whitespace, non-ASCII letters) acts as a separator.
///
/// ```
/// use postsmith::slug::slugify;
/// assert_eq!(slugify("Hello, World! 2024"), "hello-world-2024");
/// assert_eq!(slugify("hello-world-2024"), "hello-world-2024");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;

    for c in text.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// Pick the slug for a post: a supplied slug wins when it still has content
/// after normalization, otherwise the slug is derived from the title.
///
/// A supplied slug is not stored verbatim: it goes through [`slugify`] too,
/// so `My_Slug` is keyed as `my-slug`.
///
/// Returns `None` when neither yields a non-empty slug.
pub fn resolve_slug(supplied: Option<&str>, title: &str) -> Option<String> {
    let from_supplied = supplied.map(slugify).filter(|s| !s.is_empty());
    let slug = from_supplied.unwrap_or_else(|| slugify(title));
    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}
