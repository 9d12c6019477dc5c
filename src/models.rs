//! Core data models used throughout Postsmith.
//!
//! [`PostBundle`] is the single internal representation of a drafted post.
//! The generator produces it, the store consumes it. The `Stored*` types are
//! what the store reads back.

use serde::{Deserialize, Serialize};

/// Words per minute used when the model does not supply a reading time.
const WORDS_PER_MINUTE: usize = 200;

/// A drafted post together with its tags and authors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostBundle {
    pub post: PostInput,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub authors: Vec<AuthorInput>,
}

/// Post fields as drafted. Only `title` and `content_html` are required, and
/// that is enforced at write time rather than by the type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostInput {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content_html: Option<String>,
    pub date: Option<String>,
    pub image: Option<String>,
    pub reading_time_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorInput {
    #[serde(default)]
    pub name: String,
    pub twitter: Option<String>,
    pub avatar_url: Option<String>,
}

impl PostBundle {
    /// Bundle with just the two mandatory fields set.
    pub fn new(title: impl Into<String>, content_html: impl Into<String>) -> Self {
        Self {
            post: PostInput {
                title: Some(title.into()),
                content_html: Some(content_html.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_author(mut self, author: AuthorInput) -> Self {
        self.authors.push(author);
        self
    }

    /// Title, if present and not blank.
    pub fn title(&self) -> Option<&str> {
        non_blank(self.post.title.as_deref())
    }

    /// Content HTML, if present and not blank.
    pub fn content_html(&self) -> Option<&str> {
        non_blank(self.post.content_html.as_deref())
    }
}

impl AuthorInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn twitter(mut self, handle: impl Into<String>) -> Self {
        self.twitter = Some(handle.into());
        self
    }

    pub fn avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }
}

/// A post as read back from the store.
#[derive(Debug, Clone, Serialize)]
pub struct StoredPost {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub content_html: String,
    pub date: Option<String>,
    pub image: Option<String>,
    pub reading_time_minutes: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub tags: Vec<String>,
    pub authors: Vec<StoredAuthor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredAuthor {
    pub name: String,
    pub twitter: Option<String>,
    pub avatar_url: Option<String>,
}

/// Treat empty and whitespace-only strings as absent.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Estimate reading time in whole minutes from an HTML body.
///
/// Tags are stripped before counting whitespace-separated words. Never
/// returns less than one minute.
pub fn estimate_reading_time(content_html: &str) -> i64 {
    let mut text = String::with_capacity(content_html.len());
    let mut in_tag = false;
    for c in content_html.chars() {
        match c {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    let words = text.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as i64
}
