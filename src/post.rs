// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Blog post layout.
//!
//! A __post__ is one `.post` file: a small metadata header plus the markdown
//! body, serialized together as a single document. Published posts live in
//! the `posts` directory of the source checkout and get compiled straight
//! into the next oxiblog binary; drafts live in `drafts` until the user
//! publishes them.
//!
//! Listings always come out newest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    str::FromStr,
};

/// File extension of serialized posts.
pub const POST_EXT: &str = "post";

/// Title of the placeholder post that keeps an otherwise empty posts
/// directory embeddable. Skipped in every listing.
pub const EMPTY_TITLE: &str = "_empty";

/// A markdown blog post.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Post {
    /// Title shown in listings and at the top of the rendered post.
    pub title: String,

    /// One or two sentences summarizing the post.
    pub summary: String,

    /// Hero image for the rendered post.
    #[serde(default)]
    pub hero: String,

    /// Last time the post's content changed.
    pub date: DateTime<Utc>,

    /// Markdown body of the post.
    #[serde(default)]
    pub markdown: String,
}

impl Post {
    /// Whether this is the placeholder keeping the directory embeddable.
    pub fn is_placeholder(&self) -> bool {
        self.title == EMPTY_TITLE
    }

    /// File name this post serializes under.
    ///
    /// Lowercased title with everything that is not alphanumeric squashed
    /// into single hyphens, plus the `.post` extension.
    pub fn file_name(&self) -> String {
        let mut slug = String::new();
        let mut pending_hyphen = false;
        for character in self.title.chars() {
            if character.is_ascii_alphanumeric() {
                if pending_hyphen && !slug.is_empty() {
                    slug.push('-');
                }
                pending_hyphen = false;
                slug.push(character.to_ascii_lowercase());
            } else {
                pending_hyphen = true;
            }
        }

        if slug.is_empty() {
            slug.push_str("untitled");
        }

        format!("{slug}.{POST_EXT}")
    }
}

impl FromStr for Post {
    type Err = PostError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        toml::de::from_str(data).map_err(PostError::Deserialize)
    }
}

impl Display for Post {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(PostError::Serialize)?
                .as_str(),
        )
    }
}

/// Post serialization error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum PostError {
    /// Failed to deserialize post.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize post.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),
}

impl From<PostError> for FmtError {
    fn from(_: PostError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
pub type Result<T, E = PostError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn sample(title: &str, date: &str) -> Post {
        Post {
            title: title.into(),
            summary: "blah blah blah".into(),
            hero: String::new(),
            date: date.parse().unwrap(),
            markdown: "# Blah\n".into(),
        }
    }

    #[test]
    fn deserialize_post() {
        let result: Post = indoc! {r##"
            title = "Hello, Blog"
            summary = "First post."
            hero = "hello.png"
            date = "2025-06-01T12:00:00Z"
            markdown = "# Hello\n"
        "##}
        .parse()
        .unwrap();

        let expect = Post {
            title: "Hello, Blog".into(),
            summary: "First post.".into(),
            hero: "hello.png".into(),
            date: "2025-06-01T12:00:00Z".parse().unwrap(),
            markdown: "# Hello\n".into(),
        };

        assert_eq!(result, expect);
    }

    #[test]
    fn serialize_then_parse_round_trips() {
        let post = sample("Hello, Blog", "2025-06-01T12:00:00Z");
        let round_trip: Post = post.to_string().parse().unwrap();
        assert_eq!(round_trip, post);
    }

    #[test]
    fn missing_title_is_rejected() {
        let result = "summary = \"no title\"".parse::<Post>();
        assert!(matches!(result, Err(PostError::Deserialize(_))));
    }

    #[test]
    fn file_name_slugs_title() {
        assert_eq!(
            sample("Hello, Blog!", "2025-01-01T00:00:00Z").file_name(),
            "hello-blog.post"
        );
        assert_eq!(sample("  ", "2025-01-01T00:00:00Z").file_name(), "untitled.post");
    }

    #[test]
    fn placeholder_is_detected() {
        assert!(sample(EMPTY_TITLE, "1970-01-01T00:00:00Z").is_placeholder());
        assert!(!sample("real", "1970-01-01T00:00:00Z").is_placeholder());
    }
}
