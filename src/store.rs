// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Post store management and manipulation.
//!
//! Posts live in two flat directories of the source checkout: `drafts` for
//! work in progress and `posts` for published content. A __post store__ is
//! one such directory. Stores only evaluate their top level; every file with
//! a `.post` extension is a post, everything else is ignored.
//!
//! Published posts are additionally compiled into the oxiblog binary itself,
//! which is what the `posts` subcommand lists: the content this binary
//! actually serves, not whatever happens to sit in the checkout right now.
//!
//! Listing ids are 1-based positions in the newest-first ordering, so id 1
//! is always the most recent post. Ids are only stable until the store
//! changes, which is fine for a one-operator tool.

use crate::post::{Post, PostError, POST_EXT};

use rust_embed::RustEmbed;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Published posts compiled into this binary.
#[derive(RustEmbed)]
#[folder = "posts"]
struct PostsFs;

/// A post together with the file name it serializes under.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub file_name: String,
    pub post: Post,
}

/// Flat directory of `.post` files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostStore {
    dir: PathBuf,
}

impl PostStore {
    /// Construct store over target directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory this store reads and writes.
    pub fn dir(&self) -> &Path {
        self.dir.as_path()
    }

    /// List every post in the store, newest first.
    ///
    /// Skips non-post files and the embeddability placeholder.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::ReadDir`] if the store directory cannot be
    ///   scanned.
    /// - Return [`StoreError::ReadPost`] if a post file cannot be read.
    /// - Return [`StoreError::Malformed`] if a post file fails to parse.
    pub fn entries(&self) -> Result<Vec<Entry>> {
        let listing = fs::read_dir(&self.dir).map_err(|err| StoreError::ReadDir {
            source: err,
            dir: self.dir.clone(),
        })?;

        let mut entries = Vec::new();
        for dir_entry in listing {
            let dir_entry = dir_entry.map_err(|err| StoreError::ReadDir {
                source: err,
                dir: self.dir.clone(),
            })?;
            let path = dir_entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(POST_EXT) {
                continue;
            }

            let contents = fs::read_to_string(&path).map_err(|err| StoreError::ReadPost {
                source: err,
                path: path.clone(),
            })?;
            let post: Post = contents.parse().map_err(|err| StoreError::Malformed {
                source: err,
                path: path.clone(),
            })?;
            if post.is_placeholder() {
                continue;
            }

            entries.push(Entry {
                file_name: dir_entry.file_name().to_string_lossy().into_owned(),
                post,
            });
        }

        sort_newest_first(&mut entries);
        debug!("{} posts in store {}", entries.len(), self.dir.display());

        Ok(entries)
    }

    /// Fetch a post by its 1-based listing id.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::NoSuchEntry`] if the id is out of range.
    /// - Return any [`PostStore::entries`] error.
    pub fn entry(&self, id: usize) -> Result<Entry> {
        let mut entries = self.entries()?;
        if id == 0 || id > entries.len() {
            return Err(StoreError::NoSuchEntry {
                id,
                count: entries.len(),
            });
        }

        Ok(entries.swap_remove(id - 1))
    }

    /// Write a post into the store under its slug file name.
    ///
    /// Creates the store directory if needed. An existing post with the same
    /// file name is overwritten.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CreateStoreDir`] if the store directory cannot
    ///   be made.
    /// - Return [`StoreError::Post`] if the post cannot be serialized.
    /// - Return [`StoreError::WritePost`] if the file cannot be written.
    pub fn save(&self, post: &Post) -> Result<PathBuf> {
        mkdirp::mkdirp(&self.dir).map_err(|err| StoreError::CreateStoreDir {
            source: err,
            dir: self.dir.clone(),
        })?;

        let path = self.dir.join(post.file_name());
        let document = toml::ser::to_string_pretty(post)
            .map_err(|err| StoreError::Post(PostError::Serialize(err)))?;
        fs::write(&path, document.as_bytes()).map_err(|err| StoreError::WritePost {
            source: err,
            path: path.clone(),
        })?;

        Ok(path)
    }

    /// Delete a post from the store.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::RemovePost`] if the file cannot be removed.
    pub fn remove(&self, entry: &Entry) -> Result<()> {
        let path = self.dir.join(&entry.file_name);
        fs::remove_file(&path).map_err(|err| StoreError::RemovePost {
            source: err,
            path,
        })
    }

    /// Move a post into another store.
    ///
    /// This is how drafts publish and posts unpublish: one rename, no copy.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CreateStoreDir`] if the target directory
    ///   cannot be made.
    /// - Return [`StoreError::MovePost`] if the rename fails.
    pub fn move_into(&self, entry: &Entry, target: &PostStore) -> Result<PathBuf> {
        mkdirp::mkdirp(&target.dir).map_err(|err| StoreError::CreateStoreDir {
            source: err,
            dir: target.dir.clone(),
        })?;

        let from = self.dir.join(&entry.file_name);
        let to = target.dir.join(&entry.file_name);
        fs::rename(&from, &to).map_err(|err| StoreError::MovePost {
            source: err,
            from,
            to: to.clone(),
        })?;

        Ok(to)
    }
}

/// List the published posts compiled into this binary, newest first.
///
/// # Errors
///
/// - Return [`StoreError::Malformed`] if an embedded post fails to parse,
///   which means the binary itself was built from a broken checkout.
pub fn embedded_entries() -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for file_name in PostsFs::iter() {
        if Path::new(file_name.as_ref())
            .extension()
            .and_then(|ext| ext.to_str())
            != Some(POST_EXT)
        {
            continue;
        }

        let Some(file) = PostsFs::get(file_name.as_ref()) else {
            continue;
        };
        let contents = String::from_utf8_lossy(file.data.as_ref()).into_owned();
        let post: Post = contents.parse().map_err(|err| StoreError::Malformed {
            source: err,
            path: PathBuf::from(file_name.as_ref()),
        })?;
        if post.is_placeholder() {
            continue;
        }

        entries.push(Entry {
            file_name: file_name.into_owned(),
            post,
        });
    }

    sort_newest_first(&mut entries);

    Ok(entries)
}

fn sort_newest_first(entries: &mut [Entry]) {
    // Tie-break on file name to keep listing ids deterministic.
    entries.sort_by(|a, b| {
        b.post
            .date
            .cmp(&a.post.date)
            .then_with(|| a.file_name.cmp(&b.file_name))
    });
}

/// Post store error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store directory cannot be scanned.
    #[error("failed to read post store at {:?}", dir.display())]
    ReadDir {
        #[source]
        source: std::io::Error,
        dir: PathBuf,
    },

    /// Store directory cannot be created.
    #[error("failed to create post store at {:?}", dir.display())]
    CreateStoreDir {
        #[source]
        source: std::io::Error,
        dir: PathBuf,
    },

    /// Post file cannot be read.
    #[error("failed to read post at {:?}", path.display())]
    ReadPost {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Post file cannot be written.
    #[error("failed to write post at {:?}", path.display())]
    WritePost {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Post file cannot be removed.
    #[error("failed to remove post at {:?}", path.display())]
    RemovePost {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Post file cannot be moved between stores.
    #[error("failed to move post from {:?} to {:?}", from.display(), to.display())]
    MovePost {
        #[source]
        source: std::io::Error,
        from: PathBuf,
        to: PathBuf,
    },

    /// Post file fails to parse.
    #[error("malformed post at {:?}", path.display())]
    Malformed {
        #[source]
        source: PostError,
        path: PathBuf,
    },

    /// Listing id out of range.
    #[error("no post with id {id}; the store holds {count}")]
    NoSuchEntry { id: usize, count: usize },

    /// Post serialization fails.
    #[error(transparent)]
    Post(#[from] PostError),
}

/// Friendly result alias :3
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    fn sample(title: &str, date: &str) -> Post {
        Post {
            title: title.into(),
            summary: "blah blah blah".into(),
            hero: String::new(),
            date: date.parse::<DateTime<Utc>>().unwrap(),
            markdown: "# Blah\n".into(),
        }
    }

    #[sealed_test]
    fn entries_list_newest_first_and_skip_noise() {
        let store = PostStore::new("drafts");
        store.save(&sample("old", "2024-01-01T00:00:00Z")).unwrap();
        store.save(&sample("new", "2025-01-01T00:00:00Z")).unwrap();
        store.save(&sample("_empty", "1970-01-01T00:00:00Z")).unwrap();
        std::fs::write("drafts/notes.md", "not a post").unwrap();

        let entries = store.entries().unwrap();

        let titles = entries
            .iter()
            .map(|entry| entry.post.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["new", "old"]);
    }

    #[sealed_test]
    fn entry_resolves_one_based_ids() {
        let store = PostStore::new("drafts");
        store.save(&sample("old", "2024-01-01T00:00:00Z")).unwrap();
        store.save(&sample("new", "2025-01-01T00:00:00Z")).unwrap();

        assert_eq!(store.entry(1).unwrap().post.title, "new");
        assert_eq!(store.entry(2).unwrap().post.title, "old");
        assert!(matches!(
            store.entry(0),
            Err(StoreError::NoSuchEntry { id: 0, count: 2 })
        ));
        assert!(matches!(
            store.entry(3),
            Err(StoreError::NoSuchEntry { id: 3, count: 2 })
        ));
    }

    #[sealed_test]
    fn save_then_list_round_trips() {
        let store = PostStore::new("drafts");
        let post = sample("Hello, Blog", "2025-06-01T12:00:00Z");

        let path = store.save(&post).unwrap();

        assert_eq!(path, PathBuf::from("drafts/hello-blog.post"));
        let entries = store.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].post, post);
    }

    #[sealed_test]
    fn move_into_renames_between_stores() {
        let drafts = PostStore::new("drafts");
        let posts = PostStore::new("posts");
        drafts.save(&sample("ready", "2025-06-01T12:00:00Z")).unwrap();
        let entry = drafts.entry(1).unwrap();

        let to = drafts.move_into(&entry, &posts).unwrap();

        assert_eq!(to, PathBuf::from("posts/ready.post"));
        assert!(drafts.entries().unwrap().is_empty());
        assert_eq!(posts.entries().unwrap().len(), 1);
    }

    #[sealed_test]
    fn remove_deletes_the_file() {
        let store = PostStore::new("drafts");
        store.save(&sample("gone", "2025-06-01T12:00:00Z")).unwrap();
        let entry = store.entry(1).unwrap();

        store.remove(&entry).unwrap();

        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn embedded_listing_skips_the_placeholder() {
        // The crate ships only the placeholder, so a binary built from a
        // pristine checkout serves no posts.
        assert!(embedded_entries().unwrap().is_empty());
    }
}
