// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Blog home layout.
//!
//! Everything oxiblog touches lives under one well-known root directory, the
//! __blog home__. The home nests the version-controlled source checkout at
//! `src`, which itself carries the manifest at `src/config/oxiblog.toml` and
//! the content directories `src/posts` and `src/drafts`. Compiled binaries
//! land in `bin`.

use std::path::{Path, PathBuf};

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Well-known paths inside a blog home.
///
/// Only computes paths. Whether any of them exist on disk is the caller's
/// problem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// Construct layout rooted at target path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Construct layout rooted at the default blog home, `$HOME/oxiblog`.
    ///
    /// # Errors
    ///
    /// - Return [`NoWayHome`] if home directory path cannot be determined.
    pub fn try_default() -> Result<Self> {
        Ok(Self::new(home_dir()?.join("oxiblog")))
    }

    /// Root of the blog home.
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Source checkout nested in the blog home.
    pub fn src_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    /// Compiled binary output directory.
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// Manifest document persisted in the source checkout.
    pub fn manifest_path(&self) -> PathBuf {
        self.src_dir().join("config").join("oxiblog.toml")
    }

    /// Published posts in the source checkout.
    pub fn posts_dir(&self) -> PathBuf {
        self.src_dir().join("posts")
    }

    /// Draft posts in the source checkout.
    pub fn drafts_dir(&self) -> PathBuf {
        self.src_dir().join("drafts")
    }
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn layout_nests_everything_under_root() {
        let layout = Layout::new("/blah/oxiblog");

        assert_eq!(layout.root(), Path::new("/blah/oxiblog"));
        assert_eq!(layout.src_dir(), PathBuf::from("/blah/oxiblog/src"));
        assert_eq!(layout.bin_dir(), PathBuf::from("/blah/oxiblog/bin"));
        assert_eq!(
            layout.manifest_path(),
            PathBuf::from("/blah/oxiblog/src/config/oxiblog.toml")
        );
        assert_eq!(layout.posts_dir(), PathBuf::from("/blah/oxiblog/src/posts"));
        assert_eq!(
            layout.drafts_dir(),
            PathBuf::from("/blah/oxiblog/src/drafts")
        );
    }
}
