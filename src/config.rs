// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Manifest layout.
//!
//! Specify the layout of the manifest document that travels with every blog
//! source checkout at `config/oxiblog.toml`. A copy of the document is
//! compiled straight into each oxiblog binary, which is how a binary knows
//! which build of the source tree it came from.
//!
//! # General Layout
//!
//! The manifest records four things: the build counter stamped into the
//! binary produced from the checkout, the remote URL of the user's fork, the
//! branch that fork pushes go to, and the ordered list of application paths
//! the front-end serves. The build counter only ever moves forward, and only
//! the rebuild step moves it.
//!
//! The document is always written out whole. Rewrites replace the previous
//! contents instead of merging with them, so the file on disk is exactly one
//! serialization of one [`Manifest`] value at all times.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::{read_to_string, rename, write},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Branch assumed when the user submits a blank branch answer.
pub const DEFAULT_BRANCH: &str = "master";

/// Baseline manifest compiled into this binary.
const BASELINE: &str = include_str!("../config/oxiblog.toml");

/// Manifest document of a blog source checkout.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Manifest {
    /// Build counter stamped into the binary compiled from this checkout.
    ///
    /// Never edit this by hand. A binary whose embedded counter disagrees
    /// with the checkout's counter refuses to touch the checkout.
    #[serde(default)]
    pub build_num: u64,

    /// Remote URL of the user's fork, where content changes get pushed.
    #[serde(default)]
    pub remote: String,

    /// Branch checked against the fork when pushing content changes.
    ///
    /// Blank means [`DEFAULT_BRANCH`].
    #[serde(default)]
    pub branch: String,

    /// Paths the front-end web application serves.
    ///
    /// Requests for these paths get the application's index so deep links
    /// keep working.
    #[serde(default)]
    pub app_paths: Vec<String>,
}

impl Manifest {
    /// Parse the baseline manifest compiled into this binary.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Deserialize`] if the embedded document is
    ///   malformed.
    pub fn embedded() -> Result<Self> {
        BASELINE.parse()
    }

    /// Load the manifest persisted in a source checkout.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if the document cannot be read.
    /// - Return [`ConfigError::Deserialize`] if the document is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        read_to_string(path)
            .map_err(|err| ConfigError::Read {
                source: err,
                path: path.to_path_buf(),
            })?
            .parse()
    }

    /// Persist the full manifest document to a source checkout.
    ///
    /// Serializes the whole manifest to a sibling temporary file and renames
    /// it over the target, so an interrupted write never leaves a document
    /// that fails to parse on the next run. The previous contents are fully
    /// replaced, never merged.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Serialize`] if the manifest cannot be
    ///   serialized.
    /// - Return [`ConfigError::Write`] if the document cannot be written or
    ///   moved into place.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let document = toml::ser::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        let tmp_name = match path.file_name() {
            Some(name) => format!(".{}.tmp", name.to_string_lossy()),
            None => ".manifest.tmp".to_owned(),
        };
        let tmp_path = path.with_file_name(tmp_name);

        write(&tmp_path, document.as_bytes()).map_err(|err| ConfigError::Write {
            source: err,
            path: path.to_path_buf(),
        })?;
        rename(&tmp_path, path).map_err(|err| ConfigError::Write {
            source: err,
            path: path.to_path_buf(),
        })?;

        Ok(())
    }

    /// Append an application path unless it is already listed.
    ///
    /// Returns true if the listing changed. Order of existing entries is
    /// preserved.
    pub fn add_app_path(&mut self, app_path: impl Into<String>) -> bool {
        let app_path = app_path.into();
        if self.app_paths.contains(&app_path) {
            return false;
        }

        self.app_paths.push(app_path);
        true
    }

    /// Remove an application path from the listing.
    ///
    /// Returns true if the listing changed.
    pub fn remove_app_path(&mut self, app_path: impl AsRef<str>) -> bool {
        let before = self.app_paths.len();
        self.app_paths.retain(|entry| entry != app_path.as_ref());
        self.app_paths.len() != before
    }
}

impl FromStr for Manifest {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        toml::de::from_str(data).map_err(ConfigError::Deserialize)
    }
}

impl Display for Manifest {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Manifest error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize manifest.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize manifest.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Manifest document cannot be read.
    #[error("failed to read manifest at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Manifest document cannot be written into place.
    #[error("failed to write manifest at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
