// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Self-rebuilding markdown blog tool.
//!
//! Oxiblog serves blog posts straight out of its own binary: published
//! content is compiled in, so there is nothing to deploy besides the binary
//! itself. The trade is that adding or removing content means rebuilding,
//! which is why oxiblog keeps a version-controlled copy of its own source
//! under the user's blog home and knows how to rebuild itself from it.
//!
//! # Blog Home
//!
//! Everything lives under one root directory, `$HOME/oxiblog`:
//!
//! ```text
//! oxiblog/
//! ├── src/            version-controlled source checkout
//! │   ├── config/     manifest document (build counter, fork remote, ...)
//! │   ├── posts/      published posts, embedded at compile time
//! │   └── drafts/     unpublished posts
//! └── bin/            compiled oxiblog binaries
//! ```
//!
//! The [`bootstrap`] module gets a machine from nothing to that layout, and
//! keeps a running binary honest about which build of the source tree it
//! came from. It is driven by the generic decision tree engine in [`dtree`].
//!
//! # See Also
//!
//! 1. [`bootstrap`]
//! 2. [`dtree`]

pub mod bootstrap;
pub mod config;
pub mod dtree;
pub mod path;
pub mod post;
pub mod store;
