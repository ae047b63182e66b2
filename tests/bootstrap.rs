// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! End-to-end walks of the bootstrap decision tree against a local upstream.

use oxiblog::{
    bootstrap::{self, BootstrapContext, BootstrapError, ForkPrompt, Toolchain, FORK_REMOTE},
    config::Manifest,
    path::Layout,
};

use git2::{IndexEntry, IndexTime, Repository, RepositoryInitOptions};
use sealed_test::prelude::*;
use std::{
    cell::RefCell,
    collections::VecDeque,
    path::{Path, PathBuf},
};

const FORK_URL: &str = "https://blah.org/user/oxiblog-fork.git";

struct RepoFixture {
    repo: Repository,
}

impl RepoFixture {
    fn new(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("master");
        let repo = Repository::init_opts(path.as_ref(), &opts)?;

        // INVARIANT: Always provide valid name and email.
        //   - Git will complain if this is not set in CI/CD environments.
        let mut config = repo.config()?;
        config.set_str("user.name", "John Doe")?;
        config.set_str("user.email", "john@doe.com")?;

        Ok(Self { repo })
    }

    fn stage_and_commit(
        &self,
        filename: impl AsRef<Path>,
        contents: impl AsRef<str>,
    ) -> anyhow::Result<()> {
        let entry = IndexEntry {
            ctime: IndexTime::new(0, 0),
            mtime: IndexTime::new(0, 0),
            dev: 0,
            ino: 0,
            mode: 0o100644,
            uid: 0,
            gid: 0,
            file_size: contents.as_ref().len() as u32,
            id: self.repo.blob(contents.as_ref().as_bytes())?,
            flags: 0,
            flags_extended: 0,
            path: filename
                .as_ref()
                .as_os_str()
                .to_string_lossy()
                .into_owned()
                .as_bytes()
                .to_vec(),
        };

        // INVARIANT: Always use new tree produced by index after staging new entry.
        let mut index = self.repo.index()?;
        index.add_frombuffer(&entry, contents.as_ref().as_bytes())?;
        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;

        // INVARIANT: Always determine latest parent commits to append to.
        let signature = self.repo.signature()?;
        let mut parents = Vec::new();
        if let Some(parent) = self.repo.head().ok().map(|head| head.target().unwrap()) {
            parents.push(self.repo.find_commit(parent)?);
        }
        let parents = parents.iter().collect::<Vec<_>>();

        // INVARIANT: Commit to HEAD by appending to obtained parent commits.
        self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            format!("chore: add {:?}", filename.as_ref()).as_ref(),
            &tree,
            &parents,
        )?;

        Ok(())
    }
}

struct QueuedPrompt {
    answers: VecDeque<String>,
}

impl QueuedPrompt {
    fn new(answers: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            answers: answers.into_iter().map(ToOwned::to_owned).collect(),
        }
    }
}

impl ForkPrompt for QueuedPrompt {
    fn fork_remote(&mut self) -> bootstrap::Result<String> {
        Ok(self.answers.pop_front().unwrap_or_default())
    }

    fn branch(&mut self) -> bootstrap::Result<String> {
        Ok(self.answers.pop_front().unwrap_or_default())
    }
}

#[derive(Default)]
struct CountingToolchain {
    builds: RefCell<Vec<(PathBuf, PathBuf)>>,
}

impl Toolchain for CountingToolchain {
    fn build(&self, src_dir: &Path, install_root: &Path) -> bootstrap::Result<()> {
        self.builds
            .borrow_mut()
            .push((src_dir.to_path_buf(), install_root.to_path_buf()));
        Ok(())
    }
}

/// Stand up a local upstream and walk the tree from an empty environment.
fn first_walk() -> anyhow::Result<BootstrapContext<QueuedPrompt, CountingToolchain>> {
    let fixture = RepoFixture::new("upstream")?;
    fixture.stage_and_commit(
        "config/oxiblog.toml",
        "build_num = 0\nremote = \"\"\nbranch = \"\"\napp_paths = []\n",
    )?;

    let upstream = std::fs::canonicalize("upstream")?;
    let mut ctx = BootstrapContext::new(
        Manifest::embedded()?,
        Layout::new("blog-home"),
        QueuedPrompt::new([FORK_URL, ""]),
        CountingToolchain::default(),
    )
    .with_upstream(upstream.to_string_lossy());

    let mut tree = bootstrap::bootstrap_tree()?;
    tree.execute(&mut ctx)?;

    Ok(ctx)
}

#[sealed_test]
fn walk_from_nothing_builds_a_blog_home() -> anyhow::Result<()> {
    let ctx = first_walk()?;

    // One new blog home with a fresh checkout inside.
    assert!(Path::new("blog-home").is_dir());
    let checkout = Repository::open("blog-home/src")?;

    // The blank branch answer resolved to the default.
    assert_eq!(ctx.manifest.branch, "master");
    assert_eq!(ctx.manifest.remote, FORK_URL);

    // Fork remote points at the queued answer.
    let fork = checkout.find_remote(FORK_REMOTE)?;
    assert_eq!(fork.url(), Some(FORK_URL));

    // The rebuild bumped the persisted counter past the cloned baseline and
    // wrote the prompt answers along with it.
    let recorded = Manifest::load("blog-home/src/config/oxiblog.toml")?;
    assert_eq!(recorded.build_num, 1);
    assert_eq!(recorded.remote, FORK_URL);
    assert_eq!(recorded.branch, "master");

    // Exactly one build, against the checkout, into the blog home.
    let builds = ctx.toolchain.builds.borrow();
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0].0, Path::new("blog-home/src"));
    assert!(Path::new("blog-home/bin").is_dir());

    Ok(())
}

#[sealed_test]
fn second_walk_with_matching_binary_touches_nothing() -> anyhow::Result<()> {
    let first = first_walk()?;

    // A binary actually built from that checkout embeds the bumped counter.
    let mut ctx = BootstrapContext::new(
        Manifest {
            build_num: 1,
            ..first.manifest.clone()
        },
        Layout::new("blog-home"),
        QueuedPrompt::new([]),
        CountingToolchain::default(),
    );

    let mut tree = bootstrap::bootstrap_tree()?;
    tree.execute(&mut ctx)?;

    // No new clone, no new build, counter untouched.
    assert!(ctx.toolchain.builds.borrow().is_empty());
    let recorded = Manifest::load("blog-home/src/config/oxiblog.toml")?;
    assert_eq!(recorded.build_num, 1);

    Ok(())
}

#[sealed_test]
fn second_walk_with_stale_binary_is_fatal() -> anyhow::Result<()> {
    let first = first_walk()?;

    // This binary still embeds the baseline counter, but the checkout moved
    // on to build number one.
    let mut ctx = BootstrapContext::new(
        Manifest {
            build_num: 0,
            ..first.manifest.clone()
        },
        Layout::new("blog-home"),
        QueuedPrompt::new([]),
        CountingToolchain::default(),
    );

    let mut tree = bootstrap::bootstrap_tree()?;
    let result = tree.execute(&mut ctx);

    assert!(matches!(
        result,
        Err(BootstrapError::StaleBinary {
            embedded: 0,
            recorded: 1,
            ..
        })
    ));
    assert!(ctx.toolchain.builds.borrow().is_empty());

    Ok(())
}
