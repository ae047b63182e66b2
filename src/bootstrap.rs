// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Blog home bootstrap.
//!
//! Initialization is driven off whether a blog home directory can be found.
//! If it cannot, oxiblog creates one, clones its own source into it, and
//! builds a fresh binary out of that checkout. If a home already exists, it
//! checks that the source checkout is present and that the running binary
//! actually came from that checkout before letting anything touch it.
//!
//! The whole workflow is a small tree of [`Decision`]s walked by the
//! [`dtree`](crate::dtree) engine:
//!
//! ```text
//!                  [home-exists]
//!                 no/          \yes
//!      [first-clone]            [src-exists]
//!               \yes           no/        \yes
//!      [first-build]  [missing-src-clone]  [build-num]
//!                               \yes
//!                      [missing-src-build]
//! ```
//!
//! Every check threads the same [`BootstrapContext`] through: the manifest
//! baked into this binary, the blog home layout, a prompt source, and a
//! build toolchain. The last two sit behind traits so checks run in tests
//! without a console or a compiler.
//!
//! # Build Numbers
//!
//! Rebuilding bumps the checkout's build counter by one right before
//! compiling, so the produced binary always embeds the counter of the source
//! it came from. The `build-num` decision is the one place that guard is
//! enforced: a binary whose embedded counter disagrees with the checkout
//! refuses to continue, because some newer binary has already advanced the
//! checkout. Side effects already performed are never rolled back.

use crate::{
    config::{ConfigError, Manifest, DEFAULT_BRANCH},
    dtree::{Decision, NodeSpec, TreeError},
    path::Layout,
};

use auth_git2::GitAuthenticator;
use git2::{build::RepoBuilder, AutotagOption, ErrorCode, FetchOptions, RemoteCallbacks, Repository};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Text;
use std::{
    env,
    fs::{self, DirBuilder},
    io,
    path::{Path, PathBuf},
    process::Command,
    time,
};
use tracing::{debug, info, instrument, warn};

/// Canonical upstream the source checkout is cloned from.
pub const UPSTREAM_URL: &str = "https://github.com/awkless/oxiblog.git";

/// Name of the remote registered for the user's fork.
pub const FORK_REMOTE: &str = "fork";

/// Diagnostic override that forces the build number check to pass.
///
/// Any non-empty value works. Meant for automated runs only.
pub const BUILDCHECK_ENV: &str = "OXIBLOG_BUILDCHECK";

/// State threaded through every bootstrap decision.
///
/// Owns the manifest loaded from this binary's embedded baseline, the blog
/// home layout, and the injected prompt and toolchain providers. Checks
/// mutate the context directly instead of reaching for ambient globals.
pub struct BootstrapContext<P = ConsolePrompt, T = CargoToolchain>
where
    P: ForkPrompt,
    T: Toolchain,
{
    pub manifest: Manifest,
    pub layout: Layout,
    pub upstream: String,
    pub prompt: P,
    pub toolchain: T,
}

impl BootstrapContext {
    /// Construct context for a real run.
    ///
    /// Embedded manifest baseline, default blog home, console prompts, and
    /// cargo builds.
    ///
    /// # Errors
    ///
    /// - Return [`BootstrapError::Config`] if the embedded baseline is
    ///   malformed.
    /// - Return [`BootstrapError::NoWayHome`] if the user's home directory
    ///   cannot be determined.
    pub fn try_default() -> Result<Self> {
        Ok(Self::new(
            Manifest::embedded()?,
            Layout::try_default()?,
            ConsolePrompt,
            CargoToolchain,
        ))
    }
}

impl<P, T> BootstrapContext<P, T>
where
    P: ForkPrompt,
    T: Toolchain,
{
    /// Construct new bootstrap context.
    pub fn new(manifest: Manifest, layout: Layout, prompt: P, toolchain: T) -> Self {
        Self {
            manifest,
            layout,
            upstream: UPSTREAM_URL.to_owned(),
            prompt,
            toolchain,
        }
    }

    /// Replace the canonical upstream URL.
    pub fn with_upstream(mut self, upstream: impl Into<String>) -> Self {
        self.upstream = upstream.into();
        self
    }
}

/// Assemble the bootstrap decision tree.
///
/// # Errors
///
/// - Return [`TreeError`] if the table is malformed, which would be a bug in
///   the table itself.
pub fn bootstrap_tree<P, T>() -> Result<Decision<BootstrapContext<P, T>, BootstrapError>, TreeError>
where
    P: ForkPrompt + 'static,
    T: Toolchain + 'static,
{
    Decision::from_table([
        NodeSpec::new("home-exists", home_exists)
            .yes("src-exists")
            .no("first-clone"),
        NodeSpec::new("first-clone", clone_fork).yes("first-build"),
        NodeSpec::new("first-build", rebuild),
        NodeSpec::new("src-exists", checkout_present)
            .yes("build-num")
            .no("missing-src-clone"),
        NodeSpec::new("missing-src-clone", clone_fork).yes("missing-src-build"),
        NodeSpec::new("missing-src-build", rebuild),
        NodeSpec::new("build-num", build_num_consistent),
    ])
}

/// Does the blog home directory exist?
///
/// Yes means the home was found and nothing was touched. No means the home
/// was missing and exactly one directory was created for it.
///
/// # Errors
///
/// - Return [`BootstrapError::HomeIsFile`] if a regular file squats on the
///   home path.
/// - Return [`BootstrapError::CreateHome`] if the directory cannot be made.
/// - Return [`BootstrapError::StatHome`] on any other probe failure.
#[instrument(skip(ctx), level = "debug")]
pub fn home_exists<P, T>(ctx: &mut BootstrapContext<P, T>) -> Result<bool>
where
    P: ForkPrompt,
    T: Toolchain,
{
    let home = ctx.layout.root().to_path_buf();
    match fs::metadata(&home) {
        Ok(meta) if meta.is_dir() => {
            info!("found blog home at {}", home.display());
            Ok(true)
        }
        Ok(_) => Err(BootstrapError::HomeIsFile { home }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!("no blog home found, making one at {}", home.display());
            info!(
                "oxiblog embeds your posts into its own binary, so it keeps its source around \
                 under the blog home and rebuilds itself when content changes; fork the upstream \
                 repository now if you have not yet, you will be asked for your fork's remote"
            );
            let mut builder = DirBuilder::new();
            #[cfg(unix)]
            {
                use std::os::unix::fs::DirBuilderExt;
                builder.mode(0o750);
            }
            builder
                .create(&home)
                .map_err(|err| BootstrapError::CreateHome { source: err, home })?;
            Ok(false)
        }
        Err(err) => Err(BootstrapError::StatHome { source: err, home }),
    }
}

/// Does a source checkout exist under the blog home?
///
/// # Errors
///
/// - Return [`BootstrapError::ProbeCheckout`] on any probe failure other
///   than the repository simply not existing.
pub fn checkout_present<P, T>(ctx: &mut BootstrapContext<P, T>) -> Result<bool>
where
    P: ForkPrompt,
    T: Toolchain,
{
    let src = ctx.layout.src_dir();
    match Repository::open(&src) {
        Ok(_) => {
            debug!("source checkout present at {}", src.display());
            Ok(true)
        }
        Err(err) if err.code() == ErrorCode::NotFound => {
            info!("cannot find the oxiblog source at {}", src.display());
            Ok(false)
        }
        Err(err) => Err(BootstrapError::ProbeCheckout { source: err, src }),
    }
}

/// Clone the canonical upstream into the blog home.
///
/// Prompts (blocking) until the fork remote and branch are both known; a
/// blank branch answer resolves to [`DEFAULT_BRANCH`]. Clones upstream into
/// `src`, fetches every tag from `origin`, and registers the fork URL under
/// the [`FORK_REMOTE`] remote. Always answers yes or fails.
///
/// # Errors
///
/// - Return [`BootstrapError::MalformedRemote`] if the fork remote is not an
///   http(s) URL.
/// - Return [`BootstrapError::Prompt`] if console input fails.
/// - Return [`BootstrapError::CloneUpstream`] if the clone itself fails.
/// - Return [`BootstrapError::Git2`] if tag fetch or remote registration
///   fails.
#[instrument(skip(ctx), level = "debug")]
pub fn clone_fork<P, T>(ctx: &mut BootstrapContext<P, T>) -> Result<bool>
where
    P: ForkPrompt,
    T: Toolchain,
{
    while ctx.manifest.remote.is_empty() || ctx.manifest.branch.is_empty() {
        if ctx.manifest.remote.is_empty() {
            ctx.manifest.remote = ctx.prompt.fork_remote()?;
        }
        if ctx.manifest.branch.is_empty() {
            let answer = ctx.prompt.branch()?;
            ctx.manifest.branch = if answer.trim().is_empty() {
                DEFAULT_BRANCH.to_owned()
            } else {
                answer
            };
        }
    }

    let remote = ctx.manifest.remote.clone();
    if !remote.starts_with("https://") && !remote.starts_with("http://") {
        return Err(BootstrapError::MalformedRemote { remote });
    }

    let src = ctx.layout.src_dir();
    info!("cloning {} into {}", ctx.upstream, src.display());

    let bar = ProgressBar::no_length();
    let style = ProgressStyle::with_template(
        "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}]",
    )?
    .progress_chars("-Cco.");
    bar.set_style(style);
    bar.set_message(ctx.upstream.clone());
    bar.enable_steady_tick(time::Duration::from_millis(100));

    let authenticator = GitAuthenticator::default();
    let git_config = git2::Config::open_default()?;

    let mut throttle = time::Instant::now();
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(authenticator.credentials(&git_config));
    let progress_bar = bar.clone();
    callbacks.transfer_progress(move |progress| {
        let stats = progress.to_owned();
        if throttle.elapsed() > time::Duration::from_millis(10) {
            throttle = time::Instant::now();
            progress_bar.set_length(stats.total_objects() as u64);
            progress_bar.set_position(stats.received_objects() as u64);
        }
        true
    });

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(callbacks);
    let repository = RepoBuilder::new()
        .fetch_options(fetch_options)
        .clone(ctx.upstream.as_str(), &src)
        .map_err(|err| BootstrapError::CloneUpstream {
            source: err,
            upstream: ctx.upstream.clone(),
        })?;
    bar.finish_and_clear();

    // grab every upstream tag, then point the fork remote at the user's copy
    let mut origin = repository.find_remote("origin")?;
    let mut tag_options = FetchOptions::new();
    tag_options.download_tags(AutotagOption::All);
    origin.fetch(&[] as &[&str], Some(&mut tag_options), None)?;
    repository.remote(FORK_REMOTE, &remote)?;

    info!(
        "source checkout ready at {}; content changes will push to {} on branch {}",
        src.display(),
        remote,
        ctx.manifest.branch
    );

    Ok(true)
}

/// Does the checkout's recorded build number match this binary's?
///
/// The one place the build counter guard is enforced. Setting
/// [`BUILDCHECK_ENV`] to any non-empty value skips the comparison outright.
///
/// # Errors
///
/// - Return [`BootstrapError::Config`] if the checkout manifest cannot be
///   read or parsed.
/// - Return [`BootstrapError::StaleBinary`] if the counters disagree.
pub fn build_num_consistent<P, T>(ctx: &mut BootstrapContext<P, T>) -> Result<bool>
where
    P: ForkPrompt,
    T: Toolchain,
{
    // trap door for automated runs
    if env::var_os(BUILDCHECK_ENV).is_some_and(|value| !value.is_empty()) {
        warn!("{BUILDCHECK_ENV} is set, skipping the build number check");
        return Ok(true);
    }

    let manifest_path = ctx.layout.manifest_path();
    let recorded = Manifest::load(&manifest_path)?;
    if recorded.build_num != ctx.manifest.build_num {
        return Err(BootstrapError::StaleBinary {
            embedded: ctx.manifest.build_num,
            recorded: recorded.build_num,
            manifest_path,
        });
    }

    debug!(
        "build number {} matches the source checkout",
        ctx.manifest.build_num
    );
    Ok(true)
}

/// Build a new oxiblog binary from the source checkout.
///
/// Bumps the build counter by exactly one, persists the whole manifest back
/// into the checkout, makes sure the binary output directory exists, and
/// hands the checkout to the toolchain. Always answers yes or fails, and
/// never cleans up after a partial failure.
///
/// # Errors
///
/// - Return [`BootstrapError::StatManifest`] if the checkout manifest is
///   missing.
/// - Return [`BootstrapError::Config`] if the manifest cannot be persisted.
/// - Return [`BootstrapError::CreateBinDir`] if the output directory cannot
///   be made.
/// - Return [`BootstrapError::ToolchainMissing`],
///   [`BootstrapError::SpawnToolchain`], or [`BootstrapError::BuildFailed`]
///   if compilation falls over.
#[instrument(skip(ctx), level = "debug")]
pub fn rebuild<P, T>(ctx: &mut BootstrapContext<P, T>) -> Result<bool>
where
    P: ForkPrompt,
    T: Toolchain,
{
    ctx.manifest.build_num += 1;

    // INVARIANT: Only overwrite a manifest that already exists. A missing
    // document means src is not actually a blog source checkout.
    let manifest_path = ctx.layout.manifest_path();
    fs::metadata(&manifest_path).map_err(|err| BootstrapError::StatManifest {
        source: err,
        path: manifest_path.clone(),
    })?;
    ctx.manifest.persist(&manifest_path)?;
    info!(
        "wrote manifest with build number {} to {}",
        ctx.manifest.build_num,
        manifest_path.display()
    );

    let bin_dir = ctx.layout.bin_dir();
    mkdirp::mkdirp(&bin_dir).map_err(|err| BootstrapError::CreateBinDir {
        source: err,
        path: bin_dir.clone(),
    })?;

    info!("building a new oxiblog binary into {}", bin_dir.display());
    ctx.toolchain.build(&ctx.layout.src_dir(), ctx.layout.root())?;
    info!(
        "new binary ready in {}; give it a test drive, push the checkout to your fork if your \
         posts look right, or git reset the checkout to keep using the current binary",
        bin_dir.display()
    );

    Ok(true)
}

/// Source of interactive bootstrap answers.
///
/// Keeps console reads out of the decision tree, so checks that want input
/// ask the context instead of the terminal.
pub trait ForkPrompt {
    /// Ask for the remote URL of the user's fork.
    fn fork_remote(&mut self) -> Result<String>;

    /// Ask for the branch content changes get pushed to.
    ///
    /// A blank answer means the caller should fall back to the default
    /// branch.
    fn branch(&mut self) -> Result<String>;
}

/// Console prompts through inquire.
///
/// Reads block with no timeout. A stalled operator stalls the whole walk,
/// and that is fine for a one-operator tool.
#[derive(Debug, Default)]
pub struct ConsolePrompt;

impl ForkPrompt for ConsolePrompt {
    fn fork_remote(&mut self) -> Result<String> {
        Ok(Text::new("fork remote url")
            .with_help_message(
                "oxiblog pushes your posts to a fork of its upstream; fork \
                 https://github.com/awkless/oxiblog.git and paste your fork's https remote",
            )
            .prompt()?)
    }

    fn branch(&mut self) -> Result<String> {
        Ok(Text::new("branch")
            .with_help_message("branch your content changes get pushed to (blank for \"master\")")
            .prompt()?)
    }
}

/// Build toolchain that turns a source checkout into an installed binary.
pub trait Toolchain {
    /// Build the checkout at `src_dir`, installing binaries under the `bin`
    /// directory of `install_root`.
    fn build(&self, src_dir: &Path, install_root: &Path) -> Result<()>;
}

/// Cargo resolved from the process search path.
#[derive(Debug, Default)]
pub struct CargoToolchain;

impl Toolchain for CargoToolchain {
    #[instrument(skip(self), level = "debug")]
    fn build(&self, src_dir: &Path, install_root: &Path) -> Result<()> {
        let status = Command::new("cargo")
            .current_dir(src_dir)
            .args(["install", "--path", ".", "--force", "--root"])
            .arg(install_root)
            .status()
            .map_err(|err| {
                if err.kind() == io::ErrorKind::NotFound {
                    BootstrapError::ToolchainMissing {
                        tool: "cargo".to_owned(),
                    }
                } else {
                    BootstrapError::SpawnToolchain {
                        source: err,
                        tool: "cargo".to_owned(),
                    }
                }
            })?;

        if !status.success() {
            return Err(BootstrapError::BuildFailed { status });
        }

        Ok(())
    }
}

/// Bootstrap error types.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// A regular file squats on the blog home path.
    #[error(
        "a regular file is sitting where the blog home should be at {:?}; \
         remove it before oxiblog can continue",
        home.display()
    )]
    HomeIsFile { home: PathBuf },

    /// Blog home directory cannot be created.
    #[error("failed to create blog home at {:?}", home.display())]
    CreateHome {
        #[source]
        source: std::io::Error,
        home: PathBuf,
    },

    /// Blog home path cannot be probed.
    #[error("failed to check blog home at {:?}", home.display())]
    StatHome {
        #[source]
        source: std::io::Error,
        home: PathBuf,
    },

    /// Source checkout cannot be probed.
    #[error("failed to check for a source checkout at {:?}", src.display())]
    ProbeCheckout {
        #[source]
        source: git2::Error,
        src: PathBuf,
    },

    /// Fork remote is not an http(s) URL.
    #[error("remote {remote:?} is not an http(s) URL; oxiblog only clones over public http")]
    MalformedRemote { remote: String },

    /// Upstream clone fell over.
    #[error("failed to clone upstream {upstream}")]
    CloneUpstream {
        #[source]
        source: git2::Error,
        upstream: String,
    },

    /// Checkout manifest is missing.
    #[error("failed to stat manifest at {:?}", path.display())]
    StatManifest {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Binary output directory cannot be created.
    #[error("failed to create binary output directory at {:?}", path.display())]
    CreateBinDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Build tool is nowhere on the search path.
    #[error("cannot find {tool:?} on the search path")]
    ToolchainMissing { tool: String },

    /// Build tool refused to start.
    #[error("failed to run {tool:?}")]
    SpawnToolchain {
        #[source]
        source: std::io::Error,
        tool: String,
    },

    /// Build tool started but compilation failed.
    #[error("build failed: {status}")]
    BuildFailed { status: std::process::ExitStatus },

    /// Running binary and source checkout disagree on the build number.
    #[error(
        "this binary embeds build number {embedded}, but the source checkout records build \
         number {recorded} in {:?}\n\
         either git reset the source checkout to match this binary, or run the latest binary \
         from your blog home's bin directory (the 'publish' subcommand builds a fresh one if \
         you misplaced it); set {} to any non-empty value to bypass this check if you know \
         what you are doing",
        manifest_path.display(),
        BUILDCHECK_ENV
    )]
    StaleBinary {
        embedded: u64,
        recorded: u64,
        manifest_path: PathBuf,
    },

    /// Manifest handling fails.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Home directory path cannot be determined.
    #[error(transparent)]
    NoWayHome(#[from] crate::path::NoWayHome),

    /// Console input fails.
    #[error(transparent)]
    Prompt(#[from] inquire::InquireError),

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

/// Friendly result alias :3
pub type Result<T, E = BootstrapError> = std::result::Result<T, E>;
