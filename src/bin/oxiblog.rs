// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use oxiblog::{
    bootstrap::{self, BootstrapContext},
    config::Manifest,
    path::Layout,
    post::Post,
    store::{embedded_entries, Entry, PostStore},
};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use inquire::{Confirm, Text};
use std::{
    env, fs,
    path::Path,
    process::{exit, Command as Editor},
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "oxiblog [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        match self.command {
            Command::Init => run_init(),
            Command::Publish => run_publish(),
            Command::Config(command) => run_config(command),
            Command::Posts(command) => run_posts(command),
            Command::Drafts(command) => run_drafts(command),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Set up the blog home, cloning and rebuilding as needed.
    #[command(override_usage = "oxiblog init")]
    Init,

    /// Build a new oxiblog binary with the latest posts.
    #[command(override_usage = "oxiblog publish")]
    Publish,

    /// Inspect or edit the checkout's manifest.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// List, view, and unpublish the posts baked into this binary.
    #[command(subcommand)]
    Posts(PostsCommand),

    /// Write, list, publish, and delete draft posts.
    #[command(subcommand)]
    Drafts(DraftsCommand),
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print the checkout's manifest document.
    Show,

    /// Edit the application path listing.
    #[command(override_usage = "oxiblog config app-paths [--add <path>]... [--remove <path>]...")]
    AppPaths(AppPathsOptions),
}

#[derive(Parser, Clone, Debug)]
struct AppPathsOptions {
    /// Append an application path to the listing.
    #[arg(short, long, value_name = "path")]
    pub add: Vec<String>,

    /// Remove an application path from the listing.
    #[arg(short, long, value_name = "path")]
    pub remove: Vec<String>,
}

#[derive(Debug, Clone, Subcommand)]
enum PostsCommand {
    /// List published posts, newest first.
    List,

    /// Print a published post.
    #[command(override_usage = "oxiblog posts view <id>")]
    View(IdOptions),

    /// Move a published post in the checkout back into drafts.
    #[command(override_usage = "oxiblog posts draft <id>")]
    Draft(IdOptions),
}

#[derive(Debug, Clone, Subcommand)]
enum DraftsCommand {
    /// List drafts, newest first.
    List,

    /// Write a new draft in your $EDITOR.
    New,

    /// Reopen a draft in your $EDITOR.
    #[command(override_usage = "oxiblog drafts edit [options] <id>")]
    Edit(EditOptions),

    /// Print a draft.
    #[command(override_usage = "oxiblog drafts view <id>")]
    View(IdOptions),

    /// Delete a draft.
    #[command(override_usage = "oxiblog drafts delete <id>")]
    Delete(IdOptions),

    /// Move a draft into the published posts.
    #[command(override_usage = "oxiblog drafts publish <id>")]
    Publish(IdOptions),
}

#[derive(Parser, Clone, Debug)]
struct IdOptions {
    /// 1-based id from the listing.
    #[arg(value_name = "id")]
    pub id: usize,
}

#[derive(Parser, Clone, Debug)]
struct EditOptions {
    /// 1-based id from the listing.
    #[arg(value_name = "id")]
    pub id: usize,

    /// Edit the raw post document, metadata included.
    #[arg(short, long)]
    pub meta: bool,
}

fn main() {
    let layer = fmt::layer().compact().with_target(false).without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn run_init() -> Result<()> {
    let mut ctx = BootstrapContext::try_default()?;
    let mut tree = bootstrap::bootstrap_tree()?;
    tree.execute(&mut ctx)?;

    Ok(())
}

fn run_publish() -> Result<()> {
    let mut ctx = BootstrapContext::try_default()?;
    if let Err(error) = bootstrap::rebuild(&mut ctx) {
        // The direct rebuild assumes a healthy blog home. If the home turns
        // out not to be healthy, walk the whole bootstrap tree instead.
        warn!("direct rebuild failed: {error}");
        let mut ctx = BootstrapContext::try_default()?;
        let mut tree = bootstrap::bootstrap_tree()?;
        tree.execute(&mut ctx)?;
    }

    Ok(())
}

fn run_config(command: ConfigCommand) -> Result<()> {
    let layout = Layout::try_default()?;
    let manifest_path = layout.manifest_path();

    match command {
        ConfigCommand::Show => {
            let manifest = Manifest::load(&manifest_path)?;
            print!("{manifest}");
        }
        ConfigCommand::AppPaths(opts) => {
            let mut manifest = Manifest::load(&manifest_path)?;
            let mut changed = false;
            for app_path in opts.add {
                changed |= manifest.add_app_path(app_path);
            }
            for app_path in opts.remove {
                changed |= manifest.remove_app_path(app_path);
            }

            if changed {
                manifest.persist(&manifest_path)?;
                info!("wrote manifest to {}", manifest_path.display());
                info!("run 'oxiblog publish' to bake the new paths into a binary");
            }
            for app_path in &manifest.app_paths {
                println!("{app_path}");
            }
        }
    }

    Ok(())
}

fn run_posts(command: PostsCommand) -> Result<()> {
    match command {
        PostsCommand::List => list_entries(&embedded_entries()?),
        PostsCommand::View(opts) => {
            let entries = embedded_entries()?;
            if opts.id == 0 || opts.id > entries.len() {
                bail!("no published post with id {}", opts.id);
            }
            print_post(&entries[opts.id - 1].post);
        }
        PostsCommand::Draft(opts) => {
            // Unpublishing edits the checkout; the copy baked into this
            // binary stays until the next publish.
            let layout = Layout::try_default()?;
            let posts = PostStore::new(layout.posts_dir());
            let entry = posts.entry(opts.id)?;
            let to = posts.move_into(&entry, &PostStore::new(layout.drafts_dir()))?;
            info!("moved {:?} back to drafts at {}", entry.post.title, to.display());
            info!("run 'oxiblog publish' to rebuild without it");
        }
    }

    Ok(())
}

fn run_drafts(command: DraftsCommand) -> Result<()> {
    let layout = Layout::try_default()?;
    let drafts = PostStore::new(layout.drafts_dir());

    match command {
        DraftsCommand::List => list_entries(&drafts.entries()?),
        DraftsCommand::New => {
            let title = Text::new("title").prompt()?;
            let summary = Text::new("summary").prompt()?;
            let hero = Text::new("hero image")
                .with_help_message("path served for the post's hero image, blank for none")
                .prompt()?;
            let markdown = markdown_in_editor("")?;
            let post = Post {
                title,
                summary,
                hero,
                date: Utc::now(),
                markdown,
            };
            finish_draft(&drafts, &layout, post)?;
        }
        DraftsCommand::Edit(opts) if opts.meta => {
            let entry = drafts.entry(opts.id)?;
            open_editor(&drafts.dir().join(&entry.file_name))?;
        }
        DraftsCommand::Edit(opts) => {
            let entry = drafts.entry(opts.id)?;
            let mut post = entry.post.clone();
            post.markdown = markdown_in_editor(&post.markdown)?;
            post.date = Utc::now();
            drafts.remove(&entry)?;
            finish_draft(&drafts, &layout, post)?;
        }
        DraftsCommand::View(opts) => print_post(&drafts.entry(opts.id)?.post),
        DraftsCommand::Delete(opts) => {
            let entry = drafts.entry(opts.id)?;
            drafts.remove(&entry)?;
            info!("deleted draft {:?}", entry.post.title);
        }
        DraftsCommand::Publish(opts) => {
            let entry = drafts.entry(opts.id)?;
            let to = drafts.move_into(&entry, &PostStore::new(layout.posts_dir()))?;
            info!("published {:?} to {}", entry.post.title, to.display());
            info!("run 'oxiblog publish' to bake it into a new binary");
        }
    }

    Ok(())
}

/// Ask whether to publish right away, then save to the right store.
fn finish_draft(drafts: &PostStore, layout: &Layout, post: Post) -> Result<()> {
    let publish = Confirm::new("publish this post now?")
        .with_default(false)
        .prompt()?;
    let store = if publish {
        PostStore::new(layout.posts_dir())
    } else {
        drafts.clone()
    };

    let path = match store.save(&post) {
        Ok(path) => path,
        Err(error) => {
            // Dump the markdown so a failed save does not eat the work.
            eprintln!("----MARKDOWN BEGIN----");
            eprintln!("{}", post.markdown);
            eprintln!("----MARKDOWN END----");
            return Err(error.into());
        }
    };

    info!("wrote {:?} to {}", post.title, path.display());
    if publish {
        info!("run 'oxiblog publish' to bake it into a new binary");
    }

    Ok(())
}

/// Collect a markdown body by bouncing a scratch file off $EDITOR.
fn markdown_in_editor(seed: &str) -> Result<String> {
    let scratch = env::temp_dir().join("oxiblog-draft.md");
    fs::write(&scratch, seed).context("failed to seed scratch markdown file")?;
    open_editor(&scratch)?;
    let markdown =
        fs::read_to_string(&scratch).context("failed to read scratch markdown file back")?;
    let _ = fs::remove_file(&scratch);

    Ok(markdown)
}

fn open_editor(path: &Path) -> Result<()> {
    let editor = env::var("EDITOR").context("set your EDITOR environment variable")?;
    let status = Editor::new(&editor)
        .arg(path)
        .status()
        .with_context(|| format!("failed to start editor {editor:?}"))?;
    if !status.success() {
        bail!("editor {editor:?} exited with {status}");
    }

    Ok(())
}

fn list_entries(entries: &[Entry]) {
    if entries.is_empty() {
        println!("nothing here yet");
        return;
    }

    println!("{:<4} {:<12} {:<28} SUMMARY", "ID", "DATE", "TITLE");
    for (position, entry) in entries.iter().enumerate() {
        println!(
            "{:<4} {:<12} {:<28} {}",
            position + 1,
            entry.post.date.format("%Y-%b-%d"),
            entry.post.title,
            entry.post.summary
        );
    }
}

fn print_post(post: &Post) {
    println!("{} ({})", post.title, post.date.format("%Y-%b-%d"));
    if !post.summary.is_empty() {
        println!("{}", post.summary);
    }
    println!();
    println!("{}", post.markdown);
}
