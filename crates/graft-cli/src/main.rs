//! graft: inspect a mount layout through the connector.
//!
//! Usage:
//!   graft tree --config layout.ron
//!   graft check --config layout.ron
//!
//! `tree` builds the layout, looks up every entry the way the kernel would
//! while listing directories, and prints the resulting inode tree and mount
//! table. `check` does the same with the structural self-check enabled,
//! then returns every reference and unmounts everything, and fails unless
//! the connector ends up holding only the root.

mod config;
mod walk;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use clap::{Parser, Subcommand};

use graft_connector::RecordingNotifier;

use crate::config::GraftConfig;

/// Inspect graft mount layouts.
#[derive(Parser, Debug)]
#[command(name = "graft")]
#[command(about = "Build a graft mount layout and walk it through the connector")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the inode tree and mount table
    Tree {
        /// RON layout file
        #[arg(short, long)]
        config: PathBuf,

        /// Stop descending below this many levels
        #[arg(long)]
        depth: Option<usize>,
    },
    /// Walk, release and unmount, verifying the tree at every step
    Check {
        /// RON layout file
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    graft_telemetry::init(graft_telemetry::DEFAULT_FILTER);

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Tree { config, depth } => tree(&config, depth),
        Command::Check { config } => check(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load(path: &Path) -> Result<GraftConfig> {
    GraftConfig::load(path).with_context(|| format!("loading {}", path.display()))
}

fn tree(path: &Path, depth: Option<usize>) -> Result<()> {
    let layout = load(path)?.build()?;
    let conn = &layout.connector;
    let visits = walk::walk(conn, depth)?;

    print!("{}", walk::render(conn, &visits));
    println!();
    println!("{:<8} {:<20} {:<12} {:>6} {:>6}", "MOUNT", "NODE", "BACKEND", "INODES", "OPEN");
    for info in conn.list_mounts() {
        println!(
            "{:<8} {:<20} {:<12} {:>6} {:>6}",
            info.id.to_string(),
            info.mount_inode.to_string(),
            info.backend,
            info.inodes,
            info.open_files
        );
    }
    println!("{} live inodes", conn.inode_count());
    Ok(())
}

fn check(path: &Path) -> Result<()> {
    let mut config = load(path)?;
    config.connector.verify_tree = true;
    let layout = config.build()?;
    let conn = &layout.connector;
    let notifier = Arc::new(RecordingNotifier::new());
    conn.init(notifier.clone());

    let visits = walk::walk(conn, None)?;
    conn.check_tree()?;
    let walked = conn.inode_count();

    walk::forget(conn, &visits)?;
    layout.teardown()?;

    ensure!(
        conn.inode_count() == 1,
        "{} inodes left after teardown",
        conn.inode_count()
    );
    ensure!(
        conn.list_mounts().len() == 1,
        "{} mounts left after teardown",
        conn.list_mounts().len()
    );
    ensure!(
        notifier.len() == layout.mounted.len(),
        "expected one invalidation per unmount, got {}",
        notifier.len()
    );
    println!(
        "ok: {} entries walked, {walked} inodes at peak, {} mounts",
        visits.len(),
        layout.mounted.len()
    );
    Ok(())
}
