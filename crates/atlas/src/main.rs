//! Command-line driver for repository maintenance.
//!
//! Operates on a repository directory laid out like the `Library://` tree
//! and runs the reference-preserving move/copy workflows against it.

mod fs_store;
mod progress;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use atlas_core::orchestrate::{
    copy_folder_with_references, move_folder_with_references, move_resource_with_references,
    BatchOutcome, CancelFlag, WorkStatus,
};
use atlas_core::resource_id;
use atlas_core::store::ResourceStore;

use fs_store::FsStore;
use progress::ConsoleProgress;

#[derive(Parser)]
#[command(name = "atlas", version, about = "Maintain a repository of geospatial resource documents")]
struct Cli {
    /// Repository root directory
    #[arg(long, env = "ATLAS_REPO", default_value = ".")]
    repo: PathBuf,

    /// Print outcome lists as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Move a resource or folder and update every referencing resource
    Mv {
        /// Current identifier, e.g. Library://Data/Roads.FeatureSource or Library://Data/
        old: String,
        /// Target identifier
        new: String,
    },
    /// Copy a resource, or copy a folder and repoint the copies at each other
    Cp {
        old: String,
        new: String,
    },
    /// List resources under a folder
    Ls {
        #[arg(default_value = "Library://")]
        folder: String,
    },
    /// Show the resources that reference the given identifier
    Refs { id: String },
    /// Check an identifier against the grammar
    Validate { id: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = FsStore::new(&cli.repo)
        .with_context(|| format!("cannot open repository at {}", cli.repo.display()))?;

    match cli.command {
        Command::Mv { old, new } => run_move(&store, &old, &new, cli.json),
        Command::Cp { old, new } => run_copy(&store, &old, &new, cli.json),
        Command::Ls { folder } => run_list(&store, &folder),
        Command::Refs { id } => run_refs(&store, &id),
        Command::Validate { id } => run_validate(&id),
    }
}

fn run_move(store: &FsStore, old: &str, new: &str, json: bool) -> Result<()> {
    let cancel = CancelFlag::new();
    let mut sink = ConsoleProgress::default();

    let outcome = if resource_id::is_folder(old) || resource_id::is_folder(new) {
        move_folder_with_references(store, old, new, &mut sink, &cancel)?
    } else {
        move_resource_with_references(store, old, new, &mut sink, &cancel)?
    };

    render_outcome("move", &outcome, json)
}

fn run_copy(store: &FsStore, old: &str, new: &str, json: bool) -> Result<()> {
    if resource_id::is_folder(old) || resource_id::is_folder(new) {
        let cancel = CancelFlag::new();
        let mut sink = ConsoleProgress::default();
        let outcome = copy_folder_with_references(store, old, new, &mut sink, &cancel)?;
        return render_outcome("copy", &outcome, json);
    }

    // A single document's copy keeps its references; nothing to rewrite.
    store.copy_resource(old, new, false)?;
    println!("{} {} -> {}", "copied".green(), old, new);
    Ok(())
}

fn run_list(store: &FsStore, folder: &str) -> Result<()> {
    for entry in store.list_resources(folder)? {
        if entry.is_folder {
            println!("{}", entry.path.blue());
        } else {
            println!("{}", entry.path);
        }
    }
    Ok(())
}

fn run_refs(store: &FsStore, id: &str) -> Result<()> {
    let owners = store.enumerate_references(id)?;
    if owners.is_empty() {
        println!("no resources reference {id}");
        return Ok(());
    }
    for owner in owners {
        println!("{owner}");
    }
    Ok(())
}

fn run_validate(id: &str) -> Result<()> {
    resource_id::validate(id)?;
    let shape = if resource_id::is_folder(id) {
        "folder"
    } else {
        "document"
    };
    let root = if resource_id::is_session(id) {
        "session"
    } else {
        "library"
    };
    println!("{} {shape} in the {root} repository", "valid".green());
    Ok(())
}

fn render_outcome(operation: &str, outcome: &BatchOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        for item in &outcome.items {
            match &item.status {
                WorkStatus::Success => println!("{} {}", "updated".green(), item.path),
                WorkStatus::Failure(message) => {
                    println!("{} {}: {}", "failed".red(), item.path, message)
                }
                WorkStatus::Pending => println!("{} {}", "skipped".yellow(), item.path),
            }
        }
    }

    let failed = outcome.failures().count();
    if outcome.cancelled {
        bail!("{operation} cancelled before all references were updated");
    }
    if failed > 0 {
        bail!(
            "{operation} finished, but {failed} of {} reference updates failed",
            outcome.items.len()
        );
    }
    if !json {
        println!(
            "{} {} reference update(s) applied",
            "done:".green(),
            outcome.items.len()
        );
    }
    Ok(())
}
