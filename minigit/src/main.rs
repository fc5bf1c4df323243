mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use minigit_core::{
    CheckoutOutcome, CommitOutcome, Error, Head, LogEntry, MergeOutcome, Repository, Status,
    StatusReport,
};
use output::OutputWriter;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;

/// minigit - a miniature version-control system
#[derive(Parser)]
#[command(name = "minigit")]
#[command(about = "Miniature version control over a content-addressed object store", long_about = None)]
#[command(version)]
struct Cli {
    /// Emit machine-readable JSON where supported
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new repository in the current directory
    Init,

    /// Add file contents to the staging area
    Add {
        /// Paths to stage
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Mark files for removal in the next commit
    Rm {
        /// Paths to remove
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Record the staged changes as a new commit
    Commit {
        /// Commit message
        #[arg(short = 'm', long = "message")]
        message: Option<String>,
    },

    /// Show the first-parent commit history from HEAD
    Log,

    /// Create a branch at HEAD, or delete one with -d
    Branch {
        /// Branch name
        name: String,

        /// Delete the branch instead of creating it
        #[arg(short = 'd', long = "delete")]
        delete: bool,
    },

    /// List branches, marking the active one
    LsBranches,

    /// Switch to a branch or commit
    Checkout {
        /// Branch name or commit hash
        target: String,
    },

    /// Show the working tree status
    Status,

    /// Merge a branch into the current branch
    Merge {
        /// Branch to merge
        branch: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    let writer = OutputWriter::new(cli.json);

    match cli.command {
        Commands::Init => cmd_init(&cwd),
        Commands::Add { paths } => cmd_add(&cwd, paths),
        Commands::Rm { paths } => cmd_rm(&cwd, paths),
        Commands::Commit { message } => cmd_commit(&cwd, message),
        Commands::Log => cmd_log(&cwd, &writer),
        Commands::Branch { name, delete } => cmd_branch(&cwd, &name, delete),
        Commands::LsBranches => cmd_ls_branches(&cwd),
        Commands::Checkout { target } => cmd_checkout(&cwd, &target),
        Commands::Status => cmd_status(&cwd, &writer),
        Commands::Merge { branch } => cmd_merge(&cwd, &branch),
    }
}

/// Author for new commits: MINIGIT_AUTHOR env var, defaulting to Anonymous.
fn author() -> String {
    std::env::var("MINIGIT_AUTHOR").unwrap_or_else(|_| "Anonymous".to_string())
}

/// Map a command-line path (relative to the process cwd) onto the
/// repository's root-relative forward-slash form.
fn rel_to_root(repo: &Repository, cwd: &Path, path: &Path) -> Result<String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };

    // Lexical normalization; the target may legitimately not exist (rm).
    let mut parts: Vec<std::ffi::OsString> = Vec::new();
    let mut prefix = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    anyhow::bail!("path escapes the filesystem root: {}", path.display());
                }
            }
            Component::Normal(part) => parts.push(part.to_os_string()),
            other => prefix.push(other.as_os_str()),
        }
    }
    let mut normalized = prefix;
    for part in &parts {
        normalized.push(part);
    }

    let rel = normalized.strip_prefix(repo.working_dir()).map_err(|_| {
        anyhow::anyhow!(
            "path is outside the repository: {}",
            path.display()
        )
    })?;

    let mut out = Vec::new();
    for component in rel.components() {
        let part = component
            .as_os_str()
            .to_str()
            .with_context(|| format!("non-UTF-8 path: {}", path.display()))?;
        out.push(part);
    }
    if out.is_empty() {
        anyhow::bail!("not a file path: {}", path.display());
    }
    Ok(out.join("/"))
}

fn open_repo(cwd: &Path) -> Result<Repository> {
    Ok(Repository::open(cwd)?)
}

fn cmd_init(cwd: &Path) -> Result<()> {
    let (repo, created) = Repository::init(cwd)?;
    let metadata = repo.working_dir().join(minigit_core::METADATA_DIR);
    if created {
        println!("Initialized empty minigit repository in {}", metadata.display());
    } else {
        println!("minigit repository already initialized in {}", metadata.display());
    }
    Ok(())
}

fn cmd_add(cwd: &Path, paths: Vec<PathBuf>) -> Result<()> {
    let repo = open_repo(cwd)?;

    let mut rel_paths = Vec::new();
    for path in &paths {
        rel_paths.push(rel_to_root(&repo, cwd, path)?);
    }
    repo.add(&rel_paths)?;

    for rel in &rel_paths {
        println!("Added {}", rel);
    }
    Ok(())
}

fn cmd_rm(cwd: &Path, paths: Vec<PathBuf>) -> Result<()> {
    let repo = open_repo(cwd)?;

    let mut rel_paths = Vec::new();
    for path in &paths {
        rel_paths.push(rel_to_root(&repo, cwd, path)?);
    }
    repo.remove(&rel_paths)?;

    for rel in &rel_paths {
        println!("Removed {}", rel);
    }
    Ok(())
}

fn cmd_commit(cwd: &Path, message: Option<String>) -> Result<()> {
    let Some(message) = message else {
        anyhow::bail!("commit requires a message: minigit commit -m \"<message>\"");
    };

    let repo = open_repo(cwd)?;
    match repo.commit(&message, &author())? {
        CommitOutcome::Created {
            hash,
            branch,
            files,
        } => {
            match branch {
                Some(branch) => println!("[{} {}] {}", branch, hash.short(), message),
                None => println!("[HEAD detached at {}] {}", hash.short(), message),
            }
            println!("{} file(s) committed.", files);
        }
        CommitOutcome::NothingToCommit => {
            println!("Nothing to commit, working tree clean.");
        }
    }
    Ok(())
}

fn cmd_log(cwd: &Path, writer: &OutputWriter) -> Result<()> {
    let repo = open_repo(cwd)?;
    let entries = repo.log()?;

    writer.write(&entries, || render_log(&entries))
}

fn render_log(entries: &[LogEntry]) -> String {
    if entries.is_empty() {
        return "No commits yet.\n".to_string();
    }

    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!("commit {}\n", entry.hash));
        out.push_str(&format!("Author: {}\n", entry.author));
        out.push_str(&format!("Date:   {}\n", entry.timestamp));
        if entry.parents.len() > 1 {
            let parents: Vec<String> = entry.parents.iter().map(|p| p.short()).collect();
            out.push_str(&format!("Merge:  {}\n", parents.join(" ")));
        }
        out.push_str(&format!("\n    {}\n\n", entry.message));
    }
    out
}

fn cmd_branch(cwd: &Path, name: &str, delete: bool) -> Result<()> {
    let repo = open_repo(cwd)?;

    if delete {
        repo.delete_branch(name)?;
        println!("Deleted branch '{}'.", name);
    } else {
        let hash = repo.create_branch(name)?;
        println!("Branch '{}' created pointing to {}", name, hash.short());
    }
    Ok(())
}

fn cmd_ls_branches(cwd: &Path) -> Result<()> {
    let repo = open_repo(cwd)?;
    let branches = repo.refs().list_branches()?;
    let head = repo.refs().read_head()?;

    let active = match &head {
        Head::Attached { branch } => Some(branch.as_str()),
        _ => None,
    };

    println!("Branches:");
    for (name, hash) in &branches {
        let marker = if Some(name.as_str()) == active {
            "* "
        } else {
            "  "
        };
        println!("{}{} ({})", marker, name, hash.short());
    }
    if let Head::Detached(hash) = head {
        println!("* (HEAD detached at {})", hash.short());
    }
    Ok(())
}

fn cmd_checkout(cwd: &Path, target: &str) -> Result<()> {
    let repo = open_repo(cwd)?;

    match repo.checkout(target)? {
        CheckoutOutcome::Branch { name, .. } => {
            println!("Switched to branch '{}'", name);
        }
        CheckoutOutcome::Detached { hash } => {
            println!("Note: switching to '{}'.", hash.short());
            println!("You are in 'detached HEAD' state.");
        }
    }
    Ok(())
}

/// Serializable status payload for --json.
#[derive(Serialize)]
struct StatusOutput<'a> {
    branch: Option<&'a str>,
    detached: Option<String>,
    report: &'a StatusReport,
}

fn cmd_status(cwd: &Path, writer: &OutputWriter) -> Result<()> {
    let repo = open_repo(cwd)?;
    let status = repo.status()?;

    let payload = StatusOutput {
        branch: match &status.head {
            Head::Attached { branch } => Some(branch.as_str()),
            _ => None,
        },
        detached: match &status.head {
            Head::Detached(hash) => Some(hash.to_hex()),
            _ => None,
        },
        report: &status.report,
    };

    writer.write(&payload, || render_status(&status))
}

fn render_status(status: &Status) -> String {
    let mut out = String::new();

    match &status.head {
        Head::Attached { branch } => out.push_str(&format!("On branch {}\n", branch)),
        Head::Detached(hash) => {
            out.push_str(&format!("HEAD detached at {}\n", hash.short()))
        }
        Head::Unborn => out.push_str("No branch\n"),
    }

    let report = &status.report;

    out.push_str("\nChanges to be committed:\n");
    let staged_empty = report.staged_new.is_empty()
        && report.staged_modified.is_empty()
        && report.staged_deleted.is_empty();
    if staged_empty {
        out.push_str("  (no changes staged for commit)\n");
    } else {
        for path in &report.staged_new {
            out.push_str(&format!("\tnew file: {}\n", path));
        }
        for path in &report.staged_modified {
            out.push_str(&format!("\tmodified: {}\n", path));
        }
        for path in &report.staged_deleted {
            out.push_str(&format!("\tdeleted:  {}\n", path));
        }
    }

    out.push_str("\nChanges not staged for commit:\n");
    let unstaged_empty = report.unstaged_modified.is_empty()
        && report.unstaged_deleted.is_empty()
        && report.index_stale.is_empty();
    if unstaged_empty {
        out.push_str("  (no changes not staged for commit)\n");
    } else {
        for path in &report.unstaged_modified {
            out.push_str(&format!("\tmodified: {}\n", path));
        }
        for path in &report.index_stale {
            out.push_str(&format!("\tmodified: {}\n", path));
        }
        for path in &report.unstaged_deleted {
            out.push_str(&format!("\tdeleted:  {}\n", path));
        }
    }

    out.push_str("\nUntracked files:\n");
    if report.untracked.is_empty() {
        out.push_str("  (none)\n");
    } else {
        for path in &report.untracked {
            out.push_str(&format!("\t{}\n", path));
        }
    }

    out
}

fn cmd_merge(cwd: &Path, branch: &str) -> Result<()> {
    let repo = open_repo(cwd)?;

    match repo.merge(branch, &author()) {
        Ok(MergeOutcome::AlreadyUpToDate) => {
            println!("Already up-to-date.");
            Ok(())
        }
        Ok(MergeOutcome::FastForward { branch, to }) => {
            println!("Fast-forward");
            println!("Updated branch '{}' to {}.", branch, to.short());
            Ok(())
        }
        Ok(MergeOutcome::Merged { commit, .. }) => {
            println!("Merge complete. Created merge commit {}", commit.short());
            Ok(())
        }
        Err(Error::MergeConflict { paths }) => {
            for path in &paths {
                eprintln!("CONFLICT (content): Merge conflict in {}", path);
            }
            anyhow::bail!("Automatic merge failed; fix conflicts and then commit the result.")
        }
        Err(err) => Err(err.into()),
    }
}
