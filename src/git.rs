use anyhow::{bail, Context, Result};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};


/// Label prefix for files git does not track yet.
pub const UNTRACKED_PREFIX: &str = "[UNTRACKED] ";

/// Everything the session needs from version control.
///
/// Paths are repository-relative, `/`-separated, exactly as git prints them.
pub trait Repository: Send + Sync {
    /// Paths modified in the working tree but not in the index.
    fn unstaged_paths(&self) -> Result<Vec<String>>;
    /// Paths whose index entry differs from the last commit.
    fn staged_paths(&self) -> Result<Vec<String>>;
    fn untracked_paths(&self) -> Result<Vec<String>>;
    fn stage(&self, paths: &BTreeSet<String>) -> Result<()>;
    fn unstage(&self, path: &str) -> Result<()>;
    /// Unified diff of the working tree against the last commit for one path.
    fn diff(&self, path: &str) -> Result<String>;
    /// Newest first.
    fn recent_commit_messages(&self, limit: usize) -> Result<Vec<String>>;
    fn commit(&self, message: &str) -> Result<()>;
    fn pull(&self) -> Result<()>;
    fn push(&self) -> Result<()>;
    /// `None` when HEAD is detached.
    fn active_branch_name(&self) -> Result<Option<String>>;
}

/// One row of the file list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub label: String,
    pub path: String,
    pub already_staged: bool,
}

impl FileEntry {
    pub fn is_untracked(&self) -> bool {
        self.label.starts_with(UNTRACKED_PREFIX)
    }
}

/// Build the file list: modified files (unstaged first, then staged-only) sorted by
/// label, followed by untracked files in the order git reports them.
pub fn list_files(repo: &dyn Repository) -> Result<Vec<FileEntry>> {
    let unstaged = repo.unstaged_paths()?;
    let staged = repo.staged_paths()?;
    let untracked = repo.untracked_paths()?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut tracked = Vec::new();

    for path in unstaged {
        if seen.insert(path.clone()) {
            tracked.push(FileEntry {
                label: path.clone(),
                path,
                already_staged: false,
            });
        }
    }
    for path in staged {
        if seen.insert(path.clone()) {
            tracked.push(FileEntry {
                label: path.clone(),
                path,
                already_staged: true,
            });
        }
    }
    tracked.sort_by(|a, b| a.label.cmp(&b.label));

    for path in untracked {
        if seen.insert(path.clone()) {
            tracked.push(FileEntry {
                label: format!("{UNTRACKED_PREFIX}{path}"),
                path,
                already_staged: false,
            });
        }
    }

    Ok(tracked)
}

pub fn is_repo(root: &Path) -> bool {
    Command::new("git")
        .current_dir(root)
        .arg("rev-parse")
        .arg("--is-inside-work-tree")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// [`Repository`] backed by the `git` binary, run inside `root`.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !is_repo(&root) {
            bail!("Not a git repository (or git is not installed).");
        }
        Ok(Self { root })
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.root);
        // Never let git block the UI waiting on a credential prompt.
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd
    }

    fn run_git(&self, args: &[&str]) -> Result<Output> {
        tracing::debug!(args = %args.join(" "), "running git");
        self.command()
            .args(args)
            .output()
            .with_context(|| format!("Failed to run git {}", args.join(" ")))
    }

    fn run_git_checked(&self, args: &[&str]) -> Result<String> {
        let output = self.run_git(args)?;
        if !output.status.success() {
            bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        String::from_utf8(output.stdout)
            .with_context(|| format!("git {} output was not valid UTF-8", args.join(" ")))
    }

    fn run_git_paths(&self, args: &[&str]) -> Result<Vec<String>> {
        let text = self.run_git_checked(args)?;
        Ok(split_nul(&text))
    }

    fn has_head(&self) -> bool {
        self.run_git(&["rev-parse", "--verify", "-q", "HEAD"])
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn has_upstream(&self) -> bool {
        self.run_git(&["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"])
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl Repository for GitCli {
    fn unstaged_paths(&self) -> Result<Vec<String>> {
        self.run_git_paths(&["diff", "--name-only", "-z"])
    }

    fn staged_paths(&self) -> Result<Vec<String>> {
        // Without HEAD, `--cached` compares against the empty tree.
        self.run_git_paths(&["diff", "--cached", "--name-only", "-z"])
    }

    fn untracked_paths(&self) -> Result<Vec<String>> {
        self.run_git_paths(&["ls-files", "--others", "--exclude-standard", "-z"])
    }

    fn stage(&self, paths: &BTreeSet<String>) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run_git_checked(&args)?;
        Ok(())
    }

    fn unstage(&self, path: &str) -> Result<()> {
        if !self.has_head() {
            self.run_git_checked(&["rm", "--cached", "-q", "--", path])?;
            return Ok(());
        }

        // Prefer `git restore --staged`, fallback to `git reset`.
        let output = self.run_git(&["restore", "--staged", "--", path]);
        match output {
            Ok(o) if o.status.success() => Ok(()),
            Ok(_) | Err(_) => {
                self.run_git_checked(&["reset", "-q", "HEAD", "--", path])?;
                Ok(())
            }
        }
    }

    fn diff(&self, path: &str) -> Result<String> {
        if !self.has_head() {
            return self.run_git_checked(&["diff", "--cached", "--", path]);
        }
        self.run_git_checked(&["diff", "HEAD", "--", path])
    }

    fn recent_commit_messages(&self, limit: usize) -> Result<Vec<String>> {
        if !self.has_head() {
            return Ok(Vec::new());
        }
        let count = limit.to_string();
        let text = self.run_git_checked(&["log", "-n", &count, "--format=%B%x00"])?;
        Ok(text
            .split('\0')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn commit(&self, message: &str) -> Result<()> {
        // Use a temp file + `git commit -F` to reliably preserve multi-line messages.
        let mut path: PathBuf = std::env::temp_dir();
        let unique = format!(
            "lazrgit-commit-{}-{}.txt",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis()
        );
        path.push(unique);

        fs::write(&path, message).with_context(|| {
            format!(
                "Failed to write temp commit message file: {}",
                path.display()
            )
        })?;

        let output = self
            .command()
            .arg("commit")
            .arg("--cleanup=whitespace")
            .arg("-F")
            .arg(&path)
            .output()
            .context("Failed to execute git commit");

        // Best-effort cleanup (ignore errors)
        let _ = fs::remove_file(&path);

        let output = output?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() {
                stdout
            } else {
                stderr
            };
            bail!("git commit failed: {}", detail.trim());
        }

        Ok(())
    }

    fn pull(&self) -> Result<()> {
        if !self.has_upstream() {
            tracing::info!("no upstream configured, skipping pull");
            return Ok(());
        }
        self.run_git_checked(&["pull", "--no-edit"])?;
        Ok(())
    }

    fn push(&self) -> Result<()> {
        // If upstream exists, `git push` is enough. Otherwise set upstream.
        if self.has_upstream() {
            self.run_git_checked(&["push"])?;
            return Ok(());
        }

        let Some(branch) = self.active_branch_name()? else {
            bail!("Cannot push: HEAD is detached.");
        };
        self.run_git_checked(&["push", "-u", "origin", &branch])?;
        Ok(())
    }

    fn active_branch_name(&self) -> Result<Option<String>> {
        let output = self.run_git(&["symbolic-ref", "--short", "-q", "HEAD"])?;
        if !output.status.success() {
            return Ok(None);
        }
        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!name.is_empty()).then_some(name))
    }
}

fn split_nul(text: &str) -> Vec<String> {
    text.split('\0')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
