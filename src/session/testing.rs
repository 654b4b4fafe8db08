//! In-memory gateways for driving a [`Session`] without a terminal or a repository.

use anyhow::{anyhow, bail, Result};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use super::{Event, Gateways, Job, Session};
use crate::generator::MessageDrafter;
use crate::git::Repository;
use crate::tickets::{Ticket, TicketSource};

pub fn paths(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    UnstagedPaths,
    StagedPaths,
    UntrackedPaths,
    Stage(BTreeSet<String>),
    Unstage(String),
    Diff(String),
    RecentMessages(usize),
    Commit(String),
    Pull,
    Push,
    ActiveBranch,
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::Stage(_) | Call::Unstage(_) | Call::Commit(_) | Call::Pull | Call::Push
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoSnapshot {
    pub staged: BTreeSet<String>,
    pub unstaged: BTreeSet<String>,
    pub untracked: BTreeSet<String>,
    pub commits: Vec<String>,
}

#[derive(Debug, Default)]
struct RepoState {
    snapshot: RepoSnapshot,
    /// Paths that were untracked before being staged.
    new_files: BTreeSet<String>,
    history: Vec<String>,
    branch: Option<String>,
    diffs: HashMap<String, String>,
    fail_unstage: Option<String>,
    panic_stage: bool,
    fail_diff: bool,
    fail_commit: bool,
    fail_push: bool,
    calls: Vec<Call>,
}

/// Models the index as three disjoint path sets and records every call.
#[derive(Debug)]
pub struct FakeRepository {
    state: Mutex<RepoState>,
}

impl FakeRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RepoState {
                branch: Some("main".to_string()),
                ..RepoState::default()
            }),
        }
    }

    fn edit(self, f: impl FnOnce(&mut RepoState)) -> Self {
        f(&mut *self.state.lock().unwrap());
        self
    }

    pub fn with_unstaged(self, items: &[&str]) -> Self {
        self.edit(|s| s.snapshot.unstaged.extend(paths(items)))
    }

    pub fn with_staged(self, items: &[&str]) -> Self {
        self.edit(|s| s.snapshot.staged.extend(paths(items)))
    }

    pub fn with_untracked(self, items: &[&str]) -> Self {
        self.edit(|s| s.snapshot.untracked.extend(paths(items)))
    }

    pub fn with_history(self, messages: &[&str]) -> Self {
        self.edit(|s| s.history = messages.iter().map(|m| m.to_string()).collect())
    }

    pub fn with_diff(self, path: &str, diff: &str) -> Self {
        self.edit(|s| {
            s.diffs.insert(path.to_string(), diff.to_string());
        })
    }

    pub fn failing_unstage(self, path: &str) -> Self {
        self.edit(|s| s.fail_unstage = Some(path.to_string()))
    }

    pub fn panicking_stage(self) -> Self {
        self.edit(|s| s.panic_stage = true)
    }

    pub fn failing_diff(self) -> Self {
        self.edit(|s| s.fail_diff = true)
    }

    pub fn failing_commit(self) -> Self {
        self.edit(|s| s.fail_commit = true)
    }

    pub fn failing_push(self) -> Self {
        self.edit(|s| s.fail_push = true)
    }

    pub fn staged(&self) -> BTreeSet<String> {
        self.state.lock().unwrap().snapshot.staged.clone()
    }

    pub fn untracked(&self) -> BTreeSet<String> {
        self.state.lock().unwrap().snapshot.untracked.clone()
    }

    pub fn snapshot(&self) -> RepoSnapshot {
        self.state.lock().unwrap().snapshot.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    fn record(&self, call: Call) -> std::sync::MutexGuard<'_, RepoState> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }
}

impl Repository for FakeRepository {
    fn unstaged_paths(&self) -> Result<Vec<String>> {
        let state = self.record(Call::UnstagedPaths);
        Ok(state.snapshot.unstaged.iter().cloned().collect())
    }

    fn staged_paths(&self) -> Result<Vec<String>> {
        let state = self.record(Call::StagedPaths);
        Ok(state.snapshot.staged.iter().cloned().collect())
    }

    fn untracked_paths(&self) -> Result<Vec<String>> {
        let state = self.record(Call::UntrackedPaths);
        Ok(state.snapshot.untracked.iter().cloned().collect())
    }

    fn stage(&self, items: &BTreeSet<String>) -> Result<()> {
        let mut state = self.record(Call::Stage(items.clone()));
        if state.panic_stage {
            // Release the lock first so later calls are not poisoned.
            drop(state);
            panic!("index is corrupt");
        }
        for path in items {
            if state.snapshot.untracked.remove(path) {
                state.new_files.insert(path.clone());
            }
            state.snapshot.unstaged.remove(path);
            state.snapshot.staged.insert(path.clone());
        }
        Ok(())
    }

    fn unstage(&self, path: &str) -> Result<()> {
        let mut state = self.record(Call::Unstage(path.to_string()));
        if state.fail_unstage.as_deref() == Some(path) {
            bail!("git restore --staged -- {path} failed");
        }
        if state.snapshot.staged.remove(path) {
            if state.new_files.remove(path) {
                state.snapshot.untracked.insert(path.to_string());
            } else {
                state.snapshot.unstaged.insert(path.to_string());
            }
        }
        Ok(())
    }

    fn diff(&self, path: &str) -> Result<String> {
        let state = self.record(Call::Diff(path.to_string()));
        if state.fail_diff {
            bail!("git diff HEAD -- {path} failed");
        }
        Ok(state
            .diffs
            .get(path)
            .cloned()
            .unwrap_or_else(|| format!("diff --git a/{path} b/{path}\n")))
    }

    fn recent_commit_messages(&self, limit: usize) -> Result<Vec<String>> {
        let state = self.record(Call::RecentMessages(limit));
        Ok(state.history.iter().take(limit).cloned().collect())
    }

    fn commit(&self, message: &str) -> Result<()> {
        let mut state = self.record(Call::Commit(message.to_string()));
        if state.fail_commit {
            bail!("git commit failed: hook rejected");
        }
        if state.snapshot.staged.is_empty() {
            bail!("git commit failed: nothing to commit");
        }
        state.snapshot.staged.clear();
        state.snapshot.commits.push(message.to_string());
        state.history.insert(0, message.to_string());
        Ok(())
    }

    fn pull(&self) -> Result<()> {
        self.record(Call::Pull);
        Ok(())
    }

    fn push(&self) -> Result<()> {
        let state = self.record(Call::Push);
        if state.fail_push {
            bail!("git push failed: rejected");
        }
        Ok(())
    }

    fn active_branch_name(&self) -> Result<Option<String>> {
        let state = self.record(Call::ActiveBranch);
        Ok(state.branch.clone())
    }
}

pub struct FakeTickets {
    result: Result<Vec<Ticket>, String>,
}

impl FakeTickets {
    pub fn with(tickets: &[(&str, &str)]) -> Self {
        Self {
            result: Ok(tickets
                .iter()
                .map(|(id, summary)| Ticket::new(*id, *summary))
                .collect()),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: Err("Jira API error (401): unauthorized".to_string()),
        }
    }
}

impl TicketSource for FakeTickets {
    fn fetch_open_tickets(&self) -> Result<Vec<Ticket>> {
        self.result.clone().map_err(|e| anyhow!(e))
    }
}

pub struct FakeDrafter {
    reply: Result<String, String>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl FakeDrafter {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: Err("OpenAI API error: quota exceeded".to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

impl MessageDrafter for FakeDrafter {
    fn draft(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));
        self.reply.clone().map_err(|e| anyhow!(e))
    }
}

/// A session wired to fakes, with jobs run inline in submission order.
pub struct Harness {
    pub session: Session,
    pub repo: Arc<FakeRepository>,
    pub drafter: Arc<FakeDrafter>,
    pub gateways: Gateways,
}

impl Harness {
    pub fn new(repo: FakeRepository, tickets: FakeTickets, drafter: FakeDrafter) -> Self {
        let repo = Arc::new(repo);
        let drafter = Arc::new(drafter);
        let gateways = Gateways {
            repo: repo.clone(),
            tickets: Arc::new(tickets),
            drafter: drafter.clone(),
        };
        Self {
            session: Session::new(),
            repo,
            drafter,
            gateways,
        }
    }

    /// Start the session and run its startup jobs.
    pub fn started(mut self) -> Self {
        let jobs = self.session.start();
        self.run(jobs);
        self
    }

    pub fn send(&mut self, event: Event) {
        let jobs = self.session.handle(event);
        self.run(jobs);
    }

    /// Handle an event but keep its jobs for the caller to run later.
    pub fn send_deferred(&mut self, event: Event) -> Vec<Job> {
        self.session.handle(event)
    }

    pub fn run(&mut self, jobs: Vec<Job>) {
        let mut queue: VecDeque<Job> = jobs.into();
        while let Some(job) = queue.pop_front() {
            let outcome = job.run(&self.gateways);
            queue.extend(self.session.apply(outcome));
        }
    }

    pub fn select(&mut self, items: &[&str]) {
        self.send(Event::SelectionChanged(paths(items)));
    }
}
