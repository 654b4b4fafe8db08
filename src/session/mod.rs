//! Headless interaction core.
//!
//! The terminal UI turns key presses into [`Event`]s. [`Session::handle`] updates the
//! view state and hands back [`Job`]s that need the gateways; whoever owns the worker
//! threads runs them ([`Job::run`]) and feeds each [`JobOutcome`] back through
//! [`Session::apply`], which may schedule follow-up jobs.
//!
//! Modules:
//! - `selection`: index reconciliation for the checked file set
//! - `tickets`: default ticket association and ticket-id prefixing
//! - `workflow`: commit confirmation state machine
//! - `prompt`: prompt assembly for message drafting

pub mod prompt;
pub mod selection;
pub mod tickets;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::generator::MessageDrafter;
use crate::git::{self, FileEntry, Repository};
use crate::tickets::{Ticket, TicketSource};

use prompt::{build_user_prompt, FileDiff, SYSTEM_PROMPT};
use selection::ReconcileReport;
use workflow::{CommitDecision, CommitPhase, CommitWorkflow};

const MAX_LOG_LINES: usize = 200;

/// The external collaborators, built once at startup and shared with the workers.
#[derive(Clone)]
pub struct Gateways {
    pub repo: Arc<dyn Repository>,
    pub tickets: Arc<dyn TicketSource>,
    pub drafter: Arc<dyn MessageDrafter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A user-visible message: short title plus detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, message)
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SelectionChanged(BTreeSet<String>),
    TicketListFocused,
    TicketChosen(String),
    MessageEdited(String),
    CommitRequested,
    CommitDecided(CommitDecision),
    DiffRequested(Option<String>),
    DiffClosed,
    GenerateRequested,
    Refresh,
    Quit,
}

/// Which worker a job runs on. Jobs on one lane run one at a time, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    Repository,
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    LoadFiles,
    FetchTickets,
    Reconcile { selected: BTreeSet<String> },
    RecentMessages { limit: usize },
    LoadDiff { path: String },
    CollectDiffs { paths: Vec<String>, message: String },
    Draft { user_prompt: String },
    Commit { message: String },
    PullPush,
}

#[derive(Debug)]
pub enum JobOutcome {
    FilesLoaded(Result<(Vec<FileEntry>, Option<String>)>),
    TicketsFetched(Result<Vec<Ticket>>),
    Reconciled(Result<ReconcileReport>),
    RecentMessages(Result<Vec<String>>),
    DiffLoaded { path: String, result: Result<String> },
    DiffsCollected { message: String, result: Result<Vec<FileDiff>> },
    Drafted(Result<String>),
    Committed(Result<()>),
    Pushed(Result<()>),
}

impl Job {
    pub fn lane(&self) -> Lane {
        match self {
            Job::FetchTickets | Job::Draft { .. } => Lane::Network,
            _ => Lane::Repository,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Job::LoadFiles => "Reading working tree…",
            Job::FetchTickets => "Fetching tickets…",
            Job::Reconcile { .. } => "Updating index…",
            Job::RecentMessages { .. } => "Reading recent commits…",
            Job::LoadDiff { .. } => "Loading diff…",
            Job::CollectDiffs { .. } => "Collecting diffs…",
            Job::Draft { .. } => "Drafting commit message…",
            Job::Commit { .. } => "Committing…",
            Job::PullPush => "Pulling and pushing…",
        }
    }

    /// The outcome this job reports when it could not run to completion.
    pub fn failed(self, err: anyhow::Error) -> JobOutcome {
        match self {
            Job::LoadFiles => JobOutcome::FilesLoaded(Err(err)),
            Job::FetchTickets => JobOutcome::TicketsFetched(Err(err)),
            Job::Reconcile { .. } => JobOutcome::Reconciled(Err(err)),
            Job::RecentMessages { .. } => JobOutcome::RecentMessages(Err(err)),
            Job::LoadDiff { path } => JobOutcome::DiffLoaded {
                path,
                result: Err(err),
            },
            Job::CollectDiffs { message, .. } => JobOutcome::DiffsCollected {
                message,
                result: Err(err),
            },
            Job::Draft { .. } => JobOutcome::Drafted(Err(err)),
            Job::Commit { .. } => JobOutcome::Committed(Err(err)),
            Job::PullPush => JobOutcome::Pushed(Err(err)),
        }
    }

    /// Perform the gateway I/O. Runs on a worker thread.
    pub fn run(self, gw: &Gateways) -> JobOutcome {
        match self {
            Job::LoadFiles => JobOutcome::FilesLoaded(load_files(gw.repo.as_ref())),
            Job::FetchTickets => JobOutcome::TicketsFetched(gw.tickets.fetch_open_tickets()),
            Job::Reconcile { selected } => {
                JobOutcome::Reconciled(selection::reconcile(gw.repo.as_ref(), &selected))
            }
            Job::RecentMessages { limit } => {
                JobOutcome::RecentMessages(gw.repo.recent_commit_messages(limit))
            }
            Job::LoadDiff { path } => {
                let result = gw.repo.diff(&path);
                JobOutcome::DiffLoaded { path, result }
            }
            Job::CollectDiffs { paths, message } => {
                let result = paths
                    .into_iter()
                    .map(|path| -> Result<FileDiff> {
                        let diff = gw.repo.diff(&path)?;
                        Ok(FileDiff { path, diff })
                    })
                    .collect();
                JobOutcome::DiffsCollected { message, result }
            }
            Job::Draft { user_prompt } => {
                JobOutcome::Drafted(gw.drafter.draft(SYSTEM_PROMPT, &user_prompt))
            }
            Job::Commit { message } => JobOutcome::Committed(gw.repo.commit(&message)),
            Job::PullPush => {
                // Pull first so the push is less likely to be rejected as non-fast-forward.
                let result = gw.repo.pull().and_then(|()| gw.repo.push());
                JobOutcome::Pushed(result)
            }
        }
    }
}

fn load_files(repo: &dyn Repository) -> Result<(Vec<FileEntry>, Option<String>)> {
    let files = git::list_files(repo)?;
    let branch = repo.active_branch_name()?;
    Ok((files, branch))
}

/// Read-only diff shown for the highlighted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffView {
    pub path: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Association {
    NotStarted,
    WaitingForTickets,
    Running,
    Finished,
}

pub struct Session {
    files: Vec<FileEntry>,
    selection: BTreeSet<String>,
    tickets: Vec<Ticket>,
    known_ticket_ids: Vec<String>,
    tickets_loaded: bool,
    chosen_ticket: Option<String>,
    association: Association,
    message: String,
    message_rev: u64,
    branch: Option<String>,
    workflow: CommitWorkflow,
    diff_view: Option<DiffView>,
    reconcile_in_flight: bool,
    reconcile_pending: bool,
    /// The last pass failed, so the index may not match the selection.
    index_stale: bool,
    /// A confirmed commit is waiting for the index to match the selection.
    commit_waiting: bool,
    generating: bool,
    status: Option<Notice>,
    logs: Vec<String>,
    should_quit: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            selection: BTreeSet::new(),
            tickets: Vec::new(),
            known_ticket_ids: Vec::new(),
            tickets_loaded: false,
            chosen_ticket: None,
            association: Association::NotStarted,
            message: String::new(),
            message_rev: 0,
            branch: None,
            workflow: CommitWorkflow::default(),
            diff_view: None,
            reconcile_in_flight: false,
            reconcile_pending: false,
            index_stale: false,
            commit_waiting: false,
            generating: false,
            status: Some(Notice::info(
                "Welcome",
                "Space toggles files, Enter picks a ticket, Ctrl+G drafts, Ctrl+S commits. ? for help.",
            )),
            logs: Vec::new(),
            should_quit: false,
        }
    }

    /// Jobs to run when the session starts.
    pub fn start(&mut self) -> Vec<Job> {
        vec![Job::LoadFiles, Job::FetchTickets]
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    #[cfg(test)]
    pub fn known_ticket_ids(&self) -> &[String] {
        &self.known_ticket_ids
    }

    pub fn chosen_ticket(&self) -> Option<&str> {
        self.chosen_ticket.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Bumped whenever the session replaces the message text itself, so the editor
    /// knows to reload.
    pub fn message_rev(&self) -> u64 {
        self.message_rev
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub fn commit_phase(&self) -> &CommitPhase {
        self.workflow.phase()
    }

    pub fn is_confirming(&self) -> bool {
        self.workflow.is_confirming()
    }

    pub fn diff_view(&self) -> Option<&DiffView> {
        self.diff_view.as_ref()
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn status(&self) -> Option<&Notice> {
        self.status.as_ref()
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
        if self.logs.len() > MAX_LOG_LINES {
            self.logs
                .drain(0..self.logs.len().saturating_sub(MAX_LOG_LINES));
        }
    }

    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => {
                tracing::warn!(title = %notice.title, message = %notice.message, "notice")
            }
            _ => tracing::info!(title = %notice.title, message = %notice.message, "notice"),
        }
        self.log(format!("{}: {}", notice.title, notice.message));
        self.status = Some(notice);
    }

    fn replace_message(&mut self, text: String) {
        self.message = text;
        self.message_rev = self.message_rev.wrapping_add(1);
    }

    pub fn handle(&mut self, event: Event) -> Vec<Job> {
        // The confirmation dialog holds exclusive input.
        if self.workflow.is_confirming()
            && !matches!(event, Event::CommitDecided(_) | Event::Quit)
        {
            tracing::debug!(?event, "ignored while confirming");
            return Vec::new();
        }

        match event {
            Event::SelectionChanged(selected) => self.on_selection_changed(selected),
            Event::TicketListFocused => self.on_ticket_list_focused(),
            Event::TicketChosen(id) => {
                self.choose_ticket(id);
                Vec::new()
            }
            Event::MessageEdited(text) => {
                self.message = text;
                Vec::new()
            }
            Event::CommitRequested => self.on_commit_requested(),
            Event::CommitDecided(decision) => self.on_commit_decided(decision),
            Event::DiffRequested(path) => self.on_diff_requested(path),
            Event::DiffClosed => {
                self.diff_view = None;
                Vec::new()
            }
            Event::GenerateRequested => self.on_generate_requested(),
            Event::Refresh => {
                if self.workflow.is_running() {
                    self.notify(Notice::info("Busy", "Wait for the commit to finish."));
                    return Vec::new();
                }
                vec![Job::LoadFiles]
            }
            Event::Quit => {
                self.should_quit = true;
                Vec::new()
            }
        }
    }

    fn on_selection_changed(&mut self, selected: BTreeSet<String>) -> Vec<Job> {
        if self.workflow.is_running() {
            self.notify(Notice::info("Busy", "Wait for the commit to finish."));
            return Vec::new();
        }

        // Only paths the file list shows can ever be staged through the selection.
        let known: BTreeSet<&str> = self.files.iter().map(|f| f.path.as_str()).collect();
        let selected: BTreeSet<String> = selected
            .into_iter()
            .filter(|p| known.contains(p.as_str()))
            .collect();
        if selected == self.selection {
            return Vec::new();
        }
        self.selection = selected;
        self.schedule_reconcile()
    }

    /// Start a pass now, or remember that one is owed once the running pass ends.
    fn schedule_reconcile(&mut self) -> Vec<Job> {
        if self.reconcile_in_flight {
            self.reconcile_pending = true;
            return Vec::new();
        }
        self.reconcile_in_flight = true;
        vec![Job::Reconcile {
            selected: self.selection.clone(),
        }]
    }

    fn on_ticket_list_focused(&mut self) -> Vec<Job> {
        if self.chosen_ticket.is_some() || self.association != Association::NotStarted {
            return Vec::new();
        }
        if !self.tickets_loaded {
            self.association = Association::WaitingForTickets;
            return Vec::new();
        }
        self.begin_association()
    }

    fn begin_association(&mut self) -> Vec<Job> {
        if self.known_ticket_ids.is_empty() {
            self.association = Association::Finished;
            return Vec::new();
        }
        self.association = Association::Running;
        vec![Job::RecentMessages {
            limit: tickets::RECENT_MESSAGE_LIMIT,
        }]
    }

    fn choose_ticket(&mut self, id: String) {
        let id = id.trim().to_string();
        if id.is_empty() {
            return;
        }
        let text = tickets::reprefix(&self.message, &id);
        self.replace_message(text);
        self.log(format!("Ticket: {id}"));
        self.chosen_ticket = Some(id);
    }

    fn on_commit_requested(&mut self) -> Vec<Job> {
        match self.workflow.request(&self.selection, &self.message) {
            Ok(()) => {
                self.status = Some(Notice::info("Confirm", "Commit the selected files?"));
            }
            Err(notice) => self.notify(notice),
        }
        Vec::new()
    }

    fn on_commit_decided(&mut self, decision: CommitDecision) -> Vec<Job> {
        let Some(push) = self.workflow.decide(decision) else {
            if decision == CommitDecision::Cancel {
                self.notify(Notice::info("Cancelled", "Nothing was committed."));
            }
            return Vec::new();
        };

        self.log(if push {
            "Committing and pushing…"
        } else {
            "Committing…"
        });
        if self.index_stale {
            self.reconcile_pending = true;
        }
        self.commit_waiting = true;
        self.continue_commit()
    }

    /// Issue the waiting commit once no pass is running or owed. The message is read
    /// here, so a draft that landed while the index caught up is the one committed.
    fn continue_commit(&mut self) -> Vec<Job> {
        if !self.commit_waiting || self.reconcile_in_flight {
            return Vec::new();
        }
        if self.reconcile_pending {
            self.reconcile_pending = false;
            return self.schedule_reconcile();
        }
        self.commit_waiting = false;
        vec![Job::Commit {
            message: self.message.clone(),
        }]
    }

    fn on_diff_requested(&mut self, path: Option<String>) -> Vec<Job> {
        match path {
            Some(path) => vec![Job::LoadDiff { path }],
            None => {
                self.notify(Notice::info("Diff", "No file is highlighted."));
                Vec::new()
            }
        }
    }

    fn on_generate_requested(&mut self) -> Vec<Job> {
        if self.generating {
            self.notify(Notice::info("Busy", "A commit message is already being drafted."));
            return Vec::new();
        }
        if self.selection.is_empty() {
            self.notify(Notice::error(
                "Cannot draft",
                "Select the files the message should describe.",
            ));
            return Vec::new();
        }
        self.generating = true;
        vec![Job::CollectDiffs {
            paths: self.selection.iter().cloned().collect(),
            message: self.message.clone(),
        }]
    }

    pub fn apply(&mut self, outcome: JobOutcome) -> Vec<Job> {
        match outcome {
            JobOutcome::FilesLoaded(result) => {
                self.on_files_loaded(result);
                Vec::new()
            }
            JobOutcome::TicketsFetched(result) => self.on_tickets_fetched(result),
            JobOutcome::Reconciled(result) => self.on_reconciled(result),
            JobOutcome::RecentMessages(result) => {
                self.on_recent_messages(result);
                Vec::new()
            }
            JobOutcome::DiffLoaded { path, result } => {
                match result {
                    Ok(text) => self.diff_view = Some(DiffView { path, text }),
                    Err(e) => self.notify(Notice::error("Diff failed", format!("{path}: {e}"))),
                }
                Vec::new()
            }
            JobOutcome::DiffsCollected { message, result } => match result {
                Ok(diffs) => {
                    let user_prompt = build_user_prompt(&message, &self.tickets, &diffs);
                    vec![Job::Draft { user_prompt }]
                }
                Err(e) => {
                    self.generating = false;
                    self.notify(Notice::error("Draft failed", e.to_string()));
                    Vec::new()
                }
            },
            JobOutcome::Drafted(result) => {
                self.generating = false;
                match result {
                    Ok(text) => {
                        // Last writer wins: edits made while drafting are replaced.
                        self.replace_message(text);
                        self.notify(Notice::success("Drafted", "Commit message generated."));
                    }
                    Err(e) => self.notify(Notice::error("Draft failed", e.to_string())),
                }
                Vec::new()
            }
            JobOutcome::Committed(result) => self.on_committed(result),
            JobOutcome::Pushed(result) => self.on_pushed(result),
        }
    }

    fn on_files_loaded(&mut self, result: Result<(Vec<FileEntry>, Option<String>)>) {
        match result {
            Ok((files, branch)) => {
                let known: BTreeSet<&str> = files.iter().map(|f| f.path.as_str()).collect();
                if self.reconcile_in_flight || self.reconcile_pending {
                    self.selection.retain(|p| known.contains(p.as_str()));
                } else {
                    self.index_stale = false;
                    self.selection = files
                        .iter()
                        .filter(|f| f.already_staged)
                        .map(|f| f.path.clone())
                        .collect();
                }
                self.log(format!("Loaded {} changed files.", files.len()));
                self.files = files;
                self.branch = branch;
            }
            Err(e) => self.notify(Notice::error("Repository error", e.to_string())),
        }
    }

    fn on_tickets_fetched(&mut self, result: Result<Vec<Ticket>>) -> Vec<Job> {
        self.tickets_loaded = true;
        match result {
            Ok(tickets) => {
                self.log(format!("Fetched {} open tickets.", tickets.len()));
                self.known_ticket_ids = tickets.iter().map(|t| t.id.clone()).collect();
                self.tickets = tickets;
            }
            Err(e) => {
                self.tickets.clear();
                self.known_ticket_ids.clear();
                self.notify(Notice::error("Ticket fetch failed", e.to_string()));
            }
        }

        if self.association == Association::WaitingForTickets && self.chosen_ticket.is_none() {
            return self.begin_association();
        }
        Vec::new()
    }

    fn on_reconciled(&mut self, result: Result<ReconcileReport>) -> Vec<Job> {
        self.reconcile_in_flight = false;
        match result {
            Ok(report) => {
                self.index_stale = false;
                if !report.unstaged.is_empty() {
                    self.log(format!("Unstaged {}", report.unstaged.join(", ")));
                }
                self.log(format!("{} files staged.", report.staged.len()));
            }
            Err(e) => {
                self.index_stale = true;
                if self.commit_waiting {
                    // Never commit an index that does not match the selection.
                    self.commit_waiting = false;
                    self.workflow.failed(e.to_string());
                    self.notify(Notice::error(
                        "Commit failed",
                        format!("Staging failed, nothing was committed: {e}"),
                    ));
                } else {
                    self.notify(Notice::error("Staging failed", e.to_string()));
                }
            }
        }

        if self.commit_waiting {
            return self.continue_commit();
        }
        if self.reconcile_pending {
            self.reconcile_pending = false;
            return self.schedule_reconcile();
        }
        Vec::new()
    }

    fn on_recent_messages(&mut self, result: Result<Vec<String>>) {
        self.association = Association::Finished;
        let messages = match result {
            Ok(messages) => messages,
            Err(e) => {
                self.notify(Notice::error("History unavailable", e.to_string()));
                return;
            }
        };
        // The user may have picked a ticket while history was loading.
        if self.chosen_ticket.is_some() {
            return;
        }
        if let Some(id) = tickets::default_ticket(&messages, &self.known_ticket_ids) {
            tracing::info!(ticket = %id, "default ticket from history");
            self.choose_ticket(id);
        }
    }

    fn on_committed(&mut self, result: Result<()>) -> Vec<Job> {
        match result {
            Ok(()) => {
                self.log("Committed changes.");
                if self.workflow.committed() {
                    return vec![Job::PullPush];
                }
                self.notify(Notice::success("Committed", "Committed successfully."));
                self.should_quit = true;
            }
            Err(e) => {
                self.workflow.failed(e.to_string());
                self.notify(Notice::error("Commit failed", e.to_string()));
            }
        }
        Vec::new()
    }

    fn on_pushed(&mut self, result: Result<()>) -> Vec<Job> {
        match result {
            Ok(()) => {
                self.workflow.pushed();
                self.notify(Notice::success("Pushed", "Committed and pushed."));
                self.should_quit = true;
                Vec::new()
            }
            Err(e) => {
                // The commit stands; show the tree as it is now.
                self.workflow.failed(e.to_string());
                self.notify(Notice::error(
                    "Push failed",
                    format!("The commit was created but could not be pushed: {e}"),
                ));
                vec![Job::LoadFiles]
            }
        }
    }
}

#[cfg(test)]
mod tests;
