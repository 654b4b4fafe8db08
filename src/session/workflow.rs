use std::collections::BTreeSet;

use super::Notice;

pub const NO_FILES_SELECTED: &str = "No files are selected for committing";
pub const NO_COMMIT_MESSAGE: &str = "No commit message entered";

/// Result of the confirmation dialog. Consumed exactly once per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitDecision {
    Commit,
    CommitAndPush,
    Cancel,
}

impl CommitDecision {
    pub const ALL: [CommitDecision; 3] = [
        CommitDecision::Commit,
        CommitDecision::CommitAndPush,
        CommitDecision::Cancel,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CommitDecision::Commit => "Commit",
            CommitDecision::CommitAndPush => "Commit & Push",
            CommitDecision::Cancel => "Cancel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitPhase {
    Idle,
    Confirming,
    Committing { push: bool },
    Pushing,
    Done,
    Cancelled,
    Failed(String),
}

/// `Idle -> Confirming -> Committing -> (Pushing) -> Done | Cancelled | Failed`.
///
/// Validation happens inside [`CommitWorkflow::request`] and never leaves the idle
/// side of the machine when it fails.
#[derive(Debug, Clone)]
pub struct CommitWorkflow {
    phase: CommitPhase,
}

impl Default for CommitWorkflow {
    fn default() -> Self {
        Self {
            phase: CommitPhase::Idle,
        }
    }
}

impl CommitWorkflow {
    pub fn phase(&self) -> &CommitPhase {
        &self.phase
    }

    pub fn is_confirming(&self) -> bool {
        self.phase == CommitPhase::Confirming
    }

    /// A commit attempt is between confirmation and its final result.
    pub fn is_running(&self) -> bool {
        matches!(
            self.phase,
            CommitPhase::Committing { .. } | CommitPhase::Pushing
        )
    }

    /// Start an attempt. On a failed guard the phase is left as it was.
    pub fn request(&mut self, selection: &BTreeSet<String>, message: &str) -> Result<(), Notice> {
        if self.is_confirming() || self.is_running() {
            return Err(Notice::info("Busy", "A commit is already in progress."));
        }
        validate(selection, message)?;
        self.phase = CommitPhase::Confirming;
        Ok(())
    }

    /// Apply the dialog result. Returns `Some(push)` when a commit should run.
    pub fn decide(&mut self, decision: CommitDecision) -> Option<bool> {
        if !self.is_confirming() {
            return None;
        }
        match decision {
            CommitDecision::Cancel => {
                self.phase = CommitPhase::Cancelled;
                None
            }
            CommitDecision::Commit => {
                self.phase = CommitPhase::Committing { push: false };
                Some(false)
            }
            CommitDecision::CommitAndPush => {
                self.phase = CommitPhase::Committing { push: true };
                Some(true)
            }
        }
    }

    /// The commit landed. Returns `true` when a push must follow.
    pub fn committed(&mut self) -> bool {
        match self.phase {
            CommitPhase::Committing { push: true } => {
                self.phase = CommitPhase::Pushing;
                true
            }
            CommitPhase::Committing { push: false } => {
                self.phase = CommitPhase::Done;
                false
            }
            _ => false,
        }
    }

    pub fn pushed(&mut self) {
        if self.phase == CommitPhase::Pushing {
            self.phase = CommitPhase::Done;
        }
    }

    pub fn failed(&mut self, reason: impl Into<String>) {
        self.phase = CommitPhase::Failed(reason.into());
    }
}

/// Guards checked before the confirmation dialog opens.
pub fn validate(selection: &BTreeSet<String>, message: &str) -> Result<(), Notice> {
    if selection.is_empty() {
        return Err(Notice::error("Cannot commit", NO_FILES_SELECTED));
    }
    if message.trim().is_empty() {
        return Err(Notice::error("Cannot commit", NO_COMMIT_MESSAGE));
    }
    Ok(())
}
