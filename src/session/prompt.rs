use crate::tickets::Ticket;

use super::tickets::split_ticket_prefix;

pub const SYSTEM_PROMPT: &str = "You are a senior developer writing a git commit message. \
    You are given the ticket the change belongs to, an optional draft written by the author, \
    and the unified diff of every file being committed. \
    Write a concise subject line (at most 72 characters), then a blank line, then a short body \
    explaining what changed and why. \
    If a ticket id is given, the subject line MUST start with the ticket id followed by a single space. \
    Keep the intent of the author's draft when there is one. \
    Only output the commit message itself, no wrapper text or markdown code blocks.";

/// Diff of one selected file against the last commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    pub diff: String,
}

/// Assemble the user prompt from the current message text, the fetched tickets and
/// the diffs of the selected files.
pub fn build_user_prompt(message: &str, tickets: &[Ticket], diffs: &[FileDiff]) -> String {
    let (ticket_id, draft) = split_ticket_prefix(message.trim_start());
    let mut prompt = String::new();

    if let Some(id) = ticket_id {
        let summary = tickets
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.summary.as_str())
            .unwrap_or("");
        if summary.is_empty() {
            prompt.push_str(&format!("Ticket: {id}\n\n"));
        } else {
            prompt.push_str(&format!("Ticket: {id}\nTicket summary: {summary}\n\n"));
        }
    }

    let draft = draft.trim();
    if !draft.is_empty() {
        prompt.push_str(&format!("Draft message:\n{draft}\n\n"));
    }

    prompt.push_str("Changes:\n");
    for file in diffs {
        prompt.push_str(&format!("File: {}\n", file.path));
        if file.diff.trim().is_empty() {
            prompt.push_str("(no textual changes)\n\n");
        } else {
            prompt.push_str(file.diff.trim_end());
            prompt.push_str("\n\n");
        }
    }

    prompt.trim_end().to_string()
}
