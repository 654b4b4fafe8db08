//! Ticket association: pick a default ticket from history and keep the ticket id at
//! the front of the commit message.

use regex::Regex;
use std::sync::OnceLock;

/// How many commits on the active branch are scanned for a default ticket.
pub const RECENT_MESSAGE_LIMIT: usize = 10;

fn ticket_prefix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Anchored at the very start of the text; later lines are never touched.
        Regex::new(r"^([A-Z][A-Z0-9_]*-[0-9]+):?(?:[ \t\r\n]+|$)")
            .unwrap_or_else(|err| panic!("valid ticket prefix regex: {err}"))
    })
}

/// First ticket id (in `known` order) mentioned by the newest message that mentions
/// any of them. Plain substring matching: `RG-3` also matches inside `RG-30`.
pub fn default_ticket(messages: &[String], known: &[String]) -> Option<String> {
    messages.iter().find_map(|message| {
        known
            .iter()
            .find(|id| !id.is_empty() && message.contains(id.as_str()))
            .cloned()
    })
}

/// Split a leading `<TICKET-ID>[:] ` token off the message.
pub fn split_ticket_prefix(text: &str) -> (Option<&str>, &str) {
    match ticket_prefix_regex().captures(text) {
        Some(caps) => {
            let id = caps.get(1).map(|m| m.as_str());
            let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
            (id, &text[end..])
        }
        None => (None, text),
    }
}

/// Replace (or add) the leading ticket id token, leaving the body untouched.
pub fn reprefix(text: &str, ticket_id: &str) -> String {
    let (_, body) = split_ticket_prefix(text);
    format!("{ticket_id} {body}")
}
