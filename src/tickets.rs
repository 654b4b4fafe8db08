use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;

use crate::config::JiraConfig;
use crate::runtime;

/// Open tickets assigned to the current user, recently touched first.
const OPEN_TICKETS_JQL: &str = "assignee = currentUser() AND resolution = Unresolved \
    AND updated >= -30d ORDER BY updated DESC, created DESC";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: String,
    pub summary: String,
}

impl Ticket {
    pub fn new(id: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            summary: summary.into(),
        }
    }

    /// `<ID> <summary>`; the id is always the first whitespace-delimited token.
    pub fn label(&self) -> String {
        format!("{} {}", self.id, self.summary)
    }
}

pub trait TicketSource: Send + Sync {
    fn fetch_open_tickets(&self) -> Result<Vec<Ticket>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<Issue>,
}

#[derive(Debug, Deserialize)]
struct Issue {
    key: String,
    fields: IssueFields,
}

#[derive(Debug, Deserialize)]
struct IssueFields {
    #[serde(default)]
    summary: Option<String>,
}

pub struct JiraClient {
    client: Client,
    config: JiraConfig,
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub async fn search_open(&self) -> Result<Vec<Ticket>> {
        let url = format!("{}/rest/api/2/search", self.config.url);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.config.username, Some(&self.config.token))
            .query(&[("jql", OPEN_TICKETS_JQL), ("fields", "summary")])
            .send()
            .await
            .context("Failed to send request to Jira")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("Jira API error ({}): {}", status, error_text);
        }

        let body = response
            .text()
            .await
            .context("Failed to read Jira response")?;
        parse_search(&body)
    }
}

impl TicketSource for JiraClient {
    fn fetch_open_tickets(&self) -> Result<Vec<Ticket>> {
        runtime::block_on(self.search_open())
    }
}

fn parse_search(body: &str) -> Result<Vec<Ticket>> {
    let parsed: SearchResponse =
        serde_json::from_str(body).context("Failed to parse Jira search response")?;
    Ok(parsed
        .issues
        .into_iter()
        .map(|issue| Ticket {
            id: issue.key,
            summary: issue.fields.summary.unwrap_or_default(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_issues_in_response_order() {
        let body = r#"{
            "startAt": 0,
            "issues": [
                { "key": "RG-12", "fields": { "summary": "Fix crash" } },
                { "key": "RG-3", "fields": { "summary": "Add tests" } },
                { "key": "RG-4", "fields": {} }
            ]
        }"#;
        let tickets = parse_search(body).unwrap();
        assert_eq!(
            tickets,
            vec![
                Ticket::new("RG-12", "Fix crash"),
                Ticket::new("RG-3", "Add tests"),
                Ticket::new("RG-4", ""),
            ]
        );
    }

    #[test]
    fn missing_issue_list_means_no_tickets() {
        assert!(parse_search("{}").unwrap().is_empty());
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(parse_search("<html>").is_err());
    }

    #[test]
    fn label_starts_with_ticket_id() {
        let t = Ticket::new("RG-12", "Fix crash");
        assert_eq!(t.label(), "RG-12 Fix crash");
        assert_eq!(t.label().split_whitespace().next(), Some("RG-12"));
    }
}
