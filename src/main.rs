use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;

mod config;
mod error;
mod generator;
mod git;
mod logging;
mod runtime;
mod session;
mod tickets;
mod tui;

use config::Config;
use generator::Generator;
use git::GitCli;
use session::Gateways;
use tickets::JiraClient;

/// Pick files, tie the commit to a Jira ticket, write or draft the message, commit.
#[derive(Parser, Debug)]
#[command(name = "lazrgit", version, about)]
struct Cli {}

fn fatal(message: impl std::fmt::Display) -> ExitCode {
    eprintln!("{} {}", "error:".red().bold(), message.to_string().red());
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let _cli = Cli::parse();

    // Ensure terminal colors are enabled on Windows for the pre-TUI error path.
    #[cfg(windows)]
    let _ = colored::control::set_virtual_terminal(true);

    if let Err(e) = logging::init() {
        return fatal(format!("{e:#}"));
    }

    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => return fatal(e),
    };

    let repo = match GitCli::open(".") {
        Ok(repo) => repo,
        Err(e) => return fatal(format!("{e:#}")),
    };

    let gateways = Gateways {
        repo: Arc::new(repo),
        tickets: Arc::new(JiraClient::new(cfg.jira)),
        drafter: Arc::new(Generator::from_config(&cfg.llm)),
    };

    match tui::run_tui(gateways) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fatal(format!("{e:#}")),
    }
}
