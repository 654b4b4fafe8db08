//! Full-screen TUI entrypoint.
//!
//! This module wires the terminal to the session and delegates state, input and
//! rendering to submodules.
//!
//! Modules:
//! - `app`: view state around the session (focus, cursors, editor)
//! - `input`: key dispatch + focus/navigation rules
//! - `view`: rendering/layout (ratatui)
//! - `tasks`: per-lane background workers for gateway I/O

pub mod app;
pub mod input;
pub mod tasks;
pub mod view;

use std::io;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::session::Gateways;
use app::App;

/// Run the full-screen TUI until the user quits or a commit completes.
///
/// Notes:
/// - The event loop is synchronous; gateway calls run on `tasks` workers and are
///   folded back into the session once per tick.
pub fn run_tui(gateways: Gateways) -> Result<()> {
    let mut app = App::new(gateways)?;

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal backend")?;
    terminal.clear().ok();

    let result = event_loop(&mut terminal, &mut app);

    // Restore terminal state
    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    if let Some(notice) = app.session.status() {
        tracing::info!(title = %notice.title, message = %notice.message, "session ended");
    }
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let tick_rate = Duration::from_millis(33);
    let mut last_tick = Instant::now();

    loop {
        app.tick();

        terminal
            .draw(|f| view::draw(f, app))
            .context("Failed to draw frame")?;

        if app.should_quit() {
            return Ok(());
        }

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout).context("Failed to poll events")? {
            if let Event::Key(key) = event::read().context("Failed to read event")? {
                input::dispatch_key(app, key);
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }
}
