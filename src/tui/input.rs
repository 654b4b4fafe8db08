use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::app::{to_textarea_input, App, Focus};
use crate::session::workflow::CommitDecision;
use crate::session::Event;

const DIFF_PAGE: usize = 20;

/// Dispatch a key event into the TUI application.
///
/// Order of operations:
/// 1) Ignore non-press events
/// 2) Ctrl+C always quits
/// 3) The commit dialog, then the diff viewer, then help capture all input while open
/// 4) Shortcuts that work from any focus (Tab, Ctrl+S, Ctrl+G)
/// 5) Focus-specific routing (file list, ticket list, editor)
///
/// Returns `true` if the key was handled (consumed).
pub fn dispatch_key(app: &mut App, key: KeyEvent) -> bool {
    // Only process key presses; ignore repeats/releases to avoid accidental double actions.
    if key.kind != KeyEventKind::Press {
        return false;
    }

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return true;
    }

    if app.session.is_confirming() {
        handle_confirm_key(app, &key);
        return true;
    }

    if app.session.diff_view().is_some() {
        handle_diff_key(app, &key);
        return true;
    }

    if app.show_help {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            app.show_help = false;
        }
        return true;
    }

    match (key.code, key.modifiers) {
        (KeyCode::Tab, _) => {
            app.focus_next();
            return true;
        }
        (KeyCode::BackTab, _) => {
            app.focus_prev();
            return true;
        }
        (KeyCode::Char('s'), m) if m.contains(KeyModifiers::CONTROL) => {
            app.request_commit();
            return true;
        }
        (KeyCode::Char('g'), m) if m.contains(KeyModifiers::CONTROL) => {
            app.dispatch(Event::GenerateRequested);
            return true;
        }
        _ => {}
    }

    if app.focus == Focus::Message {
        if key.code == KeyCode::Esc {
            app.set_focus(Focus::Files);
            return true;
        }
        if let Some(input) = to_textarea_input(&key) {
            app.editor_input(input);
            return true;
        }
        return false;
    }

    if key.modifiers != KeyModifiers::NONE && key.modifiers != KeyModifiers::SHIFT {
        return false;
    }

    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.cursor_up(),
        KeyCode::Down | KeyCode::Char('j') => app.cursor_down(),
        KeyCode::Char(' ') | KeyCode::Enter => match app.focus {
            Focus::Files => app.toggle_highlighted_file(),
            Focus::Tickets => app.choose_highlighted_ticket(),
            Focus::Message => {}
        },
        KeyCode::Char('e') | KeyCode::Char('i') => app.set_focus(Focus::Message),
        KeyCode::Char('c') => app.request_commit(),
        KeyCode::Char('g') => app.dispatch(Event::GenerateRequested),
        KeyCode::Char('d') => app.request_diff(),
        KeyCode::Char('r') => app.dispatch(Event::Refresh),
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
        _ => return false,
    }
    true
}

fn handle_confirm_key(app: &mut App, key: &KeyEvent) {
    match key.code {
        KeyCode::Char('y') => app.decide(CommitDecision::Commit),
        KeyCode::Char('p') => app.decide(CommitDecision::CommitAndPush),
        KeyCode::Char('n') | KeyCode::Esc => app.decide(CommitDecision::Cancel),
        KeyCode::Left | KeyCode::BackTab => app.confirm_left(),
        KeyCode::Right | KeyCode::Tab => app.confirm_right(),
        KeyCode::Enter => app.confirm_selected(),
        _ => {}
    }
}

fn handle_diff_key(app: &mut App, key: &KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.diff_scroll = app.diff_scroll.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => app.diff_scroll = app.diff_scroll.saturating_add(1),
        KeyCode::PageUp => app.diff_scroll = app.diff_scroll.saturating_sub(DIFF_PAGE),
        KeyCode::PageDown | KeyCode::Char(' ') => {
            app.diff_scroll = app.diff_scroll.saturating_add(DIFF_PAGE)
        }
        KeyCode::Home => app.diff_scroll = 0,
        KeyCode::Esc | KeyCode::Char('q') => {
            app.diff_scroll = 0;
            app.dispatch(Event::DiffClosed);
        }
        _ => {}
    }
}
