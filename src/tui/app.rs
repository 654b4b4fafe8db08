use std::collections::BTreeSet;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui_textarea::{Input, TextArea};

use crate::git::FileEntry;
use crate::session::workflow::CommitDecision;
use crate::session::{Event, Gateways, Session};
use crate::tickets::Ticket;
use crate::tui::tasks::TaskRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Files,
    Tickets,
    Message,
}

pub struct App {
    pub session: Session,
    pub tasks: TaskRunner,
    pub focus: Focus,

    // Help modal
    pub show_help: bool,

    // List cursors
    pub file_cursor: usize,
    pub ticket_cursor: usize,

    // Commit dialog: index into `CommitDecision::ALL`
    pub confirm_index: usize,

    // Diff viewer
    pub diff_scroll: usize,

    // Editor, rebuilt whenever the session replaces the message text
    pub commit_editor: TextArea<'static>,
    editor_rev: u64,
}

impl App {
    pub fn new(gateways: Gateways) -> Result<Self> {
        let mut app = Self {
            session: Session::new(),
            tasks: TaskRunner::new(gateways)?,
            focus: Focus::Files,
            show_help: false,
            file_cursor: 0,
            ticket_cursor: 0,
            confirm_index: 0,
            diff_scroll: 0,
            commit_editor: TextArea::default(),
            editor_rev: 0,
        };
        app.set_commit_message_text("");
        let jobs = app.session.start();
        app.tasks.submit(jobs);
        Ok(app)
    }

    pub fn should_quit(&self) -> bool {
        self.session.should_quit()
    }

    /// Hand an event to the session and queue whatever work it asks for.
    pub fn dispatch(&mut self, event: Event) {
        let jobs = self.session.handle(event);
        self.tasks.submit(jobs);
        self.sync_editor();
    }

    /// Apply finished background work. Called once per UI tick.
    pub fn tick(&mut self) {
        self.tasks.drain_events(&mut self.session);
        self.tasks.tick_spinner();
        self.sync_editor();
        self.clamp_cursors();
    }

    fn sync_editor(&mut self) {
        if self.session.message_rev() != self.editor_rev {
            self.editor_rev = self.session.message_rev();
            let text = self.session.message().to_string();
            self.set_commit_message_text(&text);
        }
    }

    fn clamp_cursors(&mut self) {
        let files = self.session.files().len();
        self.file_cursor = self.file_cursor.min(files.saturating_sub(1));
        let tickets = self.session.tickets().len();
        self.ticket_cursor = self.ticket_cursor.min(tickets.saturating_sub(1));
    }

    pub fn quit(&mut self) {
        self.dispatch(Event::Quit);
    }

    pub fn focus_next(&mut self) {
        self.set_focus(match self.focus {
            Focus::Files => Focus::Tickets,
            Focus::Tickets => Focus::Message,
            Focus::Message => Focus::Files,
        });
    }

    pub fn focus_prev(&mut self) {
        self.set_focus(match self.focus {
            Focus::Files => Focus::Message,
            Focus::Tickets => Focus::Files,
            Focus::Message => Focus::Tickets,
        });
    }

    pub fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        if focus == Focus::Tickets {
            self.dispatch(Event::TicketListFocused);
        }
    }

    pub fn highlighted_file(&self) -> Option<&FileEntry> {
        self.session.files().get(self.file_cursor)
    }

    pub fn highlighted_ticket(&self) -> Option<&Ticket> {
        self.session.tickets().get(self.ticket_cursor)
    }

    pub fn cursor_up(&mut self) {
        match self.focus {
            Focus::Files => self.file_cursor = self.file_cursor.saturating_sub(1),
            Focus::Tickets => self.ticket_cursor = self.ticket_cursor.saturating_sub(1),
            Focus::Message => {}
        }
    }

    pub fn cursor_down(&mut self) {
        match self.focus {
            Focus::Files => self.file_cursor = self.file_cursor.saturating_add(1),
            Focus::Tickets => self.ticket_cursor = self.ticket_cursor.saturating_add(1),
            Focus::Message => {}
        }
        self.clamp_cursors();
    }

    /// Flip the checkbox of the highlighted file.
    pub fn toggle_highlighted_file(&mut self) {
        let Some(path) = self.highlighted_file().map(|f| f.path.clone()) else {
            return;
        };
        let mut selected: BTreeSet<String> = self.session.selection().clone();
        if !selected.remove(&path) {
            selected.insert(path);
        }
        self.dispatch(Event::SelectionChanged(selected));
    }

    /// The ticket id is the first token of the rendered label.
    pub fn choose_highlighted_ticket(&mut self) {
        let Some(id) = self
            .highlighted_ticket()
            .and_then(|t| t.label().split_whitespace().next().map(str::to_string))
        else {
            return;
        };
        self.dispatch(Event::TicketChosen(id));
    }

    pub fn request_diff(&mut self) {
        let path = self.highlighted_file().map(|f| f.path.clone());
        self.diff_scroll = 0;
        self.dispatch(Event::DiffRequested(path));
    }

    pub fn request_commit(&mut self) {
        self.confirm_index = 0;
        self.dispatch(Event::CommitRequested);
    }

    pub fn decide(&mut self, decision: CommitDecision) {
        self.dispatch(Event::CommitDecided(decision));
    }

    pub fn confirm_selected(&mut self) {
        let decision = CommitDecision::ALL[self.confirm_index % CommitDecision::ALL.len()];
        self.decide(decision);
    }

    pub fn confirm_left(&mut self) {
        self.confirm_index = self.confirm_index.saturating_sub(1);
    }

    pub fn confirm_right(&mut self) {
        self.confirm_index = (self.confirm_index + 1).min(CommitDecision::ALL.len() - 1);
    }

    /// Feed a key to the editor and report the new text to the session.
    pub fn editor_input(&mut self, input: Input) {
        if self.commit_editor.input(input) {
            let text = self.editor_text();
            self.dispatch(Event::MessageEdited(text));
        }
    }

    pub fn editor_text(&self) -> String {
        self.commit_editor.lines().join("\n")
    }

    pub fn set_commit_message_text(&mut self, msg: &str) {
        let mut editor = TextArea::default();
        editor.set_cursor_line_style(
            ratatui::style::Style::default().add_modifier(ratatui::style::Modifier::REVERSED),
        );

        for (i, line) in msg.split('\n').enumerate() {
            if i > 0 {
                editor.insert_newline();
            }
            editor.insert_str(line);
        }

        self.commit_editor = editor;
        self.reset_editor_block();
    }

    fn reset_editor_block(&mut self) {
        // view.rs overrides border styling per-focus each frame.
        self.commit_editor.set_block(
            ratatui::widgets::Block::default()
                .title(" Commit Message ")
                .borders(ratatui::widgets::Borders::ALL),
        );
    }
}

pub fn to_textarea_input(key: &KeyEvent) -> Option<Input> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    let key = match key.code {
        KeyCode::Char(c) => ratatui_textarea::Key::Char(c),
        KeyCode::Enter => ratatui_textarea::Key::Enter,
        KeyCode::Backspace => ratatui_textarea::Key::Backspace,
        KeyCode::Delete => ratatui_textarea::Key::Delete,
        KeyCode::Left => ratatui_textarea::Key::Left,
        KeyCode::Right => ratatui_textarea::Key::Right,
        KeyCode::Up => ratatui_textarea::Key::Up,
        KeyCode::Down => ratatui_textarea::Key::Down,
        KeyCode::Home => ratatui_textarea::Key::Home,
        KeyCode::End => ratatui_textarea::Key::End,
        KeyCode::PageUp => ratatui_textarea::Key::PageUp,
        KeyCode::PageDown => ratatui_textarea::Key::PageDown,
        KeyCode::Tab => ratatui_textarea::Key::Tab,
        _ => return None,
    };

    Some(Input { key, ctrl, alt })
}
