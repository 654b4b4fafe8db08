use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::app::{App, Focus};
use super::tasks::{format_elapsed, spinner_frames};
use crate::session::workflow::{CommitDecision, CommitPhase};
use crate::session::{DiffView, NoticeLevel};

pub fn draw(f: &mut Frame<'_>, app: &mut App) {
    let area = f.size();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(1),    // main
            Constraint::Length(4), // footer
        ])
        .split(area);

    draw_header(f, app, layout[0]);
    draw_main(f, app, layout[1]);
    draw_footer(f, app, layout[2]);

    if app.show_help {
        draw_help_modal(f, area);
    }

    // Overlays render above everything else; the commit dialog wins.
    if let Some(diff) = app.session.diff_view() {
        draw_diff_modal(f, diff, app.diff_scroll, area);
    }
    if app.session.is_confirming() {
        draw_confirm_modal(f, app, area);
    }
}

/// Banner text and colour for the active branch.
pub fn branch_banner(branch: Option<&str>) -> (String, Color) {
    match branch {
        None => ("Branch: (detached)".to_string(), Color::DarkGray),
        Some("master") => ("Branch: master".to_string(), Color::White),
        Some("stg") => ("Branch: stg ⚠ staging".to_string(), Color::Yellow),
        Some("prod") => ("Branch: prod ⚠ production".to_string(), Color::Red),
        Some(name) => (format!("Branch: {name}"), Color::Green),
    }
}

fn draw_header(f: &mut Frame<'_>, app: &App, area: Rect) {
    let (banner, color) = branch_banner(app.session.branch());

    let mut spans = vec![
        Span::styled(
            banner,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(
            format!("{} selected", app.session.selection().len()),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if let Some(phase) = phase_label(app.session.commit_phase()) {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            phase,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }
    if let Some(id) = app.session.chosen_ticket() {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            format!("Ticket: {id}"),
            Style::default().fg(Color::Cyan),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title(" lazrgit ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(header, area);
}

fn focus_border(app: &App, focus: Focus) -> Style {
    if app.focus == focus {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn draw_main(f: &mut Frame<'_>, app: &mut App, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Min(1)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Min(5)])
        .split(cols[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(8)])
        .split(cols[1]);

    render_file_list(f, app, left[0]);
    render_ticket_list(f, app, left[1]);

    let editor_border = focus_border(app, Focus::Message);
    let editor_title = if app.session.is_generating() {
        " Commit Message (drafting…) "
    } else {
        " Commit Message "
    };
    app.commit_editor.set_block(
        Block::default()
            .title(editor_title)
            .borders(Borders::ALL)
            .border_style(editor_border),
    );
    f.render_widget(app.commit_editor.widget(), right[0]);

    render_log_panel(f, app, right[1]);
}

fn render_file_list(f: &mut Frame<'_>, app: &App, area: Rect) {
    let selection = app.session.selection();
    let files = app.session.files();
    let width = area.width.saturating_sub(6) as usize;

    let items: Vec<ListItem> = files
        .iter()
        .map(|file| {
            let checked = selection.contains(&file.path);
            let mark = if checked { "[x] " } else { "[ ] " };
            let style = if file.is_untracked() {
                Style::default().fg(Color::Yellow)
            } else if checked {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(Line::from(vec![
                Span::styled(mark, style),
                Span::styled(truncate_to_width(&file.label, width), style),
            ]))
        })
        .collect();

    let title = format!(" Files ({}/{}) ", selection.len(), files.len());
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(focus_border(app, Focus::Files));

    if items.is_empty() {
        let p = Paragraph::new(Line::from(Span::styled(
            "Working tree clean.",
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        f.render_widget(p, area);
        return;
    }

    let mut state = ListState::default();
    state.select(Some(app.file_cursor));
    let list = List::new(items)
        .block(block)
        .highlight_style(cursor_style(app, Focus::Files))
        .highlight_symbol("› ");
    f.render_stateful_widget(list, area, &mut state);
}

fn render_ticket_list(f: &mut Frame<'_>, app: &App, area: Rect) {
    let chosen = app.session.chosen_ticket();
    let width = area.width.saturating_sub(6) as usize;

    let items: Vec<ListItem> = app
        .session
        .tickets()
        .iter()
        .map(|ticket| {
            let is_chosen = chosen == Some(ticket.id.as_str());
            let (mark, style) = if is_chosen {
                ("● ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            } else {
                ("  ", Style::default().fg(Color::White))
            };
            ListItem::new(Line::from(vec![
                Span::styled(mark, style),
                Span::styled(truncate_to_width(&ticket.label(), width), style),
            ]))
        })
        .collect();

    let block = Block::default()
        .title(" Tickets ")
        .borders(Borders::ALL)
        .border_style(focus_border(app, Focus::Tickets));

    if items.is_empty() {
        let p = Paragraph::new(Line::from(Span::styled(
            "No open tickets.",
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        f.render_widget(p, area);
        return;
    }

    let mut state = ListState::default();
    state.select(Some(app.ticket_cursor));
    let list = List::new(items)
        .block(block)
        .highlight_style(cursor_style(app, Focus::Tickets))
        .highlight_symbol("› ");
    f.render_stateful_widget(list, area, &mut state);
}

fn cursor_style(app: &App, focus: Focus) -> Style {
    if app.focus == focus {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    }
}

fn render_log_panel(f: &mut Frame<'_>, app: &App, area: Rect) {
    let log_block = Block::default()
        .title(" Log ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let visible = area.height.saturating_sub(2) as usize;
    let logs = app.session.logs();
    let log_lines: Vec<Line> = logs[logs.len().saturating_sub(visible)..]
        .iter()
        .map(|s| Line::from(Span::raw(s.as_str())))
        .collect();

    f.render_widget(
        Paragraph::new(log_lines)
            .block(log_block)
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn draw_footer(f: &mut Frame<'_>, app: &App, area: Rect) {
    let status = app.session.status();
    let (label, color) = match status.map(|s| s.level) {
        Some(NoticeLevel::Info) => ("INFO", Color::Cyan),
        Some(NoticeLevel::Success) => ("OK", Color::Green),
        Some(NoticeLevel::Error) => ("ERR", Color::Red),
        None => ("", Color::DarkGray),
    };

    let msg = status
        .map(|s| format!("{}: {}", s.title, s.message))
        .unwrap_or_default();

    let mut line1_spans = vec![
        Span::styled(
            format!(" {} ", label),
            Style::default().fg(Color::Black).bg(color),
        ),
        Span::raw(" "),
        Span::styled(msg, Style::default().fg(Color::White)),
    ];

    // Progress indicator for every lane with a running job.
    let frames = spinner_frames();
    for task in app.tasks.running() {
        let spinner = frames[task.spinner_index % frames.len()];
        let elapsed = format_elapsed(task.started_at.elapsed());
        line1_spans.extend([
            Span::raw("  "),
            Span::styled(
                format!("{} {}", spinner, task.label),
                Style::default().fg(Color::White),
            ),
            Span::raw(" "),
            Span::styled(
                format!("({})", elapsed),
                Style::default().fg(Color::DarkGray),
            ),
        ]);
    }

    let hints = match app.focus {
        Focus::Files => "Space:Toggle  d:Diff  Tab:Focus  c/Ctrl+S:Commit  g/Ctrl+G:Draft  r:Refresh  ?:Help  q:Quit",
        Focus::Tickets => "Enter:Choose ticket  ↑/↓:Move  Tab:Focus  Ctrl+S:Commit  ?:Help  q:Quit",
        Focus::Message => "Type to edit  Esc:Leave editor  Tab:Focus  Ctrl+S:Commit  Ctrl+G:Draft",
    };

    let footer = Paragraph::new(Text::from(vec![
        Line::from(line1_spans),
        Line::from(Span::styled(hints, Style::default().fg(Color::DarkGray))),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    )
    .wrap(Wrap { trim: true });

    f.render_widget(footer, area);
}

fn centered(area: Rect, width_pct: f32, height_pct: f32) -> Rect {
    let width = (area.width as f32 * width_pct) as u16;
    let height = (area.height as f32 * height_pct) as u16;

    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

fn key_line(key: &'static str, text: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{key:<12}"), Style::default().fg(Color::White)),
        Span::styled(text, Style::default().fg(Color::DarkGray)),
    ])
}

fn draw_help_modal(f: &mut Frame<'_>, area: Rect) {
    let modal = centered(area, 0.70, 0.70);

    // Make the modal opaque by clearing anything behind it first.
    f.render_widget(Clear, modal);

    let lines: Vec<Line> = vec![
        Line::from(Span::styled(
            "lazrgit: Help",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        key_line("Tab", "cycle focus: files, tickets, message"),
        key_line("↑/↓ j/k", "move in the focused list"),
        key_line("Space", "check or uncheck the highlighted file (stages it)"),
        key_line("Enter", "choose the highlighted ticket"),
        key_line("e", "edit the commit message (Esc leaves the editor)"),
        key_line("d", "show the diff of the highlighted file"),
        key_line("g, Ctrl+G", "draft the commit message from the selected diffs"),
        key_line("c, Ctrl+S", "commit the selected files"),
        key_line("r", "reload the file list"),
        key_line("q, Esc", "quit"),
        key_line("Ctrl+C", "quit from anywhere"),
        Line::from(""),
        Line::from(Span::styled(
            "Choosing a ticket puts its id at the start of the message.",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            "Untracked files are marked [UNTRACKED].",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let block = Block::default()
        .title(" Help (? or Esc to close) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));

    let p = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::White).bg(Color::Black));

    f.render_widget(p, modal);
}

fn draw_confirm_modal(f: &mut Frame<'_>, app: &App, area: Rect) {
    let modal = centered(area, 0.55, 0.40);
    f.render_widget(Clear, modal);

    let subject = app.session.message().lines().next().unwrap_or("").to_string();
    let width = modal.width.saturating_sub(4) as usize;

    let buttons: Vec<Span> = CommitDecision::ALL
        .iter()
        .enumerate()
        .flat_map(|(idx, decision)| {
            let style = if idx == app.confirm_index {
                Style::default().fg(Color::Black).bg(Color::White)
            } else {
                Style::default().fg(Color::White)
            };
            [
                Span::styled(format!(" {} ", decision.label()), style),
                Span::raw("  "),
            ]
        })
        .collect();

    let lines = vec![
        Line::from(Span::styled(
            format!("Commit {} file(s)?", app.session.selection().len()),
            Style::default().fg(Color::White),
        )),
        Line::from(""),
        Line::from(Span::styled(
            truncate_to_width(&subject, width),
            Style::default().fg(Color::Cyan),
        )),
        Line::from(""),
        Line::from(buttons),
        Line::from(""),
        Line::from(Span::styled(
            "y: commit   p: commit & push   n/Esc: cancel   ←/→ Enter",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let p = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Commit ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White)),
        )
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::White).bg(Color::Black));

    f.render_widget(p, modal);
}

fn diff_line_style(line: &str) -> Style {
    if line.starts_with("+++") || line.starts_with("---") {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    } else if line.starts_with('+') {
        Style::default().fg(Color::Green)
    } else if line.starts_with('-') {
        Style::default().fg(Color::Red)
    } else if line.starts_with("@@") {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::White)
    }
}

fn draw_diff_modal(f: &mut Frame<'_>, diff: &DiffView, scroll: usize, area: Rect) {
    let modal = centered(area, 0.90, 0.85);
    f.render_widget(Clear, modal);

    let viewer_block = Block::default()
        .title(format!(" Diff: {} (Esc to close) ", diff.path))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));

    // Keep allocations proportional to the viewport rather than the whole diff.
    let total = diff.text.lines().count();
    let viewport_h = modal.height.saturating_sub(2) as usize;
    let scroll = scroll.min(total.saturating_sub(viewport_h));

    let visible: Vec<Line> = if total == 0 {
        vec![Line::from(Span::styled(
            "[no changes]",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        diff.text
            .lines()
            .skip(scroll)
            .take(viewport_h)
            .map(|l| Line::from(Span::styled(l, diff_line_style(l))))
            .collect()
    };

    let p = Paragraph::new(visible)
        .block(viewer_block)
        .style(Style::default().bg(Color::Black));

    f.render_widget(p, modal);
}

/// Short label for the commit phase, shown while a commit is underway.
fn phase_label(phase: &CommitPhase) -> Option<&'static str> {
    match phase {
        CommitPhase::Committing { .. } => Some("committing"),
        CommitPhase::Pushing => Some("pushing"),
        _ => None,
    }
}

fn truncate_to_width(s: &str, max: usize) -> String {
    if UnicodeWidthStr::width(s) <= max {
        return s.to_string();
    }
    if max <= 1 {
        return "…".to_string();
    }

    let mut out = String::new();
    let mut width = 0usize;
    for ch in s.chars() {
        let ch_w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_w > max - 1 {
            break;
        }
        out.push(ch);
        width += ch_w;
    }
    out.push('…');
    out
}
