//! Main randomizer screen
//!
//! Header with mode and library info, the current settings, the rolled game,
//! a status line and the key hints.

use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Gauge, Paragraph},
    Frame,
};

use crate::app::{App, StatusKind};
use crate::library::Mode;
use crate::ui::game_panel;

/// Renders the randomizer screen
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Length(1), // Settings
            Constraint::Min(3),    // Game panel
            Constraint::Length(1), // Status
            Constraint::Length(1), // Key hints
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_settings(frame, app, chunks[1]);
    game_panel::render(frame, chunks[2], app);
    render_status(frame, app, chunks[3]);
    render_hints(frame, chunks[4]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let mode_color = match app.mode {
        Mode::Online => Color::Green,
        Mode::Offline => Color::Yellow,
    };

    let mut spans = vec![
        Span::styled(
            "Steam Game Randomizer",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            format!("[{}]", app.mode.label()),
            Style::default().fg(mode_color),
        ),
    ];

    if app.mode == Mode::Online && !app.has_api_key() {
        spans.push(Span::styled(" no API key", Style::default().fg(Color::Red)));
    }
    if !app.games.is_empty() {
        spans.push(Span::raw(format!("  {} games", app.games.len())));
    }
    if let Some(fetched_at) = app.library_fetched_at {
        spans.push(Span::styled(
            format!("  updated {}", format_age(fetched_at, Utc::now())),
            Style::default().fg(Color::DarkGray),
        ));
        if app.library_stale {
            spans.push(Span::styled(" (stale)", Style::default().fg(Color::Yellow)));
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_settings(frame: &mut Frame, app: &App, area: Rect) {
    let (eligible, excluded) = app.candidate_counts();
    let exclude = if app.selector.exclude_rolled {
        format!("on ({} rolled)", app.selector.rolled().len())
    } else {
        "off".to_string()
    };

    let mut spans = vec![
        Span::styled("Max hours: ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{:.1}", app.max_hours),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled("  Eligible: ", Style::default().fg(Color::Gray)),
        Span::raw(eligible.to_string()),
        Span::styled("  Exclude rolled: ", Style::default().fg(Color::Gray)),
        Span::raw(exclude),
    ];
    if excluded > 0 {
        spans.push(Span::styled(
            format!("  ({} excluded)", excluded),
            Style::default().fg(Color::DarkGray),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let Some(status) = &app.status else {
        return;
    };
    let color = match status.kind {
        StatusKind::Info => Color::Cyan,
        StatusKind::Success => Color::Green,
        StatusKind::Warning => Color::Yellow,
        StatusKind::Error => Color::Red,
    };

    if let Some(bulk) = &app.bulk {
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(color).bg(Color::DarkGray))
            .ratio(bulk.ratio().clamp(0.0, 1.0))
            .label(status.text.as_str());
        frame.render_widget(gauge, area);
        return;
    }

    let paragraph =
        Paragraph::new(status.text.as_str()).style(Style::default().fg(color));
    frame.render_widget(paragraph, area);
}

fn render_hints(frame: &mut Frame, area: Rect) {
    let hints = Paragraph::new("Space roll  +/- hours  x exclude  m mode  f fetch  c cache  ? help  q quit")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(hints, area);
}

/// Renders a loading message while the library is read
pub fn render_loading(frame: &mut Frame, message: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(3),
            Constraint::Percentage(45),
        ])
        .split(frame.area());

    let loading_text = Paragraph::new(message.to_string())
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center);

    frame.render_widget(loading_text, chunks[1]);
}

/// Human-readable age of a cache entry, e.g. "3 days ago"
pub fn format_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(then);
    if age.num_days() >= 1 {
        let days = age.num_days();
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else if age.num_hours() >= 1 {
        format!("{}h ago", age.num_hours())
    } else if age.num_minutes() >= 1 {
        format!("{}m ago", age.num_minutes())
    } else {
        "just now".to_string()
    }
}
