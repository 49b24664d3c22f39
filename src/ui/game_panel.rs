//! Rolled game panel
//!
//! Shows the rolled game with whatever store details and achievement progress
//! are available. Sections without data are left out.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, RolledGame};
use crate::data::{store_url, GameDetails, PriceLabel, Requirements};
use crate::library::Mode;
use crate::ui::text::clean_html_text;

mod colors {
    use ratatui::style::Color;

    pub const HEADER: Color = Color::Cyan;
    pub const LABEL: Color = Color::Gray;
    pub const SALE: Color = Color::Green;
    pub const STRUCK: Color = Color::DarkGray;
    pub const LINK: Color = Color::Blue;
}

/// Genres shown before the list is cut
const GENRE_LIMIT: usize = 3;

/// Renders the rolled game, or a prompt when nothing has been rolled yet
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors::HEADER));

    let Some(rolled) = &app.current else {
        let prompt = Paragraph::new(Line::from(Span::styled(
            "Press Space to roll a game",
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        frame.render_widget(prompt, area);
        return;
    };

    let block = block.title(Span::styled(
        format!(" {} ", rolled.game.name),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    ));
    let paragraph = Paragraph::new(game_lines(rolled, app.mode))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll_offset, 0));

    frame.render_widget(paragraph, area);
}

/// Builds the panel content for a rolled game
pub fn game_lines(rolled: &RolledGame, mode: Mode) -> Vec<Line<'static>> {
    let game = &rolled.game;
    let mut lines = vec![
        field("Playtime", format!("{:.1} hours", game.playtime_hours())),
        field("AppID", game.app_id.to_string()),
    ];

    if let Some(achievements) = rolled.achievements {
        if achievements.total > 0 {
            lines.push(field(
                "Achievements",
                format!(
                    "{}/{} ({:.0}%)",
                    achievements.unlocked,
                    achievements.total,
                    achievements.percent()
                ),
            ));
        }
    }

    match &rolled.details {
        Some(details) => push_details(&mut lines, details),
        None => {
            lines.push(Line::from(""));
            let note = match mode {
                Mode::Offline => "Game details not available offline",
                Mode::Online => "Could not fetch additional details",
            };
            lines.push(Line::from(Span::styled(
                note,
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("Store: ", Style::default().fg(colors::LABEL)),
        Span::styled(store_url(game.app_id), Style::default().fg(colors::LINK)),
    ]));
    lines.push(Line::from(vec![
        Span::styled("Image: ", Style::default().fg(colors::LABEL)),
        Span::styled(game.header_image_url(), Style::default().fg(colors::LINK)),
    ]));
    lines
}

fn push_details(lines: &mut Vec<Line<'static>>, details: &GameDetails) {
    if let Some(release) = &details.release_date {
        let date = if release.coming_soon {
            format!("{} (coming soon)", release.date)
        } else {
            release.date.clone()
        };
        lines.push(field("Release Date", date));
    }

    let genres = details.genre_names(GENRE_LIMIT);
    if !genres.is_empty() {
        lines.push(field("Genres", genres.join(", ")));
    }

    if let Some(score) = details.metacritic.as_ref().and_then(|m| m.score) {
        lines.push(field("Metacritic", format!("{}/100", score)));
    }
    if let Some(recommendations) = &details.recommendations {
        lines.push(field("Recommendations", recommendations.total.to_string()));
    }
    if let Some(price) = details.price_label() {
        lines.push(price_line(price));
    }

    if let Some(description) = &details.short_description {
        let description = clean_html_text(description);
        if !description.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(description));
        }
    }

    lines.push(Line::from(""));
    lines.push(section("Game Information"));
    if !details.developers.is_empty() {
        lines.push(field("Developer", details.developers.join(", ")));
    }
    if !details.publishers.is_empty() {
        lines.push(field("Publisher", details.publishers.join(", ")));
    }
    let platforms = details.platform_names();
    if !platforms.is_empty() {
        lines.push(field("Platforms", platforms.join(", ")));
    }
    if let Some(controller) = &details.controller_support {
        lines.push(field("Controller Support", capitalize(controller)));
    }

    let features: Vec<&str> = [
        ("Steam Cloud", "Cloud Saves"),
        ("Family Sharing", "Family Sharing"),
        ("Remote Play", "Remote Play"),
    ]
    .into_iter()
    .filter(|(category, _)| details.has_category(category))
    .map(|(_, label)| label)
    .collect();
    if !features.is_empty() {
        lines.push(field("Features", features.join(", ")));
    }

    if let Some(age) = details.age_rating() {
        lines.push(field("Age Rating", format!("{}+", age)));
    }
    if let Some(languages) = &details.supported_languages {
        let languages = clean_html_text(languages);
        if !languages.is_empty() {
            lines.push(field("Languages", languages));
        }
    }
    if let Some(drm) = &details.drm_notice {
        lines.push(field("DRM", clean_html_text(drm)));
    }

    if let Some(requirements) = &details.pc_requirements {
        push_requirements(lines, requirements);
    }
}

fn push_requirements(lines: &mut Vec<Line<'static>>, requirements: &Requirements) {
    let parts: Vec<&str> = match requirements {
        Requirements::Empty(_) => return,
        Requirements::Text(text) => vec![text.as_str()],
        Requirements::Split {
            minimum,
            recommended,
        } => [minimum.as_deref(), recommended.as_deref()]
            .into_iter()
            .flatten()
            .collect(),
    };

    let cleaned: Vec<String> = parts
        .into_iter()
        .map(clean_html_text)
        .filter(|text| !text.is_empty())
        .collect();
    if cleaned.is_empty() {
        return;
    }

    lines.push(Line::from(""));
    lines.push(section("PC Requirements"));
    for text in cleaned {
        lines.extend(text.lines().map(|line| Line::from(line.to_string())));
    }
}

fn price_line(price: PriceLabel) -> Line<'static> {
    let label = Span::styled("Price: ", Style::default().fg(colors::LABEL));
    match price {
        PriceLabel::Free => Line::from(vec![
            label,
            Span::styled("Free to Play", Style::default().fg(colors::SALE)),
        ]),
        PriceLabel::OnSale { original, current } => Line::from(vec![
            label,
            Span::styled(
                original,
                Style::default()
                    .fg(colors::STRUCK)
                    .add_modifier(Modifier::CROSSED_OUT),
            ),
            Span::raw(" "),
            Span::styled(current, Style::default().fg(colors::SALE)),
        ]),
        PriceLabel::Regular(current) => Line::from(vec![label, Span::raw(current)]),
    }
}

fn field(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", label), Style::default().fg(colors::LABEL)),
        Span::raw(value),
    ])
}

fn section(title: &'static str) -> Line<'static> {
    Line::from(Span::styled(
        title,
        Style::default()
            .fg(colors::HEADER)
            .add_modifier(Modifier::BOLD),
    ))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
