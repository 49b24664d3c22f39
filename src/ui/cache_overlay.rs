//! Cache statistics overlay

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::cache::{CacheStats, DETAILS_TTL_DAYS, LIBRARY_TTL_DAYS};
use crate::ui::help_overlay::centered_rect;

/// Renders cache statistics on top of the current view
pub fn render(frame: &mut Frame, stats: &CacheStats, cache_dir: &str) {
    let overlay_area = centered_rect(60, 12, frame.area());
    frame.render_widget(Clear, overlay_area);

    let label = Style::default().fg(Color::Gray);
    let lines = vec![
        Line::from(vec![
            Span::styled("Libraries:     ", label),
            Span::raw(format!("{} (kept {} days)", stats.libraries, LIBRARY_TTL_DAYS)),
        ]),
        Line::from(vec![
            Span::styled("Game details:  ", label),
            Span::raw(format!(
                "{} (kept {} days)",
                stats.game_details, DETAILS_TTL_DAYS
            )),
        ]),
        Line::from(vec![
            Span::styled("Total:         ", label),
            Span::raw(format!(
                "{} files, {:.2} MB",
                stats.total_files,
                stats.total_mib()
            )),
        ]),
        Line::from(vec![
            Span::styled("Location:      ", label),
            Span::raw(cache_dir.to_string()),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "C clear all cache   Esc close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let block = Block::default()
        .title(Span::styled(
            " Cache ",
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(Paragraph::new(lines).block(block), overlay_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn test_cache_overlay_renders_counts() {
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        let stats = CacheStats {
            libraries: 2,
            game_details: 31,
            total_files: 33,
            total_bytes: 3 * 1024 * 1024,
        };

        terminal
            .draw(|frame| render(frame, &stats, "/tmp/steamroll"))
            .unwrap();

        let content: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(content.contains("Libraries:     2 (kept 7 days)"));
        assert!(content.contains("31 (kept 30 days)"));
        assert!(content.contains("33 files, 3.00 MB"));
    }
}
