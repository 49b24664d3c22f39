//! UI rendering module for steamroll
//!
//! This module contains all the rendering logic for the terminal user interface,
//! using the ratatui library for TUI components.

pub mod cache_overlay;
pub mod game_panel;
pub mod help_overlay;
pub mod randomizer;
pub mod text;

pub use randomizer::render_loading;
pub use text::clean_html_text;

use ratatui::Frame;

use crate::app::{App, AppState};

/// Renders the UI based on the current application state
pub fn render(frame: &mut Frame, app: &App) {
    match app.state {
        AppState::Loading => {
            let message = app
                .pending
                .map_or("Loading...", |action| action.progress_label());
            render_loading(frame, message);
        }
        AppState::Randomizer => {
            randomizer::render(frame, app);
        }
    }

    if let Some(stats) = &app.cache_overlay {
        cache_overlay::render(frame, stats, &app.cache_dir().display().to_string());
    }
    if app.show_help {
        help_overlay::render(frame);
    }
}
