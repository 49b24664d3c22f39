//! steamroll - Roll a random under-played game from your Steam library
//!
//! A terminal UI that loads a Steam library (online or from the local cache),
//! filters it by a playtime ceiling, and picks a game at random.

use std::io;
use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;

use steamroll::app::App;
use steamroll::cache::CacheManager;
use steamroll::cli::{Cli, StartupConfig};
use steamroll::data::SteamClient;
use steamroll::library::Library;
use steamroll::{logging, ui};

/// Used when no platform cache directory can be determined
const FALLBACK_CACHE_DIR: &str = "cache";

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// This ensures the terminal is usable even if the application panics.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Attempt to restore the terminal
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        // Call the original panic hook
        original_hook(panic_info);
    }));
}

fn cache_manager(config: &StartupConfig) -> CacheManager {
    match &config.cache_dir {
        Some(dir) => CacheManager::with_dir(dir.clone()),
        None => CacheManager::new()
            .unwrap_or_else(|| CacheManager::with_dir(PathBuf::from(FALLBACK_CACHE_DIR))),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Validate before touching the terminal so errors stay readable
    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let cache = cache_manager(&config);
    let log_dir = logging::default_log_dir().unwrap_or_else(|| cache.cache_dir().to_path_buf());
    let _log_guard = logging::init_file_logging(&log_dir);
    info!(
        mode = config.mode.label(),
        cache_dir = %cache.cache_dir().display(),
        "starting steamroll"
    );

    let library = Library::new(SteamClient::new(), cache, config.api_key.clone());
    let mut app = App::new(config, library);

    // Set up panic hook to restore terminal on crash
    setup_panic_hook();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main event loop
    loop {
        // Show progress, then run queued work before reading more keys
        if app.pending.is_some() {
            app.show_progress();
            terminal.draw(|f| ui::render(f, &app))?;
            app.run_pending().await;
        }

        terminal.draw(|f| ui::render(f, &app))?;

        // A details download advances one game per turn; keys are only
        // peeked at in between so Esc and q stay responsive
        let timeout = if app.is_busy() {
            Duration::ZERO
        } else {
            Duration::from_millis(100)
        };
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }

        // Check if we should quit
        if app.should_quit {
            break;
        }

        if app.is_busy() {
            app.step_bulk().await;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    info!("exiting");
    Ok(ExitCode::SUCCESS)
}
