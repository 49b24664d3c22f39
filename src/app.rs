//! Application state management for steamroll
//!
//! This module contains the main application state, handling keyboard input,
//! library loading, rolling, and state transitions between views. Key presses
//! that need the network or the cache queue an [`Action`]; the event loop runs
//! it to completion before reading the next key.

use std::path::Path;

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use tracing::{info, warn};

use crate::cache::CacheStats;
use crate::cli::StartupConfig;
use crate::data::{store_url, AchievementSummary, GameDetails, GameRecord};
use crate::library::{BulkReport, Library, LibraryError, Mode, REFRESH_DETAILS_LIMIT};
use crate::selector::{step_max_hours, Selector};
use crate::ui::game_panel::game_lines;

/// Application state enum representing the current view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppState {
    /// Initial loading state while the library is read
    Loading,
    /// Randomizer view
    Randomizer,
}

/// Work queued by a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Load the library the way the current mode allows
    LoadLibrary,
    /// Fetch the library from Steam, ignoring the cache
    FetchFresh,
    /// Fetch the library and merge it into the loaded one
    UpdateExisting,
    /// Download details for every game
    DownloadAllDetails,
    /// Re-fetch details for the first few games
    RefreshDetails,
    /// Pick a game and look up its details
    Roll,
}

impl Action {
    /// Status line shown while the action runs
    pub fn progress_label(self) -> &'static str {
        match self {
            Action::LoadLibrary => "Loading library...",
            Action::FetchFresh => "Fetching fresh data from Steam...",
            Action::UpdateExisting => "Updating existing data...",
            Action::DownloadAllDetails => {
                "Downloading all game details (this may take a while)..."
            }
            Action::RefreshDetails => "Refreshing game details...",
            Action::Roll => "Rolling...",
        }
    }
}

/// Severity of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Warning,
    Error,
}

/// One-line message shown under the randomizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    fn new(kind: StatusKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// The most recent roll with whatever metadata could be found
#[derive(Debug, Clone)]
pub struct RolledGame {
    pub game: GameRecord,
    pub details: Option<GameDetails>,
    pub achievements: Option<AchievementSummary>,
}

/// A details download running one game per event-loop turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkProgress {
    /// Index of the next game to process
    pub next: usize,
    /// Number of games in the run
    pub total: usize,
    /// Counts so far
    pub report: BulkReport,
}

impl BulkProgress {
    /// Completed share in `[0, 1]`
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.next as f64 / self.total as f64
    }
}

/// Main application struct managing state and data
pub struct App {
    /// Current application state/view
    pub state: AppState,
    /// Online or offline
    pub mode: Mode,
    /// SteamID64 whose library is shown
    pub steam_id: Option<String>,
    /// Loaded library
    pub games: Vec<GameRecord>,
    /// When the loaded library was fetched from Steam
    pub library_fetched_at: Option<DateTime<Utc>>,
    /// Whether the loaded library is past its TTL
    pub library_stale: bool,
    /// Playtime ceiling in hours
    pub max_hours: f64,
    /// Rolled-set tracking and selection
    pub selector: Selector,
    /// Last rolled game
    pub current: Option<RolledGame>,
    /// Last status message
    pub status: Option<StatusMessage>,
    /// Action to run before the next key is read
    pub pending: Option<Action>,
    /// Details download in progress
    pub bulk: Option<BulkProgress>,
    /// Flag indicating the application should quit
    pub should_quit: bool,
    /// Flag to show help overlay
    pub show_help: bool,
    /// Cache overlay contents, shown while `Some`
    pub cache_overlay: Option<CacheStats>,
    /// Scroll offset for the game panel
    pub detail_scroll_offset: u16,
    library: Library,
}

impl App {
    /// Creates a new App from the startup configuration
    ///
    /// With a SteamID the library load is queued; without one the randomizer
    /// opens empty with an explanation.
    pub fn new(config: StartupConfig, library: Library) -> Self {
        let mut app = Self {
            state: AppState::Loading,
            mode: config.mode,
            steam_id: config.steam_id,
            games: Vec::new(),
            library_fetched_at: None,
            library_stale: false,
            max_hours: config.max_hours,
            selector: Selector::new(false),
            current: None,
            status: None,
            pending: None,
            bulk: None,
            should_quit: false,
            show_help: false,
            cache_overlay: None,
            detail_scroll_offset: 0,
            library,
        };

        if app.steam_id.is_some() {
            app.pending = Some(Action::LoadLibrary);
        } else {
            app.state = AppState::Randomizer;
            app.set_status(
                StatusKind::Error,
                "No SteamID64 given. Pass --steam-id or set STEAM_ID64.",
            );
        }
        app
    }

    fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(StatusMessage::new(kind, text));
    }

    /// Directory the cache lives in
    pub fn cache_dir(&self) -> &Path {
        self.library.cache().cache_dir()
    }

    /// Whether online actions can reach the Steam Web API
    pub fn has_api_key(&self) -> bool {
        self.library.has_api_key()
    }

    /// Number of games under the ceiling and how many the rolled set hides
    pub fn candidate_counts(&self) -> (usize, usize) {
        let candidates = self.selector.candidates(&self.games, self.max_hours);
        (candidates.games.len(), candidates.excluded)
    }

    /// Handles keyboard input and updates state accordingly
    ///
    /// # Key Bindings
    /// - `Space`/`Enter`: Roll a game
    /// - `+`/`-`: Raise/lower the playtime ceiling by half an hour
    /// - `x`: Toggle "exclude rolled games"
    /// - `R`: Reset rolled games
    /// - `m`: Switch between online and offline mode
    /// - `f`/`u`: Fetch fresh library / update existing library (online)
    /// - `d`/`D`: Download all details / refresh details (online)
    /// - `c`/`C`: Show cache stats / clear the cache
    /// - `o`: Open the rolled game's store page
    /// - `j`/`k`: Scroll the game panel
    /// - `?`: Help
    /// - `q` or `Esc`: Quit
    pub fn handle_key(&mut self, key_event: KeyEvent) {
        // A running download only listens for cancel and quit
        if self.bulk.is_some() {
            match key_event.code {
                KeyCode::Esc => self.cancel_bulk(),
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            }
            return;
        }

        // Overlays intercept all keys while shown
        if self.show_help {
            if matches!(
                key_event.code,
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')
            ) {
                self.show_help = false;
            }
            return;
        }
        if self.cache_overlay.is_some() {
            match key_event.code {
                KeyCode::Esc | KeyCode::Char('c') | KeyCode::Char('q') => {
                    self.cache_overlay = None;
                }
                KeyCode::Char('C') => {
                    self.clear_cache();
                    self.cache_overlay = Some(self.library.cache().stats());
                }
                _ => {}
            }
            return;
        }

        match self.state {
            AppState::Loading => {
                // Only quit is allowed during loading
                if key_event.code == KeyCode::Char('q') {
                    self.should_quit = true;
                }
            }
            AppState::Randomizer => match key_event.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    self.should_quit = true;
                }
                KeyCode::Char(' ') | KeyCode::Enter => {
                    self.queue_roll();
                }
                KeyCode::Char('+') | KeyCode::Char('=') => {
                    self.max_hours = step_max_hours(self.max_hours, true);
                }
                KeyCode::Char('-') => {
                    self.max_hours = step_max_hours(self.max_hours, false);
                }
                KeyCode::Char('x') => {
                    self.selector.exclude_rolled = !self.selector.exclude_rolled;
                }
                KeyCode::Char('R') => {
                    self.selector.reset();
                    self.set_status(StatusKind::Success, "Rolled games reset!");
                }
                KeyCode::Char('m') => {
                    self.mode = self.mode.toggle();
                    info!(mode = self.mode.label(), "mode switched");
                    if self.steam_id.is_some() {
                        self.pending = Some(Action::LoadLibrary);
                    }
                }
                KeyCode::Char('f') => {
                    self.queue_online(Action::FetchFresh, false);
                }
                KeyCode::Char('u') => {
                    self.queue_online(Action::UpdateExisting, true);
                }
                KeyCode::Char('d') => {
                    self.queue_online(Action::DownloadAllDetails, true);
                }
                KeyCode::Char('D') => {
                    self.queue_online(Action::RefreshDetails, true);
                }
                KeyCode::Char('c') => {
                    self.cache_overlay = Some(self.library.cache().stats());
                }
                KeyCode::Char('C') => {
                    self.clear_cache();
                }
                KeyCode::Char('o') => {
                    self.open_store_page();
                }
                KeyCode::Char('j') | KeyCode::Down => {
                    self.scroll_down();
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    self.scroll_up();
                }
                KeyCode::Char('?') => {
                    self.show_help = true;
                }
                _ => {}
            },
        }
    }

    fn queue_roll(&mut self) {
        if self.games.is_empty() {
            self.set_status(StatusKind::Warning, "No games loaded yet.");
            return;
        }
        self.pending = Some(Action::Roll);
    }

    /// Queues an action that needs online mode and a SteamID
    fn queue_online(&mut self, action: Action, needs_games: bool) {
        if self.mode == Mode::Offline {
            self.set_status(StatusKind::Warning, "Switch to online mode (m) first.");
            return;
        }
        if self.steam_id.is_none() {
            self.set_status(StatusKind::Error, "No SteamID64 given.");
            return;
        }
        if needs_games && self.games.is_empty() {
            self.set_status(StatusKind::Warning, "Fetch your library (f) first.");
            return;
        }
        self.pending = Some(action);
    }

    fn clear_cache(&mut self) {
        match self.library.cache().clear() {
            Ok(()) => self.set_status(StatusKind::Success, "Cache cleared!"),
            Err(e) => self.set_status(StatusKind::Error, format!("Could not clear cache: {}", e)),
        }
    }

    fn open_store_page(&mut self) {
        let Some(rolled) = &self.current else {
            return;
        };
        let url = store_url(rolled.game.app_id);
        if let Err(e) = open::that(&url) {
            self.set_status(StatusKind::Warning, format!("Could not open {}: {}", url, e));
        }
    }

    /// Shows the queued action's progress label in the status line
    pub fn show_progress(&mut self) {
        if self.state != AppState::Randomizer {
            return;
        }
        if let Some(action) = self.pending {
            self.set_status(StatusKind::Info, action.progress_label());
        }
    }

    /// Runs the queued action, if any
    pub async fn run_pending(&mut self) {
        let Some(action) = self.pending.take() else {
            return;
        };

        match action {
            Action::LoadLibrary => self.load_library().await,
            Action::FetchFresh => self.fetch_fresh().await,
            Action::UpdateExisting => self.update_existing().await,
            Action::DownloadAllDetails => self.start_bulk(),
            Action::RefreshDetails => self.refresh_details().await,
            Action::Roll => self.roll().await,
        }
        self.state = AppState::Randomizer;
    }

    async fn load_library(&mut self) {
        let Some(steam_id) = self.steam_id.clone() else {
            return;
        };
        match self.library.load(&steam_id, self.mode).await {
            Ok(loaded) => {
                let count = loaded.games.len();
                self.games = loaded.games;
                self.library_fetched_at = Some(loaded.fetched_at);
                self.library_stale = loaded.is_stale;
                if loaded.is_stale {
                    self.set_status(
                        StatusKind::Warning,
                        "Cache is older than 7 days. Consider refreshing.",
                    );
                } else {
                    self.set_status(StatusKind::Success, format!("{} games loaded", count));
                }
            }
            Err(e) => self.report(e),
        }
    }

    async fn fetch_fresh(&mut self) {
        let Some(steam_id) = self.steam_id.clone() else {
            return;
        };
        match self.library.fetch_fresh(&steam_id).await {
            Ok(loaded) => {
                self.set_status(
                    StatusKind::Success,
                    format!("Found {} games in your library!", loaded.games.len()),
                );
                self.games = loaded.games;
                self.library_fetched_at = Some(loaded.fetched_at);
                self.library_stale = false;
            }
            Err(e) => self.report(e),
        }
    }

    async fn update_existing(&mut self) {
        let Some(steam_id) = self.steam_id.clone() else {
            return;
        };
        match self.library.update_existing(&steam_id, &mut self.games).await {
            Ok((updated, added)) => {
                self.library_fetched_at = Some(Utc::now());
                self.library_stale = false;
                self.set_status(
                    StatusKind::Success,
                    format!(
                        "Updated {} existing games, added {} new games!",
                        updated, added
                    ),
                );
            }
            Err(e) => self.report(e),
        }
    }

    fn start_bulk(&mut self) {
        self.bulk = Some(BulkProgress {
            total: self.games.len(),
            ..Default::default()
        });
        self.announce_next_download();
    }

    /// Whether a details download is still running
    pub fn is_busy(&self) -> bool {
        self.bulk.is_some()
    }

    /// Processes the next game of a running details download
    ///
    /// The event loop calls this once per turn so the progress bar redraws and
    /// keys stay responsive between games.
    pub async fn step_bulk(&mut self) {
        let Some(mut bulk) = self.bulk else {
            return;
        };

        if let Some(game) = self.games.get(bulk.next) {
            let outcome = self.library.download_details(game).await;
            bulk.report.record(outcome);
            bulk.next += 1;
        } else {
            // The library shrank under the run
            bulk.next = bulk.total;
        }

        if bulk.next >= bulk.total {
            self.bulk = None;
            self.finish_bulk(bulk.report);
        } else {
            self.bulk = Some(bulk);
            self.announce_next_download();
        }
    }

    fn announce_next_download(&mut self) {
        let Some(bulk) = self.bulk else {
            return;
        };
        let Some(game) = self.games.get(bulk.next) else {
            return;
        };
        let text = format!(
            "Downloading details for: {} ({}/{})",
            game.name,
            bulk.next + 1,
            bulk.total
        );
        self.set_status(StatusKind::Info, text);
    }

    fn finish_bulk(&mut self, report: BulkReport) {
        info!(
            downloaded = report.downloaded,
            failed = report.failed,
            "bulk details download finished"
        );
        if report.failed > 0 {
            self.set_status(
                StatusKind::Warning,
                format!(
                    "Downloaded {} game details, {} failed",
                    report.downloaded, report.failed
                ),
            );
        } else {
            self.set_status(
                StatusKind::Success,
                format!(
                    "Successfully downloaded/cached {} game details!",
                    report.downloaded
                ),
            );
        }
    }

    fn cancel_bulk(&mut self) {
        let Some(bulk) = self.bulk.take() else {
            return;
        };
        info!(done = bulk.next, total = bulk.total, "bulk details download cancelled");
        self.set_status(
            StatusKind::Warning,
            format!(
                "Download cancelled after {} of {} games",
                bulk.next, bulk.total
            ),
        );
    }

    async fn refresh_details(&mut self) {
        let report = self
            .library
            .refresh_details(&self.games, REFRESH_DETAILS_LIMIT)
            .await;
        if report.failed > 0 {
            self.set_status(
                StatusKind::Warning,
                format!(
                    "Refreshed {} games, {} failed. Check your connection.",
                    report.downloaded, report.failed
                ),
            );
        } else {
            self.set_status(
                StatusKind::Success,
                format!("Refreshed {} games!", report.downloaded),
            );
        }
    }

    async fn roll(&mut self) {
        let mut rng = rand::rng();
        let game = match self.selector.roll(&self.games, self.max_hours, &mut rng) {
            Ok(game) => game.clone(),
            Err(e) => {
                self.set_status(StatusKind::Warning, e.to_string());
                return;
            }
        };
        info!(app_id = game.app_id, name = %game.name, "rolled");

        let steam_id = self.steam_id.clone().unwrap_or_default();
        let (details, achievements) = futures::future::join(
            self.library.details_for(game.app_id, self.mode),
            self.library
                .achievements_for(&steam_id, game.app_id, self.mode),
        )
        .await;

        let details = details.unwrap_or_else(|e| {
            warn!(app_id = game.app_id, error = %e, "details unavailable");
            None
        });
        let achievements = achievements.unwrap_or_else(|e| {
            warn!(app_id = game.app_id, error = %e, "achievements unavailable");
            None
        });

        if details.is_none() && self.mode == Mode::Offline {
            self.set_status(
                StatusKind::Info,
                "Game details not available offline. Use online mode to cache details.",
            );
        } else if details.is_none() {
            self.set_status(StatusKind::Warning, "Could not fetch additional details.");
        } else {
            let (_, excluded) = self.candidate_counts();
            if excluded > 0 {
                self.set_status(
                    StatusKind::Info,
                    format!("Excluded {} previously rolled games", excluded),
                );
            } else {
                self.status = None;
            }
        }

        self.detail_scroll_offset = 0;
        self.current = Some(RolledGame {
            game,
            details,
            achievements,
        });
    }

    fn report(&mut self, error: LibraryError) {
        warn!(error = %error, "library action failed");
        self.set_status(StatusKind::Error, error.to_string());
    }

    /// Scrolls up in the game panel, stopping at 0
    pub fn scroll_up(&mut self) {
        self.detail_scroll_offset = self.detail_scroll_offset.saturating_sub(1);
    }

    /// Scrolls down in the game panel, stopping with the last line at the top
    pub fn scroll_down(&mut self) {
        let line_count = self
            .current
            .as_ref()
            .map_or(0, |rolled| game_lines(rolled, self.mode).len());
        let max_scroll = u16::try_from(line_count.saturating_sub(1)).unwrap_or(u16::MAX);
        if self.detail_scroll_offset < max_scroll {
            self.detail_scroll_offset += 1;
        }
    }
}
