//! Command-line interface parsing for steamroll
//!
//! This module handles parsing of CLI arguments using clap. The SteamID64 and
//! API key fall back to the `STEAM_ID64` and `STEAM_API_KEY` environment variables
//! so they can be pre-filled without typing them on every launch.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use crate::library::Mode;
use crate::selector::{DEFAULT_MAX_HOURS, MAX_HOURS_LIMIT};

/// Number of digits in a SteamID64
const STEAM_ID64_LEN: usize = 17;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The SteamID is not a 17-digit SteamID64
    #[error("Invalid SteamID64: '{0}'. Expected 17 digits, e.g. 76561197960287930")]
    InvalidSteamId(String),

    /// The playtime ceiling is out of range
    #[error("Invalid max hours: {0}. Expected a value between 0 and 100")]
    InvalidMaxHours(f64),
}

/// steamroll - Roll a random under-played game from your Steam library
#[derive(Parser, Debug)]
#[command(name = "steamroll")]
#[command(about = "Pick a random under-played game from your Steam library")]
#[command(version)]
pub struct Cli {
    /// Your SteamID64 (17 digits)
    #[arg(long, env = "STEAM_ID64", value_name = "STEAMID64")]
    pub steam_id: Option<String>,

    /// Steam Web API key, only needed in online mode
    ///
    /// Get one at https://steamcommunity.com/dev/apikey
    #[arg(long, env = "STEAM_API_KEY", hide_env_values = true, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Start in offline mode, using only cached data
    #[arg(long)]
    pub offline: bool,

    /// Initial playtime ceiling in hours
    #[arg(long, value_name = "HOURS", default_value_t = DEFAULT_MAX_HOURS)]
    pub max_hours: f64,

    /// Cache directory (defaults to the platform cache dir)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone, PartialEq)]
pub struct StartupConfig {
    /// Validated SteamID64, if one was given
    pub steam_id: Option<String>,
    /// Steam Web API key, if one was given
    pub api_key: Option<String>,
    /// Online or offline mode at startup
    pub mode: Mode,
    /// Initial playtime ceiling in hours
    pub max_hours: f64,
    /// Cache directory override
    pub cache_dir: Option<PathBuf>,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            steam_id: None,
            api_key: None,
            mode: Mode::Online,
            max_hours: DEFAULT_MAX_HOURS,
            cache_dir: None,
        }
    }
}

/// Parses a SteamID64 argument
///
/// # Returns
/// * `Ok(String)` with surrounding whitespace removed
/// * `Err(CliError::InvalidSteamId)` if it is not exactly 17 ASCII digits
pub fn parse_steam_id(s: &str) -> Result<String, CliError> {
    let trimmed = s.trim();
    if trimmed.len() == STEAM_ID64_LEN && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        Ok(trimmed.to_string())
    } else {
        Err(CliError::InvalidSteamId(s.to_string()))
    }
}

/// Checks that a playtime ceiling is finite and within `[0, 100]`
pub fn validate_max_hours(hours: f64) -> Result<f64, CliError> {
    if hours.is_finite() && (0.0..=MAX_HOURS_LIMIT).contains(&hours) {
        Ok(hours)
    } else {
        Err(CliError::InvalidMaxHours(hours))
    }
}

/// Treats empty strings (e.g. `STEAM_API_KEY=`) as absent
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with validated settings
    /// * `Err(CliError)` if the SteamID or ceiling is invalid
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let steam_id = non_empty(&cli.steam_id).map(parse_steam_id).transpose()?;
        let api_key = non_empty(&cli.api_key).map(str::to_string);
        let max_hours = validate_max_hours(cli.max_hours)?;
        let mode = if cli.offline {
            Mode::Offline
        } else {
            Mode::Online
        };

        Ok(StartupConfig {
            steam_id,
            api_key,
            mode,
            max_hours,
            cache_dir: cli.cache_dir.clone(),
        })
    }
}
