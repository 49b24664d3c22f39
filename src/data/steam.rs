//! Steam Web API client
//!
//! Fetches the owned-games list, store details and player achievements, and
//! parses the responses into our data structures.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use super::{AchievementSummary, GameDetails, GameRecord};

/// Base URL for the Steam Web API
const STEAM_API_BASE_URL: &str = "https://api.steampowered.com";

/// Base URL for the Steam store API
const STEAM_STORE_BASE_URL: &str = "https://store.steampowered.com/api";

/// Applied to every request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors that can occur when talking to Steam
#[derive(Debug, Error)]
pub enum SteamError {
    /// HTTP request failed (unreachable, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Steam refused the API key
    #[error("Steam rejected the request (HTTP {0}); check the API key")]
    Unauthorized(u16),

    /// Any other non-success status
    #[error("Steam API returned HTTP {0}")]
    Status(u16),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// The response carried no games list
    #[error("No games found or profile is private")]
    NoGames,
}

/// Client for the Steam Web API and store API
#[derive(Debug, Clone)]
pub struct SteamClient {
    client: Client,
    api_base: String,
    store_base: String,
}

impl Default for SteamClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SteamClient {
    /// Create a new SteamClient pointed at the public Steam endpoints
    pub fn new() -> Self {
        Self::with_base_urls(STEAM_API_BASE_URL, STEAM_STORE_BASE_URL)
    }

    /// Create a client with custom base URLs
    ///
    /// `api_base` replaces `https://api.steampowered.com` and `store_base`
    /// replaces `https://store.steampowered.com/api`.
    pub fn with_base_urls(api_base: impl Into<String>, store_base: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_base: api_base.into(),
            store_base: store_base.into(),
        }
    }

    /// Fetch every game owned by `steam_id`, including played free games
    ///
    /// # Returns
    /// * `Ok(Vec<GameRecord>)` - The library
    /// * `Err(SteamError::NoGames)` - If the profile is private or empty
    /// * `Err(SteamError)` - If the request or parsing fails
    pub async fn fetch_owned_games(
        &self,
        api_key: &str,
        steam_id: &str,
    ) -> Result<Vec<GameRecord>, SteamError> {
        let url = format!("{}/IPlayerService/GetOwnedGames/v1/", self.api_base);
        info!(steam_id, "fetching owned games");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", api_key),
                ("steamid", steam_id),
                ("include_appinfo", "true"),
                ("include_played_free_games", "true"),
            ])
            .send()
            .await?;

        check_status(response.status())?;
        let text = response.text().await?;
        parse_owned_games(&text)
    }

    /// Fetch store details for one app
    ///
    /// Returns `Ok(None)` when the store reports no data for the app.
    pub async fn fetch_game_details(&self, app_id: u32) -> Result<Option<GameDetails>, SteamError> {
        let url = format!("{}/appdetails", self.store_base);
        debug!(app_id, "fetching store details");

        let response = self
            .client
            .get(&url)
            .query(&[("appids", app_id.to_string())])
            .send()
            .await?;

        check_status(response.status())?;
        let text = response.text().await?;
        parse_app_details(&text, app_id)
    }

    /// Fetch the achievement summary of `steam_id` for one app
    ///
    /// Returns `Ok(None)` for apps without stats; Steam answers those with
    /// HTTP 400 and `success: false`, so the body is inspected before the status.
    pub async fn fetch_achievements(
        &self,
        api_key: &str,
        steam_id: &str,
        app_id: u32,
    ) -> Result<Option<AchievementSummary>, SteamError> {
        let url = format!("{}/ISteamUserStats/GetPlayerAchievements/v1/", self.api_base);
        debug!(app_id, "fetching achievements");
        let app_id = app_id.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", api_key),
                ("steamid", steam_id),
                ("appid", app_id.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        match parse_achievements(&text) {
            Ok(summary) if status.is_success() || summary.is_none() => Ok(summary),
            Ok(_) => Err(status_error(status)),
            Err(e) => {
                check_status(status)?;
                Err(e)
            }
        }
    }
}

fn status_error(status: StatusCode) -> SteamError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SteamError::Unauthorized(status.as_u16()),
        _ => SteamError::Status(status.as_u16()),
    }
}

fn check_status(status: StatusCode) -> Result<(), SteamError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(status_error(status))
    }
}

/// Parse a `GetOwnedGames` body
fn parse_owned_games(text: &str) -> Result<Vec<GameRecord>, SteamError> {
    let parsed: OwnedGamesResponse = serde_json::from_str(text)?;
    parsed.response.games.ok_or(SteamError::NoGames)
}

/// Parse an `appdetails` body for `app_id`
fn parse_app_details(text: &str, app_id: u32) -> Result<Option<GameDetails>, SteamError> {
    let mut parsed: HashMap<String, AppDetailsEnvelope> = serde_json::from_str(text)?;
    Ok(parsed
        .remove(&app_id.to_string())
        .filter(|envelope| envelope.success)
        .and_then(|envelope| envelope.data))
}

/// Parse a `GetPlayerAchievements` body
fn parse_achievements(text: &str) -> Result<Option<AchievementSummary>, SteamError> {
    let parsed: PlayerAchievementsResponse = serde_json::from_str(text)?;
    let stats = parsed.playerstats;
    if !stats.success {
        return Ok(None);
    }
    let Some(achievements) = stats.achievements else {
        return Ok(None);
    };
    let unlocked = achievements.iter().filter(|a| a.achieved == 1).count();
    Ok(Some(AchievementSummary {
        total: achievements.len() as u32,
        unlocked: unlocked as u32,
    }))
}

/// `GetOwnedGames` response structure
#[derive(Debug, Deserialize)]
struct OwnedGamesResponse {
    response: OwnedGamesBody,
}

#[derive(Debug, Deserialize)]
struct OwnedGamesBody {
    #[serde(default)]
    games: Option<Vec<GameRecord>>,
}

/// One entry of the `appdetails` map
#[derive(Debug, Deserialize)]
struct AppDetailsEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<GameDetails>,
}

/// `GetPlayerAchievements` response structure
#[derive(Debug, Deserialize)]
struct PlayerAchievementsResponse {
    playerstats: PlayerStats,
}

#[derive(Debug, Deserialize)]
struct PlayerStats {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    achievements: Option<Vec<PlayerAchievement>>,
}

#[derive(Debug, Deserialize)]
struct PlayerAchievement {
    achieved: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{PriceLabel, Requirements};

    /// Sample `GetOwnedGames` response
    const OWNED_GAMES_RESPONSE: &str = r#"{
        "response": {
            "game_count": 3,
            "games": [
                {"appid": 220, "name": "Half-Life 2", "playtime_forever": 1320, "img_icon_url": "fcfb366051782b8ebf2aa297f3b746395858cb62", "has_community_visible_stats": true},
                {"appid": 620, "name": "Portal 2", "playtime_forever": 45},
                {"appid": 4000, "name": "Garry's Mod"}
            ]
        }
    }"#;

    /// Sample `appdetails` response
    const APP_DETAILS_RESPONSE: &str = r#"{
        "620": {
            "success": true,
            "data": {
                "type": "game",
                "name": "Portal 2",
                "steam_appid": 620,
                "required_age": 0,
                "is_free": false,
                "short_description": "The &quot;Perpetual Testing Initiative&quot; has been expanded.",
                "supported_languages": "English<strong>*</strong>, French<br><strong>*</strong>languages with full audio support",
                "pc_requirements": {"minimum": "<strong>Minimum:</strong><br><ul class=\"bb_ul\"><li><strong>OS:</strong> Windows 7</li><li><strong>Memory:</strong> 2 GB RAM</li></ul>"},
                "mac_requirements": [],
                "developers": ["Valve"],
                "publishers": ["Valve"],
                "price_overview": {"currency": "USD", "initial": 999, "final": 199, "discount_percent": 80, "initial_formatted": "$9.99", "final_formatted": "$1.99"},
                "platforms": {"windows": true, "mac": true, "linux": true},
                "metacritic": {"score": 95, "url": "https://www.metacritic.com/game/pc/portal-2"},
                "categories": [{"id": 2, "description": "Single-player"}, {"id": 23, "description": "Steam Cloud"}],
                "genres": [{"id": "1", "description": "Action"}, {"id": "25", "description": "Adventure"}],
                "recommendations": {"total": 412345},
                "release_date": {"coming_soon": false, "date": "18 Apr, 2011"},
                "controller_support": "full"
            }
        }
    }"#;

    #[test]
    fn test_parse_owned_games() {
        let games = parse_owned_games(OWNED_GAMES_RESPONSE).expect("Should parse");

        assert_eq!(games.len(), 3);
        assert_eq!(games[0].app_id, 220);
        assert_eq!(games[0].playtime_minutes, 1320);
        assert_eq!(games[1].name, "Portal 2");
        assert_eq!(games[2].playtime_minutes, 0, "Missing playtime defaults to 0");
    }

    #[test]
    fn test_parse_owned_games_private_profile() {
        let result = parse_owned_games(r#"{"response": {}}"#);
        assert!(matches!(result, Err(SteamError::NoGames)));
    }

    #[test]
    fn test_parse_owned_games_invalid_json() {
        let result = parse_owned_games("<html>Forbidden</html>");
        assert!(matches!(result, Err(SteamError::ParseError(_))));
    }

    #[test]
    fn test_parse_app_details() {
        let details = parse_app_details(APP_DETAILS_RESPONSE, 620)
            .expect("Should parse")
            .expect("Should have data");

        assert_eq!(details.name.as_deref(), Some("Portal 2"));
        assert_eq!(details.genre_names(3), vec!["Action", "Adventure"]);
        assert_eq!(details.metacritic.as_ref().and_then(|m| m.score), Some(95));
        assert_eq!(details.recommendations.as_ref().map(|r| r.total), Some(412345));
        assert_eq!(details.age_rating(), None);
        assert_eq!(details.platform_names(), vec!["Windows", "Mac", "Linux"]);
        assert_eq!(details.controller_support.as_deref(), Some("full"));
        assert!(matches!(
            details.price_label(),
            Some(PriceLabel::OnSale { .. })
        ));
        assert!(matches!(
            details.pc_requirements,
            Some(Requirements::Split { minimum: Some(_), .. })
        ));
    }

    #[test]
    fn test_parse_app_details_unsuccessful() {
        let result = parse_app_details(r#"{"999": {"success": false}}"#, 999).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_parse_app_details_wrong_app() {
        let result = parse_app_details(APP_DETAILS_RESPONSE, 220).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_parse_achievements_counts_unlocked() {
        let body = r#"{"playerstats": {"steamID": "7656", "gameName": "Portal 2", "success": true,
            "achievements": [
                {"apiname": "A", "achieved": 1, "unlocktime": 1300000000},
                {"apiname": "B", "achieved": 0, "unlocktime": 0},
                {"apiname": "C", "achieved": 1, "unlocktime": 1300000001}
            ]}}"#;
        let summary = parse_achievements(body).unwrap().expect("Should have summary");
        assert_eq!(summary.total, 3);
        assert_eq!(summary.unlocked, 2);
    }

    #[test]
    fn test_parse_achievements_without_stats() {
        let body = r#"{"playerstats": {"error": "Requested app has no stats", "success": false}}"#;
        assert!(parse_achievements(body).unwrap().is_none());
    }

    #[test]
    fn test_status_error_maps_auth_failures() {
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN),
            SteamError::Unauthorized(403)
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR),
            SteamError::Status(500)
        ));
        assert!(check_status(StatusCode::OK).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_request_failure() {
        let client = SteamClient::with_base_urls("http://127.0.0.1:1", "http://127.0.0.1:1");
        let result = client.fetch_owned_games("key", "76561198000000000").await;
        assert!(matches!(result, Err(SteamError::RequestFailed(_))));
    }
}
