//! Core data models for steamroll
//!
//! This module contains the data types used throughout the application for
//! representing owned games, store details and achievement progress.

pub mod steam;

pub use steam::{SteamClient, SteamError};

use serde::{Deserialize, Serialize};

/// Base URL for Steam CDN app assets
const CDN_APPS_URL: &str = "https://cdn.cloudflare.steamstatic.com/steam/apps";

/// Base URL for Steam store pages
const STORE_APP_URL: &str = "https://store.steampowered.com/app";

/// Header image for a game
pub fn header_image_url(app_id: u32) -> String {
    format!("{}/{}/header.jpg", CDN_APPS_URL, app_id)
}

/// Steam store page for a game
pub fn store_url(app_id: u32) -> String {
    format!("{}/{}", STORE_APP_URL, app_id)
}

/// A game in the player's library, as returned by `GetOwnedGames`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Steam AppID
    #[serde(rename = "appid")]
    pub app_id: u32,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Total playtime in minutes
    #[serde(rename = "playtime_forever", default)]
    pub playtime_minutes: u64,
    /// Icon hash, when the API includes app info
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_icon_url: Option<String>,
}

impl GameRecord {
    /// Creates a record with just the fields the selector needs
    pub fn new(app_id: u32, name: impl Into<String>, playtime_minutes: u64) -> Self {
        Self {
            app_id,
            name: name.into(),
            playtime_minutes,
            img_icon_url: None,
        }
    }

    /// Playtime in hours
    pub fn playtime_hours(&self) -> f64 {
        self.playtime_minutes as f64 / 60.0
    }

    /// Header image for this game
    pub fn header_image_url(&self) -> String {
        header_image_url(self.app_id)
    }
}

/// Store metadata from the `appdetails` endpoint
///
/// Every field is optional; Steam omits most of them for delisted or
/// region-locked apps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameDetails {
    pub name: Option<String>,
    pub short_description: Option<String>,
    pub release_date: Option<ReleaseDate>,
    pub genres: Vec<Described>,
    pub categories: Vec<Described>,
    pub metacritic: Option<Metacritic>,
    pub recommendations: Option<Recommendations>,
    pub price_overview: Option<PriceOverview>,
    pub developers: Vec<String>,
    pub publishers: Vec<String>,
    pub platforms: Option<Platforms>,
    pub controller_support: Option<String>,
    /// Either a number or a numeric string depending on the app
    pub required_age: Option<serde_json::Value>,
    pub supported_languages: Option<String>,
    pub drm_notice: Option<String>,
    pub pc_requirements: Option<Requirements>,
}

/// Release date block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseDate {
    pub coming_soon: bool,
    pub date: String,
}

/// A genre or category entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Described {
    pub description: String,
}

/// Metacritic score block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metacritic {
    pub score: Option<u32>,
    pub url: Option<String>,
}

/// Recommendation count block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recommendations {
    pub total: u64,
}

/// Price block; amounts are in the currency's minor unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceOverview {
    pub currency: Option<String>,
    pub initial: Option<u64>,
    #[serde(rename = "final")]
    pub final_price: Option<u64>,
    pub discount_percent: Option<u32>,
    pub initial_formatted: Option<String>,
    pub final_formatted: Option<String>,
}

/// Supported desktop platforms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Platforms {
    pub windows: bool,
    pub mac: bool,
    pub linux: bool,
}

/// PC requirements, which Steam sends as an object, a bare string, or `[]` when absent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Requirements {
    Empty(Vec<serde_json::Value>),
    Text(String),
    Split {
        #[serde(default)]
        minimum: Option<String>,
        #[serde(default)]
        recommended: Option<String>,
    },
}

/// How the price should be presented
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceLabel {
    Free,
    OnSale { original: String, current: String },
    Regular(String),
}

impl GameDetails {
    /// First `limit` genre names
    pub fn genre_names(&self, limit: usize) -> Vec<&str> {
        self.genres
            .iter()
            .take(limit)
            .map(|g| g.description.as_str())
            .collect()
    }

    /// Whether any category description contains `needle`
    pub fn has_category(&self, needle: &str) -> bool {
        self.categories.iter().any(|c| c.description.contains(needle))
    }

    /// Required age when it parses to a positive number
    pub fn age_rating(&self) -> Option<u32> {
        let age = match self.required_age.as_ref()? {
            serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }?;
        (age > 0).then_some(age)
    }

    /// Platform names in display order
    pub fn platform_names(&self) -> Vec<&'static str> {
        let Some(platforms) = self.platforms else {
            return Vec::new();
        };
        let mut names = Vec::new();
        if platforms.windows {
            names.push("Windows");
        }
        if platforms.mac {
            names.push("Mac");
        }
        if platforms.linux {
            names.push("Linux");
        }
        names
    }

    /// Price presentation, if the store lists a price
    pub fn price_label(&self) -> Option<PriceLabel> {
        let price = self.price_overview.as_ref()?;
        if price.final_price == Some(0) {
            return Some(PriceLabel::Free);
        }
        let current = price
            .final_formatted
            .clone()
            .unwrap_or_else(|| "N/A".to_string());
        let original = price
            .initial_formatted
            .clone()
            .unwrap_or_else(|| "N/A".to_string());
        if current != original {
            Some(PriceLabel::OnSale { original, current })
        } else {
            Some(PriceLabel::Regular(current))
        }
    }
}

/// Achievement progress of one player in one game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementSummary {
    pub total: u32,
    pub unlocked: u32,
}

impl AchievementSummary {
    /// Unlocked share in percent
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.unlocked as f64 * 100.0 / self.total as f64
    }
}
