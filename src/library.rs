//! Library service combining the Steam client with the on-disk cache
//!
//! Online mode talks to Steam and refreshes the cache; offline mode only reads
//! the cache, accepting stale entries. Network failures are reported to the
//! caller and never retried.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheManager};
use crate::data::{AchievementSummary, GameDetails, GameRecord, SteamClient, SteamError};

/// Number of games `refresh_details` re-fetches
pub const REFRESH_DETAILS_LIMIT: usize = 10;

/// Where data comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Fetch from Steam whenever the cache is missing or stale
    Online,
    /// Read the cache only
    Offline,
}

impl Mode {
    /// The other mode
    pub fn toggle(self) -> Self {
        match self {
            Mode::Online => Mode::Offline,
            Mode::Offline => Mode::Online,
        }
    }

    /// Display name
    pub fn label(self) -> &'static str {
        match self {
            Mode::Online => "Online",
            Mode::Offline => "Offline",
        }
    }
}

/// Errors surfaced to the user by library operations
#[derive(Debug, Error)]
pub enum LibraryError {
    /// Steam could not be reached or rejected the request
    #[error("Network failure: {0}")]
    NetworkFailure(#[from] SteamError),

    /// Offline mode with nothing cached for this SteamID
    #[error("No cached data found for SteamID {steam_id}. Switch to online mode to fetch data first.")]
    CacheMiss { steam_id: String },

    /// Online action without an API key
    #[error("A Steam API key is required in online mode (--api-key or STEAM_API_KEY)")]
    MissingApiKey,
}

/// A library list together with its cache metadata
#[derive(Debug, Clone)]
pub struct LoadedLibrary {
    pub games: Vec<GameRecord>,
    /// When the list was fetched from Steam
    pub fetched_at: DateTime<Utc>,
    /// Whether the list is older than the library TTL
    pub is_stale: bool,
}

/// Outcome of a bulk details download
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkReport {
    /// Fetched now or already cached and fresh
    pub downloaded: usize,
    /// Steam had no data or the request failed
    pub failed: usize,
}

/// What happened to one game during a details download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailsOutcome {
    /// A fresh entry was already cached
    Cached,
    /// Fetched and written to the cache
    Downloaded,
    /// Steam had no data or the request failed
    Failed,
}

impl BulkReport {
    /// Counts one outcome
    pub fn record(&mut self, outcome: DetailsOutcome) {
        match outcome {
            DetailsOutcome::Cached | DetailsOutcome::Downloaded => self.downloaded += 1,
            DetailsOutcome::Failed => self.failed += 1,
        }
    }
}

/// Library service
#[derive(Debug, Clone)]
pub struct Library {
    client: SteamClient,
    cache: CacheManager,
    api_key: Option<String>,
}

impl Library {
    pub fn new(client: SteamClient, cache: CacheManager, api_key: Option<String>) -> Self {
        Self {
            client,
            cache,
            api_key,
        }
    }

    /// The cache backing this library
    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Whether an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, LibraryError> {
        self.api_key.as_deref().ok_or(LibraryError::MissingApiKey)
    }

    /// Writes to the cache; a failed write is logged and otherwise ignored
    fn store<T: Serialize>(&self, key: &CacheKey, data: &T) {
        if let Err(e) = self.cache.put(key, data) {
            warn!(?key, error = %e, "failed to write cache entry");
        }
    }

    /// Loads the library the way the given mode allows
    ///
    /// Online mode reuses a fresh cache entry and fetches when it is missing
    /// or stale; offline mode returns whatever is cached.
    pub async fn load(&self, steam_id: &str, mode: Mode) -> Result<LoadedLibrary, LibraryError> {
        match mode {
            Mode::Offline => self.load_cached(steam_id),
            Mode::Online => {
                let key = CacheKey::Library(steam_id.to_string());
                if let Some(cached) = self.cache.get::<Vec<GameRecord>>(&key) {
                    if !cached.is_expired {
                        debug!(steam_id, "using fresh cached library");
                        return Ok(LoadedLibrary {
                            games: cached.data,
                            fetched_at: cached.fetched_at,
                            is_stale: false,
                        });
                    }
                }
                self.fetch_fresh(steam_id).await
            }
        }
    }

    /// Fetches the library from Steam and replaces the cached copy
    pub async fn fetch_fresh(&self, steam_id: &str) -> Result<LoadedLibrary, LibraryError> {
        let api_key = self.api_key()?;
        let games = self
            .client
            .fetch_owned_games(api_key, steam_id)
            .await
            .inspect_err(|e| warn!(steam_id, error = %e, "owned games fetch failed"))?;

        info!(steam_id, count = games.len(), "library fetched");
        self.store(&CacheKey::Library(steam_id.to_string()), &games);
        Ok(LoadedLibrary {
            games,
            fetched_at: Utc::now(),
            is_stale: false,
        })
    }

    /// Returns the cached library, stale or not
    ///
    /// # Returns
    /// * `Ok(LoadedLibrary)` - with `is_stale` set when past the TTL
    /// * `Err(LibraryError::CacheMiss)` - when nothing usable is cached
    pub fn load_cached(&self, steam_id: &str) -> Result<LoadedLibrary, LibraryError> {
        let key = CacheKey::Library(steam_id.to_string());
        let cached = self
            .cache
            .get::<Vec<GameRecord>>(&key)
            .ok_or_else(|| LibraryError::CacheMiss {
                steam_id: steam_id.to_string(),
            })?;

        if cached.is_expired {
            info!(steam_id, "cached library is older than its TTL");
        }
        Ok(LoadedLibrary {
            games: cached.data,
            fetched_at: cached.fetched_at,
            is_stale: cached.is_expired,
        })
    }

    /// Fetches the library and merges it into `games`
    ///
    /// Returns `(updated, added)` counts. The merged list is written to the cache.
    pub async fn update_existing(
        &self,
        steam_id: &str,
        games: &mut Vec<GameRecord>,
    ) -> Result<(usize, usize), LibraryError> {
        let api_key = self.api_key()?;
        let fresh = self.client.fetch_owned_games(api_key, steam_id).await?;
        let counts = merge_library(games, fresh);

        info!(steam_id, updated = counts.0, added = counts.1, "library updated");
        self.store(&CacheKey::Library(steam_id.to_string()), &*games);
        Ok(counts)
    }

    /// Cache-first lookup shared by details and achievements
    ///
    /// A fresh entry is returned as is. Offline mode falls back to a stale
    /// entry. Online mode fetches, caches what it gets, and falls back to the
    /// stale entry when the fetch fails.
    async fn cached_or_fetch<T, F, Fut>(
        &self,
        key: CacheKey,
        mode: Mode,
        fetch: F,
    ) -> Result<Option<T>, LibraryError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, SteamError>>,
    {
        let cached = self.cache.get::<T>(&key);
        let stale = match cached {
            Some(c) if !c.is_expired => return Ok(Some(c.data)),
            Some(c) => Some(c.data),
            None => None,
        };

        if mode == Mode::Offline {
            return Ok(stale);
        }

        match fetch().await {
            Ok(Some(data)) => {
                self.store(&key, &data);
                Ok(Some(data))
            }
            Ok(None) => Ok(stale),
            Err(e) => match stale {
                Some(data) => {
                    warn!(?key, error = %e, "fetch failed, using stale cache entry");
                    Ok(Some(data))
                }
                None => Err(e.into()),
            },
        }
    }

    /// Store details for one game
    pub async fn details_for(
        &self,
        app_id: u32,
        mode: Mode,
    ) -> Result<Option<GameDetails>, LibraryError> {
        self.cached_or_fetch(CacheKey::GameDetails(app_id), mode, || {
            self.client.fetch_game_details(app_id)
        })
        .await
    }

    /// Achievement progress of `steam_id` in one game
    ///
    /// Without an API key only the cache is consulted.
    pub async fn achievements_for(
        &self,
        steam_id: &str,
        app_id: u32,
        mode: Mode,
    ) -> Result<Option<AchievementSummary>, LibraryError> {
        let key = CacheKey::Achievements {
            steam_id: steam_id.to_string(),
            app_id,
        };
        let Some(api_key) = self.api_key.as_deref() else {
            return self.cached_or_fetch(key, Mode::Offline, || async { Ok(None) }).await;
        };
        self.cached_or_fetch(key, mode, || {
            self.client.fetch_achievements(api_key, steam_id, app_id)
        })
        .await
    }

    /// Makes sure one game's details are cached
    ///
    /// A fresh cache entry is left alone; otherwise the details are fetched
    /// and stored.
    pub async fn download_details(&self, game: &GameRecord) -> DetailsOutcome {
        let key = CacheKey::GameDetails(game.app_id);
        if !self.cache.is_expired(&key) {
            return DetailsOutcome::Cached;
        }
        self.fetch_and_store_details(game).await
    }

    async fn fetch_and_store_details(&self, game: &GameRecord) -> DetailsOutcome {
        match self.client.fetch_game_details(game.app_id).await {
            Ok(Some(details)) => {
                self.store(&CacheKey::GameDetails(game.app_id), &details);
                DetailsOutcome::Downloaded
            }
            Ok(None) => {
                debug!(app_id = game.app_id, "store has no details");
                DetailsOutcome::Failed
            }
            Err(e) => {
                warn!(app_id = game.app_id, name = %game.name, error = %e, "details fetch failed");
                DetailsOutcome::Failed
            }
        }
    }

    /// Downloads details for every game lacking a fresh cache entry
    ///
    /// Games are processed one after another; `progress` is called before each
    /// with `(index, total, game)`.
    pub async fn download_all_details<P>(&self, games: &[GameRecord], mut progress: P) -> BulkReport
    where
        P: FnMut(usize, usize, &GameRecord),
    {
        let mut report = BulkReport::default();
        let total = games.len();

        for (i, game) in games.iter().enumerate() {
            progress(i, total, game);
            report.record(self.download_details(game).await);
        }

        info!(
            downloaded = report.downloaded,
            failed = report.failed,
            "bulk details download finished"
        );
        report
    }

    /// Re-fetches details for the first `limit` games regardless of freshness
    ///
    /// `downloaded` in the report counts the refreshed games.
    pub async fn refresh_details(&self, games: &[GameRecord], limit: usize) -> BulkReport {
        let mut report = BulkReport::default();
        for game in games.iter().take(limit) {
            report.record(self.fetch_and_store_details(game).await);
        }
        info!(
            refreshed = report.downloaded,
            failed = report.failed,
            "details refresh finished"
        );
        report
    }
}

/// Merges a freshly fetched library into `existing`
///
/// Playtime of known AppIDs is updated in place and unknown AppIDs are appended.
/// Returns `(updated, added)`.
pub fn merge_library(existing: &mut Vec<GameRecord>, fresh: Vec<GameRecord>) -> (usize, usize) {
    let mut updated = 0;
    let mut added = Vec::new();

    for fresh_game in fresh {
        match existing.iter_mut().find(|g| g.app_id == fresh_game.app_id) {
            Some(game) => {
                game.playtime_minutes = fresh_game.playtime_minutes;
                updated += 1;
            }
            None => added.push(fresh_game),
        }
    }

    let added_count = added.len();
    existing.extend(added);
    (updated, added_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STEAM_ID: &str = "76561197960287930";

    fn offline_library(api_key: Option<&str>) -> (Library, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = CacheManager::with_dir(temp_dir.path().to_path_buf());
        // Nothing listens on port 1, so any request fails fast
        let client = SteamClient::with_base_urls("http://127.0.0.1:1", "http://127.0.0.1:1");
        (
            Library::new(client, cache, api_key.map(str::to_string)),
            temp_dir,
        )
    }

    #[test]
    fn test_mode_toggle_and_label() {
        assert_eq!(Mode::Online.toggle(), Mode::Offline);
        assert_eq!(Mode::Offline.toggle(), Mode::Online);
        assert_eq!(Mode::Offline.label(), "Offline");
    }

    #[test]
    fn test_merge_library_updates_and_appends() {
        let mut existing = vec![GameRecord::new(1, "A", 10), GameRecord::new(2, "B", 20)];
        let fresh = vec![
            GameRecord::new(2, "B", 45),
            GameRecord::new(3, "C", 0),
            GameRecord::new(1, "A", 10),
        ];

        let (updated, added) = merge_library(&mut existing, fresh);

        assert_eq!((updated, added), (2, 1));
        assert_eq!(existing.len(), 3);
        assert_eq!(existing[1].playtime_minutes, 45);
        assert_eq!(existing[2].app_id, 3);
    }

    #[test]
    fn test_offline_without_cache_is_cache_miss() {
        let (library, _temp_dir) = offline_library(None);
        let err = library.load_cached(STEAM_ID).unwrap_err();
        assert!(matches!(err, LibraryError::CacheMiss { .. }));
        assert!(err.to_string().contains("online mode"));
    }

    #[tokio::test]
    async fn test_online_fetch_without_key_is_missing_api_key() {
        let (library, _temp_dir) = offline_library(None);
        let err = library.fetch_fresh(STEAM_ID).await.unwrap_err();
        assert!(matches!(err, LibraryError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_online_fetch_unreachable_is_network_failure() {
        let (library, _temp_dir) = offline_library(Some("KEY"));
        let err = library.load(STEAM_ID, Mode::Online).await.unwrap_err();
        assert!(matches!(err, LibraryError::NetworkFailure(_)));
    }

    #[tokio::test]
    async fn test_online_load_uses_fresh_cache_without_network() {
        let (library, _temp_dir) = offline_library(Some("KEY"));
        let games = vec![GameRecord::new(10, "Cached", 5)];
        library
            .cache()
            .put(&CacheKey::Library(STEAM_ID.to_string()), &games)
            .unwrap();

        let loaded = library.load(STEAM_ID, Mode::Online).await.unwrap();
        assert_eq!(loaded.games, games);
        assert!(!loaded.is_stale);
    }

    #[tokio::test]
    async fn test_details_offline_without_cache_is_none() {
        let (library, _temp_dir) = offline_library(None);
        let details = library.details_for(620, Mode::Offline).await.unwrap();
        assert!(details.is_none());
    }

    #[tokio::test]
    async fn test_achievements_without_key_read_cache_only() {
        let (library, _temp_dir) = offline_library(None);
        let summary = AchievementSummary {
            total: 10,
            unlocked: 3,
        };
        library
            .cache()
            .put(
                &CacheKey::Achievements {
                    steam_id: STEAM_ID.to_string(),
                    app_id: 620,
                },
                &summary,
            )
            .unwrap();

        let result = library
            .achievements_for(STEAM_ID, 620, Mode::Online)
            .await
            .unwrap();
        assert_eq!(result, Some(summary));
    }

    #[tokio::test]
    async fn test_refresh_details_counts_unreachable_as_failed() {
        let (library, _temp_dir) = offline_library(Some("KEY"));
        let games = vec![GameRecord::new(1, "A", 0), GameRecord::new(2, "B", 0)];
        library
            .cache()
            .put(&CacheKey::GameDetails(1), &GameDetails::default())
            .unwrap();

        let report = library.refresh_details(&games, REFRESH_DETAILS_LIMIT).await;

        // Refresh ignores freshness, so the cached game is fetched too
        assert_eq!(
            report,
            BulkReport {
                downloaded: 0,
                failed: 2
            }
        );
    }

    #[tokio::test]
    async fn test_download_details_outcomes() {
        let (library, _temp_dir) = offline_library(None);
        let cached = GameRecord::new(1, "A", 0);
        library
            .cache()
            .put(&CacheKey::GameDetails(1), &GameDetails::default())
            .unwrap();

        assert_eq!(library.download_details(&cached).await, DetailsOutcome::Cached);
        assert_eq!(
            library.download_details(&GameRecord::new(2, "B", 0)).await,
            DetailsOutcome::Failed
        );
    }

    #[tokio::test]
    async fn test_bulk_download_counts_failures() {
        let (library, _temp_dir) = offline_library(None);
        let games = vec![GameRecord::new(1, "A", 0), GameRecord::new(2, "B", 0)];
        library
            .cache()
            .put(&CacheKey::GameDetails(1), &GameDetails::default())
            .unwrap();

        let mut seen = Vec::new();
        let report = library
            .download_all_details(&games, |i, total, game| seen.push((i, total, game.app_id)))
            .await;

        assert_eq!(
            report,
            BulkReport {
                downloaded: 1,
                failed: 1
            }
        );
        assert_eq!(seen, vec![(0, 2, 1), (1, 2, 2)]);
    }
}
