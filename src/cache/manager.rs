//! Cache manager for persisting Steam responses to disk
//!
//! Provides a `CacheManager` that stores serializable data to JSON files stamped
//! with the fetch time and the TTL of their entry class, supporting offline reuse
//! of stale entries.

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Days a cached library list stays fresh
pub const LIBRARY_TTL_DAYS: i64 = 7;

/// Days cached per-game details stay fresh
pub const DETAILS_TTL_DAYS: i64 = 30;

/// Subdirectory holding per-game store details
const DETAILS_DIR: &str = "game_details";

/// Subdirectory holding per-player achievement summaries
const ACHIEVEMENTS_DIR: &str = "achievements";

/// TTL class of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheClass {
    /// Owned-games list for a SteamID
    Library,
    /// Per-game store details and achievements
    GameDetail,
}

impl CacheClass {
    /// Time-to-live for entries of this class
    pub fn ttl(self) -> Duration {
        match self {
            CacheClass::Library => Duration::days(LIBRARY_TTL_DAYS),
            CacheClass::GameDetail => Duration::days(DETAILS_TTL_DAYS),
        }
    }
}

/// Identifies one cache file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKey {
    /// Library list, keyed by SteamID64
    Library(String),
    /// Store details, keyed by AppID
    GameDetails(u32),
    /// Achievement summary for one player and game
    Achievements { steam_id: String, app_id: u32 },
}

impl CacheKey {
    /// The TTL class this key belongs to
    pub fn class(&self) -> CacheClass {
        match self {
            CacheKey::Library(_) => CacheClass::Library,
            CacheKey::GameDetails(_) | CacheKey::Achievements { .. } => CacheClass::GameDetail,
        }
    }

    /// Path of the cache file relative to the cache directory
    fn relative_path(&self) -> PathBuf {
        match self {
            CacheKey::Library(steam_id) => PathBuf::from(format!("games_{}.json", steam_id)),
            CacheKey::GameDetails(app_id) => {
                Path::new(DETAILS_DIR).join(format!("game_{}.json", app_id))
            }
            CacheKey::Achievements { steam_id, app_id } => {
                Path::new(ACHIEVEMENTS_DIR).join(format!("{}_{}.json", steam_id, app_id))
            }
        }
    }

    /// The raw key stored inside the entry
    fn raw(&self) -> String {
        match self {
            CacheKey::Library(steam_id) => steam_id.clone(),
            CacheKey::GameDetails(app_id) => app_id.to_string(),
            CacheKey::Achievements { steam_id, app_id } => format!("{}:{}", steam_id, app_id),
        }
    }
}

/// Wrapper struct for cached data stored on disk
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// SteamID or AppID the payload belongs to
    key: String,
    /// The cached payload
    data: T,
    /// When the payload was fetched
    fetched_at: DateTime<Utc>,
    /// How long the payload stays fresh, in seconds
    ttl_secs: i64,
}

impl<T> CacheEntry<T> {
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.fetched_at >= Duration::seconds(self.ttl_secs)
    }
}

/// Result of reading from cache, including metadata about cache freshness
#[derive(Debug, Clone)]
pub struct CachedData<T> {
    /// The cached data
    pub data: T,
    /// When the data was originally fetched
    pub fetched_at: DateTime<Utc>,
    /// Whether the cache entry has outlived its TTL
    pub is_expired: bool,
}

/// Summary of what is on disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached library lists
    pub libraries: usize,
    /// Number of cached per-game detail entries
    pub game_details: usize,
    /// Total number of files under the cache directory
    pub total_files: usize,
    /// Total size of those files in bytes
    pub total_bytes: u64,
}

impl CacheStats {
    /// Total size in mebibytes
    pub fn total_mib(&self) -> f64 {
        self.total_bytes as f64 / 1024.0 / 1024.0
    }
}

/// Manages reading and writing cached data to disk
///
/// The cache manager stores data as JSON files in an XDG-compliant cache directory
/// (`~/.cache/steamroll/` on Linux). Stale entries are never deleted; they are
/// returned with `is_expired = true` so offline mode can keep using them.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl CacheManager {
    /// Creates a new CacheManager using XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "steamroll")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { cache_dir })
    }

    /// Creates a new CacheManager with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Directory where cache files are stored
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to the cache file for the given key
    fn cache_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.relative_path())
    }

    /// Writes data to the cache, stamped with the current time
    pub fn put<T: Serialize>(&self, key: &CacheKey, data: &T) -> io::Result<()> {
        self.put_at(key, data, Utc::now())
    }

    /// Writes data to the cache with an explicit fetch time
    ///
    /// The entry's TTL is taken from the key's class.
    pub fn put_at<T: Serialize>(
        &self,
        key: &CacheKey,
        data: &T,
        fetched_at: DateTime<Utc>,
    ) -> io::Result<()> {
        let path = self.cache_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let entry = CacheEntry {
            key: key.raw(),
            data,
            fetched_at,
            ttl_secs: key.class().ttl().num_seconds(),
        };

        let json = serde_json::to_string_pretty(&entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        fs::write(&path, json)?;
        debug!(path = %path.display(), "cache entry written");
        Ok(())
    }

    /// Reads data from the cache
    ///
    /// Returns `None` if the entry doesn't exist or cannot be parsed; a corrupt
    /// file is treated exactly like a missing one. Expired entries are returned
    /// with `is_expired = true`.
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<CachedData<T>> {
        let path = self.cache_path(key);
        let content = fs::read_to_string(&path).ok()?;
        let entry: CacheEntry<T> = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "ignoring corrupt cache entry");
                return None;
            }
        };

        let is_expired = entry.is_expired_at(Utc::now());
        Some(CachedData {
            data: entry.data,
            fetched_at: entry.fetched_at,
            is_expired,
        })
    }

    /// Reads data only if the entry is still fresh
    pub fn get_fresh<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        self.get(key)
            .filter(|cached| !cached.is_expired)
            .map(|cached| cached.data)
    }

    /// Whether the entry for `key` is missing, unreadable or past its TTL
    pub fn is_expired(&self, key: &CacheKey) -> bool {
        self.get::<serde_json::Value>(key)
            .map(|cached| cached.is_expired)
            .unwrap_or(true)
    }

    /// Counts cached libraries, detail entries and the total size on disk
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();

        if let Ok(entries) = fs::read_dir(&self.cache_dir) {
            stats.libraries = entries
                .filter_map(Result::ok)
                .filter(|e| is_library_file(&e.file_name().to_string_lossy()))
                .count();
        }
        if let Ok(entries) = fs::read_dir(self.cache_dir.join(DETAILS_DIR)) {
            stats.game_details = entries.filter_map(Result::ok).count();
        }

        let (files, bytes) = dir_usage(&self.cache_dir);
        stats.total_files = files;
        stats.total_bytes = bytes;
        stats
    }

    /// Removes every cache entry
    ///
    /// Only files this cache writes are touched: `games_*.json` and the
    /// details and achievements subdirectories. The directory itself goes
    /// only when nothing else is left in it. Clearing a cache that does not
    /// exist is not an error.
    pub fn clear(&self) -> io::Result<()> {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name == DETAILS_DIR || name == ACHIEVEMENTS_DIR {
                fs::remove_dir_all(entry.path())?;
            } else if is_library_file(&name) {
                fs::remove_file(entry.path())?;
            }
        }

        // Fails when foreign files remain, which leaves them in place
        if fs::remove_dir(&self.cache_dir).is_err() {
            debug!(cache_dir = %self.cache_dir.display(), "cache directory kept, not empty");
        }
        Ok(())
    }
}

fn is_library_file(name: &str) -> bool {
    name.starts_with("games_") && name.ends_with(".json")
}

/// Recursively counts files and bytes under `dir`
fn dir_usage(dir: &Path) -> (usize, u64) {
    let Ok(entries) = fs::read_dir(dir) else {
        return (0, 0);
    };

    let mut files = 0;
    let mut bytes = 0;
    for entry in entries.filter_map(Result::ok) {
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if meta.is_dir() {
            let (f, b) = dir_usage(&entry.path());
            files += f;
            bytes += b;
        } else {
            files += 1;
            bytes += meta.len();
        }
    }
    (files, bytes)
}
