//! Integration tests for the library service against a local Steam stand-in
//!
//! A small HTTP server on 127.0.0.1 answers by path prefix, so online mode can
//! be exercised without reaching Steam.

use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use steamroll::cache::{CacheKey, CacheManager};
use steamroll::data::{GameRecord, SteamClient, SteamError};
use steamroll::library::{Library, LibraryError, Mode};
use steamroll::selector::Selector;

const STEAM_ID: &str = "76561197960287930";

const OWNED_GAMES: &str = r#"{"response":{"game_count":2,"games":[
    {"appid":1,"name":"A","playtime_forever":90},
    {"appid":2,"name":"B","playtime_forever":150}
]}}"#;

const GAME_A_DETAILS: &str = r#"{"1":{"success":true,"data":{
    "name":"A","short_description":"A short game","developers":["Someone"]
}}}"#;

const ACHIEVEMENTS: &str = r#"{"playerstats":{"steamID":"76561197960287930","gameName":"A",
    "achievements":[{"apiname":"X","achieved":1,"unlocktime":1},{"apiname":"Y","achieved":0,"unlocktime":0}],
    "success":true}}"#;

type Route = (&'static str, u16, &'static str);

/// Serves canned responses until the test ends and returns the base URL
async fn spawn_stub(routes: Vec<Route>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub server");
    let addr = listener.local_addr().expect("Stub server has no address");

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let routes = routes.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                while read < buf.len() {
                    let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    read += n;
                    if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }

                let request = String::from_utf8_lossy(&buf[..read]);
                let path = request.split_whitespace().nth(1).unwrap_or("/");
                let (status, body) = routes
                    .iter()
                    .find(|(prefix, _, _)| path.starts_with(*prefix))
                    .map(|(_, status, body)| (*status, *body))
                    .unwrap_or((404, "{}"));

                let response = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

fn library_at(base_url: &str, temp_dir: &TempDir, api_key: Option<&str>) -> Library {
    let cache = CacheManager::with_dir(temp_dir.path().to_path_buf());
    let client = SteamClient::with_base_urls(base_url, base_url);
    Library::new(client, cache, api_key.map(str::to_string))
}

fn unreachable_library(temp_dir: &TempDir) -> Library {
    library_at("http://127.0.0.1:1", temp_dir, Some("KEY"))
}

#[tokio::test]
async fn test_online_replaces_stale_library() {
    let base = spawn_stub(vec![("/IPlayerService/GetOwnedGames", 200, OWNED_GAMES)]).await;
    let temp_dir = TempDir::new().unwrap();
    let library = library_at(&base, &temp_dir, Some("KEY"));
    let key = CacheKey::Library(STEAM_ID.to_string());
    library
        .cache()
        .put_at(
            &key,
            &vec![GameRecord::new(99, "Old", 0)],
            Utc::now() - Duration::days(8),
        )
        .unwrap();

    let loaded = library.load(STEAM_ID, Mode::Online).await.unwrap();

    assert_eq!(loaded.games.len(), 2);
    assert!(!loaded.is_stale);
    let cached = library.cache().get::<Vec<GameRecord>>(&key).unwrap();
    assert!(!cached.is_expired);
    assert_eq!(cached.data, loaded.games);
}

#[tokio::test]
async fn test_offline_returns_stale_library_without_network() {
    let temp_dir = TempDir::new().unwrap();
    let library = unreachable_library(&temp_dir);
    library
        .cache()
        .put_at(
            &CacheKey::Library(STEAM_ID.to_string()),
            &vec![GameRecord::new(99, "Old", 0)],
            Utc::now() - Duration::days(8),
        )
        .unwrap();

    let loaded = library.load(STEAM_ID, Mode::Offline).await.unwrap();

    assert!(loaded.is_stale);
    assert_eq!(loaded.games[0].name, "Old");
}

#[tokio::test]
async fn test_offline_without_cache_is_cache_miss() {
    let temp_dir = TempDir::new().unwrap();
    let library = unreachable_library(&temp_dir);

    let err = library.load(STEAM_ID, Mode::Offline).await.unwrap_err();
    assert!(matches!(err, LibraryError::CacheMiss { .. }));
}

#[tokio::test]
async fn test_rejected_key_is_network_failure() {
    let base = spawn_stub(vec![("/IPlayerService/GetOwnedGames", 403, "{}")]).await;
    let temp_dir = TempDir::new().unwrap();
    let library = library_at(&base, &temp_dir, Some("BAD"));

    let err = library.fetch_fresh(STEAM_ID).await.unwrap_err();
    assert!(matches!(
        err,
        LibraryError::NetworkFailure(SteamError::Unauthorized(403))
    ));
}

#[tokio::test]
async fn test_fetched_library_rolls_only_under_ceiling() {
    let base = spawn_stub(vec![("/IPlayerService/GetOwnedGames", 200, OWNED_GAMES)]).await;
    let temp_dir = TempDir::new().unwrap();
    let library = library_at(&base, &temp_dir, Some("KEY"));
    let loaded = library.fetch_fresh(STEAM_ID).await.unwrap();

    let mut selector = Selector::new(false);
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..10 {
        let game = selector.roll(&loaded.games, 2.0, &mut rng).unwrap();
        assert_eq!(game.app_id, 1);
    }
}

#[tokio::test]
async fn test_details_cached_online_are_served_offline() {
    let base = spawn_stub(vec![("/appdetails", 200, GAME_A_DETAILS)]).await;
    let temp_dir = TempDir::new().unwrap();

    let online = library_at(&base, &temp_dir, None);
    let details = online.details_for(1, Mode::Online).await.unwrap().unwrap();
    assert_eq!(details.developers, vec!["Someone".to_string()]);

    let offline = unreachable_library(&temp_dir);
    let cached = offline.details_for(1, Mode::Offline).await.unwrap();
    assert_eq!(cached, Some(details));
}

#[tokio::test]
async fn test_stale_details_used_when_fetch_fails() {
    let temp_dir = TempDir::new().unwrap();
    let library = unreachable_library(&temp_dir);
    let stale = steamroll::data::GameDetails {
        name: Some("Old details".to_string()),
        ..Default::default()
    };
    library
        .cache()
        .put_at(&CacheKey::GameDetails(1), &stale, Utc::now() - Duration::days(31))
        .unwrap();

    let details = library.details_for(1, Mode::Online).await.unwrap();
    assert_eq!(details, Some(stale));
}

#[tokio::test]
async fn test_achievements_fetched_with_key() {
    let base = spawn_stub(vec![("/ISteamUserStats/GetPlayerAchievements", 200, ACHIEVEMENTS)]).await;
    let temp_dir = TempDir::new().unwrap();
    let library = library_at(&base, &temp_dir, Some("KEY"));

    let summary = library
        .achievements_for(STEAM_ID, 1, Mode::Online)
        .await
        .unwrap()
        .unwrap();
    assert_eq!((summary.unlocked, summary.total), (1, 2));
}

#[tokio::test]
async fn test_update_existing_merges_and_caches() {
    let base = spawn_stub(vec![("/IPlayerService/GetOwnedGames", 200, OWNED_GAMES)]).await;
    let temp_dir = TempDir::new().unwrap();
    let library = library_at(&base, &temp_dir, Some("KEY"));
    let mut games = vec![GameRecord::new(1, "A", 30)];

    let (updated, added) = library.update_existing(STEAM_ID, &mut games).await.unwrap();

    assert_eq!((updated, added), (1, 1));
    assert_eq!(games[0].playtime_minutes, 90);
    let cached = library.load_cached(STEAM_ID).unwrap();
    assert_eq!(cached.games.len(), 2);
}

#[tokio::test]
async fn test_download_all_details_skips_cached() {
    let base = spawn_stub(vec![("/appdetails", 200, GAME_A_DETAILS)]).await;
    let temp_dir = TempDir::new().unwrap();
    let library = library_at(&base, &temp_dir, None);
    let games = vec![GameRecord::new(1, "A", 0), GameRecord::new(2, "B", 0)];

    let report = library.download_all_details(&games, |_, _, _| {}).await;

    // The stub only knows app 1; app 2 comes back without data
    assert_eq!((report.downloaded, report.failed), (1, 1));
    assert!(!library.cache().is_expired(&CacheKey::GameDetails(1)));
}
