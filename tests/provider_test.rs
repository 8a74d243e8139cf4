mod common;

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc, Mutex, OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use cloudmeta::{
    cache::DiskCache,
    catalog::{CatalogClient, build_http_client, build_rate_limiter},
    config::Settings,
    library::{LibraryUpdater, PersistError},
    provider::MetadataProvider,
    types::{Album, AlbumRef, Artist, ImageType, MediaItem, MediaItemImage, Track},
};
use common::{COVER_BYTES, front_covers, read_tag, write_test_flac, write_test_mp3};
use lofty::tag::{ItemKey, TagType};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::task::JoinSet;

#[derive(Clone, Default)]
struct MockCatalog {
    requests: Arc<AtomicUsize>,
    started: Arc<Mutex<Vec<Instant>>>,
    base: Arc<OnceLock<String>>,
    fail_search: bool,
    detail_code: i64,
}

impl MockCatalog {
    fn hit(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.started.lock().unwrap().push(Instant::now());
    }

    fn cover_url(&self) -> String {
        format!("{}/cover.jpg", self.base.get().cloned().unwrap_or_default())
    }
}

async fn search(
    State(state): State<MockCatalog>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.hit();
    if state.fail_search {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let keywords = params.get("keywords").cloned().unwrap_or_default();
    let body = match params.get("type").map(String::as_str) {
        Some("100") => json!({
            "code": 200,
            "result": {"artists": [{
                "id": 6452,
                "name": "Jay Chou",
                "picUrl": "http://img/search.jpg",
                "briefDesc": "search brief",
                "musicBrainzId": "mb-artist"
            }]}
        }),
        Some("10") => json!({
            "code": 200,
            "result": {"albums": [{
                "id": 18905,
                "name": "Fantasy",
                "picUrl": state.cover_url(),
                "publishTime": 1_000_000_000_000_i64,
                "musicBrainzId": "rg-fantasy"
            }]}
        }),
        Some("1") if keywords.starts_with("Unknown") => json!({"code": 200, "result": {"songs": []}}),
        Some("1") => json!({
            "code": 200,
            "result": {"songs": [{
                "id": 186016,
                "name": "Simple Love",
                "ar": [{"id": 6452, "name": "Jay Chou/Guest", "musicBrainzId": "mb-artist"}],
                "al": {"id": 18905, "name": "Fantasy", "picUrl": state.cover_url()},
                "lyric": "plain lyric text"
            }]}
        }),
        _ => json!({"code": 400}),
    };
    Json(body).into_response()
}

async fn artist_detail(
    State(state): State<MockCatalog>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    state.hit();
    Json(json!({
        "code": state.detail_code,
        "data": {"artist": {
            "id": params.get("id"),
            "name": "Jay Chou",
            "avatar": "http://img/avatar.jpg",
            "briefDesc": "detail brief"
        }}
    }))
}

async fn lyric(State(state): State<MockCatalog>) -> Json<Value> {
    state.hit();
    Json(json!({
        "lrc": {"lyric": "[ti:Simple Love]\n[00:12.34]first line\n[1:05]second line\n"}
    }))
}

async fn spawn_catalog(state: MockCatalog) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    state.base.set(format!("http://{}", addr)).unwrap();

    let app = Router::new()
        .route("/search", get(search))
        .route("/artist/detail", get(artist_detail))
        .route("/lyric", get(lyric))
        .route("/cover.jpg", get(|| async { COVER_BYTES.to_vec() }))
        .with_state(state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[derive(Clone, Default)]
struct RecordingLibrary {
    artists: Arc<Mutex<Vec<Artist>>>,
    albums: Arc<Mutex<Vec<Album>>>,
    fail: bool,
}

impl LibraryUpdater for RecordingLibrary {
    async fn update_artist(&self, artist: Artist) -> Result<(), PersistError> {
        if self.fail {
            return Err(PersistError::Storage("disk full".to_string()));
        }
        self.artists.lock().unwrap().push(artist);
        Ok(())
    }

    async fn update_album(&self, album: Album) -> Result<(), PersistError> {
        if self.fail {
            return Err(PersistError::NotFound(album.item_id));
        }
        self.albums.lock().unwrap().push(album);
        Ok(())
    }
}

struct Harness {
    provider: MetadataProvider<RecordingLibrary>,
    requests: Arc<AtomicUsize>,
    artists: Arc<Mutex<Vec<Artist>>>,
    albums: Arc<Mutex<Vec<Album>>>,
    _cache: TempDir,
}

async fn harness_with(
    state: MockCatalog,
    library: RecordingLibrary,
    configure: impl FnOnce(&mut Settings),
) -> Harness {
    let requests = Arc::clone(&state.requests);
    let artists = Arc::clone(&library.artists);
    let albums = Arc::clone(&library.albums);
    let addr = spawn_catalog(state).await;
    let cache = tempfile::tempdir().unwrap();

    let mut settings = Settings::new(format!("http://{}", addr));
    settings.cache_dir = cache.path().to_path_buf();
    configure(&mut settings);

    Harness {
        provider: MetadataProvider::setup(settings, library).unwrap(),
        requests,
        artists,
        albums,
        _cache: cache,
    }
}

fn healthy_catalog() -> MockCatalog {
    MockCatalog {
        detail_code: 200,
        ..Default::default()
    }
}

async fn harness() -> Harness {
    harness_with(healthy_catalog(), RecordingLibrary::default(), |_| {}).await
}

async fn tagging_harness() -> Harness {
    harness_with(healthy_catalog(), RecordingLibrary::default(), |s| {
        s.write_tags = true;
    })
    .await
}

fn jay_chou() -> Artist {
    Artist::new("artist:jay", "Jay Chou")
}

fn simple_love() -> Track {
    let mut track = Track::new("track:simple-love", "Simple Love");
    track.artists = vec![jay_chou()];
    track
}

#[tokio::test]
async fn test_artist_metadata_uses_detail() {
    let h = harness().await;
    let mut artist = jay_chou();

    let metadata = h.provider.get_artist_metadata(&mut artist).await.unwrap();
    assert_eq!(metadata.description.as_deref(), Some("detail brief"));
    assert_eq!(metadata.images.len(), 1);
    assert_eq!(metadata.images[0].path, "http://img/avatar.jpg");
    assert_eq!(artist.mbid.as_deref(), Some("mb-artist"));

    h.provider.settle().await;
    let persisted = h.provider.library().artists.lock().unwrap().clone();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].mbid.as_deref(), Some("mb-artist"));
}

#[tokio::test]
async fn test_artist_detail_failure_falls_back_to_search() {
    let state = MockCatalog {
        detail_code: 404,
        ..Default::default()
    };
    let h = harness_with(state, RecordingLibrary::default(), |_| {}).await;

    let metadata = h.provider.get_artist_metadata(&mut jay_chou()).await.unwrap();
    assert_eq!(metadata.description.as_deref(), Some("search brief"));
    assert_eq!(metadata.images[0].path, "http://img/search.jpg");
}

#[tokio::test]
async fn test_repeated_lookup_is_served_from_cache() {
    let h = harness().await;

    let first = h.provider.get_artist_metadata(&mut jay_chou()).await;
    let requests_after_first = h.requests.load(Ordering::SeqCst);
    assert_eq!(requests_after_first, 2);

    let second = h.provider.get_artist_metadata(&mut jay_chou()).await;
    assert_eq!(h.requests.load(Ordering::SeqCst), requests_after_first);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_server_error_yields_none_and_is_not_cached() {
    let state = MockCatalog {
        fail_search: true,
        ..Default::default()
    };
    let h = harness_with(state, RecordingLibrary::default(), |_| {}).await;

    assert!(h.provider.get_artist_metadata(&mut jay_chou()).await.is_none());
    assert!(h.provider.get_artist_metadata(&mut jay_chou()).await.is_none());
    assert_eq!(h.requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unreachable_catalog_yields_none() {
    let cache = tempfile::tempdir().unwrap();
    let mut settings = Settings::new("http://127.0.0.1:9");
    settings.cache_dir = cache.path().to_path_buf();
    let provider = MetadataProvider::setup(settings, RecordingLibrary::default()).unwrap();

    assert!(provider.get_artist_metadata(&mut jay_chou()).await.is_none());
    assert!(provider.get_track_metadata(&mut simple_love()).await.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_request_starts_stay_within_ten_per_second() {
    let state = MockCatalog::default();
    let started = Arc::clone(&state.started);
    let addr = spawn_catalog(state).await;
    let cache = tempfile::tempdir().unwrap();

    let client = CatalogClient::new(
        build_http_client().unwrap(),
        format!("http://{}", addr),
        build_rate_limiter(),
        DiskCache::new(cache.path()),
    );

    let mut tasks = JoinSet::new();
    for i in 0..20 {
        let client = client.clone();
        tasks.spawn(async move {
            let params = vec![
                ("keywords".to_string(), format!("artist {}", i)),
                ("type".to_string(), "100".to_string()),
                ("limit".to_string(), "1".to_string()),
            ];
            client.get_data("search", &params).await
        });
    }
    while let Some(joined) = tasks.join_next().await {
        assert!(joined.unwrap().is_some());
    }

    let mut starts = started.lock().unwrap().clone();
    starts.sort();
    assert_eq!(starts.len(), 20);

    // 100 ms of slack for loopback jitter between the limiter and the handler
    let window = Duration::from_millis(900);
    for (i, first) in starts.iter().enumerate() {
        let in_window = starts[i..]
            .iter()
            .take_while(|t| t.duration_since(*first) < window)
            .count();
        assert!(in_window <= 10, "{} requests started within {:?}", in_window, window);
    }
}

#[tokio::test]
async fn test_disabled_kinds_make_no_requests() {
    let h = harness_with(healthy_catalog(), RecordingLibrary::default(), |s| {
        s.enable_artist_metadata = false;
        s.enable_album_metadata = false;
        s.enable_track_metadata = false;
    })
    .await;

    assert!(h.provider.get_artist_metadata(&mut jay_chou()).await.is_none());
    assert!(h.provider.get_album_metadata(&mut Album::new("al", "Fantasy")).await.is_none());
    assert!(h.provider.get_track_metadata(&mut simple_love()).await.is_none());
    assert!(h.provider.get_track_lyrics(&simple_love()).await.is_none());
    assert_eq!(h.requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_artist_with_image_is_skipped_without_auto_trigger() {
    let h = harness_with(healthy_catalog(), RecordingLibrary::default(), |s| {
        s.auto_trigger_no_image = false;
    })
    .await;

    let mut artist = jay_chou();
    artist.images.push(MediaItemImage {
        image_type: ImageType::Thumb,
        path: "http://existing/thumb.jpg".to_string(),
        provider: "library".to_string(),
        remotely_accessible: true,
    });

    assert!(h.provider.get_artist_metadata(&mut artist).await.is_none());
    assert_eq!(h.requests.load(Ordering::SeqCst), 0);

    // Without an image the lookup runs
    assert!(h.provider.get_artist_metadata(&mut jay_chou()).await.is_some());
}

#[tokio::test]
async fn test_album_metadata_fills_year_and_release_group() {
    let h = harness().await;
    let mut album = Album::new("album:fantasy", "Fantasy");
    album.artists = vec![jay_chou()];

    let metadata = h.provider.get_album_metadata(&mut album).await.unwrap();
    assert!(metadata.images[0].path.ends_with("/cover.jpg"));
    assert!(album.year.is_some());
    assert_eq!(album.mb_release_group_id.as_deref(), Some("rg-fantasy"));

    h.provider.settle().await;
    let albums = h.albums.lock().unwrap().clone();
    assert_eq!(albums.len(), 1);
    assert_eq!(albums[0].item_id, "album:fantasy");
}

#[tokio::test]
async fn test_track_metadata_patches_artists() {
    let h = harness().await;
    let mut track = simple_love();

    let metadata = h.provider.get_track_metadata(&mut track).await.unwrap();
    assert_eq!(metadata.lyrics.as_deref(), Some("plain lyric text"));
    assert_eq!(track.artists[0].mbid.as_deref(), Some("mb-artist"));

    h.provider.settle().await;
    assert_eq!(h.artists.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_track_without_match_yields_none() {
    let h = harness().await;
    let mut track = Track::new("track:x", "Unknown Song");

    assert!(h.provider.get_track_metadata(&mut track).await.is_none());
    h.provider.settle().await;
    assert!(h.artists.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_get_metadata_dispatches_by_kind() {
    let h = harness().await;

    let mut item = MediaItem::Artist(jay_chou());
    let metadata = h.provider.get_metadata(&mut item).await.unwrap();
    assert_eq!(metadata.description.as_deref(), Some("detail brief"));
    match item {
        MediaItem::Artist(artist) => assert_eq!(artist.mbid.as_deref(), Some("mb-artist")),
        other => panic!("unexpected item {:?}", other),
    }

    let mut item = MediaItem::Track(simple_love());
    assert!(h.provider.get_metadata(&mut item).await.is_some());
}

#[tokio::test]
async fn test_pending_patches_survive_dropping_the_provider() {
    let Harness {
        provider,
        artists,
        _cache,
        ..
    } = harness().await;

    assert!(provider.get_artist_metadata(&mut jay_chou()).await.is_some());
    drop(provider);

    for _ in 0..100 {
        if !artists.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let persisted = artists.lock().unwrap().clone();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].item_id, "artist:jay");
}

#[tokio::test]
async fn test_persist_failures_are_published() {
    let library = RecordingLibrary {
        fail: true,
        ..Default::default()
    };
    let h = harness_with(healthy_catalog(), library, |_| {}).await;
    let mut failures = h.provider.persist_failures().unwrap();
    assert!(h.provider.persist_failures().is_none());

    // The lookup itself still succeeds
    assert!(h.provider.get_artist_metadata(&mut jay_chou()).await.is_some());
    h.provider.settle().await;

    let failure = failures.try_recv().unwrap();
    assert_eq!(failure.kind, "artist");
    assert_eq!(failure.item_id, "artist:jay");
    assert!(matches!(failure.error, PersistError::Storage(_)));
}

#[tokio::test]
async fn test_failures_without_subscriber_are_not_buffered() {
    let library = RecordingLibrary {
        fail: true,
        ..Default::default()
    };
    let h = harness_with(healthy_catalog(), library, |_| {}).await;

    assert!(h.provider.get_artist_metadata(&mut jay_chou()).await.is_some());
    h.provider.settle().await;

    let mut failures = h.provider.persist_failures().unwrap();
    assert!(failures.try_recv().is_err());
}

#[tokio::test]
async fn test_track_lyrics_are_normalized() {
    let h = harness().await;

    let mut track = simple_love();
    track.name = "Simple Love (Live)".to_string();
    let metadata = h.provider.get_track_lyrics(&track).await.unwrap();
    assert_eq!(
        metadata.lrc_lyrics.as_deref(),
        Some("[00:12.34]first line\n[01:05.000] second line")
    );
}

#[tokio::test]
async fn test_track_lyrics_skipped_when_present_or_without_artist() {
    let h = harness().await;

    let mut track = simple_love();
    track.lyrics = Some("already here".to_string());
    assert!(h.provider.get_track_lyrics(&track).await.is_none());

    let bare = Track::new("track:bare", "Simple Love");
    assert!(h.provider.get_track_lyrics(&bare).await.is_none());
    assert_eq!(h.requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_track_full_write_uses_catalog_fields() {
    let h = tagging_harness().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.mp3");
    write_test_mp3(&path);

    let mut track = Track::new("track:local", "simple love");
    track.artists = vec![Artist::new("artist:local", "jay chou")];
    track.file_path = Some(path.clone());

    assert!(h.provider.get_track_metadata(&mut track).await.is_some());

    let tag = read_tag(&path, TagType::Id3v2);
    assert_eq!(tag.get_string(ItemKey::TrackArtist), Some("Jay Chou"));
    assert_eq!(tag.get_string(ItemKey::AlbumArtist), Some("Jay Chou"));
    assert_eq!(tag.get_string(ItemKey::AlbumTitle), Some("Fantasy"));
    assert_eq!(tag.get_string(ItemKey::TrackTitle), Some("Simple Love"));
    assert_eq!(front_covers(&tag), 1);
}

#[tokio::test]
async fn test_track_without_match_gets_basic_tags() {
    let h = tagging_harness().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.flac");
    write_test_flac(&path);

    let mut track = Track::new("track:unknown", "Unknown Song");
    track.version = Some("Live".to_string());
    track.artists = vec![Artist::new("artist:someone", "Someone/Else")];
    track.album = Some(AlbumRef {
        item_id: "album:local".to_string(),
        name: "Local Album".to_string(),
    });
    track.file_path = Some(path.clone());

    assert!(h.provider.get_track_metadata(&mut track).await.is_none());

    let tag = read_tag(&path, TagType::VorbisComments);
    assert_eq!(tag.get_string(ItemKey::TrackArtist), Some("Someone"));
    assert_eq!(tag.get_string(ItemKey::AlbumTitle), Some("Local Album"));
    assert_eq!(tag.get_string(ItemKey::TrackTitle), Some("Unknown Song Live"));
    assert!(tag.pictures().is_empty());
}

#[tokio::test]
async fn test_album_batch_tags_existing_track_files() {
    let h = tagging_harness().await;
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("01.mp3");
    let second = dir.path().join("02.flac");
    write_test_mp3(&first);
    write_test_flac(&second);

    let mut album = Album::new("album:local", "fantasy");
    album.artists = vec![Artist::new("artist:jay", "Jay Chou/Guest")];
    album.tracks = [
        ("Intro", first.clone()),
        ("Outro", second.clone()),
        ("Ghost", dir.path().join("03.mp3")),
    ]
    .into_iter()
    .map(|(title, path)| {
        let mut track = Track::new(format!("track:{}", title), title);
        track.file_path = Some(path);
        track
    })
    .collect();

    assert!(h.provider.get_album_metadata(&mut album).await.is_some());
    h.provider.settle().await;

    let tag = read_tag(&first, TagType::Id3v2);
    assert_eq!(tag.get_string(ItemKey::AlbumTitle), Some("Fantasy"));
    assert_eq!(tag.get_string(ItemKey::TrackArtist), Some("Jay Chou"));
    assert_eq!(tag.get_string(ItemKey::TrackTitle), Some("Intro"));
    assert_eq!(front_covers(&tag), 1);

    let tag = read_tag(&second, TagType::VorbisComments);
    assert_eq!(tag.get_string(ItemKey::AlbumTitle), Some("Fantasy"));
    assert_eq!(tag.get_string(ItemKey::TrackTitle), Some("Outro"));
    assert_eq!(tag.pictures().len(), 1);

    assert!(!dir.path().join("03.mp3").exists());
}

#[tokio::test]
async fn test_files_untouched_when_tag_writing_is_off() {
    let h = harness().await;
    let dir = tempfile::tempdir().unwrap();
    let track_file = dir.path().join("track.mp3");
    let album_file = dir.path().join("album.flac");
    write_test_mp3(&track_file);
    write_test_flac(&album_file);
    let track_before = std::fs::read(&track_file).unwrap();
    let album_before = std::fs::read(&album_file).unwrap();

    let mut track = simple_love();
    track.file_path = Some(track_file.clone());
    assert!(h.provider.get_track_metadata(&mut track).await.is_some());

    let mut album = Album::new("album:fantasy", "Fantasy");
    let mut album_track = Track::new("track:intro", "Intro");
    album_track.file_path = Some(album_file.clone());
    album.tracks = vec![album_track];
    assert!(h.provider.get_album_metadata(&mut album).await.is_some());
    h.provider.settle().await;

    assert_eq!(std::fs::read(&track_file).unwrap(), track_before);
    assert_eq!(std::fs::read(&album_file).unwrap(), album_before);
}
