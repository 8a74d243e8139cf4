use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::{
    cli::output::{print_metadata, spinner},
    config::Settings,
    error, info,
    library::PersistFailure,
    management::JsonLibrary,
    provider::MetadataProvider,
    types::{Album, AlbumRef, Artist, MediaItem, Track},
    warning,
};

/// Album lookup as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct AlbumArgs {
    pub name: String,
    pub version: Option<String>,
    pub artists: Vec<String>,
    pub release_group: Option<String>,
    pub tracks: Vec<(String, PathBuf)>,
    pub write_tags: bool,
}

/// Track lookup as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct TrackArgs {
    pub name: String,
    pub version: Option<String>,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub mbid: Option<String>,
    pub file: Option<PathBuf>,
    pub write_tags: bool,
}

/// Parses a `TITLE=PATH` pair for `album --track`.
pub fn parse_track_file(value: &str) -> Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((title, path)) if !title.trim().is_empty() && !path.trim().is_empty() => {
            Ok((title.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => Err(format!("expected TITLE=PATH, got {:?}", value)),
    }
}

fn local_id(kind: &str, name: &str) -> String {
    format!("{}:{}", kind, name.trim().to_lowercase())
}

fn artists_from(names: &[String]) -> Vec<Artist> {
    names
        .iter()
        .map(|name| Artist::new(local_id("artist", name), name.clone()))
        .collect()
}

type Failures = Option<mpsc::Receiver<PersistFailure>>;

/// Builds the provider and subscribes to its persistence failures before any
/// lookup runs.
fn build_provider(write_tags: bool) -> (MetadataProvider<JsonLibrary>, Failures) {
    let mut settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Cannot load configuration. Err: {}", e);
            std::process::exit(1);
        }
    };
    if write_tags {
        settings.write_tags = true;
    }

    match MetadataProvider::setup(settings, JsonLibrary::default()) {
        Ok(provider) => {
            let failures = provider.persist_failures();
            (provider, failures)
        }
        Err(e) => {
            error!("Cannot set up metadata provider. Err: {}", e);
            std::process::exit(1);
        }
    }
}

async fn finish(provider: &MetadataProvider<JsonLibrary>, mut failures: Failures) {
    provider.settle().await;

    if let Some(rx) = failures.as_mut() {
        while let Ok(failure) = rx.try_recv() {
            warning!(
                "Library was not updated for {} {}: {}",
                failure.kind,
                failure.item_id,
                failure.error
            );
        }
    }
}

/// Resolves one artist and prints its metadata.
pub async fn artist(name: String, mbid: Option<String>) {
    let (provider, failures) = build_provider(false);

    let mut artist = Artist::new(local_id("artist", &name), name.clone());
    artist.mbid = mbid;

    let pb = spinner(format!("Looking up artist {}", name));
    let metadata = provider.get_metadata(&mut MediaItem::Artist(artist)).await;
    pb.finish_and_clear();

    print_metadata(&name, metadata);
    finish(&provider, failures).await;
}

/// Resolves an album. With tag writing on, the given track files are
/// tagged before the command returns.
pub async fn album(args: AlbumArgs) {
    let (provider, failures) = build_provider(args.write_tags);

    let mut album = Album::new(local_id("album", &args.name), args.name.clone());
    album.version = args.version;
    album.mb_release_group_id = args.release_group;
    album.artists = artists_from(&args.artists);
    album.tracks = args
        .tracks
        .iter()
        .map(|(title, path)| {
            let mut track = Track::new(local_id("track", title), title.clone());
            track.artists = album.artists.clone();
            track.album = Some(AlbumRef {
                item_id: album.item_id.clone(),
                name: album.name.clone(),
            });
            track.file_path = Some(path.clone());
            track
        })
        .collect();

    let pb = spinner(format!("Looking up album {}", args.name));
    let mut item = MediaItem::Album(album);
    let metadata = provider.get_metadata(&mut item).await;
    pb.finish_and_clear();

    if let MediaItem::Album(album) = &item {
        if let Some(year) = album.year {
            info!("Album year: {}", year);
        }
    }
    print_metadata(&args.name, metadata);
    finish(&provider, failures).await;
}

/// Resolves a single track, tagging `--file` when tag writing is on.
pub async fn track(args: TrackArgs) {
    let (provider, failures) = build_provider(args.write_tags);

    let mut track = Track::new(local_id("track", &args.name), args.name.clone());
    track.version = args.version;
    track.mbid = args.mbid;
    track.artists = artists_from(&args.artists);
    track.album = args.album.map(|name| AlbumRef {
        item_id: local_id("album", &name),
        name,
    });
    track.file_path = args.file;

    let pb = spinner(format!("Looking up track {}", args.name));
    let metadata = provider.get_metadata(&mut MediaItem::Track(track)).await;
    pb.finish_and_clear();

    print_metadata(&args.name, metadata);
    finish(&provider, failures).await;
}

/// Prints the synced lyrics of a track as LRC text.
pub async fn lyrics(name: String, artist: String) {
    let (provider, failures) = build_provider(false);

    let mut track = Track::new(local_id("track", &name), name.clone());
    track.artists = artists_from(std::slice::from_ref(&artist));

    let pb = spinner(format!("Looking up lyrics for {} by {}", name, artist));
    let metadata = provider.get_track_lyrics(&track).await;
    pb.finish_and_clear();

    match metadata.and_then(|m| m.lrc_lyrics) {
        Some(lrc) => println!("{}", lrc),
        None => warning!("No synced lyrics found for {}.", name),
    }
    finish(&provider, failures).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_track_file_pairs() {
        let (title, path) = parse_track_file("Intro = /music/01.mp3").unwrap();
        assert_eq!(title, "Intro");
        assert_eq!(path, PathBuf::from("/music/01.mp3"));
        assert!(parse_track_file("no-separator").is_err());
        assert!(parse_track_file("=/music/01.mp3").is_err());
    }

    #[test]
    fn local_ids_are_stable() {
        assert_eq!(local_id("artist", " Daft Punk "), "artist:daft punk");
    }
}
