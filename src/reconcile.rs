//! Mapping of catalog results onto host metadata.
//!
//! Each `resolve_*` function takes the first catalog match for an entity and
//! produces a fresh [`Metadata`] record. Identifiers and the album year are
//! filled forward only: a value the host already has is never replaced. Every
//! entity that gains an identifier is returned as a [`LibraryPatch`] for the
//! caller to persist.

use std::collections::BTreeSet;

use chrono::{Datelike, Local, TimeZone};
use serde_json::Value;

use crate::{
    config::Settings,
    library::LibraryPatch,
    types::{
        Album, Artist, CatalogAlbum, CatalogArtist, CatalogArtistDetail, CatalogTrack, ImageType,
        MediaItemImage, Metadata, Track,
    },
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub metadata: Metadata,
    pub patches: Vec<LibraryPatch>,
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn is_missing(value: &Option<String>) -> bool {
    present(value.as_ref()).is_none()
}

fn genres(genre: Option<&String>) -> BTreeSet<String> {
    present(genre).map(str::to_string).into_iter().collect()
}

fn thumb(url: &str, settings: &Settings) -> MediaItemImage {
    MediaItemImage {
        image_type: ImageType::Thumb,
        path: url.to_string(),
        provider: settings.instance_id.clone(),
        remotely_accessible: true,
    }
}

fn images(url: Option<&str>, settings: &Settings) -> Vec<MediaItemImage> {
    match url {
        Some(url) if settings.enable_images => vec![thumb(url, settings)],
        _ => Vec::new(),
    }
}

/// Derives the calendar year (local time) from a millisecond timestamp given
/// as a JSON number or numeric string. Zero and malformed values yield `None`.
pub fn publish_year(publish_time: &Value) -> Option<i32> {
    let millis = match publish_time {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    if millis == 0 {
        return None;
    }

    Local
        .timestamp_opt(millis.div_euclid(1000), 0)
        .single()
        .map(|dt| dt.year())
}

/// Maps an artist search hit, and the detail lookup when it succeeded, onto
/// metadata.
///
/// Detail fields win over search fields: the description comes from the
/// detail `briefDesc`, then the search `briefDesc`, then `desc`; the image
/// from `avatar`, then `cover`, then `picUrl`. A library artist without an
/// mbid takes the catalog one and is returned as a patch.
///
/// # Arguments
///
/// * `artist` - The host artist, updated in place
/// * `search` - First artist of the search result
/// * `detail` - The artist detail, if that request succeeded
/// * `settings` - Image switch and provider id for produced images
pub fn resolve_artist(
    artist: &mut Artist,
    search: &CatalogArtist,
    detail: Option<&CatalogArtistDetail>,
    settings: &Settings,
) -> Resolution {
    let description = detail
        .and_then(|d| present(d.brief_desc.as_ref()))
        .or_else(|| present(search.brief_desc.as_ref()))
        .or_else(|| present(search.desc.as_ref()))
        .map(str::to_string);

    let pic_url = detail
        .and_then(|d| present(d.avatar.as_ref()).or_else(|| present(d.cover.as_ref())))
        .or_else(|| present(search.pic_url.as_ref()));

    let metadata = Metadata {
        genres: genres(search.genre.as_ref()),
        description,
        images: images(pic_url, settings),
        ..Default::default()
    };

    let mbid = detail
        .and_then(|d| present(d.music_brainz_id.as_ref()))
        .or_else(|| present(search.music_brainz_id.as_ref()));

    let mut patches = Vec::new();
    if let Some(mbid) = mbid {
        if is_missing(&artist.mbid) && artist.provider.is_library() {
            artist.mbid = Some(mbid.to_string());
            patches.push(LibraryPatch::Artist(artist.clone()));
        }
    }

    Resolution { metadata, patches }
}

/// Maps an album search hit onto metadata. Fills the year from
/// `publishTime` and the release group id from `musicBrainzId` when the
/// album has neither; only the latter produces a patch.
pub fn resolve_album(album: &mut Album, data: &CatalogAlbum, settings: &Settings) -> Resolution {
    let metadata = Metadata {
        genres: genres(data.genre.as_ref()),
        description: present(data.description.as_ref()).map(str::to_string),
        images: images(present(data.pic_url.as_ref()), settings),
        ..Default::default()
    };

    if album.year.is_none() {
        if let Some(year) = publish_year(&data.publish_time) {
            album.year = Some(year);
        }
    }

    let mut patches = Vec::new();
    if let Some(release_group) = present(data.music_brainz_id.as_ref()) {
        if is_missing(&album.mb_release_group_id) && album.provider.is_library() {
            album.mb_release_group_id = Some(release_group.to_string());
            patches.push(LibraryPatch::Album(album.clone()));
        }
    }

    Resolution { metadata, patches }
}

/// Maps a track search hit onto metadata, lyrics included. The mbid of the
/// first catalog artist goes to every library artist of the track that lacks
/// one.
pub fn resolve_track(track: &mut Track, data: &CatalogTrack, settings: &Settings) -> Resolution {
    let metadata = Metadata {
        genres: genres(data.genre.as_ref()),
        description: present(data.description.as_ref()).map(str::to_string),
        lyrics: present(data.lyric.as_ref()).map(str::to_string),
        images: images(present(data.al.pic_url.as_ref()), settings),
        ..Default::default()
    };

    let artist_mbid = data
        .ar
        .first()
        .and_then(|ar| present(ar.music_brainz_id.as_ref()));

    let mut patches = Vec::new();
    if let Some(artist_mbid) = artist_mbid {
        for track_artist in track.artists.iter_mut() {
            if is_missing(&track_artist.mbid) && track_artist.provider.is_library() {
                track_artist.mbid = Some(artist_mbid.to_string());
                patches.push(LibraryPatch::Artist(track_artist.clone()));
            }
        }
    }

    Resolution { metadata, patches }
}
