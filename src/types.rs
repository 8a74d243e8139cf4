use std::{collections::BTreeSet, path::PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabled::Tabled;

/// Where a host entity comes from.
///
/// Only entities living in the host's own persistent library get patched
/// with identifiers discovered in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemProvider {
    #[default]
    Library,
    Remote(String),
}

impl ItemProvider {
    pub fn is_library(&self) -> bool {
        matches!(self, ItemProvider::Library)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    Thumb,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItemImage {
    pub image_type: ImageType,
    pub path: String,
    pub provider: String,
    pub remotely_accessible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub item_id: String,
    pub provider: ItemProvider,
    pub name: String,
    pub mbid: Option<String>,
    #[serde(default)]
    pub images: Vec<MediaItemImage>,
}

impl Artist {
    pub fn new(item_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether the artist already shows a usable thumbnail.
    pub fn has_thumb(&self) -> bool {
        self.images
            .iter()
            .any(|img| img.image_type == ImageType::Thumb && !img.path.is_empty())
    }
}

/// Lightweight reference to the album a track belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlbumRef {
    pub item_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub item_id: String,
    pub provider: ItemProvider,
    pub name: String,
    pub version: Option<String>,
    pub year: Option<i32>,
    pub mb_release_group_id: Option<String>,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub images: Vec<MediaItemImage>,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Album {
    pub fn new(item_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub item_id: String,
    pub provider: ItemProvider,
    pub name: String,
    pub version: Option<String>,
    pub mbid: Option<String>,
    #[serde(default)]
    pub artists: Vec<Artist>,
    pub album: Option<AlbumRef>,
    pub file_path: Option<PathBuf>,
    pub lyrics: Option<String>,
    #[serde(default)]
    pub images: Vec<MediaItemImage>,
}

impl Track {
    pub fn new(item_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// The local file path, only when it points at an existing regular file.
    pub async fn existing_file(&self) -> Option<&PathBuf> {
        let path = self.file_path.as_ref()?;
        match async_fs::metadata(path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }
}

/// Any entity the host can ask metadata for.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaItem {
    Artist(Artist),
    Album(Album),
    Track(Track),
}

/// Metadata resolved for one entity. `images` is always a fresh list; merging
/// with what the host already has is left to the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub genres: BTreeSet<String>,
    pub description: Option<String>,
    pub lyrics: Option<String>,
    pub lrc_lyrics: Option<String>,
    pub images: Vec<MediaItemImage>,
}

#[derive(Tabled)]
pub struct MetadataTableRow {
    pub field: String,
    pub value: String,
}

// Catalog payloads. Only the fields this crate reads are modelled. Ids are
// kept as raw values so a string id does not break decoding.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub result: Option<SearchResult>,
}

/// Result arrays are kept raw: only the first entry of the relevant array is
/// ever decoded, so a malformed tail cannot spoil a usable first match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub artists: Vec<Value>,
    #[serde(default)]
    pub albums: Vec<Value>,
    #[serde(default)]
    pub songs: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogArtist {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: String,
    pub pic_url: Option<String>,
    pub genre: Option<String>,
    pub brief_desc: Option<String>,
    pub desc: Option<String>,
    pub music_brainz_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtistDetailResponse {
    pub code: Option<i64>,
    pub data: Option<ArtistDetailData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtistDetailData {
    pub artist: Option<CatalogArtistDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogArtistDetail {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: String,
    pub cover: Option<String>,
    pub avatar: Option<String>,
    pub brief_desc: Option<String>,
    pub music_brainz_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogAlbum {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: String,
    pub pic_url: Option<String>,
    /// Milliseconds since the epoch, as a number or a numeric string.
    #[serde(default)]
    pub publish_time: Value,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub music_brainz_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogTrack {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ar: Vec<CatalogTrackArtist>,
    #[serde(default)]
    pub al: CatalogTrackAlbum,
    pub lyric: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogTrackArtist {
    #[serde(default)]
    pub id: Value,
    pub name: Option<String>,
    pub music_brainz_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogTrackAlbum {
    #[serde(default)]
    pub id: Value,
    pub name: Option<String>,
    pub pic_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LyricResponse {
    pub lrc: Option<LyricBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LyricBody {
    pub lyric: Option<String>,
}
