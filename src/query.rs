//! Search query construction.
//!
//! Turns partially populated host entities into the keyword and parameter
//! set sent to the catalog `search` endpoint. Everything here is pure and
//! deterministic.

use std::fmt;

use crate::types::{Album, Artist, Track};

/// Separators catalog entries use to join collaborating artists, in the
/// order they are tested.
pub const ARTIST_NAME_SEPARATORS: [char; 7] = ['/', '\\', '|', '，', '；', ';', '+'];

const VARIOUS_ARTISTS: &str = "various artists";

pub const ARTIST_SEARCH_LIMIT: u32 = 1;
pub const ALBUM_SEARCH_LIMIT: u32 = 3;
pub const TRACK_SEARCH_LIMIT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Track,
    Album,
    Artist,
}

impl SearchType {
    /// Numeric `type` code understood by the catalog.
    pub fn code(self) -> u32 {
        match self {
            SearchType::Track => 1,
            SearchType::Album => 10,
            SearchType::Artist => 100,
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keywords: String,
    pub search_type: SearchType,
    pub limit: u32,
    pub mbid: Option<String>,
}

impl SearchQuery {
    /// Query parameters in the order they are sent.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("keywords".to_string(), self.keywords.clone()),
            ("type".to_string(), self.search_type.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        if let Some(mbid) = &self.mbid {
            params.push(("mbid".to_string(), mbid.clone()));
        }
        params
    }
}

/// Reduces a possibly multi-artist credit to its primary artist.
///
/// The first separator of [`ARTIST_NAME_SEPARATORS`] found anywhere in the
/// name wins, even if another separator occurs earlier in the string. The
/// result has its whitespace runs collapsed and its ends trimmed.
pub fn clean_artist_name(artist_name: &str) -> String {
    let mut cleaned = artist_name.trim();
    for sep in ARTIST_NAME_SEPARATORS {
        if let Some((primary, _)) = cleaned.split_once(sep) {
            cleaned = primary.trim();
            break;
        }
    }

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes a cleaned artist name for use inside a search keyword.
/// `-` and `&` are kept as they are.
pub fn normalize_artist_keyword(artist_name: &str) -> String {
    artist_name.replace('+', " ")
}

/// `"{name} {version}"` when a non-empty version exists, else the name;
/// trimmed either way.
fn name_with_version(name: &str, version: Option<&str>) -> String {
    match version.filter(|v| !v.is_empty()) {
        Some(version) => format!("{} {}", name, version).trim().to_string(),
        None => name.trim().to_string(),
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

/// Builds the artist search: the cleaned primary artist name with `+`
/// replaced by a space, `type=100`, `limit=1`.
///
/// # Arguments
///
/// * `artist` - The host artist; only its name is read
///
/// # Returns
///
/// `None` when nothing is left of the name after cleaning, in which case no
/// request should be made.
///
/// # Example
///
/// ```
/// use cloudmeta::{query::artist_query, types::Artist};
///
/// let query = artist_query(&Artist::new("1", "Jay Chou/Fei Yu-ching")).unwrap();
/// assert_eq!(query.keywords, "Jay Chou");
/// ```
pub fn artist_query(artist: &Artist) -> Option<SearchQuery> {
    let keywords = normalize_artist_keyword(&clean_artist_name(&artist.name))
        .trim()
        .to_string();
    if keywords.is_empty() {
        return None;
    }

    Some(SearchQuery {
        keywords,
        search_type: SearchType::Artist,
        limit: ARTIST_SEARCH_LIMIT,
        mbid: None,
    })
}

/// The cleaned name of the album's primary artist, or an empty string.
pub fn album_artist_name(album: &Album) -> String {
    album
        .artists
        .first()
        .map(|artist| clean_artist_name(&artist.name))
        .unwrap_or_default()
}

/// Album search keyword: `"{name} {version}"` followed by the primary
/// artist, unless that artist is missing or "Various Artists".
///
/// # Example
///
/// ```
/// use cloudmeta::{query::album_keyword, types::{Album, Artist}};
///
/// let mut album = Album::new("1", "Greatest Hits");
/// album.artists = vec![Artist::new("2", "Various Artists")];
/// assert_eq!(album_keyword(&album), "Greatest Hits");
/// ```
pub fn album_keyword(album: &Album) -> String {
    let album_phrase = name_with_version(&album.name, album.version.as_deref());
    let artist_name = album_artist_name(album);

    if artist_name.is_empty() || artist_name.to_lowercase() == VARIOUS_ARTISTS {
        return album_phrase;
    }

    format!("{} {}", album_phrase, normalize_artist_keyword(&artist_name))
        .trim()
        .to_string()
}

/// Builds the album search (`type=10`, `limit=3`), forwarding a known
/// MusicBrainz release group id as `mbid`. `None` for an empty keyword.
pub fn album_query(album: &Album) -> Option<SearchQuery> {
    let keywords = album_keyword(album);
    if keywords.is_empty() {
        return None;
    }

    Some(SearchQuery {
        keywords,
        search_type: SearchType::Album,
        limit: ALBUM_SEARCH_LIMIT,
        mbid: non_empty(album.mb_release_group_id.as_ref()),
    })
}

/// Title phrase used for track searches and as the fallback tag title.
pub fn track_title(track: &Track) -> String {
    name_with_version(&track.name, track.version.as_deref())
}

/// The artist name that goes into a track keyword.
///
/// Every attached artist is cleaned in turn and the last one is kept, so for
/// multi-artist tracks the final credit is searched.
pub fn track_artist_name(track: &Track) -> String {
    let mut artist_name = String::new();
    for track_artist in &track.artists {
        artist_name = clean_artist_name(&track_artist.name);
    }
    artist_name
}

/// Track search keyword: the title phrase followed by
/// [`track_artist_name`].
pub fn track_keyword(track: &Track) -> String {
    let artist_name = normalize_artist_keyword(&track_artist_name(track));
    format!("{} {}", track_title(track), artist_name)
        .trim()
        .to_string()
}

/// Builds the track search (`type=1`, `limit=1`) with the recording mbid
/// when the host knows it.
///
/// # Arguments
///
/// * `track` - The host track; name, version, artists and mbid are read
///
/// # Returns
///
/// `None` when the keyword is empty after trimming.
pub fn track_query(track: &Track) -> Option<SearchQuery> {
    let keywords = track_keyword(track);
    if keywords.is_empty() {
        return None;
    }

    Some(SearchQuery {
        keywords,
        search_type: SearchType::Track,
        limit: TRACK_SEARCH_LIMIT,
        mbid: non_empty(track.mbid.as_ref()),
    })
}
