use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::{query::SearchType, types::LyricResponse};

use super::{CatalogClient, search::id_param};

pub const LYRIC_ENDPOINT: &str = "lyric";
pub const LYRIC_SEARCH_LIMIT: u32 = 10;

static LRC_TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(\d{1,2}):(\d{2})\.(\d{2,3})\]").unwrap());
static NON_STANDARD_LRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d{1,2}):(\d{2})\]").unwrap());
static TITLE_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(.*?\)|\[.*?\]|-.*$").unwrap());

const LRC_HEADERS: [&str; 5] = ["[ti:", "[ar:", "[al:", "[au:", "[by:"];

/// Strips `(...)` and `[...]` segments and everything from the first `-`.
pub fn clean_track_title(title: &str) -> String {
    TITLE_NOISE.replace_all(title, "").trim().to_string()
}

/// Normalizes LRC text to `[mm:ss.xxx]` lines.
///
/// Header tags and blank lines are dropped. Lines with a fractional
/// timestamp are kept verbatim, `[m:ss]` lines are rewritten with a `.000`
/// fraction, anything else is discarded.
pub fn normalize_lrc(lrc_content: &str) -> String {
    let mut normalized_lines = Vec::new();

    for line in lrc_content.lines() {
        let line = line.trim();
        if line.is_empty() || LRC_HEADERS.iter().any(|h| line.starts_with(h)) {
            continue;
        }

        if LRC_TIMESTAMP.is_match(line) {
            normalized_lines.push(line.to_string());
            continue;
        }

        let Some(caps) = NON_STANDARD_LRC.captures(line) else {
            continue;
        };
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() != 0 || line[whole.end()..].starts_with('.') {
            continue;
        }

        let minutes = format!("{:0>2}", &caps[1]);
        let seconds = format!("{:0>2}", &caps[2]);
        let lyric_content = NON_STANDARD_LRC.replace_all(line, "");
        normalized_lines.push(format!(
            "[{}:{}.000] {}",
            minutes,
            seconds,
            lyric_content.trim()
        ));
    }

    normalized_lines.join("\n")
}

/// Looks up the catalog song id for a title/artist pair.
pub async fn search_song_id(
    client: &CatalogClient,
    track_name: &str,
    artist_name: &str,
) -> Option<String> {
    let params = vec![
        (
            "keywords".to_string(),
            format!("{} {}", track_name, artist_name).trim().to_string(),
        ),
        ("type".to_string(), SearchType::Track.to_string()),
        ("limit".to_string(), LYRIC_SEARCH_LIMIT.to_string()),
    ];

    let data = client.get_data(super::search::SEARCH_ENDPOINT, &params).await?;
    if data.get("code").and_then(Value::as_i64) != Some(200) {
        return None;
    }

    let first_song = data.get("result")?.get("songs")?.as_array()?.first()?;
    id_param(first_song.get("id")?)
}

/// Fetches and normalizes the synced lyrics for a catalog song id.
pub async fn fetch_lyrics(client: &CatalogClient, song_id: &str) -> Option<String> {
    let params = vec![
        ("id".to_string(), song_id.to_string()),
        ("lv".to_string(), "-1".to_string()),
        ("kv".to_string(), "-1".to_string()),
        ("tv".to_string(), "-1".to_string()),
    ];

    let data = client.get_data(LYRIC_ENDPOINT, &params).await?;
    let response: LyricResponse = serde_json::from_value(data).ok()?;
    let raw = response.lrc.and_then(|lrc| lrc.lyric)?;

    let normalized = normalize_lrc(&raw);
    (!normalized.is_empty()).then_some(normalized)
}
