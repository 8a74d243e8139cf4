use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    query::SearchQuery,
    types::{
        ArtistDetailResponse, CatalogAlbum, CatalogArtist, CatalogArtistDetail, CatalogTrack,
        SearchResponse, SearchResult,
    },
    warning,
};

use super::CatalogClient;

pub const SEARCH_ENDPOINT: &str = "search";
pub const ARTIST_DETAIL_ENDPOINT: &str = "artist/detail";

/// Runs a search and returns the raw `result` object, or `None` when the
/// request failed or the body carries no `result`.
pub async fn search(client: &CatalogClient, query: &SearchQuery) -> Option<SearchResult> {
    let data = client.get_data(SEARCH_ENDPOINT, &query.params()).await?;
    match serde_json::from_value::<SearchResponse>(data) {
        Ok(response) => response.result,
        Err(e) => {
            warning!("Unexpected search response for {:?}: {}", query.keywords, e);
            None
        }
    }
}

fn first<T: DeserializeOwned>(items: &[Value], keywords: &str) -> Option<T> {
    let item = items.first()?;
    match serde_json::from_value(item.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warning!("Cannot decode first search result for {:?}: {}", keywords, e);
            None
        }
    }
}

/// First artist of an artist search.
pub async fn search_artist(client: &CatalogClient, query: &SearchQuery) -> Option<CatalogArtist> {
    let result = search(client, query).await?;
    first(&result.artists, &query.keywords)
}

/// First album of an album search. The catalog returns up to three; only
/// the first is used.
pub async fn search_album(client: &CatalogClient, query: &SearchQuery) -> Option<CatalogAlbum> {
    let result = search(client, query).await?;
    first(&result.albums, &query.keywords)
}

/// First song of a track search.
pub async fn search_track(client: &CatalogClient, query: &SearchQuery) -> Option<CatalogTrack> {
    let result = search(client, query).await?;
    first(&result.songs, &query.keywords)
}

/// Catalog ids arrive as numbers, occasionally as strings.
pub fn id_param(id: &Value) -> Option<String> {
    match id {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Artist detail lookup. Only a `code == 200` answer carrying
/// `data.artist` counts; everything else is `None`.
pub async fn artist_detail(client: &CatalogClient, id: &Value) -> Option<CatalogArtistDetail> {
    let id = id_param(id)?;
    let data = client
        .get_data(ARTIST_DETAIL_ENDPOINT, &[("id".to_string(), id)])
        .await?;

    let response: ArtistDetailResponse = serde_json::from_value(data).ok()?;
    if response.code != Some(200) {
        return None;
    }
    response.data.and_then(|d| d.artist)
}
