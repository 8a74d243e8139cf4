use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    config,
    library::{LibraryUpdater, PersistError},
    types::{Album, Artist},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibrarySnapshot {
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub albums: Vec<Album>,
}

impl LibrarySnapshot {
    fn upsert_artist(&mut self, artist: Artist) {
        match self.artists.iter_mut().find(|a| a.item_id == artist.item_id) {
            Some(existing) => *existing = artist,
            None => self.artists.push(artist),
        }
    }

    fn upsert_album(&mut self, album: Album) {
        match self.albums.iter_mut().find(|a| a.item_id == album.item_id) {
            Some(existing) => *existing = album,
            None => self.albums.push(album),
        }
    }
}

/// Host library kept in a single JSON file, used by the CLI to persist the
/// identifiers the provider discovers.
pub struct JsonLibrary {
    path: PathBuf,
    // serializes read-modify-write cycles of concurrent patches
    guard: Mutex<()>,
}

impl Default for JsonLibrary {
    fn default() -> Self {
        Self::new(Self::library_path())
    }
}

impl JsonLibrary {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub async fn load(&self) -> Result<LibrarySnapshot, PersistError> {
        let content = match async_fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LibrarySnapshot::default());
            }
            Err(e) => return Err(PersistError::Storage(e.to_string())),
        };
        serde_json::from_str(&content).map_err(|e| PersistError::Storage(e.to_string()))
    }

    async fn persist(&self, snapshot: &LibrarySnapshot) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| PersistError::Storage(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| PersistError::Storage(e.to_string()))?;
        async_fs::write(&self.path, json)
            .await
            .map_err(|e| PersistError::Storage(e.to_string()))
    }

    fn library_path() -> PathBuf {
        config::data_dir().join("library.json")
    }
}

impl LibraryUpdater for JsonLibrary {
    async fn update_artist(&self, artist: Artist) -> Result<(), PersistError> {
        let _guard = self.guard.lock().await;
        let mut snapshot = self.load().await?;
        snapshot.upsert_artist(artist);
        self.persist(&snapshot).await
    }

    async fn update_album(&self, album: Album) -> Result<(), PersistError> {
        let _guard = self.guard.lock().await;
        let mut snapshot = self.load().await?;
        snapshot.upsert_album(album);
        self.persist(&snapshot).await
    }
}
