//! The metadata provider handed to the host.
//!
//! One [`MetadataProvider`] is built at startup by [`MetadataProvider::setup`]
//! and owns everything shared across calls: the HTTP client, the rate
//! limiter, the cache handle and the host library seam. The `get_*`
//! operations can be called concurrently and repeatedly; none of them ever
//! returns an error to the host.
//!
//! Persistence patches and album tag batches run detached. They are never
//! cancelled: dropping the provider lets them run to completion.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::{sync::mpsc, task::JoinSet};

use crate::{
    Res,
    cache::DiskCache,
    catalog::{self, CatalogClient, lyrics, search},
    config::Settings,
    debug, info,
    library::{LibraryPatch, LibraryUpdater, PersistFailure},
    query, reconcile, success,
    tags::{TagFields, TagWriter},
    types::{Album, Artist, MediaItem, Metadata, Track},
    warning,
};

pub struct MetadataProvider<L: LibraryUpdater> {
    settings: Settings,
    catalog: CatalogClient,
    tags: TagWriter,
    library: Arc<L>,
    background: Mutex<JoinSet<()>>,
    failures: Mutex<Option<mpsc::Sender<PersistFailure>>>,
}

/// Failures kept for a subscriber that has not caught up yet; further ones
/// are only logged.
pub const PERSIST_FAILURE_BUFFER: usize = 64;

impl<L: LibraryUpdater> MetadataProvider<L> {
    /// Builds the shared HTTP client, rate limiter and cache handle.
    ///
    /// # Errors
    ///
    /// Fails only when the HTTP client cannot be constructed.
    pub fn setup(settings: Settings, library: L) -> Res<Self> {
        let http = catalog::build_http_client()?;
        let catalog = CatalogClient::new(
            http.clone(),
            settings.api_url.clone(),
            catalog::build_rate_limiter(),
            DiskCache::new(settings.cache_dir.clone()),
        );
        let tags = TagWriter::new(http);

        if settings.api_url.is_empty() {
            warning!("Catalog API url is not configured, no metadata will be resolved");
        } else {
            info!("Metadata provider ready, catalog API: {}", settings.api_url);
        }

        Ok(Self::from_parts(settings, catalog, tags, library))
    }

    /// Assembles a provider from already built collaborators.
    pub fn from_parts(settings: Settings, catalog: CatalogClient, tags: TagWriter, library: L) -> Self {
        Self {
            settings,
            catalog,
            tags,
            library: Arc::new(library),
            background: Mutex::new(JoinSet::new()),
            failures: Mutex::new(None),
        }
    }

    pub fn library(&self) -> &L {
        &self.library
    }

    /// Subscribes to persistence failures of detached patches.
    ///
    /// Only failures of patches started after the call are delivered; before
    /// anyone subscribes they are logged and dropped. Up to
    /// [`PERSIST_FAILURE_BUFFER`] unread failures are kept. There is a single
    /// subscriber: later calls return `None`.
    pub fn persist_failures(&self) -> Option<mpsc::Receiver<PersistFailure>> {
        let mut failures = lock(&self.failures);
        if failures.is_some() {
            return None;
        }
        let (tx, rx) = mpsc::channel(PERSIST_FAILURE_BUFFER);
        *failures = Some(tx);
        Some(rx)
    }

    /// Waits for every detached task started so far (persistence patches and
    /// album tag batches).
    pub async fn settle(&self) {
        loop {
            let mut pending = std::mem::take(&mut *lock(&self.background));
            if pending.is_empty() {
                return;
            }
            while let Some(joined) = pending.join_next().await {
                if let Err(e) = joined {
                    warning!("Background task ended abnormally: {}", e);
                }
            }
        }
    }

    fn spawn_detached<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut background = lock(&self.background);
        while background.try_join_next().is_some() {}
        background.spawn(task);
    }

    fn persist(&self, patches: Vec<LibraryPatch>) {
        for patch in patches {
            let library = Arc::clone(&self.library);
            let failures = lock(&self.failures).clone();

            self.spawn_detached(async move {
                let kind = patch.kind();
                let item_id = patch.item_id().to_string();
                match patch.apply(library.as_ref()).await {
                    Ok(()) => debug!("Persisted {} {}", kind, item_id),
                    Err(error) => {
                        warning!("Cannot persist {} {}: {}", kind, item_id, error);
                        if let Some(failures) = failures {
                            let failure = PersistFailure {
                                kind,
                                item_id,
                                error,
                            };
                            if failures.try_send(failure).is_err() {
                                debug!("Persist failure not delivered, subscriber is gone or behind");
                            }
                        }
                    }
                }
            });
        }
    }

    /// Dispatches to the operation matching the entity kind.
    pub async fn get_metadata(&self, item: &mut MediaItem) -> Option<Metadata> {
        match item {
            MediaItem::Artist(artist) => self.get_artist_metadata(artist).await,
            MediaItem::Album(album) => self.get_album_metadata(album).await,
            MediaItem::Track(track) => self.get_track_metadata(track).await,
        }
    }

    pub async fn get_artist_metadata(&self, artist: &mut Artist) -> Option<Metadata> {
        if !self.settings.enable_artist_metadata {
            return None;
        }

        let query = query::artist_query(artist)?;

        if self.settings.enable_images && artist.has_thumb() && !self.settings.auto_trigger_no_image {
            debug!("Artist {} already has an image, skipping", artist.name);
            return None;
        }

        let found = search::search_artist(&self.catalog, &query).await?;
        let detail = search::artist_detail(&self.catalog, &found.id).await;

        let resolution = reconcile::resolve_artist(artist, &found, detail.as_ref(), &self.settings);
        self.persist(resolution.patches);

        success!("Updated artist metadata: {}", query.keywords);
        Some(resolution.metadata)
    }

    pub async fn get_album_metadata(&self, album: &mut Album) -> Option<Metadata> {
        if !self.settings.enable_album_metadata {
            return None;
        }

        let query = query::album_query(album)?;
        let found = search::search_album(&self.catalog, &query).await?;

        let resolution = reconcile::resolve_album(album, &found, &self.settings);
        self.persist(resolution.patches);

        if self.settings.write_tags && !album.tracks.is_empty() {
            let writer = self.tags.clone();
            let snapshot = album.clone();
            let artist_name = query::album_artist_name(album);
            let album_name = if found.name.trim().is_empty() {
                album.name.clone()
            } else {
                found.name.clone()
            };
            let cover_url = found.pic_url.clone().unwrap_or_default();

            self.spawn_detached(async move {
                writer
                    .write_album(&snapshot, &artist_name, &album_name, &cover_url)
                    .await;
            });
        }

        success!("Updated album metadata: {}", query.keywords);
        Some(resolution.metadata)
    }

    pub async fn get_track_metadata(&self, track: &mut Track) -> Option<Metadata> {
        if !self.settings.enable_track_metadata {
            return None;
        }

        let query = query::track_query(track)?;
        let artist_name = query::track_artist_name(track);

        let Some(found) = search::search_track(&self.catalog, &query).await else {
            if self.settings.write_tags {
                if let Some(path) = track.existing_file().await {
                    let album_name = track
                        .album
                        .as_ref()
                        .map(|album| album.name.clone())
                        .unwrap_or_default();
                    let fields = TagFields::new(artist_name, album_name, query::track_title(track));
                    let _ = self.tags.write_basic(path, &fields).await;
                }
            }
            return None;
        };

        let resolution = reconcile::resolve_track(track, &found, &self.settings);
        self.persist(resolution.patches);

        if self.settings.write_tags {
            if let Some(path) = track.existing_file().await {
                let api_artist = found
                    .ar
                    .first()
                    .and_then(|ar| ar.name.clone())
                    .unwrap_or(artist_name);
                let fields = TagFields::new(
                    query::clean_artist_name(&api_artist),
                    found.al.name.clone().unwrap_or_default(),
                    found.name.clone(),
                );
                let cover_url = found.al.pic_url.clone().unwrap_or_default();
                let _ = self.tags.write_full(path, &fields, &cover_url).await;
            }
        }

        success!("Updated track metadata: {}", query.keywords);
        Some(resolution.metadata)
    }

    /// Synced lyrics for a track that has none yet.
    pub async fn get_track_lyrics(&self, track: &Track) -> Option<Metadata> {
        if !self.settings.enable_track_metadata {
            return None;
        }
        if track.lyrics.as_ref().is_some_and(|l| !l.trim().is_empty()) {
            return None;
        }

        let artist = track.artists.first()?;
        let title = lyrics::clean_track_title(&track.name);

        let song_id = lyrics::search_song_id(&self.catalog, &title, &artist.name).await?;
        let lrc_lyrics = lyrics::fetch_lyrics(&self.catalog, &song_id).await?;

        Some(Metadata {
            lrc_lyrics: Some(lrc_lyrics),
            ..Default::default()
        })
    }
}

impl<L: LibraryUpdater> Drop for MetadataProvider<L> {
    fn drop(&mut self) {
        // a dropped JoinSet aborts its tasks; detached work must outlive us
        self.background
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .detach_all();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
