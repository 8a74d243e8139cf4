//! Host persistence seam.
//!
//! When resolution discovers an identifier the host library is missing, the
//! patched entity is handed to a [`LibraryUpdater`] on a detached task. The
//! provider never waits for the outcome; failures are logged and published
//! as [`PersistFailure`] values.

use std::future::Future;

use thiserror::Error;

use crate::types::{Album, Artist};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("entity {0} is not in the library")]
    NotFound(String),
    #[error("library storage failed: {0}")]
    Storage(String),
}

/// Update-in-library calls offered by the host.
pub trait LibraryUpdater: Send + Sync + 'static {
    fn update_artist(&self, artist: Artist) -> impl Future<Output = Result<(), PersistError>> + Send;

    fn update_album(&self, album: Album) -> impl Future<Output = Result<(), PersistError>> + Send;
}

/// An entity patch queued for persistence.
#[derive(Debug, Clone, PartialEq)]
pub enum LibraryPatch {
    Artist(Artist),
    Album(Album),
}

impl LibraryPatch {
    pub fn item_id(&self) -> &str {
        match self {
            LibraryPatch::Artist(a) => &a.item_id,
            LibraryPatch::Album(a) => &a.item_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LibraryPatch::Artist(_) => "artist",
            LibraryPatch::Album(_) => "album",
        }
    }

    pub async fn apply<L: LibraryUpdater>(self, library: &L) -> Result<(), PersistError> {
        match self {
            LibraryPatch::Artist(artist) => library.update_artist(artist).await,
            LibraryPatch::Album(album) => library.update_album(album).await,
        }
    }
}

/// A persistence patch that did not make it into the host library.
#[derive(Debug)]
pub struct PersistFailure {
    pub kind: &'static str,
    pub item_id: String,
    pub error: PersistError,
}
