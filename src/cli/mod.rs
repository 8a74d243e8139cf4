//! # CLI Module
//!
//! Command implementations for the `cloudmeta` binary, a minimal host that
//! drives the [`crate::provider::MetadataProvider`] from the terminal.
//!
//! ## Commands
//!
//! - [`artist`] - Resolve metadata for an artist name
//! - [`album`] - Resolve metadata for an album, optionally tagging its files
//! - [`track`] - Resolve metadata for a track, optionally tagging its file
//! - [`lyrics`] - Fetch synced lyrics for a track
//! - [`clear_cache`] / [`purge_cache`] - Maintain the response cache
//!
//! Entities built here are treated as members of the local library, so
//! identifiers discovered in the catalog are written to the JSON library file
//! managed by [`crate::management::JsonLibrary`].
//!
//! ## Usage
//!
//! ```bash
//! cloudmeta artist "Jay Chou"
//! cloudmeta album "Fantasy" --artist "Jay Chou"
//! cloudmeta track "Simple Love" --artist "Jay Chou" --file ~/Music/simple_love.flac
//! cloudmeta lyrics "Simple Love" --artist "Jay Chou"
//! cloudmeta cache purge
//! ```

mod cache;
mod lookup;
mod output;

pub use cache::clear_cache;
pub use cache::purge_cache;
pub use lookup::album;
pub use lookup::artist;
pub use lookup::lyrics;
pub use lookup::track;
pub use lookup::AlbumArgs;
pub use lookup::TrackArgs;
pub use lookup::parse_track_file;
