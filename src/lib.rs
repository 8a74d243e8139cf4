//! Cloud Music Metadata Enrichment Library
//!
//! This library fills in missing artist, album and track metadata for a host
//! media library by querying a self-hosted cloud music catalog API. Resolved
//! fields (descriptions, genres, cover images, external identifiers, lyrics)
//! are handed back to the host, and can optionally be written into the tags of
//! local audio files.
//!
//! # Modules
//!
//! - `cache` - Durable, TTL-bound response cache on the local filesystem
//! - `catalog` - Rate-limited, cached client for the catalog API
//! - `cli` - Command-line interface implementations for the demo host
//! - `config` - Configuration management and environment variables
//! - `library` - Seam through which entity patches are persisted by the host
//! - `management` - JSON-file backed host library used by the CLI
//! - `provider` - The metadata provider exposed to the host
//! - `query` - Search keyword construction and artist name cleaning
//! - `reconcile` - Mapping of catalog results onto host metadata
//! - `tags` - Best-effort tag writing for MP3 and FLAC files
//! - `types` - Data structures and type definitions
//!
//! # Example
//!
//! ```
//! use cloudmeta::{config, management::JsonLibrary, provider::MetadataProvider};
//!
//! #[tokio::main]
//! async fn main() -> cloudmeta::Res<()> {
//!     config::load_env().await?;
//!     let settings = config::Settings::from_env()?;
//!     let provider = MetadataProvider::setup(settings, JsonLibrary::default())?;
//!     // Resolve metadata for host entities...
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod library;
pub mod management;
pub mod provider;
pub mod query;
pub mod reconcile;
pub mod tags;
pub mod types;

/// A convenient Result type alias for operations that may fail.
///
/// Used at the outer edges of the crate (setup, CLI glue) where the concrete
/// error type does not matter to the caller. Components below the provider use
/// their own error enums and convert failures into absence of data.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Searching catalog for {}", keyword);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Updated artist metadata: {}", name);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark.
///
/// The metadata provider runs inside a host process and must never take it
/// down, so this macro only reports. Binaries that want to terminate call
/// `std::process::exit` themselves after logging.
///
/// # Example
///
/// ```
/// error!("Failed to write tags: {}, error: {}", file_name, e);
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for swallowed, recoverable failures such as non-200 responses or a
/// batch of tag writes where some files failed.
///
/// # Example
///
/// ```
/// warning!("Album tag writing failed for {}/{} files", failed, total);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a dimmed diagnostic line when `CLOUDMETA_DEBUG` is set.
#[macro_export]
macro_rules! debug {
  ($($arg:tt)*) => ({
    if std::env::var_os("CLOUDMETA_DEBUG").is_some() {
      use colored::Colorize;
      println!("[{}] {}", "~".dimmed(), std::format_args!($($arg)*));
    }
  })
}
