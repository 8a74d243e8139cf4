//! Best-effort tag writing for local audio files.
//!
//! Two containers are supported, picked by file extension: `.mp3` files get
//! an ID3v2 tag, `.flac` files get Vorbis comments. Other files are left
//! alone. Fields without a value are never touched, so an existing tag value
//! is only ever replaced by a real one.
//!
//! lofty is synchronous; the read-modify-save cycle runs on the blocking
//! pool while cover downloads stay on the async side.

use std::path::{Path, PathBuf};

use lofty::{
    config::WriteOptions,
    file::TaggedFileExt,
    picture::{MimeType, Picture, PictureType},
    prelude::*,
    probe::Probe,
    tag::{ItemKey, Tag, TagType},
};
use reqwest::Client;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::{catalog, error, success, types::Album, warning};

#[derive(Debug, Error)]
pub enum TagError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: lofty::error::LoftyError,
    },
    #[error("cannot save {path}: {source}")]
    Save {
        path: PathBuf,
        source: lofty::error::LoftyError,
    },
    #[error("{0} does not accept {1:?} tags")]
    Unsupported(PathBuf, TagType),
    #[error("tag writer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Tag container chosen for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Id3,
    Flac,
}

impl Container {
    /// Case-insensitive extension dispatch; `None` for unsupported files.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "mp3" => Some(Container::Id3),
            "flac" => Some(Container::Flac),
            _ => None,
        }
    }

    fn tag_type(self) -> TagType {
        match self {
            Container::Id3 => TagType::Id3v2,
            Container::Flac => TagType::VorbisComments,
        }
    }
}

/// Values to write. Empty strings mean "leave the field as it is".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFields {
    pub artist: String,
    pub album: String,
    pub title: String,
}

impl TagFields {
    pub fn new(
        artist: impl Into<String>,
        album: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            artist: artist.into(),
            album: album.into(),
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub attempted: usize,
    pub failed: usize,
}

fn set_if_present(tag: &mut Tag, key: ItemKey, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        tag.insert_text(key, value.to_string());
    }
}

fn front_cover(data: Vec<u8>) -> Picture {
    Picture::unchecked(data)
        .pic_type(PictureType::CoverFront)
        .mime_type(MimeType::Jpeg)
        .build()
}

/// Synchronous read-modify-save of one file.
pub fn write_tags_blocking(
    path: &Path,
    fields: &TagFields,
    cover: Option<Vec<u8>>,
) -> Result<(), TagError> {
    let Some(container) = Container::from_path(path) else {
        return Ok(());
    };
    let tag_type = container.tag_type();

    let mut tagged_file = Probe::open(path)
        .and_then(|probe| probe.read())
        .map_err(|source| TagError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| TagError::Unsupported(path.to_path_buf(), tag_type))?;

    set_if_present(tag, ItemKey::TrackArtist, &fields.artist);
    set_if_present(tag, ItemKey::AlbumArtist, &fields.artist);
    set_if_present(tag, ItemKey::AlbumTitle, &fields.album);
    set_if_present(tag, ItemKey::TrackTitle, &fields.title);

    if let Some(data) = cover {
        match container {
            Container::Id3 => tag.remove_picture_type(PictureType::CoverFront),
            Container::Flac => {
                while !tag.pictures().is_empty() {
                    tag.remove_picture(0);
                }
            }
        }
        tag.push_picture(front_cover(data));
    }

    tag.save_to_path(path, WriteOptions::default())
        .map_err(|source| TagError::Save {
            path: path.to_path_buf(),
            source,
        })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug, Clone)]
pub struct TagWriter {
    http: Client,
}

impl TagWriter {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Artist, album and title only.
    pub async fn write_basic(&self, path: &Path, fields: &TagFields) -> Result<(), TagError> {
        self.write(path, fields, None).await
    }

    /// Artist, album, title and, when the download succeeds, the cover.
    pub async fn write_full(
        &self,
        path: &Path,
        fields: &TagFields,
        cover_url: &str,
    ) -> Result<(), TagError> {
        let cover = if cover_url.trim().is_empty() || Container::from_path(path).is_none() {
            None
        } else {
            catalog::fetch_cover(&self.http, cover_url.trim()).await
        };

        self.write(path, fields, cover).await
    }

    async fn write(
        &self,
        path: &Path,
        fields: &TagFields,
        cover: Option<Vec<u8>>,
    ) -> Result<(), TagError> {
        let owned_path = path.to_path_buf();
        let owned_fields = fields.clone();
        let result = tokio::task::spawn_blocking(move || {
            write_tags_blocking(&owned_path, &owned_fields, cover)
        })
        .await
        .map_err(TagError::from)
        .and_then(|inner| inner);

        if let Err(e) = &result {
            error!("Failed to write tags: {}, error: {}", file_name(path), e);
        }
        result
    }

    /// Full-mode write for every album track with an existing local file,
    /// all running concurrently. Failures are counted, never propagated.
    pub async fn write_album(
        &self,
        album: &Album,
        artist_name: &str,
        album_name: &str,
        cover_url: &str,
    ) -> BatchReport {
        let mut tasks = JoinSet::new();

        for track in &album.tracks {
            let Some(path) = track.existing_file().await else {
                continue;
            };

            let writer = self.clone();
            let path = path.clone();
            let fields = TagFields::new(artist_name, album_name, track.name.clone());
            let cover_url = cover_url.to_string();
            tasks.spawn(async move { writer.write_full(&path, &fields, &cover_url).await });
        }

        let mut report = BatchReport::default();
        while let Some(joined) = tasks.join_next().await {
            report.attempted += 1;
            if !matches!(joined, Ok(Ok(()))) {
                report.failed += 1;
            }
        }

        if report.failed > 0 {
            warning!(
                "Album tag writing failed for {}/{} files ({})",
                report.failed,
                report.attempted,
                album.name
            );
        } else if report.attempted > 0 {
            success!(
                "Wrote tags for {} files of album {}",
                report.attempted,
                album.name
            );
        }

        report
    }
}
