use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tabled::Table;

use crate::{
    types::{Metadata, MetadataTableRow},
    warning,
};

pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}

fn shorten(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}

/// One table row per populated metadata field; long text is shortened.
pub fn metadata_rows(metadata: &Metadata) -> Vec<MetadataTableRow> {
    let mut rows = Vec::new();

    if !metadata.genres.is_empty() {
        rows.push(MetadataTableRow {
            field: "genres".to_string(),
            value: metadata.genres.iter().cloned().collect::<Vec<_>>().join(","),
        });
    }
    if let Some(description) = &metadata.description {
        rows.push(MetadataTableRow {
            field: "description".to_string(),
            value: shorten(description, 80),
        });
    }
    if let Some(lyrics) = &metadata.lyrics {
        rows.push(MetadataTableRow {
            field: "lyrics".to_string(),
            value: shorten(lyrics, 80),
        });
    }
    if let Some(lrc) = &metadata.lrc_lyrics {
        rows.push(MetadataTableRow {
            field: "lrc lines".to_string(),
            value: lrc.lines().count().to_string(),
        });
    }
    for image in &metadata.images {
        rows.push(MetadataTableRow {
            field: "image".to_string(),
            value: image.path.clone(),
        });
    }

    rows
}

pub fn print_metadata(label: &str, metadata: Option<Metadata>) {
    match metadata {
        Some(metadata) => {
            let rows = metadata_rows(&metadata);
            if rows.is_empty() {
                warning!("Match found for {} but it carries no metadata.", label);
            } else {
                println!("{}", Table::new(rows));
            }
        }
        None => warning!("No metadata found for {}.", label),
    }
}
