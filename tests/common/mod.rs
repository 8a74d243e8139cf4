// Shared audio fixtures for the integration tests.
#![allow(dead_code)]

use std::path::Path;

use lofty::{
    file::TaggedFileExt,
    picture::PictureType,
    probe::Probe,
    tag::{Tag, TagType},
};

pub const COVER_BYTES: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0xFF, 0xD9,
];

// MPEG-1 Layer III, 128 kbps, 44.1 kHz: 417 byte frames
pub fn write_test_mp3(path: &Path) {
    let mut bytes = Vec::new();
    for _ in 0..10 {
        bytes.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
        bytes.extend(std::iter::repeat_n(0x00, 413));
    }
    std::fs::write(path, bytes).unwrap();
}

// "fLaC" marker followed by a single, final STREAMINFO block
pub fn write_test_flac(path: &Path) {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"fLaC");
    bytes.extend_from_slice(&[0x80, 0x00, 0x00, 0x22]);
    bytes.extend_from_slice(&[0x10, 0x00, 0x10, 0x00]); // block sizes
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00]); // frame sizes
    // 44100 Hz, 2 channels, 16 bits, 0 samples
    bytes.extend_from_slice(&[0x0A, 0xC4, 0x42, 0xF0, 0x00, 0x00, 0x00, 0x00]);
    bytes.extend_from_slice(&[0x00; 16]); // md5
    std::fs::write(path, bytes).unwrap();
}

pub fn read_tag(path: &Path, tag_type: TagType) -> Tag {
    let tagged = Probe::open(path).unwrap().read().unwrap();
    tagged.tag(tag_type).cloned().unwrap()
}

pub fn front_covers(tag: &Tag) -> usize {
    tag.pictures()
        .iter()
        .filter(|p| p.pic_type() == PictureType::CoverFront)
        .count()
}
