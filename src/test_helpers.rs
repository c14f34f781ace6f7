//! Shared test utilities for the album-forge test suite.
//!
//! Block and album builders for ordering tests, a real JPEG writer for
//! decoder tests, and lookups into a [`BuildReport`] that panic with the
//! available names on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let report = build_albums(root, &ctx).unwrap();
//! let album = find_album(&report, "kanto");
//! let photo = find_photo(album, "a.jpg");
//! assert_eq!(photo.build.srcset.len(), 1);
//! ```

use image::{ImageEncoder, RgbImage};
use std::path::{Path, PathBuf};

use crate::album::BuildReport;
use crate::types::{
    Album, AlbumBuildInfo, AlbumFormatting, Block, JsonObject, PhotoBlock, PhotoBuild, PhotoData,
    TextBlock, TextData, VideoBlock, VideoData, VideoKind,
};

// =========================================================================
// Image files
// =========================================================================

/// Write a real baseline JPEG with a gradient so decoders have content.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

// =========================================================================
// Block builders
// =========================================================================

pub fn text_block(id: &str, title: &str) -> Block {
    Block::Text(TextBlock {
        id: id.into(),
        data: TextData {
            title: title.into(),
            kicker: None,
            description: None,
        },
        formatting: None,
    })
}

/// A built photo, optionally with `DateTimeOriginal` in its EXIF.
pub fn photo_taken(id: &str, taken: Option<&str>) -> Block {
    let mut exif = JsonObject::new();
    if let Some(taken) = taken {
        exif.insert("DateTimeOriginal".into(), taken.into());
    }
    Block::Photo(PhotoBlock {
        id: id.into(),
        data: PhotoData::new(format!("{id}.jpg")),
        formatting: None,
        build: PhotoBuild {
            width: 100,
            height: 100,
            exif,
            tags: None,
            srcset: Vec::new(),
            cover_inferred: false,
        },
    })
}

pub fn video_on(id: &str, date: Option<&str>) -> Block {
    Block::Video(VideoBlock {
        id: id.into(),
        data: VideoData {
            kind: VideoKind::Youtube,
            href: format!("https://youtu.be/{id}"),
            date: date.map(String::from),
        },
    })
}

/// A built album named "test" holding `blocks` as given.
pub fn album_of(blocks: Vec<Block>) -> Album {
    Album {
        name: "test".into(),
        title: "Test".into(),
        kicker: None,
        order: None,
        cover: None,
        formatting: AlbumFormatting::default(),
        blocks,
        build: AlbumBuildInfo {
            slug: "test".into(),
            srcdir: PathBuf::from("albums/test"),
            time_range: None,
        },
    }
}

// =========================================================================
// Report lookups - panic with a clear message on miss
// =========================================================================

/// Find a built album by name. Panics if not found.
pub fn find_album<'a>(report: &'a BuildReport, name: &str) -> &'a Album {
    report
        .albums
        .iter()
        .map(|b| &b.album)
        .find(|a| a.name == name)
        .unwrap_or_else(|| {
            let names: Vec<&str> = report.albums.iter().map(|b| b.album.name.as_str()).collect();
            panic!("album '{name}' not found. Available: {names:?}")
        })
}

/// Find a photo by source filename within an album. Panics if not found.
pub fn find_photo<'a>(album: &'a Album, filename: &str) -> &'a PhotoBlock {
    let photos = || {
        album.blocks.iter().filter_map(|b| match b {
            Block::Photo(p) => Some(p),
            _ => None,
        })
    };
    let suffix = format!("/{filename}");
    photos()
        .find(|p| p.data.src == filename || p.data.src.ends_with(&suffix))
        .unwrap_or_else(|| {
            let srcs: Vec<&str> = photos().map(|p| p.data.src.as_str()).collect();
            panic!(
                "photo '{filename}' not found in album '{}'. Available: {srcs:?}",
                album.name
            )
        })
}
