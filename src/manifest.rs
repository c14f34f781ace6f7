//! Manifest resolution: what an album directory says about itself.
//!
//! Every album directory resolves to a [`PersistedAlbum`] in one of three
//! modes, decided by which metadata files are present:
//!
//! | `manifest.json` | `album.json` | Mode |
//! |-----------------|--------------|------|
//! | yes | no  | [`Legacy`](ManifestMode::Legacy): the manifest is the album, verbatim |
//! | any | yes | [`Versioned`](ManifestMode::Versioned): directory scan + sidecar |
//! | no  | no  | [`DirectoryScan`](ManifestMode::DirectoryScan): directory scan only |
//!
//! ## Directory scan
//!
//! ```text
//! albums/kanto.newest-first/
//! ├── DSCF3871.jpg           → photo block, id "DSCF3871.jpg"
//! ├── DSCF3902-cover.jpg     → photo block, album cover
//! ├── album.json             → sidecar (never a photo)
//! ├── .DS_Store              → skipped (hidden)
//! └── .resized_images/       → skipped (directory)
//! ```
//!
//! Photos are listed by filename. A text block titled with the directory
//! name leads the album. A directory name containing `newest-first` flips
//! the default sort direction.
//!
//! ## Versioned sidecar
//!
//! `album.json` layers author intent over the scan:
//!
//! ```json
//! {
//!   "sort": "newest-first",
//!   "cover": "DSCF3902",
//!   "externals": [{"type": "youtube", "href": "https://youtu.be/x", "date": "2019-05-01"}]
//! }
//! ```
//!
//! Externals become video blocks with ids derived from their `href`, so
//! rebuilding an album yields identical ids.

use crate::naming::sanitize_slug;
use crate::types::{
    AlbumFormatting, CoverRef, PersistedAlbum, PersistedBlock, PersistedPhotoBlock, PhotoData,
    PhotoFormatting, SortOrder, TextBlock, TextData, V2Metadata, VideoBlock,
};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Legacy author-written manifest.
pub const LEGACY_MANIFEST: &str = "manifest.json";
/// Versioned sidecar layered over a directory scan.
pub const SIDECAR: &str = "album.json";
/// Directory-name marker selecting newest-first ordering.
pub const NEWEST_FIRST_MARKER: &str = "newest-first";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("album directory not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// How an album directory describes itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestMode {
    Legacy,
    Versioned,
    DirectoryScan,
}

impl ManifestMode {
    /// Scanned albums get sorted and titled; legacy ones keep author order.
    pub fn applies_title_policy(self) -> bool {
        !matches!(self, ManifestMode::Legacy)
    }
}

impl fmt::Display for ManifestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ManifestMode::Legacy => "legacy manifest",
            ManifestMode::Versioned => "versioned",
            ManifestMode::DirectoryScan => "directory scan",
        };
        f.write_str(s)
    }
}

/// A resolved album, not yet built.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedManifest {
    pub mode: ManifestMode,
    pub album: PersistedAlbum,
}

/// Pick the mode from the files present in `dir`.
pub fn detect_mode(dir: &Path) -> ManifestMode {
    let legacy = dir.join(LEGACY_MANIFEST).is_file();
    let sidecar = dir.join(SIDECAR).is_file();
    match (legacy, sidecar) {
        (_, true) => ManifestMode::Versioned,
        (true, false) => ManifestMode::Legacy,
        (false, false) => ManifestMode::DirectoryScan,
    }
}

/// Resolve an album directory into its persisted form.
pub fn resolve(dir: &Path) -> Result<ResolvedManifest, ManifestError> {
    if !dir.is_dir() {
        return Err(ManifestError::NotFound(dir.to_path_buf()));
    }
    let mode = detect_mode(dir);
    let album = match mode {
        ManifestMode::Legacy => read_json(&dir.join(LEGACY_MANIFEST))?,
        ManifestMode::DirectoryScan => scan_directory(dir)?,
        ManifestMode::Versioned => {
            let v2: V2Metadata = read_json(&dir.join(SIDECAR))?;
            let mut album = scan_directory(dir)?;
            apply_sidecar(&mut album, v2);
            album
        }
    };
    Ok(ResolvedManifest { mode, album })
}

/// Album name of a directory: its last path component.
pub fn album_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Names of the album directories under `root`, sorted. Hidden directories
/// are skipped.
pub fn album_names(root: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !entry.path().is_dir() {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ManifestError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Photo filenames in `dir`: regular, non-hidden, non-JSON files, sorted.
fn list_photos(dir: &Path) -> Result<Vec<String>, ManifestError> {
    let io_err = |source| ManifestError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut photos = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || name.ends_with(".json") || !entry.path().is_file() {
            continue;
        }
        photos.push(name);
    }
    photos.sort();
    Ok(photos)
}

fn scan_directory(dir: &Path) -> Result<PersistedAlbum, ManifestError> {
    let name = album_name(dir);
    let photos = list_photos(dir)?;

    let sort = if name.contains(NEWEST_FIRST_MARKER) {
        SortOrder::NewestFirst
    } else {
        SortOrder::OldestFirst
    };
    let cover = photos
        .iter()
        .find(|p| p.contains("cover"))
        .map(|p| CoverRef { src: p.clone() });

    let title = PersistedBlock::Text(TextBlock {
        id: title_block_id(&name),
        data: TextData {
            title: name.clone(),
            kicker: None,
            description: None,
        },
        formatting: None,
    });
    let blocks = std::iter::once(title)
        .chain(photos.into_iter().map(|p| {
            PersistedBlock::Photo(PersistedPhotoBlock {
                id: p.clone(),
                data: PhotoData::new(p),
                formatting: None,
            })
        }))
        .collect();

    Ok(PersistedAlbum {
        title: name.clone(),
        name,
        kicker: None,
        order: None,
        cover,
        formatting: AlbumFormatting {
            sort: Some(sort),
            overlay: None,
        },
        blocks,
    })
}

fn apply_sidecar(album: &mut PersistedAlbum, v2: V2Metadata) {
    for external in v2.externals.unwrap_or_default() {
        album.blocks.push(PersistedBlock::Video(VideoBlock {
            id: video_block_id(&external.href),
            data: external,
        }));
    }

    if let Some(cover) = v2.cover {
        let marked = album.blocks.iter_mut().find_map(|b| match b {
            PersistedBlock::Photo(p) if p.data.src.contains(cover.as_str()) => Some(p),
            _ => None,
        });
        if let Some(photo) = marked {
            photo
                .formatting
                .get_or_insert_with(PhotoFormatting::default)
                .cover = Some(true);
        }
        album.cover = Some(CoverRef { src: cover });
    }

    if let Some(sort) = v2.sort {
        album.formatting.sort = Some(sort);
    }
}

fn title_block_id(name: &str) -> String {
    let slug = sanitize_slug(name);
    if slug.is_empty() {
        "title".to_string()
    } else {
        format!("{slug}-title")
    }
}

fn video_block_id(href: &str) -> String {
    let digest = Sha256::digest(href.as_bytes());
    let hex: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
    format!("video-{hex}")
}
