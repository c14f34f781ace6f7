//! Album document types shared by every stage of the build.
//!
//! There are two shapes for everything:
//!
//! - **Persisted** types ([`PersistedAlbum`], [`PersistedBlock`]) are what an
//!   author writes in `manifest.json`, or what the manifest resolver
//!   synthesizes from a directory listing. They carry source-of-truth fields
//!   only.
//! - **Built** types ([`Album`], [`Block`]) are the persisted shape plus a
//!   `_build` record computed on every build: dimensions, EXIF, tags,
//!   responsive derivatives, slug, and the source directory.
//!
//! JSON field names match the on-disk manifest format (`_build`, `srcdir`,
//! `timeRange`, `srcset`), so existing manifests parse unchanged.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Free-form JSON object. Used for EXIF records, tag rows, and formatting
/// keys we don't interpret.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// EXIF-derived metadata for a photo. Empty when extraction fails.
pub type MetadataRecord = JsonObject;

/// A row from the search index: tags, colors, descriptions.
pub type TagRecord = JsonObject;

/// Chronological direction of an album.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    OldestFirst,
    NewestFirst,
}

// ============================================================================
// Blocks
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kicker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A heading/paragraph block. Identical in persisted and built form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub id: String,
    pub data: TextData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatting: Option<JsonObject>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoKind {
    Youtube,
}

/// An embedded external video. Also the shape of a sidecar `externals` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoData {
    #[serde(rename = "type")]
    pub kind: VideoKind,
    pub href: String,
    /// Explicit date used for ordering; any ISO-8601 date or datetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Alias used where the value comes from a versioned sidecar.
pub type ExternalBlockSpec = VideoData;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoBlock {
    pub id: String,
    pub data: VideoData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoData {
    /// Relative to the album directory when persisted; public root-relative
    /// path once built.
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kicker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PhotoData {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            title: None,
            kicker: None,
            description: None,
        }
    }
}

/// Presentation flags for a photo. Unknown keys are kept in `extra` so
/// hand-written manifests survive a round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoFormatting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immersive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<bool>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl PhotoFormatting {
    /// True when this would serialize to `{}`.
    pub fn is_empty(&self) -> bool {
        self.immersive.is_none() && self.cover.is_none() && self.extra.is_empty()
    }
}

/// A photo as the author describes it: no derived data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedPhotoBlock {
    pub id: String,
    pub data: PhotoData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatting: Option<PhotoFormatting>,
}

/// One generated derivative of a source photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derivative {
    /// Public root-relative path of the cached file.
    pub src: String,
    pub width: u32,
    pub height: u32,
}

/// Everything computed for a photo at build time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoBuild {
    pub width: u32,
    pub height: u32,
    pub exif: MetadataRecord,
    pub tags: Option<TagRecord>,
    /// Ascending by width, one entry per configured width.
    pub srcset: Vec<Derivative>,
    /// Set when `formatting.cover` came from the filename rather than the
    /// author, so serialization can drop it again.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cover_inferred: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoBlock {
    pub id: String,
    pub data: PhotoData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatting: Option<PhotoFormatting>,
    #[serde(rename = "_build")]
    pub build: PhotoBuild,
}

/// Author-facing block. Unknown `kind` values fail to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PersistedBlock {
    Text(TextBlock),
    Photo(PersistedPhotoBlock),
    Video(VideoBlock),
}

/// Fully built block. Only photos carry build data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Block {
    Text(TextBlock),
    Photo(PhotoBlock),
    Video(VideoBlock),
}

impl Block {
    pub fn id(&self) -> &str {
        match self {
            Block::Text(b) => &b.id,
            Block::Photo(b) => &b.id,
            Block::Video(b) => &b.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Block::Text(_) => "text",
            Block::Photo(_) => "photo",
            Block::Video(_) => "video",
        }
    }
}

impl PersistedBlock {
    pub fn id(&self) -> &str {
        match self {
            PersistedBlock::Text(b) => &b.id,
            PersistedBlock::Photo(b) => &b.id,
            PersistedBlock::Video(b) => &b.id,
        }
    }
}

// ============================================================================
// Albums
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverRef {
    pub src: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlbumFormatting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay: Option<bool>,
}

/// Album as stored in a legacy `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedAlbum {
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kicker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<CoverRef>,
    #[serde(default)]
    pub formatting: AlbumFormatting,
    pub blocks: Vec<PersistedBlock>,
}

/// Build-time facts about an album. `srcdir` is the only field coupled to
/// the filesystem and never appears in a persisted manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumBuildInfo {
    pub slug: String,
    pub srcdir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<(Option<i64>, Option<i64>)>,
}

/// Fully built album, the document every presentation layer consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kicker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<CoverRef>,
    #[serde(default)]
    pub formatting: AlbumFormatting,
    pub blocks: Vec<Block>,
    #[serde(rename = "_build")]
    pub build: AlbumBuildInfo,
}

impl Album {
    /// Effective sort direction (`oldest-first` unless set).
    pub fn sort_order(&self) -> SortOrder {
        self.formatting.sort.unwrap_or_default()
    }
}

/// Versioned sidecar (`album.json`): author intent layered over a
/// directory scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct V2Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOrder>,
    /// Filename (or substring of one) of the cover photo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub externals: Option<Vec<ExternalBlockSpec>>,
}
