//! # Album Forge
//!
//! Builds a tree of photo-album directories into fully resolved album
//! documents. Each album directory holds raw photos and, optionally,
//! hand-written metadata; the build turns it into an ordered list of text,
//! photo and video blocks, every photo enriched with its dimensions, EXIF
//! record, search-index tags and a set of responsive derivative images.
//!
//! # Architecture: Resolve, Enrich, Order
//!
//! ```text
//! 1. Resolve   albums/kanto/     →  PersistedAlbum   (manifest, sidecar or scan)
//! 2. Enrich    PersistedAlbum    →  Album            (metadata, tags, derivatives)
//! 3. Order     Album             →  Album            (date sort, title kicker)
//! ```
//!
//! The persisted and built shapes are separate types, so author-controlled
//! fields always survive [`codec::serialize_album`] and derived data never
//! leaks into a manifest.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`album`] | Assembler: resolve, enrich and order one album, or every album under a root |
//! | [`manifest`] | Detects legacy / versioned / scanned albums and produces the persisted album |
//! | [`codec`] | Block and album (de)serialization; photo enrichment runs here |
//! | [`ordering`] | Timestamp sort, text pinning and the year-range kicker |
//! | [`cache`] | Derivative cache: one resized file per (photo, width), encoded on demand |
//! | [`janitor`] | Sweeps derivatives of removed photos, unconfigured widths and old formats |
//! | [`imaging`] | `ImageBackend` trait and the pure-Rust decode/resize/encode backend |
//! | [`metadata`] | EXIF extraction into a JSON record |
//! | [`tags`] | Read-only lookups into the SQLite search index |
//! | [`naming`] | Derivative filenames, public paths and slugs |
//! | [`config`] | `config.toml` loading, validation and the stock config |
//! | [`types`] | Persisted and built album document types |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## All-or-Nothing Albums
//!
//! Every block of an album is attempted, but one failing photo fails its
//! album: a half-built album with missing photos is never handed on. Albums
//! stay independent of each other, so one broken directory never stops a
//! batch build.
//!
//! ## Derivatives Next to Their Sources
//!
//! Derivatives live in a hidden directory inside each album
//! (`kanto/.resized_images/a.jpg@800.avif`). The cache key is the filename,
//! so a derivative is reused as long as it exists and decodes, and the
//! janitor can tell stale files apart from the name alone.
//!
//! ## Best-Effort Enrichment
//!
//! EXIF and tags are optional. A photo without EXIF gets an empty record; a
//! missing, locked or slow search index means no tags. Only derivative
//! encoding can fail a photo.

pub mod album;
pub mod cache;
pub mod codec;
pub mod config;
pub mod imaging;
pub mod janitor;
pub mod manifest;
pub mod metadata;
pub mod naming;
pub mod ordering;
pub mod output;
pub mod tags;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
