//! Block codec: persisted blocks in, built blocks out, and back.
//!
//! ```text
//! PersistedBlock ──deserialize_block──▶ Block
//! Block ──serialize_block──▶ PersistedBlock
//! ```
//!
//! Text and video blocks pass through unchanged. A photo block is enriched
//! with three independent reads, run concurrently on the rayon pool:
//!
//! - dimensions + EXIF ([`metadata`](crate::metadata))
//! - responsive derivatives ([`cache`](crate::cache))
//! - tags ([`tags`](crate::tags))
//!
//! and gets two author-visible adjustments:
//!
//! - `formatting.cover` defaults to whether the filename contains `cover`.
//!   An explicit value in the manifest wins.
//! - `data.src` becomes the public root-relative path
//!   (`public/data/albums/kanto/a.jpg` → `/data/albums/kanto/a.jpg`).
//!
//! Serializing drops everything derived: `_build`, an inferred cover flag,
//! and a formatting object left empty. The `src` rewrite is not undone.

use crate::cache::{CacheError, DerivativeCache};
use crate::imaging::ImageBackend;
use crate::metadata;
use crate::naming::{public_path, sanitize_slug};
use crate::ordering::timestamp_range;
use crate::tags::TagLookup;
use crate::types::{
    Album, AlbumBuildInfo, Block, PersistedAlbum, PersistedBlock, PersistedPhotoBlock,
    PhotoBlock, PhotoBuild, TextBlock,
};
use rayon::prelude::*;
use std::path::Path;
use thiserror::Error;

/// Everything a block needs from the outside world to build.
pub struct BuildContext<'a> {
    pub backend: &'a dyn ImageBackend,
    pub tags: &'a dyn TagLookup,
    pub cache: &'a DerivativeCache,
    /// Derivative widths generated for every photo.
    pub widths: Vec<u32>,
}

/// A block that failed to build.
#[derive(Error, Debug)]
#[error("block '{id}': {source}")]
pub struct BlockError {
    pub id: String,
    pub source: CacheError,
}

/// Every block failure of one album.
#[derive(Error, Debug)]
#[error("{} block(s) failed to build", .0.len())]
pub struct BlockFailures(pub Vec<BlockError>);

/// Build one block. `album_dir` is the directory photo `src` values are
/// relative to.
pub fn deserialize_block(
    block: PersistedBlock,
    album_dir: &Path,
    ctx: &BuildContext<'_>,
) -> Result<Block, BlockError> {
    match block {
        PersistedBlock::Text(text) => Ok(Block::Text(text)),
        PersistedBlock::Video(video) => Ok(Block::Video(video)),
        PersistedBlock::Photo(photo) => deserialize_photo(photo, album_dir, ctx).map(Block::Photo),
    }
}

fn deserialize_photo(
    photo: PersistedPhotoBlock,
    album_dir: &Path,
    ctx: &BuildContext<'_>,
) -> Result<PhotoBlock, BlockError> {
    let source = album_dir.join(&photo.data.src);

    let ((dims, exif), (srcset, tags)) = rayon::join(
        || {
            rayon::join(
                || metadata::get_dimensions(ctx.backend, &source),
                || metadata::extract(&source),
            )
        },
        || {
            rayon::join(
                || ctx.cache.ensure(ctx.backend, &source, &ctx.widths),
                || ctx.tags.lookup(&source),
            )
        },
    );
    let srcset = srcset.map_err(|source| BlockError {
        id: photo.id.clone(),
        source,
    })?;

    let mut formatting = photo.formatting.unwrap_or_default();
    let cover_inferred = formatting.cover.is_none();
    if cover_inferred {
        formatting.cover = Some(photo.data.src.contains("cover"));
    }

    let mut data = photo.data;
    data.src = public_path(&source);

    Ok(PhotoBlock {
        id: photo.id,
        data,
        formatting: Some(formatting),
        build: PhotoBuild {
            width: dims.width,
            height: dims.height,
            exif,
            tags,
            srcset,
            cover_inferred,
        },
    })
}

/// Strip derived data from a built block.
pub fn serialize_block(block: &Block) -> PersistedBlock {
    match block {
        Block::Text(text) => PersistedBlock::Text(TextBlock {
            formatting: text.formatting.clone().filter(|f| !f.is_empty()),
            ..text.clone()
        }),
        Block::Video(video) => PersistedBlock::Video(video.clone()),
        Block::Photo(photo) => {
            let formatting = photo.formatting.clone().and_then(|mut f| {
                if photo.build.cover_inferred {
                    f.cover = None;
                }
                (!f.is_empty()).then_some(f)
            });
            PersistedBlock::Photo(PersistedPhotoBlock {
                id: photo.id.clone(),
                data: photo.data.clone(),
                formatting,
            })
        }
    }
}

/// Build every block of an album in parallel.
///
/// All blocks are attempted; if any fails the album fails with the full
/// list of failures. The result keeps the persisted block order.
pub fn deserialize_album(
    persisted: PersistedAlbum,
    album_dir: &Path,
    ctx: &BuildContext<'_>,
) -> Result<Album, BlockFailures> {
    let results: Vec<Result<Block, BlockError>> = persisted
        .blocks
        .into_par_iter()
        .map(|block| deserialize_block(block, album_dir, ctx))
        .collect();

    let mut blocks = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(block) => blocks.push(block),
            Err(e) => failures.push(e),
        }
    }
    if !failures.is_empty() {
        return Err(BlockFailures(failures));
    }

    let slug = match sanitize_slug(&persisted.name) {
        s if s.is_empty() => persisted.name.clone(),
        s => s,
    };
    let time_range = Some(timestamp_range(&blocks));

    Ok(Album {
        name: persisted.name,
        title: persisted.title,
        kicker: persisted.kicker,
        order: persisted.order,
        cover: persisted.cover,
        formatting: persisted.formatting,
        blocks,
        build: AlbumBuildInfo {
            slug,
            srcdir: album_dir.to_path_buf(),
            time_range,
        },
    })
}

/// Strip all build data from an album.
pub fn serialize_album(album: &Album) -> PersistedAlbum {
    PersistedAlbum {
        name: album.name.clone(),
        title: album.title.clone(),
        kicker: album.kicker.clone(),
        order: album.order,
        cover: album.cover.clone(),
        formatting: album.formatting.clone(),
        blocks: album.blocks.iter().map(serialize_block).collect(),
    }
}
