//! Album assembly: one directory in, one fully built [`Album`] out.
//!
//! ```text
//! albums/kanto/ ──resolve──▶ PersistedAlbum ──deserialize──▶ Album
//!                (manifest)                  (codec, parallel)
//!
//! Album ──title policy──▶ Album
//!        (scanned albums only)
//! ```
//!
//! [`build_albums`] runs [`build_album`] for every album directory under a
//! root in parallel. Albums are isolated: a malformed manifest or a photo
//! that fails to encode fails its own album and nothing else.

use crate::codec::{BlockFailures, BuildContext, deserialize_album};
use crate::manifest::{self, ManifestError, ManifestMode};
use crate::ordering::apply_title_policy;
use crate::types::Album;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum AlbumError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("{}: {source}", .dir.display())]
    Blocks {
        dir: PathBuf,
        source: BlockFailures,
    },
    #[error("cannot list albums in {}: {source}", .root.display())]
    ListRoot {
        root: PathBuf,
        source: std::io::Error,
    },
}

/// A built album and how its directory described itself.
#[derive(Debug)]
pub struct AlbumBuild {
    pub mode: ManifestMode,
    pub album: Album,
}

/// An album that failed to build.
#[derive(Debug)]
pub struct AlbumFailure {
    pub name: String,
    pub error: AlbumError,
}

/// Outcome of building every album under a root.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Built albums, sorted by name.
    pub albums: Vec<AlbumBuild>,
    pub failures: Vec<AlbumFailure>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Build one album directory.
pub fn build_album(dir: &Path, ctx: &BuildContext<'_>) -> Result<AlbumBuild, AlbumError> {
    let resolved = manifest::resolve(dir)?;
    let mut album = deserialize_album(resolved.album, dir, ctx).map_err(|source| {
        for failure in &source.0 {
            error!(album = %dir.display(), "{failure}");
        }
        AlbumError::Blocks {
            dir: dir.to_path_buf(),
            source,
        }
    })?;

    if resolved.mode.applies_title_policy() {
        apply_title_policy(&mut album);
    }

    info!(
        album = %album.name,
        mode = %resolved.mode,
        blocks = album.blocks.len(),
        "built album"
    );
    Ok(AlbumBuild {
        mode: resolved.mode,
        album,
    })
}

/// Build every album under `root` in parallel.
///
/// Failing to list `root` is the only error; album failures are collected
/// in the report.
pub fn build_albums(root: &Path, ctx: &BuildContext<'_>) -> Result<BuildReport, AlbumError> {
    let names = manifest::album_names(root).map_err(|source| AlbumError::ListRoot {
        root: root.to_path_buf(),
        source,
    })?;

    let results: Vec<(String, Result<AlbumBuild, AlbumError>)> = names
        .into_par_iter()
        .map(|name| {
            let result = build_album(&root.join(&name), ctx);
            (name, result)
        })
        .collect();

    let mut report = BuildReport::default();
    for (name, result) in results {
        match result {
            Ok(build) => report.albums.push(build),
            Err(e) => {
                error!(album = %name, error = %e, "album failed to build");
                report.failures.push(AlbumFailure { name, error: e });
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DerivativeCache;
    use crate::imaging::backend::tests::{MockBackend, write_fake_image};
    use crate::imaging::{OutputFormat, Quality};
    use crate::tags::NoTags;
    use crate::test_helpers::{find_album, find_photo};
    use crate::types::{Block, SortOrder};
    use std::fs;
    use tempfile::TempDir;

    fn with_ctx<R>(f: impl FnOnce(&BuildContext<'_>) -> R) -> R {
        let backend = MockBackend::new();
        let cache = DerivativeCache::new(".resized_images", Quality::default(), OutputFormat::Avif);
        let ctx = BuildContext {
            backend: &backend,
            tags: &NoTags,
            cache: &cache,
            widths: vec![800],
        };
        f(&ctx)
    }

    fn make_album(root: &Path, name: &str, photos: &[&str]) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        for p in photos {
            write_fake_image(&dir.join(p), 1600, 1200);
        }
        dir
    }

    #[test]
    fn scanned_album_gets_title_first_and_build_info() {
        let tmp = TempDir::new().unwrap();
        let dir = make_album(tmp.path(), "kanto", &["b.jpg", "a.jpg"]);

        let build = with_ctx(|ctx| build_album(&dir, ctx)).unwrap();
        assert_eq!(build.mode, ManifestMode::DirectoryScan);
        let album = build.album;
        assert!(matches!(&album.blocks[0], Block::Text(t) if t.data.title == "kanto"));
        assert_eq!(album.blocks.len(), 3);
        assert_eq!(album.build.slug, "kanto");
        assert_eq!(album.build.srcdir, dir);
        assert_eq!(album.sort_order(), SortOrder::OldestFirst);
    }

    #[test]
    fn legacy_album_keeps_author_order() {
        let tmp = TempDir::new().unwrap();
        let dir = make_album(tmp.path(), "kanto", &["a.jpg", "b.jpg"]);
        fs::write(
            dir.join(manifest::LEGACY_MANIFEST),
            r#"{"name": "kanto", "title": "Kanto", "blocks": [
                {"kind": "photo", "id": "b", "data": {"src": "b.jpg"}},
                {"kind": "text", "id": "t", "data": {"title": "Later"}},
                {"kind": "photo", "id": "a", "data": {"src": "a.jpg"}}
            ]}"#,
        )
        .unwrap();

        let album = with_ctx(|ctx| build_album(&dir, ctx)).unwrap().album;
        let ids: Vec<&str> = album.blocks.iter().map(|b| b.id()).collect();
        assert_eq!(ids, vec!["b", "t", "a"]);
    }

    #[test]
    fn missing_directory_fails_album() {
        let result = with_ctx(|ctx| build_album(Path::new("/nonexistent/kanto"), ctx));
        assert!(matches!(result, Err(AlbumError::Manifest(ManifestError::NotFound(_)))));
    }

    #[test]
    fn unreadable_photo_fails_album() {
        let tmp = TempDir::new().unwrap();
        let dir = make_album(tmp.path(), "kanto", &["a.jpg"]);
        fs::write(dir.join("broken.jpg"), "not an image").unwrap();

        let result = with_ctx(|ctx| build_album(&dir, ctx));
        let Err(AlbumError::Blocks { source, .. }) = result else {
            panic!("expected block failure");
        };
        assert_eq!(source.0.len(), 1);
        assert_eq!(source.0[0].id, "broken.jpg");
    }

    #[test]
    fn batch_isolates_failing_albums() {
        let tmp = TempDir::new().unwrap();
        make_album(tmp.path(), "good", &["a.jpg"]);
        make_album(tmp.path(), "also-good", &["b-cover.jpg"]);
        let bad = make_album(tmp.path(), "bad", &[]);
        fs::write(bad.join(manifest::LEGACY_MANIFEST), "{ nope").unwrap();

        let report = with_ctx(|ctx| build_albums(tmp.path(), ctx)).unwrap();
        assert!(!report.is_success());
        assert_eq!(report.albums.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].name, "bad");

        let album = find_album(&report, "also-good");
        let cover = find_photo(album, "b-cover.jpg");
        assert_eq!(cover.formatting.as_ref().unwrap().cover, Some(true));
    }

    #[test]
    fn batch_albums_sorted_by_name() {
        let tmp = TempDir::new().unwrap();
        for name in ["zebra", "alpha", "mid"] {
            make_album(tmp.path(), name, &[]);
        }
        let report = with_ctx(|ctx| build_albums(tmp.path(), ctx)).unwrap();
        let names: Vec<&str> = report.albums.iter().map(|b| b.album.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zebra"]);
    }

    #[test]
    fn batch_missing_root_is_an_error() {
        let result = with_ctx(|ctx| build_albums(Path::new("/nonexistent/root"), ctx));
        assert!(matches!(result, Err(AlbumError::ListRoot { .. })));
    }
}
