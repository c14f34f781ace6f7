//! Derivative cache for incremental builds.
//!
//! Encoding is the bottleneck of the build pipeline: a single photo at three
//! widths can take several seconds through rav1e. This module makes sure
//! every (photo, width) pair is encoded once and then reused across builds.
//!
//! # Design
//!
//! The cache is **path-addressed**: the key is `(source filename, width)`,
//! realized as a file in a derivative directory next to the source:
//!
//! ```text
//! albums/kanto/DSCF3871.jpg
//! albums/kanto/.resized_images/DSCF3871.jpg@800.avif
//! albums/kanto/.resized_images/DSCF3871.jpg@1600.avif
//! ```
//!
//! Filenames go through [`naming`](crate::naming) so the
//! [`janitor`](crate::janitor) can parse them back.
//!
//! A cache hit requires:
//! 1. The derivative file exists and is non-empty
//! 2. The backend can identify it with non-zero dimensions
//!
//! On a hit the dimensions are read back from the file rather than computed
//! from the requested width, so a file written by another encoder reports
//! its real size.
//!
//! Changing quality or format does not invalidate existing files of the
//! same name; changing the extension (format) produces new names and the
//! janitor removes the old ones.
//!
//! ## Concurrency
//!
//! Writes are atomic (temp file + rename inside the backend), so a crash
//! never leaves a truncated derivative under its final name. Within one
//! process a per-path lock keeps two workers from encoding the same
//! derivative at once; the second one waits and then takes the cache hit.

use crate::config::BuildConfig;
use crate::imaging::{BackendError, ImageBackend, OutputFormat, Quality, ResizeParams};
use crate::naming::{derivative_filename, public_path};
use crate::types::Derivative;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a photo file: {}", .0.display())]
    InvalidSource(PathBuf),
    #[error("failed to encode {} at {width}px: {source}", .path.display())]
    Encode {
        path: PathBuf,
        width: u32,
        source: BackendError,
    },
}

/// Summary of cache performance for a build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} encoded ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} encoded", self.misses)
        }
    }
}

/// One lock per derivative path, created on first use and dropped once
/// nobody holds or waits on it.
#[derive(Default)]
struct KeyedLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    fn get(&self, key: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(key.to_path_buf()).or_default().clone()
    }

    /// Hand back a lock taken with [`get`](Self::get), after its guard is
    /// dropped.
    fn release(&self, key: &Path, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Held only by the map and `lock`: no other worker is waiting
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Generates and reuses responsive derivatives of source photos.
pub struct DerivativeCache {
    dir_name: String,
    quality: Quality,
    format: OutputFormat,
    locks: KeyedLocks,
    stats: Mutex<CacheStats>,
}

impl DerivativeCache {
    pub fn new(dir_name: impl Into<String>, quality: Quality, format: OutputFormat) -> Self {
        Self {
            dir_name: dir_name.into(),
            quality,
            format,
            locks: KeyedLocks::default(),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(
            config.cache.dir.clone(),
            Quality::new(config.images.quality),
            config.images.format,
        )
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Derivative directory for an album.
    pub fn derivative_dir(&self, album_dir: &Path) -> PathBuf {
        album_dir.join(&self.dir_name)
    }

    /// Cache path of `source` at `width`. `None` when the source has no
    /// filename or no parent directory.
    pub fn cache_path(&self, source: &Path, width: u32) -> Option<PathBuf> {
        let filename = source.file_name()?.to_str()?;
        let album_dir = source.parent()?;
        Some(
            self.derivative_dir(album_dir)
                .join(derivative_filename(filename, width, self.format.extension())),
        )
    }

    /// Hits and encodes since this cache was created.
    pub fn stats(&self) -> CacheStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, hit: bool) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        if hit { stats.hit() } else { stats.miss() }
    }

    /// Ensure a derivative exists for every width, one result per width.
    ///
    /// Widths are deduplicated and processed in ascending order. Each width
    /// is independent: a failed encode does not stop the others.
    pub fn ensure_each(
        &self,
        backend: &dyn ImageBackend,
        source: &Path,
        widths: &[u32],
    ) -> Vec<Result<Derivative, CacheError>> {
        let mut widths = widths.to_vec();
        widths.sort_unstable();
        widths.dedup();

        if let Some(album_dir) = source.parent()
            && let Err(e) = std::fs::create_dir_all(self.derivative_dir(album_dir))
        {
            return widths.iter().map(|_| Err(CacheError::Io(clone_io(&e)))).collect();
        }

        widths
            .into_iter()
            .map(|width| self.ensure_width(backend, source, width))
            .collect()
    }

    /// Ensure all derivatives of `source`, ascending by width.
    ///
    /// Every width is attempted; the first failure is returned afterwards.
    pub fn ensure(
        &self,
        backend: &dyn ImageBackend,
        source: &Path,
        widths: &[u32],
    ) -> Result<Vec<Derivative>, CacheError> {
        self.ensure_each(backend, source, widths)
            .into_iter()
            .collect()
    }

    fn ensure_width(
        &self,
        backend: &dyn ImageBackend,
        source: &Path,
        width: u32,
    ) -> Result<Derivative, CacheError> {
        let output = self
            .cache_path(source, width)
            .ok_or_else(|| CacheError::InvalidSource(source.to_path_buf()))?;

        let lock = self.locks.get(&output);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.ensure_locked(backend, source, &output, width)
        };
        self.locks.release(&output, lock);
        result
    }

    /// Reuse or encode `output`. The caller holds its path lock.
    fn ensure_locked(
        &self,
        backend: &dyn ImageBackend,
        source: &Path,
        output: &Path,
        width: u32,
    ) -> Result<Derivative, CacheError> {
        if let Some(derivative) = self.reuse(backend, output) {
            debug!(path = %output.display(), "derivative cache hit");
            self.record(true);
            return Ok(derivative);
        }

        let dims = backend
            .resize(&ResizeParams {
                source: source.to_path_buf(),
                output: output.to_path_buf(),
                width,
                quality: self.quality,
                format: self.format,
            })
            .map_err(|source_err| CacheError::Encode {
                path: source.to_path_buf(),
                width,
                source: source_err,
            })?;
        info!(
            path = %output.display(),
            width = dims.width,
            height = dims.height,
            "encoded derivative"
        );
        self.record(false);

        Ok(Derivative {
            src: public_path(output),
            width: dims.width,
            height: dims.height,
        })
    }

    /// An existing, non-empty, identifiable derivative.
    fn reuse(&self, backend: &dyn ImageBackend, output: &Path) -> Option<Derivative> {
        let meta = std::fs::metadata(output).ok()?;
        if !meta.is_file() || meta.len() == 0 {
            return None;
        }
        let dims = backend.identify(output).ok()?;
        if dims.width == 0 || dims.height == 0 {
            return None;
        }
        Some(Derivative {
            src: public_path(output),
            width: dims.width,
            height: dims.height,
        })
    }
}

fn clone_io(e: &std::io::Error) -> std::io::Error {
    std::io::Error::new(e.kind(), e.to_string())
}
