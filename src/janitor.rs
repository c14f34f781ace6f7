//! Derivative cache cleanup.
//!
//! Three sweeps keep an album's derivative directory in step with its
//! sources and the current configuration:
//!
//! - [`remove_stale_sources`]: the source photo of a derivative was deleted
//!   or renamed.
//! - [`remove_unused_sizes`]: the derivative's width is no longer one of
//!   the configured widths.
//! - [`remove_other_formats`]: the derivative was encoded in a format other
//!   than the configured one.
//!
//! All of them only touch files whose names parse as derivatives
//! ([`parse_derivative_filename`]). Anything else in the directory,
//! including temp files of an encode in progress, is left alone. Errors on
//! individual files are logged and collected, never fatal.

use crate::naming::{DerivativeName, parse_derivative_filename};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Result of one or more sweeps.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Derivatives deleted.
    pub removed: Vec<PathBuf>,
    /// Files that couldn't be inspected or deleted.
    pub errors: Vec<(PathBuf, io::Error)>,
}

impl SweepReport {
    fn merge(&mut self, other: SweepReport) {
        self.removed.extend(other.removed);
        self.errors.extend(other.errors);
    }
}

/// Delete derivatives whose source is gone from `album_dir`.
pub fn remove_stale_sources(album_dir: &Path, derivative_dir: &Path) -> SweepReport {
    sweep(derivative_dir, |name| !album_dir.join(&name.source).is_file())
}

/// Delete derivatives whose width isn't in `widths`.
pub fn remove_unused_sizes(derivative_dir: &Path, widths: &[u32]) -> SweepReport {
    sweep(derivative_dir, |name| !widths.contains(&name.width))
}

/// Delete derivatives whose extension isn't `extension`.
pub fn remove_other_formats(derivative_dir: &Path, extension: &str) -> SweepReport {
    sweep(derivative_dir, |name| name.extension != extension)
}

/// Run every sweep on one album. `extension` is the one of the configured
/// output format.
pub fn sweep_album(
    album_dir: &Path,
    derivative_dir: &Path,
    widths: &[u32],
    extension: &str,
) -> SweepReport {
    let mut report = remove_stale_sources(album_dir, derivative_dir);
    report.merge(remove_unused_sizes(derivative_dir, widths));
    report.merge(remove_other_formats(derivative_dir, extension));
    report
}

/// Delete every derivative in `dir` matching `is_stale`.
fn sweep(dir: &Path, is_stale: impl Fn(&DerivativeName) -> bool) -> SweepReport {
    let mut report = SweepReport::default();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return report,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot read derivative directory");
            report.errors.push((dir.to_path_buf(), e));
            return report;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot read directory entry");
                report.errors.push((dir.to_path_buf(), e));
                continue;
            }
        };
        let path = entry.path();
        let Some(name) = entry.file_name().to_str().and_then(parse_derivative_filename) else {
            continue;
        };
        if !path.is_file() || !is_stale(&name) {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "removed stale derivative");
                report.removed.push(path);
            }
            // Already gone: another sweep got there first
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot remove derivative");
                report.errors.push((path, e));
            }
        }
    }
    report
}
