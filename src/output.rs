//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Output is **album-centric, not file-centric**. Every album leads with its
//! positional index and title; where it came from (directory, manifest
//! mode) and what it contains follow as indented context lines.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! 001 Kanto (12 blocks)
//!     Source: kanto/ (versioned)
//!     10 photos, 1 video, 1 text
//!     Years: 2017–2019
//! 002 broken
//!     Error: broken/manifest.json: expected value at line 1 column 3
//!
//! Built 1 album, 1 failed
//! Cache: 18 cached, 2 encoded (20 total)
//! ```
//!
//! ## Check
//!
//! ```text
//! 001 Kanto (12 blocks)
//!     Source: kanto/ (versioned)
//! ```
//!
//! ## Clean
//!
//! ```text
//! kanto
//!     Removed: a.jpg@1200.avif
//!
//! Removed 1 derivative
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::album::BuildReport;
use crate::cache::CacheStats;
use crate::janitor::SweepReport;
use crate::manifest::{ManifestError, ManifestMode, ResolvedManifest};
use crate::ordering::kicker;
use crate::types::Album;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 photo`, `2 photos`.
fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Album header: positional index + title + block count.
///
/// ```text
/// 001 Kanto (12 blocks)
/// ```
fn album_header(index: usize, title: &str, blocks: usize) -> String {
    format!("{} {} ({})", format_index(index), title, plural(blocks, "block"))
}

fn source_line(name: &str, mode: ManifestMode) -> String {
    format!("{}Source: {}/ ({})", indent(1), name, mode)
}

/// Per-kind block counts, skipping kinds with none.
///
/// ```text
/// 10 photos, 1 video, 1 text
/// ```
fn block_summary(album: &Album) -> String {
    let count = |kind: &str| album.blocks.iter().filter(|b| b.kind() == kind).count();
    let (photos, videos, texts) = (count("photo"), count("video"), count("text"));

    let mut parts = Vec::new();
    if photos > 0 {
        parts.push(plural(photos, "photo"));
    }
    if videos > 0 {
        parts.push(plural(videos, "video"));
    }
    if texts > 0 {
        parts.push(format!("{texts} text"));
    }
    if parts.is_empty() {
        "empty".to_string()
    } else {
        parts.join(", ")
    }
}

/// Year range over the album's dated photos, in its sort direction.
fn years_line(album: &Album) -> Option<String> {
    let range = album.build.time_range?;
    kicker(range, album.sort_order()).map(|years| format!("{}Years: {}", indent(1), years))
}

fn error_line(error: &dyn std::fmt::Display) -> String {
    format!("{}Error: {}", indent(1), error)
}

// ============================================================================
// Build output
// ============================================================================

/// Format the result of `build`: one entry per album (built or failed),
/// then totals and cache statistics.
pub fn format_build_output(report: &BuildReport, stats: CacheStats) -> Vec<String> {
    // Built and failed albums interleaved by name, as listed on disk
    let mut entries: Vec<(&str, Result<usize, usize>)> = report
        .albums
        .iter()
        .enumerate()
        .map(|(i, b)| (b.album.name.as_str(), Ok(i)))
        .chain(
            report
                .failures
                .iter()
                .enumerate()
                .map(|(i, f)| (f.name.as_str(), Err(i))),
        )
        .collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut lines = Vec::new();
    for (pos, (name, entry)) in entries.into_iter().enumerate() {
        match entry {
            Ok(i) => {
                let build = &report.albums[i];
                let album = &build.album;
                lines.push(album_header(pos + 1, &album.title, album.blocks.len()));
                lines.push(source_line(name, build.mode));
                lines.push(format!("{}{}", indent(1), block_summary(album)));
                lines.extend(years_line(album));
            }
            Err(i) => {
                lines.push(format!("{} {}", format_index(pos + 1), name));
                lines.push(error_line(&report.failures[i].error));
            }
        }
    }

    lines.push(String::new());
    let mut totals = format!("Built {}", plural(report.albums.len(), "album"));
    if !report.failures.is_empty() {
        totals.push_str(&format!(", {} failed", report.failures.len()));
    }
    lines.push(totals);
    lines.push(format!("Cache: {}", stats));
    lines
}

/// Print build output to stdout.
pub fn print_build_output(report: &BuildReport, stats: CacheStats) {
    for line in format_build_output(report, stats) {
        println!("{}", line);
    }
}

// ============================================================================
// Check output
// ============================================================================

/// Format the result of `check`: how each album describes itself, without
/// touching any image.
pub fn format_check_output(
    results: &[(String, Result<ResolvedManifest, ManifestError>)],
) -> Vec<String> {
    let mut lines = Vec::new();
    for (pos, (name, result)) in results.iter().enumerate() {
        match result {
            Ok(resolved) => {
                lines.push(album_header(
                    pos + 1,
                    &resolved.album.title,
                    resolved.album.blocks.len(),
                ));
                lines.push(source_line(name, resolved.mode));
            }
            Err(e) => {
                lines.push(format!("{} {}", format_index(pos + 1), name));
                lines.push(error_line(e));
            }
        }
    }
    lines
}

/// Print check output to stdout.
pub fn print_check_output(results: &[(String, Result<ResolvedManifest, ManifestError>)]) {
    for line in format_check_output(results) {
        println!("{}", line);
    }
}

// ============================================================================
// Clean output
// ============================================================================

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Format the result of a cache sweep. Albums with nothing to report are
/// omitted.
pub fn format_sweep_output(reports: &[(String, SweepReport)]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut removed = 0;
    for (name, report) in reports {
        if report.removed.is_empty() && report.errors.is_empty() {
            continue;
        }
        lines.push(name.clone());
        for path in &report.removed {
            lines.push(format!("{}Removed: {}", indent(1), file_name(path)));
        }
        for (path, e) in &report.errors {
            lines.push(format!("{}Error: {}: {}", indent(1), file_name(path), e));
        }
        removed += report.removed.len();
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!("Removed {}", plural(removed, "derivative")));
    lines
}

/// Print sweep output to stdout.
pub fn print_sweep_output(reports: &[(String, SweepReport)]) {
    for line in format_sweep_output(reports) {
        println!("{}", line);
    }
}
