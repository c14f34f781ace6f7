//! Centralized naming conventions.
//!
//! Every path or name the build derives from another one goes through this
//! module, so the conventions are encoded and decoded in exactly one place.
//!
//! ## Derivative filenames
//!
//! A derivative of `DSCF3871.jpg` at 800px encoded as AVIF is stored as
//! `DSCF3871.jpg@800.avif` inside the album's derivative directory. The
//! cache writes names with [`derivative_filename`]; the janitor reads them
//! back with [`parse_derivative_filename`] to recover the source file and
//! the width.
//!
//! ## Public paths
//!
//! Album directories are addressed relative to a storage root whose first
//! path segment is not part of the served URL space:
//! `public/data/albums/kanto/a.jpg` is served as `/data/albums/kanto/a.jpg`.
//! [`public_path`] performs that rewrite.
//!
//! ## Slugs
//!
//! [`sanitize_slug`] turns an album name into a URL-safe identifier.

use std::path::{Component, Path};

/// Parts recovered from a derivative filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativeName {
    /// Filename of the source photo, extension included.
    pub source: String,
    pub width: u32,
    /// Extension of the encoded derivative (`avif`, `jpg`).
    pub extension: String,
}

/// Build the cache filename for `source` at `width`.
///
/// ```text
/// derivative_filename("a.jpg", 800, "avif") → "a.jpg@800.avif"
/// ```
pub fn derivative_filename(source: &str, width: u32, extension: &str) -> String {
    format!("{source}@{width}.{extension}")
}

/// Parse a cache filename written by [`derivative_filename`].
///
/// Splits on the last `@` so sources containing `@` still parse. Returns
/// `None` for anything that doesn't follow the convention (temp files,
/// stray files dropped into the directory).
pub fn parse_derivative_filename(name: &str) -> Option<DerivativeName> {
    let (source, rest) = name.rsplit_once('@')?;
    let (width, extension) = rest.split_once('.')?;
    if source.is_empty() || extension.is_empty() || !width.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(DerivativeName {
        source: source.to_string(),
        width: width.parse().ok()?,
        extension: extension.to_string(),
    })
}

/// Rewrite a storage path into the public root-relative path it is served at.
///
/// The first segment of a relative path is dropped; `.` segments are
/// ignored. Absolute paths keep all their segments.
///
/// ```text
/// public/data/albums/kanto/a.jpg → /data/albums/kanto/a.jpg
/// ./test/fixtures/monkey.jpg     → /fixtures/monkey.jpg
/// ```
pub fn public_path(path: &Path) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut absolute = false;
    for component in path.components() {
        match component {
            Component::RootDir | Component::Prefix(_) => absolute = true,
            Component::CurDir => {}
            Component::ParentDir => segments.push("..".to_string()),
            Component::Normal(s) => segments.push(s.to_string_lossy().into_owned()),
        }
    }
    let kept = if absolute {
        &segments[..]
    } else {
        segments.get(1..).unwrap_or(&[])
    };
    format!("/{}", kept.join("/"))
}

const MAX_SLUG_LEN: usize = 80;

/// Sanitize a name for use as a URL slug.
///
/// - Replaces non-alphanumeric characters (except dashes) with dashes
/// - Collapses consecutive dashes into one
/// - Strips leading and trailing dashes
/// - Truncates to `MAX_SLUG_LEN` characters (breaks at last dash before limit)
pub fn sanitize_slug(name: &str) -> String {
    let mut collapsed = String::with_capacity(name.len());
    let mut prev_dash = false;
    for c in name.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '-' {
            c
        } else {
            '-'
        };
        if c == '-' {
            if !prev_dash {
                collapsed.push('-');
            }
            prev_dash = true;
        } else {
            collapsed.push(c);
            prev_dash = false;
        }
    }

    let trimmed = collapsed.trim_matches('-');
    if trimmed.len() <= MAX_SLUG_LEN {
        trimmed.to_string()
    } else {
        let truncated = &trimmed[..MAX_SLUG_LEN];
        match truncated.rfind('-') {
            Some(pos) => truncated[..pos].to_string(),
            None => truncated.to_string(),
        }
    }
}
