//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. The
//! [`cache`](crate::cache) decides which derivatives are missing and hands a
//! [`ResizeParams`] to the [`backend`](super::backend), which does the pixel
//! work. Tests swap in a mock backend without touching cache logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 75). Clamped on construction.
//! - [`OutputFormat`]: Encoded format of a derivative and its file extension.
//! - [`ResizeParams`]: Everything a resize needs: source and output paths, target
//!   width, quality and format.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

/// Encoded format for derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Avif,
    Jpeg,
}

impl OutputFormat {
    /// File extension used in derivative filenames.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Avif => "avif",
            OutputFormat::Jpeg => "jpg",
        }
    }
}

/// Parameters for a width-constrained resize.
///
/// The output is exactly `width` wide, upscaling narrower sources. Height
/// follows from the source aspect ratio.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub quality: Quality,
    pub format: OutputFormat,
}
