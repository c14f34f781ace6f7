//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the build needs:
//! identify (read dimensions) and resize (decode, scale, encode, write).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use the
//! recording [`MockBackend`](tests::MockBackend).

use super::params::ResizeParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` so a single backend can be shared across rayon workers.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Execute a resize operation, returning the dimensions actually written.
    ///
    /// The output must appear atomically: either the complete file or
    /// nothing at `params.output`.
    fn resize(&self, params: &ResizeParams) -> Result<Dimensions, BackendError>;
}
