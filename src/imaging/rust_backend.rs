//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Orientation | `ImageDecoder::orientation` + `DynamicImage::apply_orientation` |
//! | Identify (AVIF) | `avif-parse` container metadata, no pixel decode |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Atomic write | `tempfile::NamedTempFile` in the output dir, then `persist` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::scale_to_width;
use super::params::{OutputFormat, ResizeParams};
use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn is_avif(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("avif"))
}

fn decode_error(path: &Path, e: impl std::fmt::Display) -> BackendError {
    BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
}

/// Load, decode and upright an image from disk.
///
/// The EXIF orientation is applied to the pixels, so the returned image is
/// displayed correctly without any metadata.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    let reader = ImageReader::open(path)?
        .with_guessed_format()
        .map_err(BackendError::Io)?;
    let mut decoder = reader.into_decoder().map_err(|e| decode_error(path, e))?;
    let orientation = decoder.orientation().map_err(|e| decode_error(path, e))?;
    let mut img = DynamicImage::from_decoder(decoder).map_err(|e| decode_error(path, e))?;
    img.apply_orientation(orientation);
    Ok(img)
}

/// Extract dimensions from an AVIF file's container metadata (no full decode needed).
fn identify_avif(path: &Path) -> Result<Dimensions, BackendError> {
    let file_data = std::fs::read(path)?;
    let avif = avif_parse::read_avif(&mut std::io::Cursor::new(&file_data)).map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to parse AVIF {}: {e:?}", path.display()))
    })?;
    let meta = avif.primary_item_metadata().map_err(|e| {
        BackendError::ProcessingFailed(format!(
            "Failed to read AVIF metadata {}: {e:?}",
            path.display()
        ))
    })?;
    Ok(Dimensions {
        width: meta.max_frame_width.get(),
        height: meta.max_frame_height.get(),
    })
}

/// Encode into memory in the requested format.
fn encode(img: &DynamicImage, format: OutputFormat, quality: u32) -> Result<Vec<u8>, BackendError> {
    let mut bytes = Vec::new();
    let result = match format {
        // speed=6 for reasonable throughput
        OutputFormat::Avif => img.write_with_encoder(
            image::codecs::avif::AvifEncoder::new_with_speed_quality(&mut bytes, 6, quality as u8),
        ),
        // JPEG has no alpha channel
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, quality as u8),
        ),
    };
    result.map_err(|e| {
        BackendError::ProcessingFailed(format!(
            "{} encode failed: {}",
            format.extension().to_uppercase(),
            e
        ))
    })?;
    Ok(bytes)
}

/// Write `bytes` next to `output` under a temporary name, then rename it
/// into place. Readers never observe a partial file.
fn write_atomically(output: &Path, bytes: &[u8]) -> Result<(), BackendError> {
    let dir = output.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(output).map_err(|e| BackendError::Io(e.error))?;
    Ok(())
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        if is_avif(path) {
            return identify_avif(path);
        }
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn resize(&self, params: &ResizeParams) -> Result<Dimensions, BackendError> {
        let img = load_image(&params.source)?;
        let (width, height) = scale_to_width((img.width(), img.height()), params.width);
        let resized = if (width, height) == (img.width(), img.height()) {
            img
        } else {
            img.resize_exact(width, height, FilterType::Lanczos3)
        };
        let bytes = encode(&resized, params.format, params.quality.value())?;
        write_atomically(&params.output, &bytes)?;
        Ok(Dimensions { width, height })
    }
}
