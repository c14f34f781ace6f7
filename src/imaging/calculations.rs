//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the output dimensions of a width-constrained resize.
///
/// The output is always exactly `target_width` wide, so a source narrower
/// than the target is upscaled. The height follows the source aspect ratio,
/// rounded to the nearest pixel and never below 1.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target_width` - Requested output width in pixels
///
/// # Returns
/// * `(width, height)` - Output dimensions
pub fn scale_to_width(source: (u32, u32), target_width: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w == 0 {
        return source;
    }
    let ratio = target_width as f64 / src_w as f64;
    let h = ((src_h as f64 * ratio).round() as u32).max(1);
    (target_width, h)
}
