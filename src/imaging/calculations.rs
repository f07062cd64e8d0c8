//! Pure dimension math.

/// Height of an image scaled to `target_width`, preserving aspect ratio.
///
/// Rounds to the nearest pixel and never returns 0.
///
/// ```text
/// (4000, 3000) → 800  = 600
/// (3000, 4000) → 800  = 1067
/// (800, 600)   → 1200 = 900   (upscales, like `-resize 1200x`)
/// ```
pub fn scaled_height(original: (u32, u32), target_width: u32) -> u32 {
    let (width, height) = original;
    if width == 0 {
        return height.max(1);
    }
    let scaled = (height as f64 * target_width as f64 / width as f64).round() as u32;
    scaled.max(1)
}

/// Geometry string for a width-only ImageMagick resize: `800x`.
pub fn width_geometry(width: u32) -> String {
    format!("{}x", width)
}

/// Geometry string for an exact box: `100x65`.
pub fn box_geometry(width: u32, height: u32) -> String {
    format!("{}x{}", width, height)
}
