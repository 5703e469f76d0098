//! Resolution/zoom conversion for the Web Mercator tile pyramid.
//!
//! Both engines agree on the standard 256px tile pyramid, but the primary
//! engine expresses the view scale as a resolution (projected units per
//! pixel) while the secondary engine wants an integer-ish zoom level.

use crate::core::geo::HALF_WORLD;
use once_cell::sync::Lazy;

/// Highest zoom level in the lookup table
pub const MAX_ZOOM: u8 = 28;

/// Resolution of zoom level 0 for a 256px tile covering the world
const BASE_RESOLUTION: f64 = 2.0 * HALF_WORLD / 256.0;

static RESOLUTIONS: Lazy<Vec<f64>> = Lazy::new(|| {
    (0..=MAX_ZOOM as i32)
        .map(|z| BASE_RESOLUTION / 2_f64.powi(z))
        .collect()
});

/// Returns the table of resolutions, indexed by integer zoom level.
pub fn resolutions() -> &'static [f64] {
    &RESOLUTIONS
}

/// Resolution for an integer zoom level, clamped to the table range.
pub fn resolution_from_zoom(zoom: u8) -> f64 {
    let z = zoom.min(MAX_ZOOM) as usize;
    RESOLUTIONS[z]
}

/// Fractional zoom level for a resolution.
///
/// Exact table entries map back to their integer zoom. Resolutions between
/// two entries interpolate logarithmically, so a value geometrically halfway
/// between levels n and n+1 yields n + 0.5. Out-of-range values clamp to the
/// table extremes.
pub fn zoom_from_resolution(resolution: f64) -> f64 {
    debug_assert!(
        resolution.is_finite() && resolution > 0.0,
        "resolution must be positive and finite"
    );
    if resolution >= RESOLUTIONS[0] {
        return 0.0;
    }
    if resolution <= RESOLUTIONS[MAX_ZOOM as usize] {
        return MAX_ZOOM as f64;
    }
    // Each level halves the resolution, so the fractional part is log2.
    (RESOLUTIONS[0] / resolution).log2()
}
