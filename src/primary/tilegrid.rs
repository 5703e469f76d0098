use crate::core::geo::{Extent, Point, TileCoord, HALF_WORLD};
use crate::core::resolution;

/// The primary engine's tile grid: an origin, a tile size and a resolution
/// per zoom level.
///
/// Tile rows count upward from the origin: row `-1` is the first row below
/// the origin's y, so with the standard top-left world origin the top-left
/// world tile is `(0, -1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    origin: Point,
    tile_size: u32,
    resolutions: Vec<f64>,
}

impl TileGrid {
    /// Standard XYZ grid: top-left world origin, 256px tiles, the default
    /// Web Mercator resolution pyramid.
    pub fn xyz() -> Self {
        Self {
            origin: Point::new(-HALF_WORLD, HALF_WORLD),
            tile_size: 256,
            resolutions: resolution::resolutions().to_vec(),
        }
    }

    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_resolutions(mut self, resolutions: Vec<f64>) -> Self {
        self.resolutions = resolutions;
        self
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    /// Whether the origin is the standard top-left world origin
    pub fn has_default_origin(&self) -> bool {
        let default = Point::new(-HALF_WORLD, HALF_WORLD);
        (self.origin.x - default.x).abs() < 1e-7 && (self.origin.y - default.y).abs() < 1e-7
    }

    /// Tile size in pixels at the given zoom
    pub fn tile_size(&self, _zoom: u8) -> u32 {
        self.tile_size
    }

    pub fn resolution(&self, zoom: u8) -> Option<f64> {
        self.resolutions.get(zoom as usize).copied()
    }

    pub fn max_zoom(&self) -> u8 {
        (self.resolutions.len().saturating_sub(1)) as u8
    }

    /// Projected extent covered by a tile coordinate
    pub fn tile_extent(&self, coord: TileCoord) -> Option<Extent> {
        let resolution = self.resolution(coord.z)?;
        let span = self.tile_size(coord.z) as f64 * resolution;
        Some(Extent::new(
            self.origin.x + coord.x as f64 * span,
            self.origin.y + coord.y as f64 * span,
            self.origin.x + (coord.x + 1) as f64 * span,
            self.origin.y + (coord.y + 1) as f64 * span,
        ))
    }
}

impl Default for TileGrid {
    fn default() -> Self {
        Self::xyz()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xyz_grid_top_left_tile() {
        let grid = TileGrid::xyz();
        assert!(grid.has_default_origin());

        // Row -1 directly below the origin: the top-left world tile at z=1.
        let extent = grid.tile_extent(TileCoord::new(0, -1, 1)).unwrap();
        assert!((extent.min_x - -HALF_WORLD).abs() < 1e-6);
        assert!((extent.max_y - HALF_WORLD).abs() < 1e-6);
        assert!((extent.width() - HALF_WORLD).abs() < 1e-6);
    }

    #[test]
    fn test_custom_origin() {
        let grid = TileGrid::xyz().with_origin(Point::new(0.0, 0.0));
        assert!(!grid.has_default_origin());

        let extent = grid.tile_extent(TileCoord::new(0, 0, 1)).unwrap();
        assert_eq!(extent.min_x, 0.0);
        assert_eq!(extent.min_y, 0.0);
    }

    #[test]
    fn test_resolution_out_of_range() {
        let grid = TileGrid::xyz().with_resolutions(vec![10.0, 5.0]);
        assert_eq!(grid.resolution(1), Some(5.0));
        assert_eq!(grid.resolution(2), None);
        assert_eq!(grid.max_zoom(), 1);
    }
}
