use std::fmt;

use crate::errors::{GridifyError, Result};

/// Pixel dimensions of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for ImageDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Square tile size and the number of tile columns covering the image.
///
/// Edge tiles may be narrower or shorter than `tile_size`; placement only
/// needs the size and the column count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilingGeometry {
    pub tile_size: u32,
    pub columns: u32,
    pub rows: u32,
}

impl TilingGeometry {
    /// Picks the tile size from whichever axis leaves the larger remainder
    /// against `max_tile_size`, splitting that axis into equal integer parts.
    pub fn compute(dimensions: ImageDimensions, max_tile_size: u32) -> Result<Self> {
        let ImageDimensions { width, height } = dimensions;
        if width == 0 || height == 0 {
            return Err(GridifyError::Geometry {
                reason: format!("image dimensions must be positive, got {}", dimensions),
            });
        }
        if max_tile_size == 0 {
            return Err(GridifyError::Geometry {
                reason: "maximum tile size must be positive".to_string(),
            });
        }

        let tile_size = if width % max_tile_size > height % max_tile_size {
            split_axis(width, max_tile_size)
        } else {
            split_axis(height, max_tile_size)
        };

        Ok(Self::with_tile_size(dimensions, tile_size))
    }

    pub(crate) const fn with_tile_size(dimensions: ImageDimensions, tile_size: u32) -> Self {
        Self {
            tile_size,
            columns: dimensions.width.div_ceil(tile_size),
            rows: dimensions.height.div_ceil(tile_size),
        }
    }

    pub const fn tile_count(&self) -> u32 {
        self.columns * self.rows
    }

    /// Grid `(column, row)` of the tile with this raster index.
    pub const fn grid_position(&self, index: usize) -> (u32, u32) {
        let columns = self.columns as usize;
        ((index % columns) as u32, (index / columns) as u32)
    }

    /// Top-left pixel of the tile with this raster index.
    pub const fn offset(&self, index: usize) -> (u32, u32) {
        let (column, row) = self.grid_position(index);
        (column * self.tile_size, row * self.tile_size)
    }
}

/// `round(size / (floor(size / max) + 1))`, halves rounding away from zero.
fn split_axis(size: u32, max_tile_size: u32) -> u32 {
    let parts = size / max_tile_size + 1;
    (f64::from(size) / f64::from(parts)).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_remainder_wins() -> Result<()> {
        // 1000 % 400 = 200, 700 % 400 = 300
        let geometry = TilingGeometry::compute(ImageDimensions::new(1000, 700), 400)?;
        assert_eq!(geometry.tile_size, 350);
        assert_eq!(geometry.columns, 3);
        assert_eq!(geometry.rows, 2);
        assert_eq!(geometry.tile_count(), 6);
        Ok(())
    }

    #[test]
    fn test_width_remainder_wins() -> Result<()> {
        // 900 % 400 = 100, 800 % 400 = 0 -> round(900 / 3)
        let geometry = TilingGeometry::compute(ImageDimensions::new(900, 800), 400)?;
        assert_eq!(geometry.tile_size, 300);
        assert_eq!(geometry.columns, 3);
        Ok(())
    }

    #[test]
    fn test_image_smaller_than_max_is_one_tile() -> Result<()> {
        let geometry = TilingGeometry::compute(ImageDimensions::new(120, 80), 512)?;
        assert_eq!(geometry.tile_size, 120);
        assert_eq!(geometry.columns, 1);
        assert_eq!(geometry.rows, 1);
        Ok(())
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        // 5 / 2 = 2.5
        assert_eq!(split_axis(5, 4), 3);
        assert_eq!(split_axis(700, 400), 350);
        assert_eq!(split_axis(200, 150), 100);
    }

    #[test]
    fn test_tile_size_bounded_by_max() -> Result<()> {
        for width in (16..400).step_by(7) {
            for height in (16..400).step_by(11) {
                for max in [8, 13, 16] {
                    let geometry =
                        TilingGeometry::compute(ImageDimensions::new(width, height), max)?;
                    assert!(geometry.tile_size >= 1);
                    assert!(
                        geometry.tile_size <= max,
                        "{}x{} max {} gave {}",
                        width,
                        height,
                        max,
                        geometry.tile_size
                    );
                    assert_eq!(geometry.columns, width.div_ceil(geometry.tile_size));
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_positions_and_offsets() -> Result<()> {
        let geometry = TilingGeometry::compute(ImageDimensions::new(1000, 700), 400)?;
        assert_eq!(geometry.grid_position(0), (0, 0));
        assert_eq!(geometry.grid_position(2), (2, 0));
        assert_eq!(geometry.grid_position(4), (1, 1));
        assert_eq!(geometry.offset(4), (350, 350));
        assert_eq!(geometry.offset(5), (700, 350));
        Ok(())
    }

    #[test]
    fn test_zero_inputs_rejected() {
        assert!(matches!(
            TilingGeometry::compute(ImageDimensions::new(0, 10), 4),
            Err(GridifyError::Geometry { .. })
        ));
        assert!(matches!(
            TilingGeometry::compute(ImageDimensions::new(10, 10), 0),
            Err(GridifyError::Geometry { .. })
        ));
    }
}
