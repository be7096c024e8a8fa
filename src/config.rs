//! Tiling configuration.
//!
//! This module provides [`TilingConfig`], the full description of how a
//! space is cut into tiles, together with [`ConfigError`] for the checks
//! that [`TilingConfig::validate`] performs.
//!
//! # Example
//!
//! ```rust
//! use tilestream::{Shape, TilingConfig};
//!
//! // 3x3 stencil over a 64x48 image, 16x8 output tiles.
//! let config = TilingConfig::stencil(Shape::new_2d(64, 48), Shape::new_2d(16, 8), 1);
//! assert!(config.validate().is_ok());
//!
//! let tiler = config.build();
//! assert_eq!(tiler.tile_count(), 4 * 6);
//! ```
//!
//! # Degenerate configurations
//!
//! A tiler is always constructible. When a tile axis is not larger than
//! the overlap on that axis, or the space is empty, the tiler simply
//! produces zero tiles. `validate` exists for callers who prefer to catch
//! those mistakes up front instead of running an empty pipeline.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::{Augmentation, Overlap, Shape};
use crate::tiler::Tiler;

/// Description of a tiling: the space, the tile, overlap and halo.
///
/// # Creating a Configuration
///
/// ```rust
/// use tilestream::{Augmentation, Overlap, Shape, TilingConfig};
///
/// let config = TilingConfig {
///     space: Shape::new_2d(100, 40),
///     tile: Shape::new_2d(32, 16),
///     overlap: Overlap::new_2d(2, 2),
///     augmentation: Augmentation::uniform_2d(1),
/// };
/// config.validate().expect("Invalid configuration");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TilingConfig {
    /// The space to be tiled, e.g. an image.
    pub space: Shape,
    /// Shape of every tile except the last one on each axis.
    pub tile: Shape,
    /// Elements shared between adjacent tiles.
    pub overlap: Overlap,
    /// Zero-filled halo around the space.
    pub augmentation: Augmentation,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            space: Shape::new_2d(256, 256),
            tile: Shape::new_2d(32, 32),
            overlap: Overlap::NONE,
            augmentation: Augmentation::NONE,
        }
    }
}

impl TilingConfig {
    /// Creates a configuration with no overlap and no halo.
    pub fn new(space: Shape, tile: Shape) -> Self {
        Self {
            space,
            tile,
            overlap: Overlap::NONE,
            augmentation: Augmentation::NONE,
        }
    }

    /// Input tiling for a square neighbourhood kernel of the given radius.
    ///
    /// Each input tile is the output tile grown by `radius` on all four
    /// sides, adjacent input tiles overlap by `2 * radius`, and the space is
    /// augmented by `radius` so border outputs see zeros. The resulting
    /// tiler yields exactly as many tiles, in the same order, as
    /// `TilingConfig::new(space, core_tile)`.
    pub fn stencil(space: Shape, core_tile: Shape, radius: usize) -> Self {
        let grow = 2 * radius;
        Self {
            space,
            tile: Shape::new(core_tile.width + grow, core_tile.height + grow, core_tile.depth),
            overlap: Overlap::new_2d(grow, grow),
            augmentation: Augmentation::uniform_2d(radius),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if:
    /// - the space or the tile has a zero axis
    /// - a tile axis is not larger than the overlap on that axis
    /// - the halo on one side of an axis is at least as large as the tile
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.space.num_elements() == 0 {
            return Err(ConfigError::EmptySpace);
        }
        if self.tile.num_elements() == 0 {
            return Err(ConfigError::EmptyTile);
        }

        let axes = [
            ("width", self.tile.width, self.overlap.width, self.augmentation.left.max(self.augmentation.right)),
            ("height", self.tile.height, self.overlap.height, self.augmentation.top.max(self.augmentation.bottom)),
            ("depth", self.tile.depth, self.overlap.depth, self.augmentation.front.max(self.augmentation.back)),
        ];
        for (axis, tile, overlap, halo) in axes {
            if tile <= overlap {
                return Err(ConfigError::OverlapTooLarge { axis, tile, overlap });
            }
            if halo >= tile {
                return Err(ConfigError::AugmentationTooLarge { axis, tile, halo });
            }
        }
        Ok(())
    }

    /// Builds the tiler. Never fails; see the module docs on degenerate
    /// configurations.
    pub fn build(&self) -> Tiler {
        Tiler::new(self.space, self.tile, self.overlap, self.augmentation)
    }
}

impl From<TilingConfig> for Tiler {
    fn from(config: TilingConfig) -> Self {
        config.build()
    }
}

/// Errors returned by [`TilingConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The space to tile has no elements.
    #[error("Space to tile is empty")]
    EmptySpace,

    /// The tile has no elements.
    #[error("Tile shape is empty")]
    EmptyTile,

    /// A tile axis does not exceed its overlap, so tiles never advance.
    #[error("Tile {axis} {tile} must exceed overlap {overlap}")]
    OverlapTooLarge {
        /// Axis name.
        axis: &'static str,
        /// Tile extent on that axis.
        tile: usize,
        /// Overlap on that axis.
        overlap: usize,
    },

    /// A tile would consist of halo only.
    #[error("Tile {axis} {tile} must exceed augmentation {halo}")]
    AugmentationTooLarge {
        /// Axis name.
        axis: &'static str,
        /// Tile extent on that axis.
        tile: usize,
        /// Largest halo on that axis.
        halo: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TilingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.build().tile_count(), 64);
    }

    #[test]
    fn test_stencil_preset() {
        let config = TilingConfig::stencil(Shape::new_2d(10, 10), Shape::new_2d(4, 4), 1);
        assert!(config.validate().is_ok());
        assert_eq!(config.tile, Shape::new_2d(6, 6));
        assert_eq!(config.overlap, Overlap::new_2d(2, 2));

        let plain = TilingConfig::new(config.space, Shape::new_2d(4, 4)).build();
        assert_eq!(config.build().tile_count(), plain.tile_count());
    }

    #[test]
    fn test_overlap_too_large() {
        let mut config = TilingConfig::default();
        config.overlap = Overlap::new_2d(32, 0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::OverlapTooLarge { axis: "width", tile: 32, overlap: 32 })
        );
        // Still buildable, just empty.
        assert_eq!(config.build().tile_count(), 0);
    }

    #[test]
    fn test_empty_space() {
        let config = TilingConfig::new(Shape::EMPTY, Shape::new_2d(4, 4));
        assert_eq!(config.validate(), Err(ConfigError::EmptySpace));
    }

    #[test]
    fn test_augmentation_too_large() {
        let mut config = TilingConfig::new(Shape::new_2d(16, 16), Shape::new_2d(4, 4));
        config.augmentation = Augmentation::new_2d(0, 0, 4, 0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AugmentationTooLarge { axis: "height", .. })
        ));
    }
}
