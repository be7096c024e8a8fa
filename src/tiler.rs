//! Tile partitioning of a 3D space.
//!
//! A [`Tiler`] cuts a space into equally sized, possibly overlapping tiles
//! and hands out the [`Tile`] for any linear id, in row-major or
//! column-major order.
//!
//! # Tile Arithmetic
//!
//! For each axis, with space `S`, tile `T`, overlap `O` and halo `L`/`H`
//! on the low/high side:
//!
//! ```text
//! tiles(axis) = ceil((S + L + H - O) / (T - O))      (0 when T <= O)
//! offset(i)   = i * (T - O) - L
//! shape(i)    = T, except the last tile: S - offset + H
//! ```
//!
//! The last tile on each axis is clamped so that it ends exactly at the
//! true boundary plus the high-side halo.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::{Augmentation, Offset, Overlap, Shape};

/// One partition of a space: its shape and its offset from the space origin.
///
/// The empty tile (zero width) doubles as a no-op marker: every scheduler
/// step given an empty tile issues no transfer for that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tile {
    /// Extent of the tile.
    pub shape: Shape,
    /// Position of the tile's first element relative to the space origin.
    pub offset: Offset,
}

impl Tile {
    /// The empty tile.
    pub const EMPTY: Tile = Tile {
        shape: Shape::EMPTY,
        offset: Offset::ORIGIN,
    };

    /// Creates a tile.
    #[inline]
    pub const fn new(shape: Shape, offset: Offset) -> Self {
        Self { shape, offset }
    }

    /// A tile is empty if its shape is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.shape.is_empty()
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile {} at {}", self.shape, self.offset)
    }
}

/// Tile counts precomputed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct TileCounts {
    tile_count: usize,
    tiles_in_width: usize,
    tiles_in_height: usize,
    tiles_in_depth: usize,
    tiles_in_plane: usize,
}

/// Partitions a space into tiles with overlap and halo.
///
/// Created once, immutable, queried many times.
///
/// # Example
///
/// ```rust
/// use tilestream::{Shape, Tiler};
///
/// let tiler = Tiler::new_no_overlap(Shape::new_2d(10, 4), Shape::new_2d(4, 4));
/// assert_eq!(tiler.tile_count(), 3);
///
/// // The last tile in a row is clamped to the space boundary.
/// let last = tiler.get_tile(2);
/// assert_eq!(last.shape, Shape::new_2d(2, 4));
/// assert_eq!(last.offset.x, 8);
///
/// // Out-of-range ids give the empty tile.
/// assert!(tiler.get_tile(3).is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tiler {
    space: Shape,
    tile: Shape,
    overlap: Overlap,
    augmentation: Augmentation,
    cache: TileCounts,
}

/// `ceil(a / b)`, or 0 when the divisor does not advance or there is
/// nothing to cover.
#[inline]
fn ceil_div(a: isize, b: isize) -> usize {
    if b <= 0 || a <= 0 {
        0
    } else {
        ((a + b - 1) / b) as usize
    }
}

/// Tiles needed along one axis.
#[inline]
fn tiles_on_axis(space: usize, tile: usize, overlap: usize, low: usize, high: usize) -> usize {
    if space == 0 {
        return 0;
    }
    let covered = (space + low + high) as isize - overlap as isize;
    let stride = tile as isize - overlap as isize;
    ceil_div(covered, stride)
}

impl Tiler {
    /// Creates a tiler and precomputes the tile counts.
    ///
    /// A configuration where some tile axis is not larger than its overlap,
    /// or where the space is empty, produces zero tiles.
    pub fn new(space: Shape, tile: Shape, overlap: Overlap, augmentation: Augmentation) -> Self {
        let tiles_in_width = tiles_on_axis(
            space.width,
            tile.width,
            overlap.width,
            augmentation.left,
            augmentation.right,
        );
        let tiles_in_height = tiles_on_axis(
            space.height,
            tile.height,
            overlap.height,
            augmentation.top,
            augmentation.bottom,
        );
        let tiles_in_depth = tiles_on_axis(
            space.depth,
            tile.depth,
            overlap.depth,
            augmentation.front,
            augmentation.back,
        );

        let tiles_in_plane = tiles_in_width * tiles_in_height;
        let tile_count = tiles_in_plane * tiles_in_depth;

        if tile_count == 0 {
            log::warn!(
                "tiler produces no tiles: space {}, tile {}, overlap {}, augmentation {}",
                space,
                tile,
                overlap,
                augmentation
            );
        } else {
            log::debug!(
                "tiler {}x{}x{} tiles over space {} (tile {}, overlap {})",
                tiles_in_width,
                tiles_in_height,
                tiles_in_depth,
                space,
                tile,
                overlap
            );
        }

        Self {
            space,
            tile,
            overlap,
            augmentation,
            cache: TileCounts {
                tile_count,
                tiles_in_width,
                tiles_in_height,
                tiles_in_depth,
                tiles_in_plane,
            },
        }
    }

    /// Creates a tiler without overlap or augmentation.
    pub fn new_no_overlap(space: Shape, tile: Shape) -> Self {
        Self::new(space, tile, Overlap::NONE, Augmentation::NONE)
    }

    /// The space being tiled.
    #[inline]
    pub fn space(&self) -> Shape {
        self.space
    }

    /// The nominal tile shape.
    #[inline]
    pub fn tile_shape(&self) -> Shape {
        self.tile
    }

    /// Overlap between adjacent tiles.
    #[inline]
    pub fn overlap(&self) -> Overlap {
        self.overlap
    }

    /// Halo around the space.
    #[inline]
    pub fn augmentation(&self) -> Augmentation {
        self.augmentation
    }

    /// Total number of tiles.
    #[inline]
    pub fn tile_count(&self) -> usize {
        self.cache.tile_count
    }

    /// Tiles along x.
    #[inline]
    pub fn tiles_in_width(&self) -> usize {
        self.cache.tiles_in_width
    }

    /// Tiles along y.
    #[inline]
    pub fn tiles_in_height(&self) -> usize {
        self.cache.tiles_in_height
    }

    /// Tiles along z.
    #[inline]
    pub fn tiles_in_depth(&self) -> usize {
        self.cache.tiles_in_depth
    }

    /// Tiles in one plane.
    #[inline]
    pub fn tiles_in_plane(&self) -> usize {
        self.cache.tiles_in_plane
    }

    /// Returns true if `0 <= tile_id < tile_count()`.
    #[inline]
    pub fn is_valid_tile_id(&self, tile_id: isize) -> bool {
        tile_id >= 0 && (tile_id as usize) < self.cache.tile_count
    }

    /// Returns the `tile_id`'th tile in row-major order (x fastest).
    ///
    /// Out-of-range ids return [`Tile::EMPTY`].
    pub fn get_tile(&self, tile_id: isize) -> Tile {
        if !self.is_valid_tile_id(tile_id) {
            return Tile::EMPTY;
        }
        let id = tile_id as usize;
        let z = id / self.cache.tiles_in_plane;
        let in_plane = id % self.cache.tiles_in_plane;
        let y = in_plane / self.cache.tiles_in_width;
        let x = in_plane % self.cache.tiles_in_width;

        self.create_tile(x, y, z)
    }

    /// Returns the `tile_id`'th tile in column-major order (y fastest
    /// within a plane).
    ///
    /// Produces the same set of tiles as [`get_tile`](Self::get_tile) over
    /// `0..tile_count()`, in transposed order. Out-of-range ids return
    /// [`Tile::EMPTY`].
    pub fn get_tile_column_major(&self, tile_id: isize) -> Tile {
        if !self.is_valid_tile_id(tile_id) {
            return Tile::EMPTY;
        }
        let id = tile_id as usize;
        let z = id / self.cache.tiles_in_plane;
        let in_plane = id % self.cache.tiles_in_plane;
        let y = in_plane % self.cache.tiles_in_height;
        let x = in_plane / self.cache.tiles_in_height;

        self.create_tile(x, y, z)
    }

    /// All tiles in row-major order.
    pub fn tiles(&self) -> impl ExactSizeIterator<Item = Tile> + '_ {
        (0..self.tile_count()).map(move |id| self.get_tile(id as isize))
    }

    /// All tiles in column-major order.
    pub fn tiles_column_major(&self) -> impl ExactSizeIterator<Item = Tile> + '_ {
        (0..self.tile_count()).map(move |id| self.get_tile_column_major(id as isize))
    }

    /// Builds the tile at grid coordinates `(x, y, z)`.
    fn create_tile(&self, x: usize, y: usize, z: usize) -> Tile {
        let stride_x = (self.tile.width - self.overlap.width) as isize;
        let stride_y = (self.tile.height - self.overlap.height) as isize;
        let stride_z = (self.tile.depth - self.overlap.depth) as isize;

        let offset = Offset::new(
            x as isize * stride_x - self.augmentation.left as isize,
            y as isize * stride_y - self.augmentation.top as isize,
            z as isize * stride_z - self.augmentation.front as isize,
        );

        let mut shape = self.tile;
        if x == self.cache.tiles_in_width - 1 {
            shape.width =
                (self.space.width as isize - offset.x + self.augmentation.right as isize) as usize;
        }
        if y == self.cache.tiles_in_height - 1 {
            shape.height =
                (self.space.height as isize - offset.y + self.augmentation.bottom as isize) as usize;
        }
        if z == self.cache.tiles_in_depth - 1 {
            shape.depth =
                (self.space.depth as isize - offset.z + self.augmentation.back as isize) as usize;
        }

        Tile { shape, offset }
    }
}

impl fmt::Display for Tiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tiler space {} tile {} overlap {} augmentation {} -> {} tiles ({}x{}x{})",
            self.space,
            self.tile,
            self.overlap,
            self.augmentation,
            self.cache.tile_count,
            self.cache.tiles_in_width,
            self.cache.tiles_in_height,
            self.cache.tiles_in_depth
        )
    }
}
