//! Unified error types for tilestream.
//!
//! The tiling arithmetic itself never fails: invalid tile ids produce the
//! empty [`Tile`](crate::Tile) and degenerate tilers produce zero tiles.
//! Errors only originate from the transfer side, when a copy would touch
//! memory outside the region it was carved from, when a tile does not fit
//! in a working buffer, or when a platform engine reports a failure.
//!
//! # Example
//!
//! ```rust
//! use tilestream::{Shape, TileError};
//!
//! fn check_same(src: Shape, dst: Shape) -> Result<(), TileError> {
//!     if src != dst {
//!         return Err(TileError::shape_mismatch(src, dst));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_same(Shape::new_2d(4, 4), Shape::new_2d(4, 3)).is_err());
//! ```

use thiserror::Error;

use crate::config::ConfigError;
use crate::geometry::Shape;

/// Unified error type for tilestream operations.
#[derive(Error, Debug)]
pub enum TileError {
    /// A view's memory footprint falls outside the region backing it.
    ///
    /// `start..end` is the half-open range of element indices the view
    /// would touch; `len` is the number of elements in the region.
    #[error("Footprint out of bounds: elements {start}..{end} of a region holding {len}")]
    OutOfBounds {
        /// First element index touched by the view.
        start: isize,
        /// One past the last element index touched by the view.
        end: isize,
        /// Number of elements in the backing region.
        len: usize,
    },

    /// Source and destination of a copy have different shapes.
    #[error("Shape mismatch: source {src}, destination {dst}")]
    ShapeMismatch {
        /// Shape of the source view.
        src: Shape,
        /// Shape of the destination view.
        dst: Shape,
    },

    /// A working buffer is too small to hold the tile scheduled into it.
    #[error("Buffer too small: tile needs {needed} elements, buffer holds {capacity}")]
    BufferTooSmall {
        /// Elements required by the tile.
        needed: usize,
        /// Elements available in the buffer.
        capacity: usize,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failure reported by a platform transfer engine.
    #[error("Transfer engine error: {0}")]
    Engine(String),
}

/// Result type alias for tilestream operations.
pub type TileResult<T> = Result<T, TileError>;

impl TileError {
    /// Creates an out-of-bounds error for the element range `start..end`.
    pub fn out_of_bounds(start: isize, end: isize, len: usize) -> Self {
        TileError::OutOfBounds { start, end, len }
    }

    /// Creates a shape mismatch error.
    pub fn shape_mismatch(src: Shape, dst: Shape) -> Self {
        TileError::ShapeMismatch { src, dst }
    }

    /// Creates a buffer too small error.
    pub fn buffer_too_small(needed: usize, capacity: usize) -> Self {
        TileError::BufferTooSmall { needed, capacity }
    }

    /// Creates an engine error with the given message.
    pub fn engine<S: Into<String>>(msg: S) -> Self {
        TileError::Engine(msg.into())
    }
}
