//! Pipelining schedulers that overlap transfers with computation.
//!
//! Every scheduler rotates a fixed set of caller-allocated working buffers.
//! Each call to `step_buffering` waits on the transfers that must have
//! finished, issues the next ones, and returns the views the caller computes
//! on. Results lag one step behind the tiles passed in.
//!
//! | Scheme | Buffers | Directions | Drain |
//! |--------|---------|------------|-------|
//! | [`ImportDoubleBuffering`] | 2 | import | none |
//! | [`ExportDoubleBuffering`] | 2 | export | 2 empty steps |
//! | [`SimplexBuffering`] | 3 | import + export, one stream | 2 empty steps |
//! | [`DuplexBuffering`] | 1 + 1 | import and export, concurrent | 1 empty step |
//!
//! The empty tile is a no-op marker throughout: a step given an empty tile
//! issues nothing for that side and returns an empty view.
//!
//! # Caller Loop
//!
//! ```rust
//! use tilestream::{HostEngine, ImportDoubleBuffering, Region, Shape, Tensor, Tile, Tiler};
//!
//! let mut image: Vec<u32> = (0..64).collect();
//! let external = Tensor::dense(Region::new(&mut image), Shape::new_2d(8, 8));
//! let tiler = Tiler::new_no_overlap(external.shape(), Shape::new_2d(4, 4));
//!
//! let (mut a, mut b) = (vec![0u32; 16], vec![0u32; 16]);
//! let mut engine = HostEngine;
//! let mut pipeline = ImportDoubleBuffering::new(
//!     Region::new(&mut a),
//!     Region::new(&mut b),
//!     external,
//!     &mut engine,
//!     tiler.get_tile(0),
//! )?;
//!
//! let mut sum = 0u32;
//! for i in 0..tiler.tile_count() as isize {
//!     let tile = pipeline.step_buffering(tiler.get_tile(i + 1))?;
//!     sum += tile.tensor.to_vec()?.iter().sum::<u32>();
//! }
//! pipeline.finish_buffering()?;
//! assert_eq!(sum, (0..64).sum());
//! # Ok::<(), tilestream::TileError>(())
//! ```

mod double;
mod duplex;
mod simplex;

pub use double::{ExportDoubleBuffering, ImportDoubleBuffering};
pub use duplex::DuplexBuffering;
pub use simplex::SimplexBuffering;

use crate::error::{TileError, TileResult};
use crate::geometry::Shape;
use crate::tensor::{Element, Origin, Region, SubTensor, Tensor};
use crate::tiler::Tile;

/// The pair of views a coupled scheduler returns for one compute step.
pub struct IoTensors<'a, T> {
    /// Tile imported for the caller to read.
    pub imported_to: SubTensor<'a, T>,
    /// Buffer the caller writes its result into; exported on a later step.
    pub to_export_from: SubTensor<'a, T>,
}

impl<'a, T> Clone for IoTensors<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for IoTensors<'a, T> {}

impl<'a, T: Element> IoTensors<'a, T> {
    /// Creates the pair.
    pub fn new(imported_to: SubTensor<'a, T>, to_export_from: SubTensor<'a, T>) -> Self {
        Self {
            imported_to,
            to_export_from,
        }
    }

    /// Nothing to compute this step.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.imported_to.is_empty()
    }
}

impl<'a, T> std::fmt::Debug for IoTensors<'a, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoTensors")
            .field("imported_to", &self.imported_to)
            .field("to_export_from", &self.to_export_from)
            .finish()
    }
}

/// Dense view of `shape` at the start of `buffer`.
///
/// # Errors
///
/// [`TileError::BufferTooSmall`] if the buffer cannot hold `shape`.
pub(crate) fn buffer_view<'a, T: Element>(buffer: Region<'a, T>, shape: Shape) -> TileResult<Tensor<'a, T>> {
    if shape.is_empty() {
        return Ok(Tensor::empty(buffer));
    }
    let needed = shape.num_elements();
    if needed > buffer.len() {
        return Err(TileError::buffer_too_small(needed, buffer.len()));
    }
    Ok(Tensor::dense(buffer, shape))
}

/// Working view of `tile` in `buffer`, standing for that tile of `external`.
pub(crate) fn tile_view<'a, T: Element>(
    buffer: Region<'a, T>,
    tile: Tile,
    external: &Tensor<'a, T>,
) -> TileResult<SubTensor<'a, T>> {
    Ok(SubTensor::new(
        buffer_view(buffer, tile.shape)?,
        Origin::new(external.shape(), tile.offset),
    ))
}

/// The part of `external` that `tile` covers.
#[inline]
pub(crate) fn external_view<'a, T: Element>(external: &Tensor<'a, T>, tile: Tile) -> Tensor<'a, T> {
    external.view(tile.offset, tile.shape)
}
