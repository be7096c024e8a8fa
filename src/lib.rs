//! # tilestream - Tiled Data Movement for Small Working Memories
//!
//! Cuts large tensors into overlapping tiles and pipelines their transfer
//! between slow external memory and a few small working buffers, so that
//! copies overlap with computation.
//!
//! ## Architecture
//! - [`Tiler`]: pure tile arithmetic with overlap and zero halo
//! - [`Tensor`] / [`SubTensor`]: non-owning strided views over caller buffers
//! - [`TransferEngine`]: issue/wait copy primitive, halo-clipped imports
//! - Schedulers: double, simplex and duplex buffering over caller buffers
//!
//! ## Usage
//! ```rust
//! use tilestream::{HostEngine, Region, Shape, SimplexBuffering, Tensor, TilingConfig};
//!
//! let mut input = vec![1.0f32; 32 * 32];
//! let mut output = vec![0.0f32; 32 * 32];
//! let ext_in = Tensor::dense(Region::new(&mut input), Shape::new_2d(32, 32));
//! let ext_out = Tensor::dense(Region::new(&mut output), Shape::new_2d(32, 32));
//!
//! let tiler = TilingConfig::new(ext_in.shape(), Shape::new_2d(8, 8)).build();
//! let (mut a, mut b, mut c) = (vec![0.0; 64], vec![0.0; 64], vec![0.0; 64]);
//! let mut engine = HostEngine;
//! let mut pipeline = SimplexBuffering::new(
//!     Region::new(&mut a),
//!     Region::new(&mut b),
//!     Region::new(&mut c),
//!     ext_in,
//!     ext_out,
//!     &mut engine,
//!     tiler.get_tile(0),
//! )?;
//!
//! for i in 0..tiler.tile_count() as isize {
//!     let io = pipeline.step_buffering(tiler.get_tile(i + 1), tiler.get_tile(i))?;
//!     let shape = io.imported_to.shape();
//!     for y in 0..shape.height {
//!         for x in 0..shape.width {
//!             io.to_export_from.write(io.imported_to.read(x, y, 0) + 1.0, x, y, 0);
//!         }
//!     }
//! }
//! pipeline.finish_buffering()?;
//! assert!(ext_out.to_vec()?.iter().all(|&v| v == 2.0));
//! # Ok::<(), tilestream::TileError>(())
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod tensor;
pub mod tiler;
pub mod transfer;

// Re-exports
pub use config::{ConfigError, TilingConfig};
pub use error::{TileError, TileResult};
pub use geometry::{Augmentation, Layout, Offset, Overlap, Shape};
pub use pipeline::{DuplexBuffering, ExportDoubleBuffering, ImportDoubleBuffering, IoTensors, SimplexBuffering};
pub use tensor::{Element, HaloClip, Origin, Region, SubTensor, Tensor};
pub use tiler::{Tile, Tiler};
pub use transfer::{
    blocking_export, blocking_import, import_sub_tensor, DeferredEngine, DeferredEvent, HostEngine,
    TracingEngine, TransferEngine, TransferKind, TransferRecord, TransferStats,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
