//! Pipeline with independent import and export streams.

use crate::error::TileResult;
use crate::tensor::{Element, Region, Tensor};
use crate::tiler::Tile;
use crate::transfer::{import_sub_tensor, TransferEngine};

use super::{external_view, tile_view, IoTensors};

const IMPORT: usize = 0;
const EXPORT: usize = 1;

/// Duplex buffering over one import buffer and one export buffer.
///
/// Each step imports the current tile while exporting the result of the
/// previous one, then waits on both before handing the buffers to the
/// caller. Useful when the two directions run on separate channels.
///
/// Drive it with `(get_tile(i), get_tile(i))` for `i` in `0..tile_count`,
/// then call [`finish_buffering`](Self::finish_buffering) to export the
/// last result. The constructor's prologue also imports the first tile, so
/// that tile is transferred twice.
pub struct DuplexBuffering<'a, T: Element, E: TransferEngine<'a, T>> {
    import_buffer: Region<'a, T>,
    export_buffer: Region<'a, T>,
    ext_in: Tensor<'a, T>,
    ext_out: Tensor<'a, T>,
    engine: E,
    events: [E::Event; 2],
    prev_export_src: Tensor<'a, T>,
    prev_export_dst: Tensor<'a, T>,
}

impl<'a, T: Element, E: TransferEngine<'a, T>> DuplexBuffering<'a, T, E> {
    /// Creates the pipeline and imports `first_tile`.
    ///
    /// # Errors
    ///
    /// Any error of the first import.
    pub fn new(
        ext_in: Tensor<'a, T>,
        import_buffer: Region<'a, T>,
        ext_out: Tensor<'a, T>,
        export_buffer: Region<'a, T>,
        engine: E,
        first_tile: Tile,
    ) -> TileResult<Self> {
        log::debug!(
            "duplex buffering {} -> {}, first {}",
            ext_in.shape(),
            ext_out.shape(),
            first_tile
        );
        let mut pipeline = Self {
            import_buffer,
            export_buffer,
            ext_in,
            ext_out,
            engine,
            events: [E::Event::default(), E::Event::default()],
            prev_export_src: Tensor::empty(export_buffer),
            prev_export_dst: Tensor::empty(ext_out.region()),
        };
        pipeline.step_buffering(first_tile, Tile::EMPTY)?;
        Ok(pipeline)
    }

    /// One pipeline step.
    ///
    /// Imports `current_import`, exports the result written since the
    /// previous call, waits for both, and returns the imported tile together
    /// with a buffer for the result of `current_export`.
    ///
    /// # Errors
    ///
    /// - [`TileError::BufferTooSmall`](crate::TileError::BufferTooSmall) if a
    ///   buffer cannot hold a tile
    /// - any error reported by the engine
    pub fn step_buffering(&mut self, current_import: Tile, current_export: Tile) -> TileResult<IoTensors<'a, T>> {
        log::trace!("duplex step: import {}, export {}", current_import, current_export);

        let import_to = tile_view(self.import_buffer, current_import, &self.ext_in)?;
        let export_from = tile_view(self.export_buffer, current_export, &self.ext_out)?;

        import_sub_tensor(&mut self.engine, &import_to, &self.ext_in, &mut self.events[IMPORT])?;
        if !self.prev_export_src.is_empty() {
            self.engine
                .begin_export(self.prev_export_src, self.prev_export_dst, &mut self.events[EXPORT])?;
        }

        self.prev_export_src = export_from.tensor;
        self.prev_export_dst = external_view(&self.ext_out, current_export);

        self.engine.wait(&mut self.events)?;

        Ok(IoTensors::new(import_to, export_from))
    }

    /// Exports the last result and waits for it.
    pub fn finish_buffering(&mut self) -> TileResult<()> {
        self.step_buffering(Tile::EMPTY, Tile::EMPTY)?;
        log::debug!("duplex buffering finished");
        Ok(())
    }

    /// The engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The engine, mutably.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Releases the engine.
    pub fn into_engine(self) -> E {
        self.engine
    }
}
