//! Three-buffer pipeline where import and export share one stream.

use crate::error::TileResult;
use crate::tensor::{Element, Region, SubTensor, Tensor};
use crate::tiler::Tile;
use crate::transfer::{import_sub_tensor, TransferEngine};

use super::{buffer_view, external_view, tile_view, IoTensors};

/// Simplex buffering over three rotating buffers.
///
/// In one step a buffer is first the source of the previous result's export
/// and then the destination of the next import. The engine's issue-order
/// guarantee keeps the two apart. While the caller computes tile `i`, tile
/// `i + 1` is arriving in one buffer and the result of tile `i - 1` is
/// leaving another.
///
/// Drive it with `(get_tile(i + 1), get_tile(i))` for `i` in
/// `0..tile_count`, then call [`finish_buffering`](Self::finish_buffering).
pub struct SimplexBuffering<'a, T: Element, E: TransferEngine<'a, T>> {
    buffers: [Region<'a, T>; 3],
    index: usize,
    ext_in: Tensor<'a, T>,
    ext_out: Tensor<'a, T>,
    engine: E,
    event_in: E::Event,
    event_out: E::Event,
    next_exported: Tile,
    prev_imported: SubTensor<'a, T>,
}

impl<'a, T: Element, E: TransferEngine<'a, T>> SimplexBuffering<'a, T, E> {
    /// Creates the pipeline and issues the import of `first_tile`.
    ///
    /// # Errors
    ///
    /// Any error of the first import.
    pub fn new(
        buffer1: Region<'a, T>,
        buffer2: Region<'a, T>,
        buffer3: Region<'a, T>,
        ext_in: Tensor<'a, T>,
        ext_out: Tensor<'a, T>,
        engine: E,
        first_tile: Tile,
    ) -> TileResult<Self> {
        log::debug!(
            "simplex buffering {} -> {}, first {}",
            ext_in.shape(),
            ext_out.shape(),
            first_tile
        );
        let mut pipeline = Self {
            buffers: [buffer1, buffer2, buffer3],
            index: 0,
            ext_in,
            ext_out,
            engine,
            event_in: E::Event::default(),
            event_out: E::Event::default(),
            next_exported: Tile::EMPTY,
            prev_imported: SubTensor::empty(buffer1),
        };
        pipeline.step_buffering(first_tile, Tile::EMPTY)?;
        Ok(pipeline)
    }

    /// One pipeline step.
    ///
    /// Waits for both streams, exports the result written since the
    /// previous call, imports `next_import` into the same buffer, and
    /// returns the tile imported by the previous call together with a
    /// buffer to write the result for `current_export` into.
    ///
    /// # Errors
    ///
    /// - [`TileError::BufferTooSmall`](crate::TileError::BufferTooSmall) if a
    ///   buffer cannot hold a tile
    /// - any error reported by the engine
    pub fn step_buffering(&mut self, next_import: Tile, current_export: Tile) -> TileResult<IoTensors<'a, T>> {
        log::trace!("simplex step: import {}, export {}", next_import, current_export);
        // Every view is built before anything is waited on or issued, so a
        // tile too large for the buffers leaves the pipeline untouched.
        let buffer = self.buffers[self.index];
        let next_index = (self.index + 1) % 3;
        let src = buffer_view(buffer, self.next_exported.shape)?;
        let import_to = tile_view(buffer, next_import, &self.ext_in)?;
        let to_export_from = tile_view(self.buffers[next_index], current_export, &self.ext_out)?;

        self.engine.wait(std::slice::from_mut(&mut self.event_out))?;
        self.engine.wait(std::slice::from_mut(&mut self.event_in))?;

        if !self.next_exported.is_empty() {
            let dst = external_view(&self.ext_out, self.next_exported);
            self.engine.begin_export(src, dst, &mut self.event_out)?;
        }
        import_sub_tensor(&mut self.engine, &import_to, &self.ext_in, &mut self.event_in)?;

        self.index = next_index;
        let imported_to = std::mem::replace(&mut self.prev_imported, import_to);
        self.next_exported = current_export;

        Ok(IoTensors::new(imported_to, to_export_from))
    }

    /// Exports the last result and waits for it.
    pub fn finish_buffering(&mut self) -> TileResult<()> {
        self.step_buffering(Tile::EMPTY, Tile::EMPTY)?;
        self.step_buffering(Tile::EMPTY, Tile::EMPTY)?;
        log::debug!("simplex buffering finished");
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Shape;
    use crate::tiler::Tiler;
    use crate::transfer::{DeferredEngine, TracingEngine};

    #[test]
    fn test_doubles_every_element() {
        let mut input: Vec<i32> = (0..20).collect();
        let mut output = vec![0i32; 20];
        let (mut a, mut b, mut c) = (vec![0i32; 6], vec![0i32; 6], vec![0i32; 6]);
        let ext_in = Tensor::dense(Region::new(&mut input), Shape::new_2d(4, 5));
        let ext_out = Tensor::dense(Region::new(&mut output), Shape::new_2d(4, 5));
        let tiler = Tiler::new_no_overlap(ext_in.shape(), Shape::new_2d(3, 2));

        let mut engine = TracingEngine::new(DeferredEngine::new());
        let mut pipeline = SimplexBuffering::new(
            Region::new(&mut a),
            Region::new(&mut b),
            Region::new(&mut c),
            ext_in,
            ext_out,
            &mut engine,
            tiler.get_tile(0),
        )
        .unwrap();

        for i in 0..tiler.tile_count() as isize {
            let io = pipeline.step_buffering(tiler.get_tile(i + 1), tiler.get_tile(i)).unwrap();
            assert!(!io.is_empty());
            let shape = io.imported_to.shape();
            assert_eq!(shape, io.to_export_from.shape());
            for y in 0..shape.height {
                for x in 0..shape.width {
                    io.to_export_from.write(2 * io.imported_to.read(x, y, 0), x, y, 0);
                }
            }
        }
        pipeline.finish_buffering().unwrap();

        let stats = engine.stats();
        assert_eq!(stats.imports, tiler.tile_count());
        assert_eq!(stats.exports, tiler.tile_count());
        assert_eq!(stats.fills, 0);
        let expected: Vec<i32> = (0..20).map(|v| 2 * v).collect();
        assert_eq!(ext_out.to_vec().unwrap(), expected);
    }
}
