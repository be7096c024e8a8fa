//! Two-buffer pipelines for a single direction.

use crate::error::TileResult;
use crate::tensor::{Element, Region, SubTensor, Tensor};
use crate::tiler::Tile;
use crate::transfer::{import_sub_tensor, TransferEngine};

use super::{buffer_view, external_view, tile_view};

/// Double-buffered import.
///
/// While the caller computes on one buffer, the next tile is imported into
/// the other. The constructor imports the first tile; each
/// [`step_buffering`](Self::step_buffering) then imports the tile passed in
/// and returns the tile passed on the previous call.
///
/// Drive it with `get_tile(i + 1)` for `i` in `0..tile_count`: the last call
/// passes an empty tile and receives the last real one.
pub struct ImportDoubleBuffering<'a, T: Element, E: TransferEngine<'a, T>> {
    buffers: [Region<'a, T>; 2],
    index: usize,
    external: Tensor<'a, T>,
    engine: E,
    event: E::Event,
    prev_tile: Tile,
}

impl<'a, T: Element, E: TransferEngine<'a, T>> ImportDoubleBuffering<'a, T, E> {
    /// Creates the pipeline and issues the import of `first_tile`.
    ///
    /// # Errors
    ///
    /// Any error of the first import.
    pub fn new(
        buffer1: Region<'a, T>,
        buffer2: Region<'a, T>,
        external: Tensor<'a, T>,
        engine: E,
        first_tile: Tile,
    ) -> TileResult<Self> {
        log::debug!("import double buffering over {}, first {}", external.shape(), first_tile);
        let mut pipeline = Self {
            buffers: [buffer1, buffer2],
            index: 0,
            external,
            engine,
            event: E::Event::default(),
            prev_tile: Tile::EMPTY,
        };
        pipeline.step_buffering(first_tile)?;
        Ok(pipeline)
    }

    /// Waits for the pending import, issues the import of `next_tile` and
    /// returns the tile imported by the previous call.
    ///
    /// # Errors
    ///
    /// - [`TileError::BufferTooSmall`](crate::TileError::BufferTooSmall) if a
    ///   buffer cannot hold `next_tile`
    /// - any error reported by the engine
    pub fn step_buffering(&mut self, next_tile: Tile) -> TileResult<SubTensor<'a, T>> {
        log::trace!("import step: next {}", next_tile);
        let next_index = (self.index + 1) % 2;
        let dst = tile_view(self.buffers[self.index], next_tile, &self.external)?;
        let result = tile_view(self.buffers[next_index], self.prev_tile, &self.external)?;

        self.engine.wait(std::slice::from_mut(&mut self.event))?;
        if !next_tile.is_empty() {
            import_sub_tensor(&mut self.engine, &dst, &self.external, &mut self.event)?;
        }

        self.index = next_index;
        self.prev_tile = next_tile;
        Ok(result)
    }

    /// Ends the pipeline. The import side has nothing in flight once the
    /// caller's last step passed an empty tile.
    pub fn finish_buffering(&mut self) -> TileResult<()> {
        log::debug!("import double buffering finished");
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

/// Double-buffered export.
///
/// Each [`step_buffering`](Self::step_buffering) hands out a buffer for the
/// caller to write the current tile into and exports the buffer filled on
/// the previous call. Nothing is issued at construction.
///
/// Drive it with `get_tile(i)` for `i` in `0..tile_count`, then call
/// [`finish_buffering`](Self::finish_buffering) to export the last tile.
pub struct ExportDoubleBuffering<'a, T: Element, E: TransferEngine<'a, T>> {
    buffers: [Region<'a, T>; 2],
    index: usize,
    external: Tensor<'a, T>,
    engine: E,
    event: E::Event,
    prev_tile: Tile,
}

impl<'a, T: Element, E: TransferEngine<'a, T>> ExportDoubleBuffering<'a, T, E> {
    /// Creates the pipeline.
    pub fn new(buffer1: Region<'a, T>, buffer2: Region<'a, T>, external: Tensor<'a, T>, engine: E) -> Self {
        log::debug!("export double buffering over {}", external.shape());
        Self {
            buffers: [buffer1, buffer2],
            index: 0,
            external,
            engine,
            event: E::Event::default(),
            prev_tile: Tile::EMPTY,
        }
    }

    /// Waits for the pending export, exports the tile written since the
    /// previous call, and returns a buffer for `current_tile`.
    ///
    /// # Errors
    ///
    /// - [`TileError::BufferTooSmall`](crate::TileError::BufferTooSmall) if a
    ///   buffer cannot hold `current_tile`
    /// - any error reported by the engine, including an out-of-bounds export
    pub fn step_buffering(&mut self, current_tile: Tile) -> TileResult<SubTensor<'a, T>> {
        log::trace!("export step: current {}", current_tile);
        let next_index = (self.index + 1) % 2;
        let src = buffer_view(self.buffers[self.index], self.prev_tile.shape)?;
        let result = tile_view(self.buffers[next_index], current_tile, &self.external)?;

        self.engine.wait(std::slice::from_mut(&mut self.event))?;
        if !self.prev_tile.is_empty() {
            let dst = external_view(&self.external, self.prev_tile);
            self.engine.begin_export(src, dst, &mut self.event)?;
        }

        self.index = next_index;
        self.prev_tile = current_tile;
        Ok(result)
    }

    /// Exports the last tile and waits for it.
    pub fn finish_buffering(&mut self) -> TileResult<()> {
        self.step_buffering(Tile::EMPTY)?;
        self.step_buffering(Tile::EMPTY)?;
        log::debug!("export double buffering finished");
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
    fn test_import_lags_one_step() {
        let mut ext: Vec<u16> = (0..12).collect();
        let (mut a, mut b) = (vec![0u16; 4], vec![0u16; 4]);
        let external = Tensor::dense(Region::new(&mut ext), Shape::new_2d(12, 1));
        let tiler = Tiler::new_no_overlap(external.shape(), Shape::new_1d(4));

        let mut engine = DeferredEngine::new();
        let mut pipeline = ImportDoubleBuffering::new(
            Region::new(&mut a),
            Region::new(&mut b),
            external,
            &mut engine,
            tiler.get_tile(0),
        )
        .unwrap();

        let first = pipeline.step_buffering(tiler.get_tile(1)).unwrap();
        assert_eq!(first.origin.offset, tiler.get_tile(0).offset);
        assert_eq!(first.tensor.to_vec().unwrap(), vec![0, 1, 2, 3]);

        let second = pipeline.step_buffering(tiler.get_tile(2)).unwrap();
        assert_eq!(second.tensor.to_vec().unwrap(), vec![4, 5, 6, 7]);

        let third = pipeline.step_buffering(Tile::EMPTY).unwrap();
        assert_eq!(third.tensor.to_vec().unwrap(), vec![8, 9, 10, 11]);

        assert!(pipeline.step_buffering(Tile::EMPTY).unwrap().is_empty());
        pipeline.finish_buffering().unwrap();
    }

    #[test]
    fn test_export_drains_in_finish() {
        let mut ext = vec![0u16; 6];
        let (mut a, mut b) = (vec![0u16; 3], vec![0u16; 3]);
        let external = Tensor::dense(Region::new(&mut ext), Shape::new_1d(6));
        let tiler = Tiler::new_no_overlap(external.shape(), Shape::new_1d(3));

        let mut engine = TracingEngine::new(DeferredEngine::new());
        let mut pipeline =
            ExportDoubleBuffering::new(Region::new(&mut a), Region::new(&mut b), external, &mut engine);

        for (i, tile) in tiler.tiles().enumerate() {
            let out = pipeline.step_buffering(tile).unwrap();
            for x in 0..tile.shape.width {
                out.write((10 * i + x) as u16, x, 0, 0);
            }
        }
        assert_eq!(pipeline.engine().stats().exports, 1);

        pipeline.finish_buffering().unwrap();
        assert_eq!(engine.stats().exports, 2);
        assert_eq!(engine.inner().pending(), 0);
        assert_eq!(external.to_vec().unwrap(), vec![0, 1, 2, 10, 11, 12]);
    }

    #[test]
    fn test_import_buffer_too_small() {
        let mut ext = vec![0u8; 16];
        let (mut a, mut b) = (vec![0u8; 2], vec![0u8; 2]);
        let external = Tensor::dense(Region::new(&mut ext), Shape::new_2d(4, 4));
        let tile = Tile::new(Shape::new_2d(2, 2), Default::default());

        let result = ImportDoubleBuffering::new(
            Region::new(&mut a),
            Region::new(&mut b),
            external,
            crate::transfer::HostEngine,
            tile,
        );
        assert!(result.is_err());
    }
}
