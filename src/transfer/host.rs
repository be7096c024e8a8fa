//! Synchronous host-memory engine.

use crate::error::TileResult;
use crate::tensor::{Element, Tensor};

use super::TransferEngine;

/// Engine that performs every copy at issue time.
///
/// Events carry nothing and waiting returns immediately. Suitable wherever
/// external and internal memory are both plain host memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostEngine;

impl<'a, T: Element> TransferEngine<'a, T> for HostEngine {
    type Event = ();

    fn begin_import(&mut self, dst: Tensor<'a, T>, src: Tensor<'a, T>, _event: &mut ()) -> TileResult<()> {
        dst.copy_from(&src)
    }

    fn begin_export(&mut self, src: Tensor<'a, T>, dst: Tensor<'a, T>, _event: &mut ()) -> TileResult<()> {
        dst.copy_from(&src)
    }

    fn begin_fill(&mut self, dst: Tensor<'a, T>, _event: &mut ()) -> TileResult<()> {
        dst.fill_zero()
    }

    fn wait(&mut self, _events: &mut [()]) -> TileResult<()> {
        Ok(())
    }
}
