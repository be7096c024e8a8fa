//! Asynchronous transfer primitive and the halo-clipped import built on it.
//!
//! A [`TransferEngine`] moves data between external tensors (large, slow
//! memory) and internal tensors (small working buffers). Operations are
//! *issued* with `begin_*` and complete at the latest when an event they were
//! recorded into is passed to [`wait`](TransferEngine::wait).
//!
//! # Ordering Contract
//!
//! Operations issued on one engine take effect in issue order. Schedulers
//! rely on this: simplex buffering exports a buffer and imports into the same
//! buffer within a single step, and the halo zero fill of an import is issued
//! through the engine so it cannot overtake an earlier export.
//!
//! # Engines
//!
//! | Engine | Behaviour |
//! |--------|-----------|
//! | [`HostEngine`] | Copies synchronously; waiting has nothing to do |
//! | [`DeferredEngine`] | Queues operations, runs them when their event is waited on |
//! | [`TracingEngine`] | Wraps another engine, logs and counts every operation |

mod deferred;
mod host;
mod trace;

pub use deferred::{DeferredEngine, DeferredEvent};
pub use host::HostEngine;
pub use trace::{TracingEngine, TransferKind, TransferRecord, TransferStats};

use crate::error::TileResult;
use crate::tensor::{Element, SubTensor, Tensor};

/// Issue/wait interface to a copy facility.
///
/// `'a` is the lifetime of the buffers the engine moves data between; an
/// engine may hold on to views until they are waited on.
///
/// Zero-sized views must be accepted as no-ops.
pub trait TransferEngine<'a, T: Element> {
    /// Completion handle. The default value is an event with nothing
    /// recorded.
    type Event: Default;

    /// Issues a copy from external `src` into internal `dst`.
    fn begin_import(
        &mut self,
        dst: Tensor<'a, T>,
        src: Tensor<'a, T>,
        event: &mut Self::Event,
    ) -> TileResult<()>;

    /// Issues a copy from internal `src` into external `dst`.
    fn begin_export(
        &mut self,
        src: Tensor<'a, T>,
        dst: Tensor<'a, T>,
        event: &mut Self::Event,
    ) -> TileResult<()>;

    /// Issues a zero fill of `dst`.
    fn begin_fill(&mut self, dst: Tensor<'a, T>, event: &mut Self::Event) -> TileResult<()>;

    /// Blocks until every operation recorded in `events` has completed, then
    /// resets the events.
    fn wait(&mut self, events: &mut [Self::Event]) -> TileResult<()>;
}

impl<'a, T: Element, E: TransferEngine<'a, T> + ?Sized> TransferEngine<'a, T> for &mut E {
    type Event = E::Event;

    #[inline]
    fn begin_import(
        &mut self,
        dst: Tensor<'a, T>,
        src: Tensor<'a, T>,
        event: &mut Self::Event,
    ) -> TileResult<()> {
        (**self).begin_import(dst, src, event)
    }

    #[inline]
    fn begin_export(
        &mut self,
        src: Tensor<'a, T>,
        dst: Tensor<'a, T>,
        event: &mut Self::Event,
    ) -> TileResult<()> {
        (**self).begin_export(src, dst, event)
    }

    #[inline]
    fn begin_fill(&mut self, dst: Tensor<'a, T>, event: &mut Self::Event) -> TileResult<()> {
        (**self).begin_fill(dst, event)
    }

    #[inline]
    fn wait(&mut self, events: &mut [Self::Event]) -> TileResult<()> {
        (**self).wait(events)
    }
}

/// Imports the part of `external` that `dst` stands for, zero-filling
/// whatever part of `dst` lies outside `external`.
///
/// `dst.origin.offset` is the position of the request within `external`
/// and may be negative; `dst.origin.shape` is expected to be
/// `external.shape()`. Only the valid part is copied. The border is zeroed
/// through [`begin_fill`](TransferEngine::begin_fill), recorded into the
/// same `event` as the copy. Depth is not clipped.
pub fn import_sub_tensor<'a, T, E>(
    engine: &mut E,
    dst: &SubTensor<'a, T>,
    external: &Tensor<'a, T>,
    event: &mut E::Event,
) -> TileResult<()>
where
    T: Element,
    E: TransferEngine<'a, T> + ?Sized,
{
    if dst.is_empty() {
        return Ok(());
    }

    let shape = dst.shape();
    let clip = dst.halo_clip();
    for (offset, band) in clip.border_bands(shape) {
        if band.num_elements() > 0 {
            engine.begin_fill(dst.tensor.view(offset, band), event)?;
        }
    }

    let effective = clip.clipped_shape(shape);
    if effective.num_elements() == 0 {
        return Ok(());
    }

    let inner = clip.inner_offset();
    let src = external.view(dst.origin.offset, shape).view(inner, effective);
    engine.begin_import(dst.tensor.view(inner, effective), src, event)
}

/// Halo-clipped import that returns once the data has arrived.
pub fn blocking_import<'a, T, E>(
    engine: &mut E,
    dst: &SubTensor<'a, T>,
    external: &Tensor<'a, T>,
) -> TileResult<()>
where
    T: Element,
    E: TransferEngine<'a, T> + ?Sized,
{
    let mut event = E::Event::default();
    import_sub_tensor(engine, dst, external, &mut event)?;
    engine.wait(std::slice::from_mut(&mut event))
}

/// Export that returns once the data has left `src`.
pub fn blocking_export<'a, T, E>(engine: &mut E, src: Tensor<'a, T>, dst: Tensor<'a, T>) -> TileResult<()>
where
    T: Element,
    E: TransferEngine<'a, T> + ?Sized,
{
    let mut event = E::Event::default();
    engine.begin_export(src, dst, &mut event)?;
    engine.wait(std::slice::from_mut(&mut event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Offset, Shape};
    use crate::tensor::{Origin, Region};

    fn sub<'a>(region: Region<'a, i32>, shape: Shape, origin: Shape, offset: Offset) -> SubTensor<'a, i32> {
        SubTensor::new(Tensor::dense(region, shape), Origin::new(origin, offset))
    }

    #[test]
    fn test_import_inside_is_plain_copy() {
        let mut ext: Vec<i32> = (0..16).collect();
        let mut int = vec![-1i32; 4];
        let external = Tensor::dense(Region::new(&mut ext), Shape::new_2d(4, 4));
        let dst = sub(Region::new(&mut int), Shape::new_2d(2, 2), external.shape(), Offset::new_2d(1, 2));

        blocking_import(&mut HostEngine, &dst, &external).unwrap();
        assert_eq!(dst.tensor.to_vec().unwrap(), vec![9, 10, 13, 14]);
    }

    #[test]
    fn test_import_top_left_halo() {
        let mut ext: Vec<i32> = (1..=16).collect();
        let mut int = vec![-1i32; 9];
        let external = Tensor::dense(Region::new(&mut ext), Shape::new_2d(4, 4));
        let dst = sub(Region::new(&mut int), Shape::new_2d(3, 3), external.shape(), Offset::new_2d(-1, -1));

        blocking_import(&mut HostEngine, &dst, &external).unwrap();
        assert_eq!(dst.tensor.to_vec().unwrap(), vec![0, 0, 0, 0, 1, 2, 0, 5, 6]);
    }

    #[test]
    fn test_import_entirely_outside_is_zero() {
        let mut ext: Vec<i32> = (1..=16).collect();
        let mut int = vec![-1i32; 4];
        let external = Tensor::dense(Region::new(&mut ext), Shape::new_2d(4, 4));
        let dst = sub(Region::new(&mut int), Shape::new_2d(2, 2), external.shape(), Offset::new_2d(5, 0));

        blocking_import(&mut HostEngine, &dst, &external).unwrap();
        assert_eq!(dst.tensor.to_vec().unwrap(), vec![0; 4]);
    }

    #[test]
    fn test_empty_request_is_noop() {
        let mut ext = vec![1i32; 4];
        let mut int = vec![-1i32; 4];
        let external = Tensor::dense(Region::new(&mut ext), Shape::new_2d(2, 2));
        let dst = SubTensor::empty(Region::new(&mut int));

        let mut engine = TracingEngine::new(HostEngine);
        blocking_import(&mut engine, &dst, &external).unwrap();
        assert_eq!(engine.stats().imports, 0);
        assert_eq!(engine.stats().fills, 0);
    }

    #[test]
    fn test_blocking_export() {
        let mut ext = vec![0i32; 6];
        let mut int = vec![7i32; 2];
        let external = Tensor::dense(Region::new(&mut ext), Shape::new_2d(3, 2));
        let src = Tensor::dense(Region::new(&mut int), Shape::new_2d(2, 1));

        blocking_export(&mut HostEngine, src, external.view(Offset::new_2d(1, 1), src.shape())).unwrap();
        assert_eq!(external.to_vec().unwrap(), vec![0, 0, 0, 0, 7, 7]);
    }
}
