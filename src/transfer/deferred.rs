//! Engine that defers every operation until it is waited on.
//!
//! Behaves like a DMA queue that only makes progress when the host blocks on
//! it: issuing validates the transfer and queues it, waiting on an event runs
//! the queue in order up to the last operation recorded in that event. A
//! scheduler that reads a buffer before waiting on the transfer targeting it
//! sees the old contents, which is what the pipeline tests rely on.

use std::collections::VecDeque;

use crate::error::{TileError, TileResult};
use crate::tensor::{Element, Tensor};

use super::TransferEngine;

/// Completion handle of a [`DeferredEngine`]: the sequence number of the
/// last operation recorded into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeferredEvent {
    last: Option<u64>,
}

impl DeferredEvent {
    /// True if no operation is recorded in the event.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.last.is_none()
    }

    fn record(&mut self, seq: u64) {
        self.last = Some(self.last.map_or(seq, |last| last.max(seq)));
    }
}

enum PendingOp<'a, T> {
    Copy { dst: Tensor<'a, T>, src: Tensor<'a, T> },
    Fill { dst: Tensor<'a, T> },
}

impl<'a, T: Element> PendingOp<'a, T> {
    fn run(&self) -> TileResult<()> {
        match self {
            PendingOp::Copy { dst, src } => dst.copy_from(src),
            PendingOp::Fill { dst } => dst.fill_zero(),
        }
    }
}

/// FIFO engine with deferred execution.
///
/// # Example
///
/// ```rust
/// use tilestream::{DeferredEngine, DeferredEvent, Region, Shape, Tensor, TransferEngine};
///
/// let mut a = vec![1u8; 4];
/// let mut b = vec![0u8; 4];
/// let src = Tensor::dense(Region::new(&mut a), Shape::new_1d(4));
/// let dst = Tensor::dense(Region::new(&mut b), Shape::new_1d(4));
///
/// let mut engine = DeferredEngine::new();
/// let mut event = DeferredEvent::default();
/// engine.begin_import(dst, src, &mut event).unwrap();
/// assert_eq!(dst.read(0, 0, 0), 0);
///
/// engine.wait(std::slice::from_mut(&mut event)).unwrap();
/// assert_eq!(dst.read(0, 0, 0), 1);
/// ```
pub struct DeferredEngine<'a, T> {
    queue: VecDeque<(u64, PendingOp<'a, T>)>,
    next_seq: u64,
}

impl<'a, T: Element> DeferredEngine<'a, T> {
    /// Creates an engine with an empty queue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            next_seq: 0,
        }
    }

    /// Number of queued operations.
    #[inline]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Runs every queued operation.
    pub fn flush(&mut self) -> TileResult<()> {
        self.run_until(u64::MAX)
    }

    fn push(&mut self, op: PendingOp<'a, T>, event: &mut DeferredEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push_back((seq, op));
        event.record(seq);
    }

    fn run_until(&mut self, last: u64) -> TileResult<()> {
        while let Some((seq, _)) = self.queue.front() {
            if *seq > last {
                break;
            }
            if let Some((_, op)) = self.queue.pop_front() {
                op.run()?;
            }
        }
        Ok(())
    }

    fn check_copy(dst: &Tensor<'a, T>, src: &Tensor<'a, T>) -> TileResult<()> {
        if dst.shape() != src.shape() {
            return Err(TileError::shape_mismatch(src.shape(), dst.shape()));
        }
        dst.check_bounds()?;
        src.check_bounds()
    }
}

impl<'a, T: Element> Default for DeferredEngine<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T: Element> TransferEngine<'a, T> for DeferredEngine<'a, T> {
    type Event = DeferredEvent;

    fn begin_import(
        &mut self,
        dst: Tensor<'a, T>,
        src: Tensor<'a, T>,
        event: &mut DeferredEvent,
    ) -> TileResult<()> {
        Self::check_copy(&dst, &src)?;
        if dst.num_elements() > 0 {
            self.push(PendingOp::Copy { dst, src }, event);
        }
        Ok(())
    }

    fn begin_export(
        &mut self,
        src: Tensor<'a, T>,
        dst: Tensor<'a, T>,
        event: &mut DeferredEvent,
    ) -> TileResult<()> {
        self.begin_import(dst, src, event)
    }

    fn begin_fill(&mut self, dst: Tensor<'a, T>, event: &mut DeferredEvent) -> TileResult<()> {
        dst.check_bounds()?;
        if dst.num_elements() > 0 {
            self.push(PendingOp::Fill { dst }, event);
        }
        Ok(())
    }

    fn wait(&mut self, events: &mut [DeferredEvent]) -> TileResult<()> {
        let last = events.iter().filter_map(|e| e.last).max();
        for event in events.iter_mut() {
            event.last = None;
        }
        match last {
            Some(last) => self.run_until(last),
            None => Ok(()),
        }
    }
}
