//! Logging and counting wrapper around any engine.

use std::fmt;

use crate::error::TileResult;
use crate::geometry::Shape;
use crate::tensor::{Element, Tensor};

use super::TransferEngine;

/// Direction of a recorded transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferKind {
    /// External to internal.
    Import,
    /// Internal to external.
    Export,
    /// Zero fill of an internal view.
    Fill,
}

/// One issued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRecord {
    /// What was issued.
    pub kind: TransferKind,
    /// Shape of the transfer.
    pub shape: Shape,
    /// Start index of the external view, `None` for fills.
    pub external_start: Option<isize>,
}

/// Running counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferStats {
    /// Non-empty imports issued.
    pub imports: usize,
    /// Non-empty exports issued.
    pub exports: usize,
    /// Non-empty fills issued.
    pub fills: usize,
    /// Calls to `wait`.
    pub waits: usize,
    /// Elements copied or filled.
    pub elements: usize,
}

impl fmt::Display for TransferStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} imports, {} exports, {} fills, {} waits, {} elements",
            self.imports, self.exports, self.fills, self.waits, self.elements
        )
    }
}

/// Wraps an engine, logging every operation at `trace` level and keeping a
/// history of what was issued.
///
/// Empty operations are forwarded but neither counted nor recorded.
#[derive(Debug, Default)]
pub struct TracingEngine<E> {
    inner: E,
    stats: TransferStats,
    history: Vec<TransferRecord>,
}

impl<E> TracingEngine<E> {
    /// Wraps `inner`.
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            stats: TransferStats::default(),
            history: Vec::new(),
        }
    }

    /// Counters so far.
    pub fn stats(&self) -> TransferStats {
        self.stats
    }

    /// Issued operations, oldest first.
    pub fn history(&self) -> &[TransferRecord] {
        &self.history
    }

    /// Records of one kind, oldest first.
    pub fn records(&self, kind: TransferKind) -> impl Iterator<Item = &TransferRecord> + '_ {
        self.history.iter().filter(move |r| r.kind == kind)
    }

    /// Clears counters and history.
    pub fn reset(&mut self) {
        self.stats = TransferStats::default();
        self.history.clear();
    }

    /// The wrapped engine.
    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// The wrapped engine, mutably.
    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.inner
    }

    /// Unwraps the engine.
    pub fn into_inner(self) -> E {
        self.inner
    }

    fn record(&mut self, kind: TransferKind, shape: Shape, external_start: Option<isize>) {
        let n = shape.num_elements();
        if n == 0 {
            return;
        }
        match kind {
            TransferKind::Import => self.stats.imports += 1,
            TransferKind::Export => self.stats.exports += 1,
            TransferKind::Fill => self.stats.fills += 1,
        }
        self.stats.elements += n;
        self.history.push(TransferRecord { kind, shape, external_start });
    }
}

impl<'a, T: Element, E: TransferEngine<'a, T>> TransferEngine<'a, T> for TracingEngine<E> {
    type Event = E::Event;

    fn begin_import(
        &mut self,
        dst: Tensor<'a, T>,
        src: Tensor<'a, T>,
        event: &mut Self::Event,
    ) -> TileResult<()> {
        log::trace!("import {} from external index {}", src.shape(), src.start());
        self.inner.begin_import(dst, src, event)?;
        self.record(TransferKind::Import, src.shape(), Some(src.start()));
        Ok(())
    }

    fn begin_export(
        &mut self,
        src: Tensor<'a, T>,
        dst: Tensor<'a, T>,
        event: &mut Self::Event,
    ) -> TileResult<()> {
        log::trace!("export {} to external index {}", dst.shape(), dst.start());
        self.inner.begin_export(src, dst, event)?;
        self.record(TransferKind::Export, dst.shape(), Some(dst.start()));
        Ok(())
    }

    fn begin_fill(&mut self, dst: Tensor<'a, T>, event: &mut Self::Event) -> TileResult<()> {
        log::trace!("fill {}", dst.shape());
        self.inner.begin_fill(dst, event)?;
        self.record(TransferKind::Fill, dst.shape(), None);
        Ok(())
    }

    fn wait(&mut self, events: &mut [Self::Event]) -> TileResult<()> {
        self.stats.waits += 1;
        self.inner.wait(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Offset;
    use crate::tensor::Region;
    use crate::transfer::HostEngine;

    #[test]
    fn test_counts_and_history() {
        let mut ext = vec![1i16; 16];
        let mut int = vec![0i16; 4];
        let external = Tensor::dense(Region::new(&mut ext), Shape::new_2d(4, 4));
        let internal = Tensor::dense(Region::new(&mut int), Shape::new_2d(2, 2));

        let mut engine = TracingEngine::new(HostEngine);
        let src = external.view(Offset::new_2d(2, 2), Shape::new_2d(2, 2));
        engine.begin_import(internal, src, &mut ()).unwrap();
        engine.begin_export(internal, external.view(Offset::ORIGIN, Shape::new_2d(2, 2)), &mut ()).unwrap();
        engine.begin_fill(Tensor::empty(internal.region()), &mut ()).unwrap();
        <TracingEngine<HostEngine> as TransferEngine<'_, i16>>::wait(&mut engine, &mut [(), ()]).unwrap();

        let stats = engine.stats();
        assert_eq!(stats.imports, 1);
        assert_eq!(stats.exports, 1);
        assert_eq!(stats.fills, 0);
        assert_eq!(stats.waits, 1);
        assert_eq!(stats.elements, 8);
        assert_eq!(engine.history()[0].external_start, Some(10));
        assert_eq!(engine.records(TransferKind::Export).count(), 1);

        engine.reset();
        assert!(engine.history().is_empty());
    }
}
