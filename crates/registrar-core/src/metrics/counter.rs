use std::fmt::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use super::cells::Cells;
use super::{write_labels, Collector, MetricDescriptor, MetricKind};
use crate::error::Result;

/// Monotonic counter keyed by label set.
///
/// Amounts are unsigned, so a cell can never decrease.
pub struct Counter {
    desc: MetricDescriptor,
    cells: Cells<AtomicU64>,
}

impl Counter {
    pub fn new(desc: MetricDescriptor) -> Self {
        Self {
            desc,
            cells: Cells::default(),
        }
    }

    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) -> Result<()> {
        self.inc_by(labels, 1)
    }

    /// Increment by an arbitrary amount.
    pub fn inc_by(&self, labels: &[(&str, &str)], v: u64) -> Result<()> {
        self.cells.with_cell(&self.desc, labels, AtomicU64::default, |c| {
            c.fetch_add(v, Ordering::Relaxed);
        })
    }

    /// Current value of one cell, `None` if never incremented.
    pub fn get(&self, labels: &[(&str, &str)]) -> Result<Option<u64>> {
        self.cells
            .read(&self.desc, labels, |c| c.load(Ordering::Relaxed))
    }

    /// Number of populated label sets.
    pub fn label_sets(&self) -> usize {
        self.cells.len()
    }
}

impl Collector for Counter {
    fn descriptor(&self) -> &MetricDescriptor {
        &self.desc
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Counter
    }

    fn encode(&self, out: &mut String) -> fmt::Result {
        let name = self.desc.name();
        for (key, val) in self.cells.snapshot(|c| c.load(Ordering::Relaxed)) {
            out.push_str(name);
            write_labels(out, self.desc.label_names(), &key, None)?;
            writeln!(out, " {}", val)?;
        }
        Ok(())
    }
}
