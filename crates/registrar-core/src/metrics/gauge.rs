use std::fmt::{self, Write};
use std::sync::atomic::{AtomicI64, Ordering};

use super::cells::Cells;
use super::{write_labels, Collector, MetricDescriptor, MetricKind};
use crate::error::Result;

/// Signed value keyed by label set; may go up and down.
pub struct Gauge {
    desc: MetricDescriptor,
    cells: Cells<AtomicI64>,
}

impl Gauge {
    pub fn new(desc: MetricDescriptor) -> Self {
        Self {
            desc,
            cells: Cells::default(),
        }
    }

    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) -> Result<()> {
        self.add(labels, 1)
    }

    /// Decrement by 1.
    pub fn dec(&self, labels: &[(&str, &str)]) -> Result<()> {
        self.add(labels, -1)
    }

    /// Add an arbitrary signed delta.
    pub fn add(&self, labels: &[(&str, &str)], v: i64) -> Result<()> {
        self.cells.with_cell(&self.desc, labels, AtomicI64::default, |g| {
            g.fetch_add(v, Ordering::Relaxed);
        })
    }

    pub fn set(&self, labels: &[(&str, &str)], v: i64) -> Result<()> {
        self.cells.with_cell(&self.desc, labels, AtomicI64::default, |g| {
            g.store(v, Ordering::Relaxed);
        })
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> Result<Option<i64>> {
        self.cells
            .read(&self.desc, labels, |g| g.load(Ordering::Relaxed))
    }
}

impl Collector for Gauge {
    fn descriptor(&self) -> &MetricDescriptor {
        &self.desc
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Gauge
    }

    fn encode(&self, out: &mut String) -> fmt::Result {
        let name = self.desc.name();
        for (key, val) in self.cells.snapshot(|g| g.load(Ordering::Relaxed)) {
            out.push_str(name);
            write_labels(out, self.desc.label_names(), &key, None)?;
            writeln!(out, " {}", val)?;
        }
        Ok(())
    }
}
