//! In-process metrics with Prometheus text exposition.
//!
//! Metrics are explicit objects registered into a [`MetricsRegistry`] and
//! shared by `Arc`. Each metric keys its cells by the label values ordered as
//! the descriptor declares them, stored in a `DashMap` so concurrent
//! insert-if-absent and updates to different cells never contend on one lock.

mod cells;
mod counter;
mod descriptor;
mod gauge;
mod histogram;
mod registry;

use std::fmt::{self, Write};

pub use counter::Counter;
pub use descriptor::{LabelValues, MetricDescriptor};
pub use gauge::Gauge;
pub use histogram::{Buckets, Histogram, HistogramSnapshot};
pub use registry::MetricsRegistry;

/// Metric family type as written in `# TYPE` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

/// Anything the registry can own and render.
pub trait Collector: Send + Sync {
    fn descriptor(&self) -> &MetricDescriptor;
    fn kind(&self) -> MetricKind;
    /// Write the sample lines (no `# HELP`/`# TYPE`) for every populated cell.
    fn encode(&self, out: &mut String) -> fmt::Result;
}

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Write `{k="v",...}` for a cell, appending `extra` (e.g. `le`) last.
/// Writes nothing when there are no labels at all.
fn write_labels(
    out: &mut String,
    names: &[String],
    values: &LabelValues,
    extra: Option<(&str, &str)>,
) -> fmt::Result {
    if names.is_empty() && extra.is_none() {
        return Ok(());
    }
    out.push('{');
    let mut first = true;
    for (k, v) in names.iter().zip(values.as_slice()) {
        if !first {
            out.push(',');
        }
        first = false;
        write!(out, "{}=\"{}\"", k, escape_label(v))?;
    }
    if let Some((k, v)) = extra {
        if !first {
            out.push(',');
        }
        write!(out, "{}=\"{}\"", k, escape_label(v))?;
    }
    out.push('}');
    Ok(())
}
