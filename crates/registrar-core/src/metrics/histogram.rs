use std::fmt::{self, Write};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::cells::Cells;
use super::{write_labels, Collector, MetricDescriptor, MetricKind};
use crate::error::{RegistrarError, Result};

/// Default request latency buckets in seconds.
pub const HTTP_DURATION_BUCKETS: [f64; 8] = [0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Finite, strictly ascending bucket upper bounds. `+Inf` is implicit.
#[derive(Debug, Clone, PartialEq)]
pub struct Buckets(Vec<f64>);

impl Buckets {
    pub fn new(bounds: Vec<f64>) -> Result<Self> {
        if bounds.is_empty() {
            return Err(RegistrarError::Config("buckets must not be empty".into()));
        }
        if let Some(b) = bounds.iter().find(|b| !b.is_finite()) {
            return Err(RegistrarError::Config(format!(
                "bucket bound must be finite: {b}"
            )));
        }
        if bounds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(RegistrarError::Config(
                "bucket bounds must be strictly ascending".into(),
            ));
        }
        Ok(Self(bounds))
    }

    /// `{0.01, 0.05, 0.1, 0.5, 1, 2.5, 5, 10}` seconds.
    pub fn http_duration() -> Self {
        Self(HTTP_DURATION_BUCKETS.to_vec())
    }

    pub fn bounds(&self) -> &[f64] {
        &self.0
    }
}

#[derive(Debug)]
struct HistogramState {
    /// Cumulative count per finite bound.
    buckets: Vec<u64>,
    sum: f64,
    count: u64,
}

/// Consistent copy of one histogram cell.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// `(upper bound, cumulative count)` per finite bucket.
    pub buckets: Vec<(f64, u64)>,
    pub sum: f64,
    pub count: u64,
}

impl HistogramSnapshot {
    /// Count of the implicit `+Inf` bucket.
    pub fn inf_count(&self) -> u64 {
        self.count
    }
}

/// Bucketed distribution keyed by label set.
///
/// A cell sits behind its own short mutex so one observation updates its
/// buckets, sum and count together and a scrape never sees them torn.
pub struct Histogram {
    desc: MetricDescriptor,
    buckets: Buckets,
    cells: Cells<Mutex<HistogramState>>,
}

impl Histogram {
    pub fn new(desc: MetricDescriptor, buckets: Buckets) -> Result<Self> {
        if desc.label_names().iter().any(|l| l == "le") {
            return Err(desc.invalid("histogram cannot use the reserved label `le`"));
        }
        Ok(Self {
            desc,
            buckets,
            cells: Cells::default(),
        })
    }

    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    /// Record one observation. `value` must be finite and non-negative.
    pub fn observe(&self, labels: &[(&str, &str)], value: f64) -> Result<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(RegistrarError::InvalidObservation {
                metric: self.desc.name().to_string(),
                value,
            });
        }
        let bounds = self.buckets.bounds();
        let init = || {
            Mutex::new(HistogramState {
                buckets: vec![0; bounds.len()],
                sum: 0.0,
                count: 0,
            })
        };
        self.cells.with_cell(&self.desc, labels, init, |cell| {
            let mut st = lock(cell);
            // Cumulative: every bucket whose bound is >= value.
            for (slot, &le) in st.buckets.iter_mut().zip(bounds) {
                if value <= le {
                    *slot += 1;
                }
            }
            st.sum += value;
            st.count += 1;
        })
    }

    /// Record a duration in seconds.
    pub fn observe_duration(&self, labels: &[(&str, &str)], d: Duration) -> Result<()> {
        self.observe(labels, d.as_secs_f64())
    }

    pub fn snapshot(&self, labels: &[(&str, &str)]) -> Result<Option<HistogramSnapshot>> {
        self.cells
            .read(&self.desc, labels, |cell| self.copy_state(cell))
    }

    fn copy_state(&self, cell: &Mutex<HistogramState>) -> HistogramSnapshot {
        let st = lock(cell);
        HistogramSnapshot {
            buckets: self
                .buckets
                .bounds()
                .iter()
                .copied()
                .zip(st.buckets.iter().copied())
                .collect(),
            sum: st.sum,
            count: st.count,
        }
    }
}

/// The state stays consistent even if a holder panicked, so poison is ignored.
fn lock(cell: &Mutex<HistogramState>) -> MutexGuard<'_, HistogramState> {
    cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Collector for Histogram {
    fn descriptor(&self) -> &MetricDescriptor {
        &self.desc
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Histogram
    }

    fn encode(&self, out: &mut String) -> fmt::Result {
        let name = self.desc.name();
        let names = self.desc.label_names();
        for (key, snap) in self.cells.snapshot(|cell| self.copy_state(cell)) {
            for (le, count) in &snap.buckets {
                write!(out, "{}_bucket", name)?;
                write_labels(out, names, &key, Some(("le", &le.to_string())))?;
                writeln!(out, " {}", count)?;
            }
            write!(out, "{}_bucket", name)?;
            write_labels(out, names, &key, Some(("le", "+Inf")))?;
            writeln!(out, " {}", snap.inf_count())?;

            write!(out, "{}_sum", name)?;
            write_labels(out, names, &key, None)?;
            writeln!(out, " {}", snap.sum)?;

            write!(out, "{}_count", name)?;
            write_labels(out, names, &key, None)?;
            writeln!(out, " {}", snap.count)?;
        }
        Ok(())
    }
}
