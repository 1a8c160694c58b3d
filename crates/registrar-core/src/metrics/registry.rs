use std::fmt::Write;
use std::sync::{Arc, RwLock};

use super::{escape_help, Buckets, Collector, Counter, Gauge, Histogram, MetricDescriptor};
use crate::error::{RegistrarError, Result};

/// Owns every registered metric, in registration order.
///
/// Registration happens at startup; afterwards the lock is only taken for
/// reading by scrapes, so request-path updates (which go straight to the
/// metric handles) never touch it.
#[derive(Default)]
pub struct MetricsRegistry {
    metrics: RwLock<Vec<Arc<dyn Collector>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metric and hand back its handle.
    ///
    /// A name that is already registered is a configuration error.
    pub fn register<M: Collector + 'static>(&self, metric: Arc<M>) -> Result<Arc<M>> {
        let mut metrics = self
            .metrics
            .write()
            .map_err(|_| RegistrarError::Internal("metrics registry lock poisoned".into()))?;
        let name = metric.descriptor().name();
        if metrics.iter().any(|m| m.descriptor().name() == name) {
            return Err(RegistrarError::DuplicateMetric(name.to_string()));
        }
        metrics.push(metric.clone());
        tracing::debug!(metric = %name, "metric registered");
        Ok(metric)
    }

    pub fn register_counter(&self, desc: MetricDescriptor) -> Result<Arc<Counter>> {
        self.register(Arc::new(Counter::new(desc)))
    }

    pub fn register_gauge(&self, desc: MetricDescriptor) -> Result<Arc<Gauge>> {
        self.register(Arc::new(Gauge::new(desc)))
    }

    pub fn register_histogram(
        &self,
        desc: MetricDescriptor,
        buckets: Buckets,
    ) -> Result<Arc<Histogram>> {
        self.register(Arc::new(Histogram::new(desc, buckets)?))
    }

    /// Registered metric names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.metrics
            .read()
            .map(|m| m.iter().map(|c| c.descriptor().name().to_string()).collect())
            .unwrap_or_default()
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn collect(&self) -> Result<String> {
        let metrics: Vec<Arc<dyn Collector>> = self
            .metrics
            .read()
            .map_err(|_| RegistrarError::Internal("metrics registry lock poisoned".into()))?
            .clone();

        let mut out = String::new();
        for m in &metrics {
            let desc = m.descriptor();
            writeln!(out, "# HELP {} {}", desc.name(), escape_help(desc.help()))?;
            writeln!(out, "# TYPE {} {}", desc.name(), m.kind().as_str())?;
            m.encode(&mut out)?;
        }
        Ok(out)
    }
}
