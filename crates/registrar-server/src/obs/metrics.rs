//! Service metric handles, registered once into the shared registry.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashSet;
use registrar_core::error::Result;
use registrar_core::metrics::{Buckets, Counter, Gauge, Histogram, MetricDescriptor, MetricsRegistry};

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const REQUESTS_IN_FLIGHT: &str = "http_requests_in_flight";
pub const CONNECT_ATTEMPTS_TOTAL: &str = "dependency_connect_attempts_total";
pub const PROCESS_START_TIME_SECONDS: &str = "process_start_time_seconds";

/// Route label for requests that lost their own label to a cardinality cap.
pub const OVERFLOW_ROUTE: &str = "__other__";

const REQUEST_LABELS: [&str; 3] = ["method", "route", "status"];

/// Label-set limits for the request metrics.
#[derive(Debug, Clone, Copy)]
pub struct RouteLimits {
    /// Hard cap per metric; past it new label sets fold into [`OVERFLOW_ROUTE`].
    pub max_label_sets: usize,
    /// Distinct raw paths of unmatched requests kept as their own route label.
    pub max_unmatched_routes: usize,
}

/// Request counter, latency histogram and in-flight gauge.
pub struct HttpMetrics {
    requests: Arc<Counter>,
    duration: Arc<Histogram>,
    in_flight: Arc<Gauge>,
    unmatched: DashSet<String>,
    max_unmatched_routes: usize,
}

impl HttpMetrics {
    pub fn register(registry: &MetricsRegistry, buckets: Buckets, limits: RouteLimits) -> Result<Self> {
        let requests = registry.register_counter(
            MetricDescriptor::new(REQUESTS_TOTAL, "Total number of HTTP requests", &REQUEST_LABELS)?
                .with_max_label_sets(limits.max_label_sets)
                .with_overflow("route", OVERFLOW_ROUTE)?,
        )?;
        let duration = registry.register_histogram(
            MetricDescriptor::new(
                REQUEST_DURATION_SECONDS,
                "Duration of HTTP requests in seconds",
                &REQUEST_LABELS,
            )?
            .with_max_label_sets(limits.max_label_sets)
            .with_overflow("route", OVERFLOW_ROUTE)?,
            buckets,
        )?;
        let in_flight = registry.register_gauge(MetricDescriptor::new(
            REQUESTS_IN_FLIGHT,
            "Number of HTTP requests currently being served",
            &[],
        )?)?;
        Ok(Self {
            requests,
            duration,
            in_flight,
            unmatched: DashSet::new(),
            max_unmatched_routes: limits.max_unmatched_routes,
        })
    }

    pub fn requests(&self) -> &Counter {
        &self.requests
    }

    pub fn duration(&self) -> &Histogram {
        &self.duration
    }

    pub fn in_flight(&self) -> &Gauge {
        &self.in_flight
    }

    pub(crate) fn request_started(&self) {
        if let Err(e) = self.in_flight.inc(&[]) {
            tracing::warn!(error = %e, "in-flight gauge update failed");
        }
    }

    /// Route label for a request. Matched patterns are bounded by the router
    /// and always kept; raw paths get a budget of their own so scanners
    /// cannot crowd real routes out of the label-set cap.
    fn route_label<'a>(&self, route: &'a str, matched: bool) -> &'a str {
        if matched || self.unmatched.contains(route) {
            return route;
        }
        // best-effort under concurrent inserts, like the cell cap
        if self.unmatched.len() < self.max_unmatched_routes {
            self.unmatched.insert(route.to_owned());
            return route;
        }
        OVERFLOW_ROUTE
    }

    /// Record one finished request: one increment, one observation.
    ///
    /// Never fails; bookkeeping errors are logged and dropped.
    pub(crate) fn request_finished(
        &self,
        method: &str,
        route: &str,
        matched: bool,
        status: u16,
        elapsed: Duration,
    ) {
        let route = self.route_label(route, matched);
        let status = status.to_string();
        let labels = [("method", method), ("route", route), ("status", status.as_str())];

        if let Err(e) = self.requests.inc(&labels) {
            tracing::warn!(error = %e, %method, %route, "request counter update failed");
        }
        if let Err(e) = self.duration.observe_duration(&labels, elapsed) {
            tracing::warn!(error = %e, %method, %route, "request duration update failed");
        }
        if let Err(e) = self.in_flight.dec(&[]) {
            tracing::warn!(error = %e, "in-flight gauge update failed");
        }
    }
}

/// Counts dependency connection attempts by outcome.
pub fn register_connect_attempts(registry: &MetricsRegistry) -> Result<Arc<Counter>> {
    registry.register_counter(MetricDescriptor::new(
        CONNECT_ATTEMPTS_TOTAL,
        "Dependency connection attempts by outcome",
        &["outcome"],
    )?)
}

/// Registers `process_start_time_seconds` and sets it to now.
pub fn register_process_metrics(registry: &MetricsRegistry) -> Result<Arc<Gauge>> {
    let start = registry.register_gauge(MetricDescriptor::new(
        PROCESS_START_TIME_SECONDS,
        "Start time of the process since unix epoch in seconds",
        &[],
    )?)?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    start.set(&[], i64::try_from(now).unwrap_or(i64::MAX))?;
    Ok(start)
}
