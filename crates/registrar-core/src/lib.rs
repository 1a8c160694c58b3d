//! registrar core: metric model, registry, and the shared error surface.
//!
//! This crate owns the aggregation state behind the service's request
//! metrics. It carries no transport or runtime dependencies so the HTTP
//! layer, the startup supervisor and tests can all share one registry.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Every fallible
//! path surfaces as `RegistrarError`/`Result` so a malformed label set or a
//! bad observation never takes the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metrics;

/// Shared result type.
pub use error::{ErrorClass, RegistrarError, Result};
pub use metrics::{
    Buckets, Collector, Counter, Gauge, Histogram, HistogramSnapshot, MetricDescriptor,
    MetricKind, MetricsRegistry,
};
