//! Observability: metric handles and the request instrumentation layer.

pub mod metrics;
pub mod middleware;

pub use metrics::{HttpMetrics, RouteLimits};
pub use middleware::track_requests;
