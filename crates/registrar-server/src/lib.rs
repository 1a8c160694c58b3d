//! registrar server library entry.
//!
//! Wires configuration, the metrics registry, request instrumentation, the
//! operational endpoints and the startup connection supervisor. Consumed by
//! the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod obs;
pub mod ops;
pub mod router;
