//! Top-level facade crate for registrar.
//!
//! Re-exports the metric core and the server library so users can depend on a single crate.

pub mod core {
    pub use registrar_core::*;
}

pub mod server {
    pub use registrar_server::*;
}
