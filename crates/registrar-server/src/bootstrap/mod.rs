//! Startup bootstrap: bring the database up before serving.
//!
//! - `supervisor`: bounded fixed-delay retry state machine
//! - `mysql`     : production connector producing a pool

pub mod mysql;
pub mod supervisor;

pub use mysql::MySqlConnector;
pub use supervisor::{
    ConnectionRetrySupervisor, Connector, Escalation, ExitProcess, Phase, RetryPolicy,
    SupervisorState,
};
