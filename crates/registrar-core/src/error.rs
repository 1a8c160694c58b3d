//! Shared error type across registrar crates.

use thiserror::Error;

/// Coarse error classes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Startup misconfiguration. Never recovered.
    Configuration,
    /// Dependency connection failure.
    Dependency,
    /// Per-request bookkeeping failure. Logged, never propagated.
    Request,
    /// Exposition failure. Reported to the scraper.
    Scrape,
    /// Internal invariant violation.
    Internal,
}

impl ErrorClass {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::Configuration => "CONFIGURATION",
            ErrorClass::Dependency => "DEPENDENCY",
            ErrorClass::Request => "REQUEST",
            ErrorClass::Scrape => "SCRAPE",
            ErrorClass::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RegistrarError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error("invalid config: {0}")]
    Config(String),
    #[error("metric already registered: {0}")]
    DuplicateMetric(String),
    #[error("invalid metric {metric}: {reason}")]
    InvalidMetric { metric: String, reason: String },
    #[error("label mismatch on {metric}: {reason}")]
    LabelMismatch { metric: String, reason: String },
    #[error("label set limit {limit} reached on {metric}")]
    CardinalityExceeded { metric: String, limit: usize },
    #[error("invalid observation on {metric}: {value}")]
    InvalidObservation { metric: String, value: f64 },
    #[error("exposition failed: {0}")]
    Exposition(String),
    #[error("dependency connection failed: {0}")]
    Dependency(String),
    #[error("dependency unavailable after {attempts} attempts: {last_error}")]
    DependencyExhausted { attempts: u32, last_error: String },
    #[error("internal: {0}")]
    Internal(String),
}

impl RegistrarError {
    /// Map an error to its class.
    pub fn class(&self) -> ErrorClass {
        match self {
            RegistrarError::Config(_)
            | RegistrarError::DuplicateMetric(_)
            | RegistrarError::InvalidMetric { .. } => ErrorClass::Configuration,
            RegistrarError::LabelMismatch { .. }
            | RegistrarError::CardinalityExceeded { .. }
            | RegistrarError::InvalidObservation { .. } => ErrorClass::Request,
            RegistrarError::Exposition(_) => ErrorClass::Scrape,
            RegistrarError::Dependency(_) | RegistrarError::DependencyExhausted { .. } => {
                ErrorClass::Dependency
            }
            RegistrarError::Internal(_) => ErrorClass::Internal,
        }
    }
}

impl From<std::fmt::Error> for RegistrarError {
    fn from(e: std::fmt::Error) -> Self {
        RegistrarError::Exposition(e.to_string())
    }
}
