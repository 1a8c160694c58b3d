use std::net::SocketAddr;

use serde::Deserialize;
use registrar_core::error::{RegistrarError, Result};
use registrar_core::metrics::Buckets;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub database: DatabaseSection,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            metrics: MetricsSection::default(),
            database: DatabaseSection::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RegistrarError::Config(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.server.validate()?;
        self.metrics.validate()?;
        self.database.validate()?;

        Ok(())
    }

    /// Apply environment overrides through `lookup` (usually `std::env::var`).
    ///
    /// Recognised: DB_HOST, DB_USER, DB_PASSWORD (or DB_PASS), DB_NAME,
    /// DB_PORT, BACKEND_PORT.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = &mut self.database;
        if let Some(v) = lookup("DB_HOST") {
            db.host = v;
        }
        if let Some(v) = lookup("DB_USER") {
            db.user = v;
        }
        if let Some(v) = lookup("DB_PASSWORD").or_else(|| lookup("DB_PASS")) {
            db.password = v;
        }
        if let Some(v) = lookup("DB_NAME") {
            db.name = v;
        }
        if let Some(v) = lookup("DB_PORT") {
            db.port = parse_port("DB_PORT", &v)?;
        }
        if let Some(v) = lookup("BACKEND_PORT") {
            let port = parse_port("BACKEND_PORT", &v)?;
            let mut addr = self.server.listen_addr()?;
            addr.set_port(port);
            self.server.listen = addr.to_string();
        }
        Ok(())
    }
}

fn parse_port(var: &str, v: &str) -> Result<u16> {
    v.trim()
        .parse()
        .map_err(|e| RegistrarError::Config(format!("{var} must be a port number: {e}")))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            RegistrarError::Config(format!("server.listen must be a valid SocketAddr: {e}"))
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }
}

fn default_listen() -> String {
    "0.0.0.0:3000".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_metrics_path")]
    pub path: String,

    #[serde(default = "default_duration_buckets")]
    pub duration_buckets: Vec<f64>,

    /// Per-metric cap on distinct label sets.
    #[serde(default = "default_max_label_sets")]
    pub max_label_sets: usize,

    /// Distinct raw paths of unmatched requests labelled individually;
    /// further ones are recorded as route `__other__`.
    #[serde(default = "default_max_unmatched_routes")]
    pub max_unmatched_routes: usize,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            path: default_metrics_path(),
            duration_buckets: default_duration_buckets(),
            max_label_sets: default_max_label_sets(),
            max_unmatched_routes: default_max_unmatched_routes(),
        }
    }
}

impl MetricsSection {
    pub fn buckets(&self) -> Result<Buckets> {
        Buckets::new(self.duration_buckets.clone())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') || self.path.len() < 2 {
            return Err(RegistrarError::Config(
                "metrics.path must start with '/' and name a route".into(),
            ));
        }
        if self
            .path
            .split('/')
            .any(|seg| seg.starts_with(':') || seg.starts_with('*') || seg.contains(['{', '}']))
        {
            return Err(RegistrarError::Config(format!(
                "metrics.path must be a literal route without captures: {}",
                self.path
            )));
        }
        if RESERVED_PATHS.contains(&self.path.as_str()) {
            return Err(RegistrarError::Config(format!(
                "metrics.path collides with a built-in route: {}",
                self.path
            )));
        }
        if self.max_label_sets == 0 {
            return Err(RegistrarError::Config(
                "metrics.max_label_sets must be greater than 0".into(),
            ));
        }
        match self.buckets() {
            Ok(_) => Ok(()),
            Err(RegistrarError::Config(reason)) => Err(RegistrarError::Config(format!(
                "metrics.duration_buckets: {reason}"
            ))),
            Err(e) => Err(e),
        }
    }
}

const RESERVED_PATHS: [&str; 3] = ["/api", "/healthz", "/readyz"];

fn default_metrics_path() -> String {
    "/metrics".into()
}
fn default_duration_buckets() -> Vec<f64> {
    Buckets::http_duration().bounds().to_vec()
}
fn default_max_label_sets() -> usize {
    10_000
}
fn default_max_unmatched_routes() -> usize {
    100
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSection {
    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_db_name")]
    pub name: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    /// Retries after the first failed attempt.
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Bound on one startup connection attempt.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            user: default_db_user(),
            password: String::new(),
            name: default_db_name(),
            port: default_db_port(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            pool_size: default_pool_size(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
        }
    }
}

impl DatabaseSection {
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(RegistrarError::Config("database.host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(RegistrarError::Config("database.port must not be 0".into()));
        }
        if !(100..=600_000).contains(&self.retry_delay_ms) {
            return Err(RegistrarError::Config(
                "database.retry_delay_ms must be between 100 and 600000".into(),
            ));
        }
        if !(100..=600_000).contains(&self.connect_timeout_ms) {
            return Err(RegistrarError::Config(
                "database.connect_timeout_ms must be between 100 and 600000".into(),
            ));
        }
        if !(1..=512).contains(&self.pool_size) {
            return Err(RegistrarError::Config(
                "database.pool_size must be between 1 and 512".into(),
            ));
        }
        if self.acquire_timeout_ms == 0 {
            return Err(RegistrarError::Config(
                "database.acquire_timeout_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_db_host() -> String {
    "localhost".into()
}
fn default_db_user() -> String {
    "root".into()
}
fn default_db_name() -> String {
    "student_management".into()
}
fn default_db_port() -> u16 {
    3306
}
fn default_retries() -> u32 {
    10
}
fn default_retry_delay_ms() -> u64 {
    3000
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_pool_size() -> u32 {
    10
}
fn default_acquire_timeout_ms() -> u64 {
    60_000
}
