//! Shared application state.
//!
//! Built before the database is reachable so metric registration errors
//! surface at startup; the pool is attached once the supervisor connects.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use sqlx::MySqlPool;

use registrar_core::error::{RegistrarError, Result};
use registrar_core::metrics::MetricsRegistry;

use crate::config::ServerConfig;
use crate::obs::{metrics, HttpMetrics, RouteLimits};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServerConfig,
    registry: Arc<MetricsRegistry>,
    http: Arc<HttpMetrics>,
    db: OnceLock<MySqlPool>,
    draining: AtomicBool,
}

impl AppState {
    /// Build application state and register the service metrics.
    /// Returns Result so main can fail startup cleanly on a bad registry.
    pub fn new(cfg: ServerConfig, registry: Arc<MetricsRegistry>) -> Result<Self> {
        metrics::register_process_metrics(&registry)?;
        let http = HttpMetrics::register(
            &registry,
            cfg.metrics.buckets()?,
            RouteLimits {
                max_label_sets: cfg.metrics.max_label_sets,
                max_unmatched_routes: cfg.metrics.max_unmatched_routes,
            },
        )?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                http: Arc::new(http),
                db: OnceLock::new(),
                draining: AtomicBool::new(false),
            }),
        })
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> &MetricsRegistry {
        &self.inner.registry
    }

    pub fn http_metrics(&self) -> Arc<HttpMetrics> {
        Arc::clone(&self.inner.http)
    }

    /// Attach the connected pool. Only the first call wins.
    pub fn attach_database(&self, pool: MySqlPool) -> Result<()> {
        self.inner
            .db
            .set(pool)
            .map_err(|_| RegistrarError::Internal("database pool already attached".into()))
    }

    pub fn db(&self) -> Option<&MySqlPool> {
        self.inner.db.get()
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}
