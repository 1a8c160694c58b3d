use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlPool, MySqlPoolOptions};
use sqlx::Connection;

use registrar_core::error::{RegistrarError, Result};

use super::supervisor::Connector;
use crate::config::DatabaseSection;

/// Opens a MySQL pool; an attempt succeeds once one connection is established.
///
/// Each attempt dials exactly once, bounded by `connect_timeout`. The pool
/// itself is lazy; `acquire_timeout` only applies to request-time checkouts.
/// Parameters are captured from the config once and never re-read.
pub struct MySqlConnector {
    options: MySqlConnectOptions,
    pool_size: u32,
    connect_timeout: Duration,
    acquire_timeout: Duration,
    target: String,
}

impl MySqlConnector {
    pub fn from_config(db: &DatabaseSection) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&db.host)
            .port(db.port)
            .username(&db.user)
            .password(&db.password)
            .database(&db.name);
        Self {
            options,
            pool_size: db.pool_size,
            connect_timeout: Duration::from_millis(db.connect_timeout_ms),
            acquire_timeout: Duration::from_millis(db.acquire_timeout_ms),
            target: format!("mysql://{}@{}:{}/{}", db.user, db.host, db.port, db.name),
        }
    }

    async fn dial_once(&self) -> Result<()> {
        let conn = tokio::time::timeout(self.connect_timeout, MySqlConnection::connect_with(&self.options))
            .await
            .map_err(|_| {
                RegistrarError::Dependency(format!(
                    "connect timed out after {}ms",
                    self.connect_timeout.as_millis()
                ))
            })?
            .map_err(|e| RegistrarError::Dependency(e.to_string()))?;

        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "closing startup connection failed");
        }
        Ok(())
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    type Connection = MySqlPool;

    fn target(&self) -> String {
        self.target.clone()
    }

    async fn connect(&self) -> Result<MySqlPool> {
        self.dial_once().await?;
        Ok(MySqlPoolOptions::new()
            .max_connections(self.pool_size)
            .acquire_timeout(self.acquire_timeout)
            .connect_lazy_with(self.options.clone()))
    }
}
