//! Connection provider backed by a lazily created sqlx pool.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlcreds::{ConnectionProvider, CredentialError, Result};
use sqlx::Connection as _;
use sqlx::mysql::MySqlPoolOptions;

use crate::{MySqlConfig, MySqlPool, TYPE_NAME};

/// Produces MySQL connections from the configuration given at initialization.
///
/// The pool is built on first use and cached until `close` or the next
/// `initialize`.
#[derive(Debug, Default)]
pub struct MySqlConnectionProducer {
    config: Option<MySqlConfig>,
    pool: Option<MySqlPool>,
}

impl MySqlConnectionProducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<&MySqlConfig> {
        self.config.as_ref()
    }

    async fn open_pool(&self) -> Result<MySqlPool> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| CredentialError::Config("database is not initialized".to_string()))?;

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_open_connections)
            .max_lifetime(config.max_lifetime())
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| CredentialError::Connection(e.to_string()))?;

        tracing::info!(
            max_connections = config.max_open_connections,
            "opened mysql connection pool"
        );
        Ok(MySqlPool::new(pool))
    }

    async fn close_pool(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
    }
}

#[async_trait]
impl ConnectionProvider for MySqlConnectionProducer {
    type Connection = MySqlPool;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    async fn initialize(&mut self, config: &Map<String, Value>, verify: bool) -> Result<()> {
        let config = MySqlConfig::from_map(config)?;
        self.close_pool().await;
        self.config = Some(config);

        if verify {
            let pool = self.open_pool().await?;
            let mut conn = pool
                .acquire()
                .await
                .map_err(|e| CredentialError::Connection(e.to_string()))?;
            conn.ping()
                .await
                .map_err(|e| CredentialError::Connection(e.to_string()))?;
            drop(conn);
            self.pool = Some(pool);
        }

        Ok(())
    }

    async fn connection(&mut self) -> Result<MySqlPool> {
        if let Some(pool) = &self.pool {
            if !pool.is_closed() {
                return Ok(pool.clone());
            }
        }

        let pool = self.open_pool().await?;
        self.pool = Some(pool.clone());
        Ok(pool)
    }

    fn secret_values(&self) -> Vec<(String, String)> {
        self.config
            .iter()
            .filter(|config| !config.password.is_empty())
            .map(|config| (config.password.clone(), "[password]".to_string()))
            .collect()
    }

    async fn close(&mut self) -> Result<()> {
        self.close_pool().await;
        Ok(())
    }
}
