//! Database connection management against PostgreSQL — this service is
//! natively multi-tenant and multi-region, and `sqlx`'s Postgres driver is
//! the idiomatic fit.

pub mod accounts;

use std::time::Duration;

use sqlx::postgres::{PgPoolOptions, Postgres};
use sqlx::{Pool, Transaction};

use crate::error::CoreError;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Clone)]
pub struct Database {
    pool: Pool<Postgres>,
}

impl Database {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, CoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .idle_timeout(IDLE_TIMEOUT)
            .connect(database_url)
            .await
            .map_err(|e| CoreError::StorageError(e.to_string()))?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CoreError::StorageError(e.to_string()))
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, CoreError> {
        self.pool.begin().await.map_err(CoreError::from)
    }
}
