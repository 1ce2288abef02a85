//! Database connection handling
//!
//! This module provides functionality to establish and manage database connections.

use std::time::Duration;

use sqlx::{
    mysql::MySqlPoolOptions, postgres::PgPoolOptions, sqlite::SqlitePoolOptions, MySql, Pool,
    Postgres, Sqlite,
};

use crate::config::{DatabaseConfig, Driver};
use crate::error::Result;

/// Enumeration of supported database pools
#[derive(Debug, Clone)]
pub enum DatabaseConnection {
    Postgres(Pool<Postgres>),
    MySql(Pool<MySql>),
    Sqlite(Pool<Sqlite>),
}

impl DatabaseConnection {
    /// Create a new database connection from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool_size = config.pool_size.unwrap_or(10);
        let timeout = Duration::from_secs(config.timeout_seconds.unwrap_or(30));

        tracing::debug!(driver = %config.driver, pool_size, "Connecting to database");

        let connection = match config.driver {
            Driver::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(timeout)
                    .connect(&config.url)
                    .await?;
                DatabaseConnection::Postgres(pool)
            }
            Driver::Mysql => {
                let pool = MySqlPoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(timeout)
                    .connect(&config.url)
                    .await?;
                DatabaseConnection::MySql(pool)
            }
            Driver::Sqlite => {
                let pool = SqlitePoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(timeout)
                    .connect(&config.url)
                    .await?;
                DatabaseConnection::Sqlite(pool)
            }
        };

        Ok(connection)
    }

    pub fn driver(&self) -> Driver {
        match self {
            DatabaseConnection::Postgres(_) => Driver::Postgres,
            DatabaseConnection::MySql(_) => Driver::Mysql,
            DatabaseConnection::Sqlite(_) => Driver::Sqlite,
        }
    }

    /// Round-trip a trivial query to prove the pool can serve requests
    pub async fn ping(&self) -> Result<()> {
        self.execute("SELECT 1").await
    }

    /// Execute a SQL statement
    pub async fn execute(&self, sql: &str) -> Result<()> {
        match self {
            DatabaseConnection::Postgres(pool) => {
                sqlx::query(sql).execute(pool).await?;
            }
            DatabaseConnection::MySql(pool) => {
                sqlx::query(sql).execute(pool).await?;
            }
            DatabaseConnection::Sqlite(pool) => {
                sqlx::query(sql).execute(pool).await?;
            }
        }
        Ok(())
    }

    /// Execute statements in order, stopping at the first failure
    pub async fn execute_batch<'a, I>(&self, statements: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a String>,
    {
        for statement in statements {
            tracing::trace!(sql = %statement, "Executing statement");
            self.execute(statement).await?;
        }
        Ok(())
    }
}
