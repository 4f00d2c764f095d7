//! # bookstore-db
//!
//! Database layer for the bookstore backend:
//! - **Central database**: branches, staff accounts and the catalog
//! - **Branch databases**: opened on demand through [`BranchRouter`]
//! - **Listing**: query-parameter driven list queries over typed column schemas

pub mod branch_router;
pub mod listing;
pub mod postgres;
pub mod repository;
pub mod schema;

use anyhow::Result;
use bookstore_common::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub use branch_router::BranchRouter;

/// Shared database state passed through Axum extractors.
#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
    pub branches: BranchRouter,
}

impl Database {
    /// Connect to the central database. Fails fast when it is unreachable.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        tracing::info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.uri)
            .await?;
        tracing::info!("Connected to PostgreSQL");

        Ok(Self {
            pool,
            branches: BranchRouter::new(&config.uri, config.max_connections),
        })
    }

    /// Build the pool without connecting; connections open on first query.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_lazy(&config.uri)?;
        Ok(Self {
            pool,
            branches: BranchRouter::new(&config.uri, config.max_connections),
        })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Migrations complete");
        Ok(())
    }
}
