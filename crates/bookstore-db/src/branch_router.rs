//! Per-branch database routing.
//!
//! A branch with its own database lives on the same server as the central one;
//! only the database name differs. The router derives the branch URI by
//! swapping the path of the configured URI and keeps one pool per database.

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::sync::RwLock;
use url::Url;

/// Replace the database name in `base` with `db_name`, keeping credentials,
/// hosts and query options.
///
/// URIs the `url` crate cannot parse (multi-host lists such as
/// `postgres://a:5432,b:5432/db`) are rewritten by hand.
pub fn branch_database_uri(base: &str, db_name: &str) -> String {
    match Url::parse(base) {
        Ok(mut url) if !url.cannot_be_a_base() && url.has_host() => {
            url.set_path(&format!("/{db_name}"));
            url.to_string()
        }
        _ => rewrite_path(base, db_name),
    }
}

fn rewrite_path(base: &str, db_name: &str) -> String {
    let (without_query, query) = match base.find('?') {
        Some(idx) => base.split_at(idx),
        None => (base, ""),
    };
    let authority_start = without_query.find("://").map_or(0, |idx| idx + 3);
    let path_start = without_query[authority_start..]
        .find('/')
        .map_or(without_query.len(), |idx| authority_start + idx);

    format!("{}/{db_name}{query}", &without_query[..path_start])
}

/// Lazily opened, cached pools for branch databases.
#[derive(Clone)]
pub struct BranchRouter {
    base_uri: Arc<str>,
    max_connections: u32,
    pools: Arc<RwLock<HashMap<String, PgPool>>>,
}

impl BranchRouter {
    pub fn new(base_uri: &str, max_connections: u32) -> Self {
        Self {
            base_uri: Arc::from(base_uri),
            max_connections,
            pools: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn database_uri(&self, db_name: &str) -> String {
        branch_database_uri(&self.base_uri, db_name)
    }

    /// Pool for `db_name`, connecting on first use.
    pub async fn pool(&self, db_name: &str) -> Result<PgPool, sqlx::Error> {
        if let Some(pool) = self.pools.read().await.get(db_name) {
            return Ok(pool.clone());
        }

        tracing::info!(database = %db_name, "Connecting to branch database...");
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.database_uri(db_name))
            .await?;
        tracing::info!(database = %db_name, "Connected to branch database");

        // Another request may have connected meanwhile; keep the first pool.
        let mut pools = self.pools.write().await;
        Ok(pools.entry(db_name.to_string()).or_insert(pool).clone())
    }

    /// Names of the databases with an open pool.
    pub async fn connected(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pools.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrites_database_name() {
        assert_eq!(
            branch_database_uri("postgres://admin:pw@db.local:5432/central", "branch_north"),
            "postgres://admin:pw@db.local:5432/branch_north"
        );
    }

    #[test]
    fn test_keeps_query_options() {
        assert_eq!(
            branch_database_uri("postgres://db.local/central?sslmode=require", "branch_north"),
            "postgres://db.local/branch_north?sslmode=require"
        );
    }

    #[test]
    fn test_adds_missing_path() {
        assert_eq!(
            branch_database_uri("postgres://db.local:5432", "branch_north"),
            "postgres://db.local:5432/branch_north"
        );
    }

    #[test]
    fn test_multi_host_uri_uses_fallback() {
        assert_eq!(
            branch_database_uri(
                "postgres://u:p@h1:5432,h2:5432/central?target_session_attrs=read-write",
                "branch_south"
            ),
            "postgres://u:p@h1:5432,h2:5432/branch_south?target_session_attrs=read-write"
        );
    }

    #[test]
    fn test_fallback_without_scheme() {
        assert_eq!(rewrite_path("localhost:5432/central", "b1"), "localhost:5432/b1");
        assert_eq!(rewrite_path("localhost", "b1"), "localhost/b1");
    }

    #[tokio::test]
    async fn test_router_starts_empty() {
        let router = BranchRouter::new("postgres://localhost/central", 5);
        assert!(router.connected().await.is_empty());
        assert_eq!(router.database_uri("b1"), "postgres://localhost/b1");
    }
}
