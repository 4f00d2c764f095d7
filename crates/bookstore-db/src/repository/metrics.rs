//! Dashboard aggregates.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// Stock and customer figures for one branch.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BranchMetrics {
    pub branch_id: Uuid,
    pub branch_name: String,
    pub branch_code: String,
    pub customers: i64,
    pub books: i64,
    pub stationery_items: i64,
    /// Units on hand across books and stationery
    pub stock_units: i64,
    /// Σ price × stock across books and stationery
    pub stock_value: f64,
    /// Books and items below the low-stock threshold
    pub low_stock: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Totals {
    pub branches: i64,
    pub users: i64,
    pub customers: i64,
    pub books: i64,
    pub stationery_items: i64,
    pub stock_units: i64,
    pub stock_value: f64,
    pub low_stock: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardMetrics {
    pub totals: Totals,
    pub branches: Vec<BranchMetrics>,
}

impl DashboardMetrics {
    pub fn from_branches(branches: Vec<BranchMetrics>, users: i64) -> Self {
        let totals = branches.iter().fold(
            Totals {
                branches: branches.len() as i64,
                users,
                customers: 0,
                books: 0,
                stationery_items: 0,
                stock_units: 0,
                stock_value: 0.0,
                low_stock: 0,
            },
            |mut acc, b| {
                acc.customers += b.customers;
                acc.books += b.books;
                acc.stationery_items += b.stationery_items;
                acc.stock_units += b.stock_units;
                acc.stock_value += b.stock_value;
                acc.low_stock += b.low_stock;
                acc
            },
        );
        Self { totals, branches }
    }
}

/// Per-branch figures; `only` restricts the result to one branch.
pub async fn branch_metrics(
    pool: &PgPool,
    only: Option<Uuid>,
    low_stock_threshold: i32,
) -> Result<Vec<BranchMetrics>, sqlx::Error> {
    sqlx::query_as::<_, BranchMetrics>(
        r#"
        SELECT
            b.id   AS branch_id,
            b.name AS branch_name,
            b.code AS branch_code,
            (SELECT COUNT(*) FROM customers c WHERE c.branch_id = b.id) AS customers,
            (SELECT COUNT(*) FROM books k WHERE k.branch_id = b.id) AS books,
            (SELECT COUNT(*) FROM stationery_items s WHERE s.branch_id = b.id) AS stationery_items,
            (
                (SELECT COALESCE(SUM(stock), 0) FROM books k WHERE k.branch_id = b.id)
              + (SELECT COALESCE(SUM(stock), 0) FROM stationery_items s WHERE s.branch_id = b.id)
            )::BIGINT AS stock_units,
            (
                (SELECT COALESCE(SUM(price * stock), 0) FROM books k WHERE k.branch_id = b.id)
              + (SELECT COALESCE(SUM(price * stock), 0) FROM stationery_items s WHERE s.branch_id = b.id)
            )::DOUBLE PRECISION AS stock_value,
            (
                (SELECT COUNT(*) FROM books k WHERE k.branch_id = b.id AND k.stock < $2)
              + (SELECT COUNT(*) FROM stationery_items s WHERE s.branch_id = b.id AND s.stock < $2)
            ) AS low_stock
        FROM branches b
        WHERE ($1::uuid IS NULL OR b.id = $1)
        ORDER BY b.name
        "#,
    )
    .bind(only)
    .bind(low_stock_threshold)
    .fetch_all(pool)
    .await
}

/// Staff accounts, optionally of one branch.
pub async fn count_users(pool: &PgPool, only: Option<Uuid>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE ($1::uuid IS NULL OR branch_id = $1)")
        .bind(only)
        .fetch_one(pool)
        .await
}

/// Everything the dashboard shows, in two round trips.
pub async fn dashboard(
    pool: &PgPool,
    only: Option<Uuid>,
    low_stock_threshold: i32,
) -> Result<DashboardMetrics, sqlx::Error> {
    let branches = branch_metrics(pool, only, low_stock_threshold).await?;
    let users = count_users(pool, only).await?;
    Ok(DashboardMetrics::from_branches(branches, users))
}
