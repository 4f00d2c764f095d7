//! Branch registry repository.

use bookstore_common::{
    error::{BookstoreError, BookstoreResult},
    models::branch::{Branch, CreateBranchRequest, UpdateBranchRequest},
};
use sqlx::PgPool;
use uuid::Uuid;

/// Register a new branch.
pub async fn create_branch(
    pool: &PgPool,
    id: Uuid,
    req: &CreateBranchRequest,
) -> Result<Branch, sqlx::Error> {
    sqlx::query_as::<_, Branch>(
        r#"
        INSERT INTO branches (id, name, code, db_name, address, city, phone, is_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.code)
    .bind(&req.db_name)
    .bind(&req.address)
    .bind(&req.city)
    .bind(&req.phone)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Branch>, sqlx::Error> {
    sqlx::query_as::<_, Branch>("SELECT * FROM branches WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Branch>, sqlx::Error> {
    sqlx::query_as::<_, Branch>("SELECT * FROM branches WHERE code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await
}

/// Update branch fields. `None` leaves a column unchanged.
pub async fn update_branch(
    pool: &PgPool,
    id: Uuid,
    req: &UpdateBranchRequest,
) -> Result<Option<Branch>, sqlx::Error> {
    sqlx::query_as::<_, Branch>(
        r#"
        UPDATE branches SET
            name      = COALESCE($2, name),
            db_name   = COALESCE($3, db_name),
            address   = COALESCE($4, address),
            city      = COALESCE($5, city),
            phone     = COALESCE($6, phone),
            is_active = COALESCE($7, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.db_name)
    .bind(&req.address)
    .bind(&req.city)
    .bind(&req.phone)
    .bind(req.is_active)
    .fetch_optional(pool)
    .await
}

/// Delete a branch. Branch-scoped rows cascade; staff accounts block the delete.
pub async fn delete_branch(pool: &PgPool, id: Uuid) -> BookstoreResult<bool> {
    let result = sqlx::query("DELETE FROM branches WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                BookstoreError::validation("Branch still has staff accounts")
            }
            _ => e.into(),
        })?;
    Ok(result.rows_affected() > 0)
}
