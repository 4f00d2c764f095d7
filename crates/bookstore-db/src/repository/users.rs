//! Staff account repository.

use bookstore_common::{
    models::user::{UpdateUserRequest, User},
    permissions::Role,
};
use sqlx::PgPool;
use uuid::Uuid;

/// Create a new staff account.
pub async fn create_user(
    pool: &PgPool,
    id: Uuid,
    name: &str,
    email: &str,
    password_hash: &str,
    role: Role,
    branch_id: Option<Uuid>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, name, email, password_hash, role, branch_id, is_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, TRUE, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .bind(branch_id)
    .fetch_one(pool)
    .await
}

/// Find a user by their unique ID.
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Find a user by email (case-insensitive).
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Update profile and access fields. `None` leaves name, email, role and
/// `is_active` unchanged; `branch_id` is always written, so the caller passes the
/// branch the account ends up with (`None` for super admins).
pub async fn update_user(
    pool: &PgPool,
    id: Uuid,
    req: &UpdateUserRequest,
    branch_id: Option<Uuid>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            name      = COALESCE($2, name),
            email     = COALESCE($3, email),
            role      = COALESCE($4, role),
            branch_id = $5,
            is_active = COALESCE($6, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.email)
    .bind(req.role)
    .bind(branch_id)
    .bind(req.is_active)
    .fetch_optional(pool)
    .await
}

pub async fn update_password(
    pool: &PgPool,
    id: Uuid,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_user(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
