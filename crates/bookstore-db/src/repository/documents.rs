//! Generic CRUD over any table described by a [`Schema`].
//!
//! Bodies arrive as JSON objects that have already passed request validation;
//! here every key is checked against the schema's writable columns and bound
//! with the column's type. Results are JSON documents in the listing shape.

use serde_json::{Map, Value};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use bookstore_common::error::{BookstoreError, BookstoreResult};

use crate::listing::Scope;
use crate::schema::{push_document, BindValue, Schema};

/// Typed `(column, value)` pairs for the writable keys of `fields`.
fn writable_values(
    schema: &Schema,
    fields: &Map<String, Value>,
) -> BookstoreResult<Vec<(&'static str, BindValue)>> {
    fields
        .iter()
        .map(|(key, value)| {
            let column = schema.column(key)?;
            if !column.writable {
                return Err(BookstoreError::validation(format!(
                    "Field '{key}' cannot be written"
                )));
            }
            Ok((column.name, BindValue::from_json(column, value)?))
        })
        .collect()
}

fn columns(schema: &Schema) -> Vec<&'static str> {
    schema.column_names().collect()
}

fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, schema: &Schema, scope: Scope) {
    if let Some((column, branch_id)) = scope.condition(schema) {
        qb.push(" AND ").push(column).push(" = ").push_bind(branch_id);
    }
}

// ============================================================
// Create
// ============================================================

pub fn insert_query(
    schema: &Schema,
    id: Uuid,
    fields: &Map<String, Value>,
) -> BookstoreResult<QueryBuilder<'static, Postgres>> {
    let values = writable_values(schema, fields)?;

    let mut qb = QueryBuilder::new("INSERT INTO ");
    qb.push(schema.table).push(" (id");
    for (name, _) in &values {
        qb.push(", ").push(*name);
    }
    qb.push(", created_at, updated_at) VALUES (").push_bind(id);
    for (_, value) in values {
        qb.push(", ");
        value.push(&mut qb);
    }
    qb.push(", NOW(), NOW()) RETURNING ");
    push_document(&mut qb, schema, &columns(schema));
    Ok(qb)
}

/// Insert a new row and return it as a document.
pub async fn insert(
    pool: &PgPool,
    schema: &Schema,
    id: Uuid,
    fields: &Map<String, Value>,
) -> BookstoreResult<Value> {
    let doc = insert_query(schema, id, fields)?
        .build_query_scalar()
        .fetch_one(pool)
        .await?;
    Ok(doc)
}

// ============================================================
// Read
// ============================================================

pub async fn find_by_id(
    pool: &PgPool,
    schema: &Schema,
    id: Uuid,
    scope: Scope,
) -> Result<Option<Value>, sqlx::Error> {
    let mut qb = QueryBuilder::new("SELECT ");
    push_document(&mut qb, schema, &columns(schema));
    qb.push(" FROM ").push(schema.table).push(" WHERE id = ").push_bind(id);
    push_scope(&mut qb, schema, scope);

    qb.build_query_scalar().fetch_optional(pool).await
}

/// Number of rows visible in `scope`.
pub async fn count(pool: &PgPool, schema: &Schema, scope: Scope) -> Result<i64, sqlx::Error> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ");
    qb.push(schema.table).push(" WHERE TRUE");
    push_scope(&mut qb, schema, scope);

    qb.build_query_scalar().fetch_one(pool).await
}

// ============================================================
// Update
// ============================================================

pub fn update_query(
    schema: &Schema,
    id: Uuid,
    fields: &Map<String, Value>,
    scope: Scope,
) -> BookstoreResult<QueryBuilder<'static, Postgres>> {
    let values = writable_values(schema, fields)?;

    let mut qb = QueryBuilder::new("UPDATE ");
    qb.push(schema.table).push(" SET ");
    for (name, value) in values {
        qb.push(name).push(" = ");
        value.push(&mut qb);
        qb.push(", ");
    }
    qb.push("updated_at = NOW() WHERE id = ").push_bind(id);
    push_scope(&mut qb, schema, scope);
    qb.push(" RETURNING ");
    push_document(&mut qb, schema, &columns(schema));
    Ok(qb)
}

/// Apply `fields` to one row. `None` when the row does not exist in `scope`.
pub async fn update(
    pool: &PgPool,
    schema: &Schema,
    id: Uuid,
    fields: &Map<String, Value>,
    scope: Scope,
) -> BookstoreResult<Option<Value>> {
    let doc = update_query(schema, id, fields, scope)?
        .build_query_scalar()
        .fetch_optional(pool)
        .await?;
    Ok(doc)
}

// ============================================================
// Delete
// ============================================================

/// Returns whether a row was deleted.
pub async fn delete(
    pool: &PgPool,
    schema: &Schema,
    id: Uuid,
    scope: Scope,
) -> Result<bool, sqlx::Error> {
    let mut qb = QueryBuilder::new("DELETE FROM ");
    qb.push(schema.table).push(" WHERE id = ").push_bind(id);
    push_scope(&mut qb, schema, scope);

    let result = qb.build().execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
