//! Summary routes: row counts for dashboard cards.

use axum::{
    extract::{Extension, Path, State},
    middleware,
    routing::get,
    Json, Router,
};
use bookstore_common::{
    error::{BookstoreError, BookstoreResult},
    permissions::Permissions,
};
use bookstore_db::{repository::documents, schema};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{middleware::AuthContext, AppState};

/// Summary routes (all require authentication).
pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/summary/counts", get(all_counts))
        .route("/summary/{resource}", get(resource_count))
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::auth_middleware,
        ))
}

#[derive(Serialize)]
struct CountsResponse {
    status: &'static str,
    counts: BTreeMap<&'static str, i64>,
}

#[derive(Serialize)]
struct CountResponse {
    status: &'static str,
    resource: String,
    count: i64,
}

/// GET /api/v1/summary/counts
///
/// Every resource, in the caller's scope.
async fn all_counts(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
) -> BookstoreResult<Json<CountsResponse>> {
    auth.require(Permissions::VIEW_CATALOG)?;

    let scope = auth.scope();
    let mut counts = BTreeMap::new();
    for (name, schema) in schema::RESOURCES {
        counts.insert(*name, documents::count(&state.db.pool, schema, scope).await?);
    }

    Ok(Json(CountsResponse {
        status: "success",
        counts,
    }))
}

/// GET /api/v1/summary/:resource
async fn resource_count(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(resource): Path<String>,
) -> BookstoreResult<Json<CountResponse>> {
    auth.require(Permissions::VIEW_CATALOG)?;

    let schema = schema::resource_by_name(&resource)
        .ok_or_else(|| BookstoreError::not_found(format!("Resource '{resource}'")))?;
    let count = documents::count(&state.db.pool, schema, auth.scope()).await?;

    Ok(Json(CountResponse {
        status: "success",
        resource,
        count,
    }))
}
