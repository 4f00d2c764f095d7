//! Branch routes: the branch registry and branch database probing.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use bookstore_common::{
    error::{BookstoreError, BookstoreResult},
    ids,
    models::branch::{Branch, CreateBranchRequest, UpdateBranchRequest},
    permissions::Permissions,
    validation::validate_request,
};
use bookstore_db::{postgres, repository::branches, schema};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    middleware::AuthContext,
    routes::catalog::{list_documents, ListResponse},
    AppState,
};

/// Branch routes (all require authentication).
pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/branches", get(list_branches).post(create_branch))
        .route(
            "/branches/{branch_id}",
            get(get_branch).patch(update_branch).delete(delete_branch),
        )
        .route("/branches/{branch_id}/database", get(check_database))
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::auth_middleware,
        ))
}

#[derive(Serialize)]
struct BranchResponse {
    status: &'static str,
    data: Branch,
}

#[derive(Serialize)]
struct DatabaseStatus {
    branch_id: Uuid,
    database: String,
    reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Load a branch the caller is allowed to see; other branches look like missing ones.
async fn visible_branch(
    state: &AppState,
    auth: &AuthContext,
    branch_id: Uuid,
) -> BookstoreResult<Branch> {
    let visible = auth.scope().branch_id.is_none_or(|own| own == branch_id);
    let branch = if visible {
        branches::find_by_id(&state.db.pool, branch_id).await?
    } else {
        None
    };
    branch.ok_or_else(|| BookstoreError::not_found("Branch"))
}

/// GET /api/v1/branches
///
/// Branch users only see their own branch.
async fn list_branches(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> BookstoreResult<Json<ListResponse>> {
    Ok(Json(
        list_documents(&state, &auth, &schema::BRANCHES, params).await?,
    ))
}

/// POST /api/v1/branches
async fn create_branch(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBranchRequest>,
) -> BookstoreResult<(StatusCode, Json<BranchResponse>)> {
    auth.require(Permissions::MANAGE_BRANCHES)?;
    validate_request(&body)?;

    if branches::find_by_code(&state.db.pool, &body.code)
        .await?
        .is_some()
    {
        return Err(BookstoreError::AlreadyExists {
            resource: "Branch code".into(),
        });
    }

    let branch = branches::create_branch(&state.db.pool, ids::generate_id(), &body).await?;

    tracing::info!(branch_id = %branch.id, code = %branch.code, "Branch created");

    Ok((
        StatusCode::CREATED,
        Json(BranchResponse {
            status: "success",
            data: branch,
        }),
    ))
}

/// GET /api/v1/branches/:branch_id
async fn get_branch(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(branch_id): Path<Uuid>,
) -> BookstoreResult<Json<BranchResponse>> {
    let branch = visible_branch(&state, &auth, branch_id).await?;
    Ok(Json(BranchResponse {
        status: "success",
        data: branch,
    }))
}

/// PATCH /api/v1/branches/:branch_id
async fn update_branch(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(branch_id): Path<Uuid>,
    Json(body): Json<UpdateBranchRequest>,
) -> BookstoreResult<Json<BranchResponse>> {
    auth.require(Permissions::MANAGE_BRANCHES)?;
    validate_request(&body)?;

    let branch = branches::update_branch(&state.db.pool, branch_id, &body)
        .await?
        .ok_or_else(|| BookstoreError::not_found("Branch"))?;

    Ok(Json(BranchResponse {
        status: "success",
        data: branch,
    }))
}

/// DELETE /api/v1/branches/:branch_id
async fn delete_branch(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(branch_id): Path<Uuid>,
) -> BookstoreResult<StatusCode> {
    auth.require(Permissions::MANAGE_BRANCHES)?;

    if !branches::delete_branch(&state.db.pool, branch_id).await? {
        return Err(BookstoreError::not_found("Branch"));
    }

    tracing::info!(%branch_id, user_id = %auth.user_id, "Branch deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/branches/:branch_id/database
///
/// Open (or reuse) the pool for the branch's own database and ping it.
async fn check_database(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(branch_id): Path<Uuid>,
) -> BookstoreResult<Json<DatabaseStatus>> {
    auth.require(Permissions::MANAGE_BRANCHES)?;

    let branch = visible_branch(&state, &auth, branch_id).await?;
    let database = branch.db_name.ok_or_else(|| {
        BookstoreError::validation("Branch has no dedicated database")
    })?;

    let (reachable, error) = match state.db.branches.pool(&database).await {
        Ok(pool) => (postgres::health_check(&pool).await, None),
        Err(e) => {
            tracing::warn!(%branch_id, database = %database, "Branch database unreachable: {e}");
            (false, Some("connection failed".to_string()))
        }
    };

    Ok(Json(DatabaseStatus {
        branch_id,
        database,
        reachable,
        error,
    }))
}
