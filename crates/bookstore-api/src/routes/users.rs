//! Staff routes: super admins manage every account.

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
    models::user::{CreateUserRequest, UpdateUserRequest, UserResponse},
    permissions::{Permissions, Role},
    validation::validate_request,
};
use bookstore_db::{
    repository::{branches, users},
    schema,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth,
    middleware::AuthContext,
    routes::catalog::{list_documents, ListResponse},
    AppState,
};

/// Staff routes (all require authentication and MANAGE_STAFF).
pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{user_id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::auth_middleware,
        ))
}

#[derive(Serialize)]
struct UserEnvelope {
    status: &'static str,
    data: UserResponse,
}

/// Branch roles need a branch; super admins never carry one.
fn branch_for_role(role: Role, branch_id: Option<Uuid>) -> BookstoreResult<Option<Uuid>> {
    if !role.requires_branch() {
        return Ok(None);
    }
    branch_id
        .map(Some)
        .ok_or_else(|| BookstoreError::validation(format!("branch_id is required for role {role}")))
}

/// [`branch_for_role`], plus the branch has to exist.
async fn resolve_branch(
    state: &AppState,
    role: Role,
    branch_id: Option<Uuid>,
) -> BookstoreResult<Option<Uuid>> {
    let branch_id = branch_for_role(role, branch_id)?;
    if let Some(id) = branch_id {
        if branches::find_by_id(&state.db.pool, id).await?.is_none() {
            return Err(BookstoreError::not_found("Branch"));
        }
    }
    Ok(branch_id)
}

/// GET /api/v1/users
async fn list_users(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> BookstoreResult<Json<ListResponse>> {
    auth.require(Permissions::MANAGE_STAFF)?;
    Ok(Json(list_documents(&state, &auth, &schema::USERS, params).await?))
}

/// POST /api/v1/users
async fn create_user(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateUserRequest>,
) -> BookstoreResult<(StatusCode, Json<UserEnvelope>)> {
    auth.require(Permissions::MANAGE_STAFF)?;
    validate_request(&body)?;

    if users::find_by_email(&state.db.pool, &body.email)
        .await?
        .is_some()
    {
        return Err(BookstoreError::AlreadyExists {
            resource: "Email".into(),
        });
    }

    let branch_id = resolve_branch(&state, body.role, body.branch_id).await?;

    let password_hash = auth::hash_password(&body.password)
        .map_err(|e| BookstoreError::Internal(anyhow::anyhow!("{e}")))?;

    let user = users::create_user(
        &state.db.pool,
        ids::generate_id(),
        &body.name,
        &body.email,
        &password_hash,
        body.role,
        branch_id,
    )
    .await?;

    tracing::info!(user_id = %user.id, role = %user.role, created_by = %auth.user_id, "Staff account created");

    Ok((
        StatusCode::CREATED,
        Json(UserEnvelope {
            status: "success",
            data: user.into(),
        }),
    ))
}

/// GET /api/v1/users/:user_id
async fn get_user(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> BookstoreResult<Json<UserEnvelope>> {
    auth.require(Permissions::MANAGE_STAFF)?;

    let user = users::find_by_id(&state.db.pool, user_id)
        .await?
        .ok_or_else(|| BookstoreError::not_found("User"))?;

    Ok(Json(UserEnvelope {
        status: "success",
        data: user.into(),
    }))
}

/// PATCH /api/v1/users/:user_id
async fn update_user(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> BookstoreResult<Json<UserEnvelope>> {
    auth.require(Permissions::MANAGE_STAFF)?;
    validate_request(&body)?;

    if user_id == auth.user_id && (body.is_active == Some(false) || body.role.is_some()) {
        return Err(BookstoreError::validation(
            "You cannot change your own role or deactivate yourself",
        ));
    }

    if let Some(ref email) = body.email {
        if let Some(existing) = users::find_by_email(&state.db.pool, email).await? {
            if existing.id != user_id {
                return Err(BookstoreError::AlreadyExists {
                    resource: "Email".into(),
                });
            }
        }
    }

    let current = users::find_by_id(&state.db.pool, user_id)
        .await?
        .ok_or_else(|| BookstoreError::not_found("User"))?;

    let branch_id = if body.role.is_some() || body.branch_id.is_some() {
        let role = body.role.unwrap_or(current.role);
        resolve_branch(&state, role, body.branch_id.or(current.branch_id)).await?
    } else {
        current.branch_id
    };

    let user = users::update_user(&state.db.pool, user_id, &body, branch_id)
        .await?
        .ok_or_else(|| BookstoreError::not_found("User"))?;

    Ok(Json(UserEnvelope {
        status: "success",
        data: user.into(),
    }))
}

/// DELETE /api/v1/users/:user_id
async fn delete_user(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> BookstoreResult<StatusCode> {
    auth.require(Permissions::MANAGE_STAFF)?;

    if user_id == auth.user_id {
        return Err(BookstoreError::validation("You cannot delete your own account"));
    }
    if !users::delete_user(&state.db.pool, user_id).await? {
        return Err(BookstoreError::not_found("User"));
    }

    tracing::info!(%user_id, deleted_by = %auth.user_id, "Staff account deleted");
    Ok(StatusCode::NO_CONTENT)
}
