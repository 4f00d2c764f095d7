//! Authentication routes: login, logout, current user, password change.

use axum::{
    extract::{Extension, State},
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use bookstore_common::{
    error::{BookstoreError, BookstoreResult},
    models::user::{ChangePasswordRequest, LoginRequest, UserResponse},
    validation::validate_request,
};
use bookstore_db::repository::users;
use serde::Serialize;
use std::sync::Arc;

use crate::{auth, middleware::AuthContext, AppState};

/// Auth router. Login and logout are public; the rest needs a session.
pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/auth/me", get(me))
        .route("/auth/password", patch(change_password))
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::auth_middleware,
        ));

    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .merge(protected)
}

#[derive(Serialize)]
struct LoginResponse {
    status: &'static str,
    token: String,
    user: UserResponse,
}

#[derive(Serialize)]
struct UserEnvelope {
    status: &'static str,
    user: UserResponse,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

/// POST /api/v1/auth/login
///
/// Check email + password, then issue the session token both in the body and
/// as an HTTP-only cookie.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> BookstoreResult<(CookieJar, Json<LoginResponse>)> {
    validate_request(&body)?;

    let Some(user) = users::find_by_email(&state.db.pool, &body.email).await? else {
        auth::verify_dummy_password(&body.password);
        return Err(BookstoreError::InvalidCredentials);
    };

    let valid = auth::verify_password(&body.password, &user.password_hash)
        .map_err(|_| BookstoreError::InvalidCredentials)?;
    if !valid {
        return Err(BookstoreError::InvalidCredentials);
    }

    if !user.is_active {
        return Err(BookstoreError::Forbidden);
    }

    let config = &state.config;
    let token = auth::generate_token(&user, &config.auth)?;
    let cookie = auth::session_cookie(token.clone(), &config.auth, config.server.production);

    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            status: "success",
            token,
            user: user.into(),
        }),
    ))
}

/// POST /api/v1/auth/logout
///
/// Clear the session cookie. Clients holding the token in storage drop it themselves.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Json<StatusResponse>) {
    (
        jar.add(auth::expired_cookie(state.config.server.production)),
        Json(StatusResponse { status: "success" }),
    )
}

/// GET /api/v1/auth/me
async fn me(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
) -> BookstoreResult<Json<UserEnvelope>> {
    let user = users::find_by_id(&state.db.pool, auth.user_id)
        .await?
        .ok_or_else(|| BookstoreError::not_found("User"))?;

    Ok(Json(UserEnvelope {
        status: "success",
        user: user.into(),
    }))
}

/// PATCH /api/v1/auth/password
///
/// Change the caller's password and hand out a fresh session.
async fn change_password(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<ChangePasswordRequest>,
) -> BookstoreResult<(CookieJar, Json<LoginResponse>)> {
    validate_request(&body)?;

    let user = users::find_by_id(&state.db.pool, auth.user_id)
        .await?
        .ok_or_else(|| BookstoreError::not_found("User"))?;

    let valid = auth::verify_password(&body.current_password, &user.password_hash)
        .map_err(|_| BookstoreError::InvalidCredentials)?;
    if !valid {
        return Err(BookstoreError::InvalidCredentials);
    }

    let password_hash = auth::hash_password(&body.new_password)
        .map_err(|e| BookstoreError::Internal(anyhow::anyhow!("{e}")))?;
    users::update_password(&state.db.pool, user.id, &password_hash).await?;

    let config = &state.config;
    let token = auth::generate_token(&user, &config.auth)?;
    let cookie = auth::session_cookie(token.clone(), &config.auth, config.server.production);

    tracing::info!(user_id = %user.id, "Password changed");

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            status: "success",
            token,
            user: user.into(),
        }),
    ))
}
