//! Middleware: session authentication and security headers.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use bookstore_common::{
    auth,
    error::BookstoreError,
    permissions::{Permissions, Role},
};
use bookstore_db::{listing::Scope, repository::users};
use uuid::Uuid;

use crate::{auth::SESSION_COOKIE, AppState};

/// The authenticated staff member, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Role,
    pub branch_id: Option<Uuid>,
}

impl AuthContext {
    pub fn permissions(&self) -> Permissions {
        self.role.permissions()
    }

    /// Fail with 403 unless the caller holds every bit of `required`.
    pub fn require(&self, required: Permissions) -> Result<(), BookstoreError> {
        let perms = self.permissions();
        if perms.has(required) {
            Ok(())
        } else {
            Err(BookstoreError::MissingPermission {
                permission: perms.missing_name(required),
            })
        }
    }

    /// Rows this caller may see on branch-scoped tables.
    pub fn scope(&self) -> Scope {
        if self.permissions().has(Permissions::VIEW_ALL_BRANCHES) {
            Scope::ALL
        } else {
            // A branch role without a branch sees nothing
            Scope::branch(self.branch_id.unwrap_or(Uuid::nil()))
        }
    }
}

/// Session token from `Authorization: Bearer <token>`, else from the `token` cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

/// Validate the session token and load the user behind it.
///
/// Role and branch come from the database, not the token, so a deactivated or
/// re-assigned account takes effect on its next request.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, BookstoreError> {
    let token = extract_token(request.headers()).ok_or(BookstoreError::Unauthorized)?;

    let claims = auth::validate_token(&token, &state.config.auth.jwt_secret)
        .map_err(|_| BookstoreError::InvalidToken)?;

    let user_id = claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| BookstoreError::InvalidToken)?;

    let user = users::find_by_id(&state.db.pool, user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or(BookstoreError::InvalidToken)?;

    request.extensions_mut().insert(AuthContext {
        user_id: user.id,
        role: user.role,
        branch_id: user.branch_id,
    });

    Ok(next.run(request).await)
}

// ── Security headers ──────────────────────────────────────────────────────────

/// Add security headers to every HTTP response.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let h = response.headers_mut();

    macro_rules! set {
        ($name:expr, $val:expr) => {
            if let Ok(v) = $val.parse::<axum::http::HeaderValue>() {
                h.insert(axum::http::header::HeaderName::from_static($name), v);
            }
        };
    }

    set!("x-content-type-options", "nosniff");
    set!("x-frame-options", "DENY");
    set!("referrer-policy", "strict-origin-when-cross-origin");
    set!("content-security-policy", "default-src 'none'; frame-ancestors 'none'");

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        headers.insert(header::COOKIE, HeaderValue::from_static("token=from-cookie"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=abc.def.ghi"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn test_scope_follows_role() {
        let branch = Uuid::now_v7();
        let admin = AuthContext {
            user_id: Uuid::now_v7(),
            role: Role::SuperAdmin,
            branch_id: None,
        };
        assert_eq!(admin.scope(), Scope::ALL);

        let manager = AuthContext {
            user_id: Uuid::now_v7(),
            role: Role::StockManager,
            branch_id: Some(branch),
        };
        assert_eq!(manager.scope(), Scope::branch(branch));
        assert!(manager.require(Permissions::MANAGE_STOCK).is_ok());
        assert!(matches!(
            manager.require(Permissions::MANAGE_BRANCHES),
            Err(BookstoreError::MissingPermission { .. })
        ));
    }
}
