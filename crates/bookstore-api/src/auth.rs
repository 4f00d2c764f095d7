//! Authentication: password hashing, session tokens and the session cookie.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use bookstore_common::{
    auth::Claims,
    config::AuthConfig,
    error::{BookstoreError, BookstoreResult},
    models::user::User,
};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::LazyLock;

/// Name of the HTTP-only cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against an Argon2id hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash checked when a login names an unknown email, so both paths pay for one
/// Argon2 verification.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("no-such-account").ok());

/// Verify `password` against a throwaway hash. Always `false`.
pub fn verify_dummy_password(password: &str) -> bool {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
    false
}

/// Sign a session token for `user`. Fails instead of panicking when the configured
/// lifetime does not fit a timestamp.
pub fn generate_token(user: &User, config: &AuthConfig) -> BookstoreResult<String> {
    let now = Utc::now();
    let expires_at = i64::try_from(config.jwt_expire_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            BookstoreError::Internal(anyhow::anyhow!(
                "token lifetime of {}s is out of range",
                config.jwt_expire_secs
            ))
        })?;

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role,
        branch_id: user.branch_id,
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| BookstoreError::Internal(e.into()))
}

/// HTTP-only cookie holding `token`, valid for `cookie_expire_days`.
pub fn session_cookie(token: String, config: &AuthConfig, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(config.cookie_expire_days))
        .build()
}

/// Empty, already expired session cookie. Added (not removed) on logout so the
/// browser drops its copy even when the request carried no cookie.
pub fn expired_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookstore_common::{auth::validate_token, permissions::Role};
    use uuid::Uuid;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".into(),
            jwt_expire_secs: 3600,
            cookie_expire_days: 7,
        }
    }

    fn user(role: Role, branch_id: Option<Uuid>) -> User {
        User {
            id: Uuid::now_v7(),
            name: "Ayesha".into(),
            email: "ayesha@example.com".into(),
            password_hash: String::new(),
            role,
            branch_id,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_dummy_verification_does_real_work() {
        assert!(DUMMY_HASH.as_deref().is_some_and(|h| h.starts_with("$argon2id$")));
        assert!(!verify_dummy_password("no-such-account"));
        assert!(!verify_dummy_password("anything"));
    }

    #[test]
    fn test_token_carries_role_and_branch() {
        let branch = Uuid::now_v7();
        let user = user(Role::BranchAdmin, Some(branch));
        let token = generate_token(&user, &config()).unwrap();

        let claims = validate_token(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, Role::BranchAdmin);
        assert_eq!(claims.branch_id, Some(branch));
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_token_rejected_with_other_secret() {
        let token = generate_token(&user(Role::SuperAdmin, None), &config()).unwrap();
        assert!(validate_token(&token, "another-secret").is_err());
    }

    #[test]
    fn test_out_of_range_lifetime_is_an_error() {
        let mut cfg = config();
        cfg.jwt_expire_secs = 25_920_000_000_000;
        let err = generate_token(&user(Role::SuperAdmin, None), &cfg).unwrap_err();
        assert!(matches!(err, BookstoreError::Internal(_)));

        cfg.jwt_expire_secs = u64::MAX;
        assert!(generate_token(&user(Role::SuperAdmin, None), &cfg).is_err());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc".into(), &config(), true);
        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));
    }
}
