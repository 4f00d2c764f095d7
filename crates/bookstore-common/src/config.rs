//! Application configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables for production.
//! Config precedence: legacy plain env vars > `BOOKSTORE__*` env vars > config.toml > defaults

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use serde::Deserialize;

/// Plain environment variables understood for compatibility with older deployments,
/// mapped to their config keys.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("DATABASE_URI", "database.uri"),
    ("JWT_SECRET", "auth.jwt_secret"),
    ("JWT_COOKIE_EXPIRE", "auth.cookie_expire_days"),
    ("PORT", "server.port"),
    ("CLIENT_URL", "server.client_url"),
];

/// Longest accepted token lifetime: ten years.
pub const MAX_TOKEN_LIFETIME_SECS: u64 = 3_650 * 86_400;

/// Longest accepted session cookie lifetime.
pub const MAX_COOKIE_LIFETIME_DAYS: i64 = 3_650;

/// Initialize the application configuration from the process environment.
///
/// Should be called once at application startup. Fails when the database URI or the
/// JWT secret is missing.
pub fn init() -> Result<AppConfig, ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let builder = defaults()?
        // Optional config file
        .add_source(config::File::with_name("config").required(false))
        // Environment variables (BOOKSTORE__SERVER__PORT, BOOKSTORE__DATABASE__URI, etc.)
        .add_source(
            config::Environment::with_prefix("BOOKSTORE")
                .separator("__")
                .try_parsing(true),
        );

    let builder = apply_legacy_env(builder, |name| std::env::var(name).ok())?;
    AppConfig::from_builder(builder)
}

/// Builder pre-populated with every default value.
pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5000)?
        .set_default("server.production", false)?
        .set_default("server.client_url", "http://localhost:3000")?
        .set_default("database.uri", "")?
        .set_default("database.max_connections", 20)?
        .set_default("database.min_connections", 2)?
        .set_default("auth.jwt_secret", "")?
        .set_default("auth.jwt_expire_secs", 7_776_000)? // 90 days
        .set_default("auth.cookie_expire_days", 90)?
        .set_default("limits.max_page_size", 1000)?
        .set_default("limits.low_stock_threshold", 10)
}

/// Layer the legacy plain environment variables on top of `builder`.
///
/// `JWT_EXPIRE` accepts a duration such as `90d`, `12h` or a bare number of seconds.
pub fn apply_legacy_env<F>(
    mut builder: ConfigBuilder<DefaultState>,
    lookup: F,
) -> Result<ConfigBuilder<DefaultState>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for (var, key) in LEGACY_ENV {
        builder = builder.set_override_option(*key, lookup(var))?;
    }

    if let Some(raw) = lookup("JWT_EXPIRE") {
        let secs = parse_duration_secs(&raw).ok_or_else(|| {
            ConfigError::Message(format!("JWT_EXPIRE has an invalid duration: {raw}"))
        })?;
        builder = builder.set_override("auth.jwt_expire_secs", secs)?;
    }

    Ok(builder)
}

/// Parse `30`, `30s`, `15m`, `12h` or `90d` into seconds.
pub fn parse_duration_secs(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => raw.split_at(idx),
        None => (raw, "s"),
    };
    let value: u64 = digits.parse().ok()?;
    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        _ => return None,
    };
    value.checked_mul(multiplier)
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub limits: LimitsConfig,
}

impl AppConfig {
    /// Build and validate the final configuration.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let app_config: AppConfig = builder.build()?.try_deserialize()?;

        if app_config.database.uri.trim().is_empty() {
            return Err(ConfigError::Message(
                "DATABASE_URI is not set; refusing to start without a database".into(),
            ));
        }
        if app_config.auth.jwt_secret.is_empty() {
            return Err(ConfigError::Message("JWT_SECRET is not set".into()));
        }
        if !(1..=MAX_TOKEN_LIFETIME_SECS).contains(&app_config.auth.jwt_expire_secs) {
            return Err(ConfigError::Message(format!(
                "JWT_EXPIRE must be between 1 second and {} days",
                MAX_TOKEN_LIFETIME_SECS / 86_400
            )));
        }
        if !(1..=MAX_COOKIE_LIFETIME_DAYS).contains(&app_config.auth.cookie_expire_days) {
            return Err(ConfigError::Message(format!(
                "JWT_COOKIE_EXPIRE must be between 1 and {MAX_COOKIE_LIFETIME_DAYS} days"
            )));
        }

        Ok(app_config)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Marks session cookies `Secure`.
    pub production: bool,
    /// Origin of the frontend, allowed by CORS with credentials.
    pub client_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URI of the central database. Branch databases are
    /// derived from it by swapping the database name.
    pub uri: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// JWT signing secret (HS256)
    pub jwt_secret: String,
    /// Token lifetime in seconds
    pub jwt_expire_secs: u64,
    /// Session cookie lifetime in days
    pub cookie_expire_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    /// Upper bound for the `limit` query parameter.
    pub max_page_size: u64,
    /// Stock level under which a book or item counts as low stock.
    pub low_stock_threshold: i32,
}
