//! # Bookstore Server
//!
//! Main binary for the bookstore backend:
//! - `serve` (default): run migrations, then the REST API
//! - `create-admin`: seed a super admin account so the first login is possible

use bookstore_api::{auth, build_router, AppState};
use bookstore_common::{
    config::AppConfig, ids, models::user::CreateUserRequest, permissions::Role,
    validation::validate_request,
};
use bookstore_db::{repository::users, Database};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;

#[derive(Parser)]
#[command(name = "bookstore", version, about = "Multi-branch bookstore management backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Create a super admin account
    CreateAdmin {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "BOOKSTORE_ADMIN_PASSWORD")]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = bookstore_common::config::init()?;

    // Initialize tracing (structured logging)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookstore=debug,tower_http=debug".into()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    // Connect to the central database; nothing works without it
    let db = match Database::connect(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Database connection failed: {e}");
            std::process::exit(1);
        }
    };

    // Run migrations
    db.migrate().await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(db, config).await,
        Command::CreateAdmin {
            name,
            email,
            password,
        } => create_admin(&db, name, email, password).await,
    }
}

async fn serve(db: Database, config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting bookstore v{}", env!("CARGO_PKG_VERSION"));

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let production = config.server.production;
    let router = build_router(AppState::new(db, config));

    tracing::info!(production, "REST API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn create_admin(
    db: &Database,
    name: String,
    email: String,
    password: String,
) -> anyhow::Result<()> {
    let request = CreateUserRequest {
        name,
        email,
        password,
        role: Role::SuperAdmin,
        branch_id: None,
    };
    validate_request(&request)?;

    if users::find_by_email(&db.pool, &request.email).await?.is_some() {
        anyhow::bail!("A user with email {} already exists", request.email);
    }

    let password_hash =
        auth::hash_password(&request.password).map_err(|e| anyhow::anyhow!("{e}"))?;
    let user = users::create_user(
        &db.pool,
        ids::generate_id(),
        &request.name,
        &request.email,
        &password_hash,
        request.role,
        request.branch_id,
    )
    .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "Super admin created");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
