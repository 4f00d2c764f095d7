//! Dashboard metrics: stock, value and customer figures per branch.

use axum::{extract::{Extension, State}, middleware, routing::get, Json, Router};
use bookstore_common::{error::BookstoreResult, permissions::Permissions};
use bookstore_db::repository::metrics::{self, DashboardMetrics};
use serde::Serialize;
use std::sync::Arc;

use crate::{middleware::AuthContext, AppState};

pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard/metrics", get(dashboard_metrics))
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::auth_middleware,
        ))
}

#[derive(Serialize)]
struct MetricsResponse {
    status: &'static str,
    low_stock_threshold: i32,
    #[serde(flatten)]
    metrics: DashboardMetrics,
}

/// GET /api/v1/dashboard/metrics
///
/// All branches for super admins, the own branch otherwise.
async fn dashboard_metrics(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
) -> BookstoreResult<Json<MetricsResponse>> {
    auth.require(Permissions::VIEW_CATALOG)?;

    let threshold = state.config.limits.low_stock_threshold;
    let metrics = metrics::dashboard(&state.db.pool, auth.scope().branch_id, threshold).await?;

    Ok(Json(MetricsResponse {
        status: "success",
        low_stock_threshold: threshold,
        metrics,
    }))
}
