//! REST + SSE surface
//!
//! ## Endpoints
//!
//! - `GET    /api/health`                        - Liveness and version
//! - `POST   /api/clients`                       - Register a browser connection
//! - `DELETE /api/clients/:id`                   - Disconnect hook
//! - `GET    /api/clients/:id/events`            - Render + SSE stream of view events
//! - `POST   /api/clients/:id/filter`            - Set one filter field
//! - `POST   /api/clients/:id/filter/toggle`     - Toggle the filter panel
//! - `POST   /api/clients/:id/execute`           - Run the guided query
//! - `POST   /api/clients/:id/quick/:action`     - Quick action
//! - `POST   /api/clients/:id/chat`              - Free-text query
//! - `GET    /api/clients/:id/report/download`   - Last generated report
//! - `GET    /api/options`                       - Selectable filter options
//! - `GET    /api/dashboard[/:cmp_num]`          - Dashboard projection

mod client_routes;
mod dashboard_routes;

use std::sync::Arc;

use axum::{http::StatusCode, routing::get, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::collaborator::MetricsSource;
use crate::error::EsgError;
use crate::page::PageController;

// ── State ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<PageController>,
    pub metrics: Arc<dyn MetricsSource>,
    /// Company used by `/api/dashboard` without a path argument
    pub default_company: String,
    pub version: String,
}

impl AppState {
    pub fn new(
        controller: Arc<PageController>,
        metrics: Arc<dyn MetricsSource>,
        default_company: impl Into<String>,
    ) -> Self {
        Self {
            controller,
            metrics,
            default_company: default_company.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// ── Response Types ───────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

pub(crate) type ApiError = (StatusCode, Json<ApiResponse<()>>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ApiResponse::err(message)))
}

impl From<EsgError> for (StatusCode, Json<ApiResponse<()>>) {
    fn from(e: EsgError) -> Self {
        let status = match &e {
            EsgError::UnknownClient(_) | EsgError::DownloadUnavailable(_) => StatusCode::NOT_FOUND,
            EsgError::UserInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %e, "request failed");
        }
        api_error(status, e.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthInfo {
    pub status: String,
    pub version: String,
}

// ── Router ───────────────────────────────────────────────────

/// All routes with state applied; middleware is added by the binary
pub fn create_esg_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/clients", post(client_routes::connect))
        .route("/api/clients/:id", axum::routing::delete(client_routes::disconnect))
        .route("/api/clients/:id/events", get(client_routes::events))
        .route("/api/clients/:id/filter", post(client_routes::set_filter))
        .route("/api/clients/:id/filter/toggle", post(client_routes::toggle_filter))
        .route("/api/clients/:id/execute", post(client_routes::execute))
        .route("/api/clients/:id/quick/:action", post(client_routes::quick_action))
        .route("/api/clients/:id/chat", post(client_routes::chat))
        .route("/api/clients/:id/report/download", get(client_routes::download))
        .route("/api/options", get(dashboard_routes::options))
        .route("/api/dashboard", get(dashboard_routes::default_dashboard))
        .route("/api/dashboard/:cmp_num", get(dashboard_routes::company_dashboard))
        .with_state(state)
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<ApiResponse<HealthInfo>> {
    Json(ApiResponse::ok(HealthInfo {
        status: "ok".to_string(),
        version: state.version.clone(),
    }))
}
