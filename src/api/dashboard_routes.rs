//! Read-only routes: dashboard projection and filter options

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResponse, AppState};
use crate::dashboard::{load_dashboard, Dashboard};
use crate::filter::{Category, Intent, Period};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionEntry {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOptions {
    pub intents: Vec<OptionEntry>,
    pub categories: Vec<OptionEntry>,
    pub periods: Vec<OptionEntry>,
}

impl FilterOptions {
    pub fn current() -> Self {
        Self {
            intents: Intent::selectable()
                .iter()
                .map(|i| entry(i.as_str(), i.label()))
                .collect(),
            categories: Category::all()
                .iter()
                .map(|c| entry(c.as_str(), c.label()))
                .collect(),
            periods: Period::all()
                .iter()
                .map(|p| entry(p.as_str(), p.report_label()))
                .collect(),
        }
    }
}

fn entry(value: &str, label: &str) -> OptionEntry {
    OptionEntry {
        value: value.to_string(),
        label: label.to_string(),
    }
}

/// GET /api/options
pub(super) async fn options() -> Json<ApiResponse<FilterOptions>> {
    Json(ApiResponse::ok(FilterOptions::current()))
}

/// GET /api/dashboard
pub(super) async fn default_dashboard(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Dashboard>>, ApiError> {
    let cmp_num = state.default_company.clone();
    dashboard_for(&state, &cmp_num).await
}

/// GET /api/dashboard/:cmp_num
pub(super) async fn company_dashboard(
    State(state): State<AppState>,
    Path(cmp_num): Path<String>,
) -> Result<Json<ApiResponse<Dashboard>>, ApiError> {
    dashboard_for(&state, &cmp_num).await
}

async fn dashboard_for(
    state: &AppState,
    cmp_num: &str,
) -> Result<Json<ApiResponse<Dashboard>>, ApiError> {
    let dashboard = load_dashboard(state.metrics.as_ref(), Some(cmp_num)).await?;
    if let Dashboard::CompanyNotFound { cmp_num } = &dashboard {
        tracing::debug!(%cmp_num, "dashboard requested for unknown company");
    }
    Ok(Json(ApiResponse::ok(dashboard)))
}
