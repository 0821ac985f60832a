//! Reporting endpoints

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;

use super::AuthenticatedUser;

/// Dashboard counters
#[derive(Serialize, ToSchema)]
pub struct DashboardSummary {
    /// Number of catalogued titles
    pub total_books: i64,
    /// Copies owned by the library, shelved plus lent out
    pub total_copies: i64,
    /// Copies currently on the shelf
    pub available_copies: i64,
    /// Number of registered member accounts
    pub registered_users: i64,
    /// Loans currently out and not yet due
    pub active_loans: i64,
    /// Loans past their due date
    pub overdue_loans: i64,
    /// Borrow requests waiting for approval
    pub waiting_requests: i64,
}

/// Issuances of one calendar month
#[derive(Serialize, ToSchema)]
pub struct MonthlyTrend {
    /// Month label, `YYYY-MM`
    pub month: String,
    /// Loans issued in this month
    pub issued: i64,
}

/// Get the dashboard counters
#[utoipa::path(
    get,
    path = "/reports/dashboard",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard counters", body = DashboardSummary),
        (status = 403, description = "Staff only")
    )
)]
pub async fn get_dashboard(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<DashboardSummary>> {
    claims.require_staff()?;

    let summary = state.services.reports.dashboard().await?;
    Ok(Json(summary))
}

/// Get monthly issuance counts for the trailing twelve months
#[utoipa::path(
    get,
    path = "/reports/trends",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Monthly issuance counts, oldest month first", body = Vec<MonthlyTrend>),
        (status = 403, description = "Staff only")
    )
)]
pub async fn get_trends(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<MonthlyTrend>>> {
    claims.require_staff()?;

    let trends = state.services.reports.monthly_trends().await?;
    Ok(Json(trends))
}
