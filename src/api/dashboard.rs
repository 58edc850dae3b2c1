use axum::{Json, extract::State};

use super::gate;
use crate::auth::AuthUser;
use crate::domain::DomainError;
use crate::domain::policy::{Action, Resource};
use crate::infrastructure::AppState;
use crate::services::local_now;
use crate::services::report_service::{self, DashboardStats};

#[utoipa::path(
    get,
    path = "/api/dashboard/stats/",
    responses(
        (status = 200, description = "Booking, order and revenue snapshot"),
        (status = 403, description = "Caller is not staff")
    ),
    security(("bearer" = []))
)]
pub async fn stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<DashboardStats>, DomainError> {
    gate(Some(&user), Resource::Dashboard, Action::ViewStats)?;
    Ok(Json(
        report_service::dashboard_stats(state.db(), local_now()).await?,
    ))
}
