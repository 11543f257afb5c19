//! Admin audit log endpoints

use axum::extract::{rejection::QueryRejection, Query, State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::response::ApiResponse;
use crate::audit::{retention_cutoff, AuditPage, AuditQuery, AuditStats, SharedAuditStore};
use crate::auth::RequireAdmin;
use crate::error::{AppError, ServerResult};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct CleanupParams {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CleanupResult {
    pub deleted_count: u64,
    pub message: String,
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> ServerResult<T> {
    query
        .map(|Query(params)| params)
        .map_err(|e| AppError::BadRequest(format!("Invalid query parameters: {}", e.body_text())))
}

/// `GET /api/audit-logs`
pub async fn list_audit_logs(
    RequireAdmin(_): RequireAdmin,
    State(store): State<SharedAuditStore>,
    query: Result<Query<AuditQuery>, QueryRejection>,
) -> ServerResult<ApiResponse<AuditPage>> {
    let query = query_params(query)?;
    let page = store.list(query).await?;
    Ok(ApiResponse::success(page))
}

/// `GET /api/audit-logs/stats`
pub async fn audit_stats(
    RequireAdmin(_): RequireAdmin,
    State(store): State<SharedAuditStore>,
) -> ServerResult<ApiResponse<AuditStats>> {
    let stats = store.stats(Utc::now()).await?;
    Ok(ApiResponse::success(stats))
}

/// `GET /api/audit-logs/actions`
pub async fn audit_actions(
    RequireAdmin(_): RequireAdmin,
    State(store): State<SharedAuditStore>,
) -> ServerResult<ApiResponse<Vec<String>>> {
    let actions = store.distinct_actions().await?;
    Ok(ApiResponse::success(actions))
}

/// `DELETE /api/audit-logs/cleanup?days=N`
pub async fn cleanup_audit_logs(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    params: Result<Query<CleanupParams>, QueryRejection>,
) -> ServerResult<ApiResponse<CleanupResult>> {
    let days = query_params(params)?.days.unwrap_or(state.retention_days);
    if days == 0 {
        return Err(AppError::BadRequest("days must be at least 1".to_string()));
    }

    let cutoff = retention_cutoff(Utc::now(), days)
        .ok_or_else(|| AppError::BadRequest(format!("days is out of range: {}", days)))?;
    let deleted_count = state.store.purge_older_than(cutoff).await?;

    info!(admin = %admin.id, days, deleted_count, "Purged old audit logs");

    Ok(ApiResponse::success(CleanupResult {
        deleted_count,
        message: format!("Deleted {} logs older than {} days", deleted_count, days),
    }))
}
