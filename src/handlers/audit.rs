// src/handlers/audit.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::audit::{AuditLog, AuditQuery},
};

// GET /api/audit
#[utoipa::path(
    get,
    path = "/api/audit",
    tag = "Audit",
    responses(
        (status = 200, description = "Registros de auditoria, mais recentes primeiro", body = [AuditLog])
    ),
    params(AuditQuery)
)]
pub async fn query_audit_log(
    State(app_state): State<AppState>,
    Query(filter): Query<AuditQuery>,
) -> Result<impl IntoResponse, AppError> {
    let logs = app_state.audit_repo.query(&filter).await?;
    Ok(Json(logs))
}
