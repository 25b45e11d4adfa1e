// src/handlers/cron.rs
//
// Gatilhos agendados. O scheduler externo (cron do host) chama estes
// endpoints com `Authorization: Bearer <CRON_SECRET>`.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    services::order_service::{BuyingCycleOutcome, ShoppingList},
};

/// Ator sintético dos jobs agendados na trilha de auditoria.
const SYSTEM_ACTOR: Uuid = Uuid::nil();

fn check_cron_secret(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::InvalidToken)?;

    if token != expected {
        return Err(AppError::InvalidToken);
    }
    Ok(())
}

// GET /api/cron/daily-subscriptions
#[utoipa::path(
    get,
    path = "/api/cron/daily-subscriptions",
    tag = "Cron",
    responses(
        (status = 200, description = "Pedidos de assinatura materializados", body = crate::services::subscription_service::GenerationOutcome),
        (status = 401, description = "CRON_SECRET ausente ou incorreto")
    ),
    security(("cron_secret" = []))
)]
pub async fn daily_subscriptions(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    check_cron_secret(&headers, &app_state.cron_secret)?;

    let outcome = app_state
        .subscription_service
        .generate_subscription_orders(SYSTEM_ACTOR)
        .await?;

    tracing::info!(
        gerados = outcome.orders.len(),
        pulados = outcome.skipped,
        falhas = outcome.failures,
        "job diário de assinaturas concluído"
    );

    Ok(Json(outcome))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyCycleResponse {
    pub cycle: BuyingCycleOutcome,
    pub shopping_list: ShoppingList,
}

// GET /api/cron/weekly-buying-cycle
#[utoipa::path(
    get,
    path = "/api/cron/weekly-buying-cycle",
    tag = "Cron",
    responses(
        (status = 200, description = "Pedidos pagos movidos para IN_SOURCING + lista de compras", body = WeeklyCycleResponse),
        (status = 401, description = "CRON_SECRET ausente ou incorreto")
    ),
    security(("cron_secret" = []))
)]
pub async fn weekly_buying_cycle(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    check_cron_secret(&headers, &app_state.cron_secret)?;

    let cycle = app_state
        .order_service
        .process_weekly_buying_cycle(SYSTEM_ACTOR)
        .await?;
    let shopping_list = app_state.order_service.build_shopping_list().await?;

    tracing::info!(
        movidos = cycle.orders.len(),
        falhas = cycle.failures,
        produtos = shopping_list.rows.len(),
        "ciclo semanal de compras concluído"
    );

    Ok(Json(WeeklyCycleResponse {
        cycle,
        shopping_list,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_accepts_matching_bearer_token() {
        let headers = headers_with("Bearer segredo-123");
        assert!(check_cron_secret(&headers, "segredo-123").is_ok());
    }

    #[test]
    fn test_rejects_wrong_token() {
        let headers = headers_with("Bearer outro");
        assert!(matches!(
            check_cron_secret(&headers, "segredo-123"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_rejects_missing_header() {
        let headers = HeaderMap::new();
        assert!(matches!(
            check_cron_secret(&headers, "segredo-123"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_rejects_non_bearer_scheme() {
        let headers = headers_with("Basic segredo-123");
        assert!(matches!(
            check_cron_secret(&headers, "segredo-123"),
            Err(AppError::InvalidToken)
        ));
    }
}
