// src/handlers/substitutions.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{catalog::Product, substitutions::Substitution},
};

// =============================================================================
//  1. PROPOSTA
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProposeSubstitutionPayload {
    pub order_id: Uuid,

    pub order_item_id: Uuid,

    pub original_product_id: Uuid,

    pub substitute_product_id: Uuid,

    #[schema(example = "2.0")]
    pub substitute_quantity: Decimal,

    #[schema(example = "Fornecedor sem estoque do original")]
    pub reason: Option<String>,

    pub actor_id: Uuid,
}

// POST /api/substitutions
#[utoipa::path(
    post,
    path = "/api/substitutions",
    tag = "Substitutions",
    request_body = ProposeSubstitutionPayload,
    responses(
        (status = 201, description = "Substituição proposta (PENDING)", body = Substitution),
        (status = 400, description = "Payload inválido"),
        (status = 404, description = "Pedido, item ou produto não encontrado")
    )
)]
pub async fn propose_substitution(
    State(app_state): State<AppState>,
    Json(payload): Json<ProposeSubstitutionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let substitution = app_state
        .substitution_service
        .propose_substitution(
            payload.order_id,
            payload.order_item_id,
            payload.original_product_id,
            payload.substitute_product_id,
            payload.substitute_quantity,
            payload.reason.as_deref(),
            payload.actor_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(substitution)))
}

// =============================================================================
//  2. RESOLUÇÃO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveSubstitutionPayload {
    #[schema(example = "Pode trocar sim")]
    pub customer_response: Option<String>,

    pub actor_id: Uuid,
}

// POST /api/substitutions/{id}/approve
#[utoipa::path(
    post,
    path = "/api/substitutions/{substitution_id}/approve",
    tag = "Substitutions",
    request_body = ResolveSubstitutionPayload,
    responses(
        (status = 200, description = "Substituição aprovada, item e totais atualizados", body = Substitution),
        (status = 404, description = "Substituição não encontrada"),
        (status = 409, description = "Substituição já resolvida")
    ),
    params(
        ("substitution_id" = Uuid, Path, description = "ID da Substituição")
    )
)]
pub async fn approve_substitution(
    State(app_state): State<AppState>,
    Path(substitution_id): Path<Uuid>,
    Json(payload): Json<ResolveSubstitutionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let substitution = app_state
        .substitution_service
        .approve_substitution(
            substitution_id,
            payload.customer_response.as_deref(),
            payload.actor_id,
        )
        .await?;

    Ok(Json(substitution))
}

// POST /api/substitutions/{id}/reject
#[utoipa::path(
    post,
    path = "/api/substitutions/{substitution_id}/reject",
    tag = "Substitutions",
    request_body = ResolveSubstitutionPayload,
    responses(
        (status = 200, description = "Substituição rejeitada, item removido do total", body = Substitution),
        (status = 404, description = "Substituição não encontrada"),
        (status = 409, description = "Substituição já resolvida")
    ),
    params(
        ("substitution_id" = Uuid, Path, description = "ID da Substituição")
    )
)]
pub async fn reject_substitution(
    State(app_state): State<AppState>,
    Path(substitution_id): Path<Uuid>,
    Json(payload): Json<ResolveSubstitutionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let substitution = app_state
        .substitution_service
        .reject_substitution(
            substitution_id,
            payload.customer_response.as_deref(),
            payload.actor_id,
        )
        .await?;

    Ok(Json(substitution))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutoApprovePayload {
    pub actor_id: Uuid,
}

// POST /api/orders/{id}/substitutions/auto-approve
#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/substitutions/auto-approve",
    tag = "Substitutions",
    request_body = AutoApprovePayload,
    responses(
        (status = 200, description = "Substituições sem diferença de preço aprovadas", body = [Substitution])
    ),
    params(
        ("order_id" = Uuid, Path, description = "ID do Pedido")
    )
)]
pub async fn auto_approve_substitutions(
    State(app_state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<AutoApprovePayload>,
) -> Result<impl IntoResponse, AppError> {
    let approved = app_state
        .substitution_service
        .auto_approve_zero_difference(order_id, payload.actor_id)
        .await?;

    Ok(Json(approved))
}

// =============================================================================
//  3. SUGESTÕES
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsQuery {
    pub limit: Option<i64>,
}

// GET /api/products/{id}/suggested-substitutes
#[utoipa::path(
    get,
    path = "/api/products/{product_id}/suggested-substitutes",
    tag = "Substitutions",
    responses(
        (status = 200, description = "Produtos sugeridos como substitutos", body = [Product]),
        (status = 404, description = "Produto não encontrado")
    ),
    params(
        ("product_id" = Uuid, Path, description = "ID do Produto"),
        SuggestionsQuery
    )
)]
pub async fn suggested_substitutes(
    State(app_state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<SuggestionsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let products = app_state
        .substitution_service
        .suggested_substitutes(product_id, query.limit)
        .await?;

    Ok(Json(products))
}
