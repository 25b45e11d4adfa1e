// src/handlers/orders.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::orders::{Order, OrderDetail, OrderStatus},
};

// =============================================================================
//  1. CRIAÇÃO E CONSULTA
// =============================================================================

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemPayload {
    pub product_id: Uuid,

    #[schema(example = "2.0")]
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    pub customer_id: Uuid,

    pub address_id: Uuid,

    #[validate(length(min = 1, message = "required"))]
    pub items: Vec<OrderItemPayload>,

    #[serde(default)]
    #[schema(example = "8.00")]
    pub delivery_fee: Decimal,

    #[serde(default)]
    #[schema(example = "0.00")]
    pub discount: Decimal,

    pub requested_delivery_date: Option<NaiveDate>,

    #[schema(example = "Entregar na portaria")]
    pub notes: Option<String>,

    pub actor_id: Uuid,
}

// POST /api/orders
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Orders",
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "Pedido criado em RECEIVED", body = Order),
        (status = 400, description = "Payload inválido")
    )
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let items: Vec<(Uuid, Decimal)> = payload
        .items
        .iter()
        .map(|i| (i.product_id, i.quantity))
        .collect();

    let order = app_state
        .order_service
        .create_order(
            payload.customer_id,
            payload.address_id,
            &items,
            payload.delivery_fee,
            payload.discount,
            payload.requested_delivery_date,
            payload.notes.as_deref(),
            payload.actor_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

// GET /api/orders/{id}
#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    tag = "Orders",
    responses(
        (status = 200, description = "Pedido com itens e substituições", body = OrderDetail),
        (status = 404, description = "Pedido não encontrado")
    ),
    params(
        ("order_id" = Uuid, Path, description = "ID do Pedido")
    )
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state.order_service.get_order_detail(order_id).await?;
    Ok(Json(detail))
}

// =============================================================================
//  2. MÁQUINA DE ESTADOS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOrderPayload {
    #[schema(example = "CONFIRMED")]
    pub new_status: OrderStatus,

    #[schema(example = "Confirmado por telefone")]
    pub notes: Option<String>,

    pub actor_id: Uuid,
}

// POST /api/orders/{id}/transition
#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/transition",
    tag = "Orders",
    request_body = TransitionOrderPayload,
    responses(
        (status = 200, description = "Pedido movido para o novo status", body = Order),
        (status = 404, description = "Pedido não encontrado"),
        (status = 422, description = "Transição não permitida pela tabela")
    ),
    params(
        ("order_id" = Uuid, Path, description = "ID do Pedido")
    )
)]
pub async fn transition_order(
    State(app_state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<TransitionOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    let order = app_state
        .order_service
        .transition(
            order_id,
            payload.new_status,
            payload.actor_id,
            payload.notes.as_deref(),
        )
        .await?;

    Ok(Json(order))
}

// =============================================================================
//  3. SOURCING (itens indisponíveis)
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnavailableItemsPayload {
    #[validate(length(min = 1, message = "required"))]
    pub item_ids: Vec<Uuid>,

    pub actor_id: Uuid,
}

// POST /api/orders/{id}/unavailable-items
#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/unavailable-items",
    tag = "Orders",
    request_body = UnavailableItemsPayload,
    responses(
        (status = 200, description = "Itens marcados; pedido em SUBSTITUTION_REQUIRED ou READY_FOR_PACKING", body = Order),
        (status = 404, description = "Pedido não encontrado")
    ),
    params(
        ("order_id" = Uuid, Path, description = "ID do Pedido")
    )
)]
pub async fn report_unavailable_items(
    State(app_state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UnavailableItemsPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let order = app_state
        .order_service
        .check_unavailable_items(order_id, &payload.item_ids, payload.actor_id)
        .await?;

    Ok(Json(order))
}
