// src/handlers/subscriptions.rs

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
    models::subscriptions::{
        Subscription, SubscriptionFrequency, SubscriptionItem, SubscriptionSkip,
    },
};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionItemPayload {
    pub product_id: Uuid,

    #[schema(example = "1.0")]
    pub quantity: Decimal,

    // Item flexível aceita substituição automática na montagem da cesta.
    #[serde(default)]
    pub is_flexible: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionPayload {
    pub customer_id: Uuid,

    pub address_id: Option<Uuid>,

    #[schema(example = "WEEKLY")]
    pub frequency: SubscriptionFrequency,

    #[serde(default)]
    #[schema(example = "8.00")]
    pub delivery_fee: Decimal,

    pub start_date: NaiveDate,

    pub end_date: Option<NaiveDate>,

    #[schema(example = "THURSDAY")]
    pub preferred_delivery_day: Option<String>,

    #[validate(length(min = 1, message = "required"))]
    pub items: Vec<SubscriptionItemPayload>,

    pub actor_id: Uuid,
}

// POST /api/subscriptions
#[utoipa::path(
    post,
    path = "/api/subscriptions",
    tag = "Subscriptions",
    request_body = CreateSubscriptionPayload,
    responses(
        (status = 201, description = "Assinatura criada (ACTIVE)", body = Subscription),
        (status = 400, description = "Payload inválido")
    )
)]
pub async fn create_subscription(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateSubscriptionPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let items: Vec<(Uuid, Decimal, bool)> = payload
        .items
        .iter()
        .map(|i| (i.product_id, i.quantity, i.is_flexible))
        .collect();

    let subscription = app_state
        .subscription_service
        .create_subscription(
            payload.customer_id,
            payload.address_id,
            payload.frequency,
            payload.delivery_fee,
            payload.start_date,
            payload.end_date,
            payload.preferred_delivery_day.as_deref(),
            &items,
            payload.actor_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(subscription)))
}

// GET /api/subscriptions/{id}
#[utoipa::path(
    get,
    path = "/api/subscriptions/{subscription_id}",
    tag = "Subscriptions",
    responses(
        (status = 200, description = "Assinatura", body = Subscription),
        (status = 404, description = "Assinatura não encontrada")
    ),
    params(
        ("subscription_id" = Uuid, Path, description = "ID da Assinatura")
    )
)]
pub async fn get_subscription(
    State(app_state): State<AppState>,
    Path(subscription_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let subscription = app_state
        .subscription_service
        .get_subscription(subscription_id)
        .await?;

    Ok(Json(subscription))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActorPayload {
    pub actor_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PauseSubscriptionPayload {
    #[schema(example = "Cliente de férias")]
    pub reason: Option<String>,

    pub actor_id: Uuid,
}

// POST /api/subscriptions/{id}/pause
#[utoipa::path(
    post,
    path = "/api/subscriptions/{subscription_id}/pause",
    tag = "Subscriptions",
    request_body = PauseSubscriptionPayload,
    responses(
        (status = 200, description = "Assinatura pausada", body = Subscription),
        (status = 400, description = "Assinatura cancelada não pode ser pausada"),
        (status = 404, description = "Assinatura não encontrada")
    ),
    params(
        ("subscription_id" = Uuid, Path, description = "ID da Assinatura")
    )
)]
pub async fn pause_subscription(
    State(app_state): State<AppState>,
    Path(subscription_id): Path<Uuid>,
    Json(payload): Json<PauseSubscriptionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let subscription = app_state
        .subscription_service
        .pause(subscription_id, payload.reason.as_deref(), payload.actor_id)
        .await?;

    Ok(Json(subscription))
}

// POST /api/subscriptions/{id}/resume
#[utoipa::path(
    post,
    path = "/api/subscriptions/{subscription_id}/resume",
    tag = "Subscriptions",
    request_body = ActorPayload,
    responses(
        (status = 200, description = "Assinatura reativada, cursor reprogramado", body = Subscription),
        (status = 404, description = "Assinatura não encontrada")
    ),
    params(
        ("subscription_id" = Uuid, Path, description = "ID da Assinatura")
    )
)]
pub async fn resume_subscription(
    State(app_state): State<AppState>,
    Path(subscription_id): Path<Uuid>,
    Json(payload): Json<ActorPayload>,
) -> Result<impl IntoResponse, AppError> {
    let subscription = app_state
        .subscription_service
        .resume(subscription_id, payload.actor_id)
        .await?;

    Ok(Json(subscription))
}

// POST /api/subscriptions/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/subscriptions/{subscription_id}/cancel",
    tag = "Subscriptions",
    request_body = ActorPayload,
    responses(
        (status = 200, description = "Assinatura cancelada", body = Subscription),
        (status = 404, description = "Assinatura não encontrada")
    ),
    params(
        ("subscription_id" = Uuid, Path, description = "ID da Assinatura")
    )
)]
pub async fn cancel_subscription(
    State(app_state): State<AppState>,
    Path(subscription_id): Path<Uuid>,
    Json(payload): Json<ActorPayload>,
) -> Result<impl IntoResponse, AppError> {
    let subscription = app_state
        .subscription_service
        .cancel(subscription_id, payload.actor_id)
        .await?;

    Ok(Json(subscription))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkipDatePayload {
    #[schema(example = "2026-09-10")]
    pub skip_date: NaiveDate,

    #[schema(example = "Cliente viajando")]
    pub reason: Option<String>,

    pub actor_id: Uuid,
}

// POST /api/subscriptions/{id}/skip
#[utoipa::path(
    post,
    path = "/api/subscriptions/{subscription_id}/skip",
    tag = "Subscriptions",
    request_body = SkipDatePayload,
    responses(
        (status = 201, description = "Data marcada para pular", body = SubscriptionSkip),
        (status = 404, description = "Assinatura não encontrada")
    ),
    params(
        ("subscription_id" = Uuid, Path, description = "ID da Assinatura")
    )
)]
pub async fn skip_subscription_date(
    State(app_state): State<AppState>,
    Path(subscription_id): Path<Uuid>,
    Json(payload): Json<SkipDatePayload>,
) -> Result<impl IntoResponse, AppError> {
    let skip = app_state
        .subscription_service
        .skip_date(
            subscription_id,
            payload.skip_date,
            payload.reason.as_deref(),
            payload.actor_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(skip)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemsPayload {
    #[validate(length(min = 1, message = "required"))]
    pub items: Vec<SubscriptionItemPayload>,

    pub actor_id: Uuid,
}

// PUT /api/subscriptions/{id}/items
#[utoipa::path(
    put,
    path = "/api/subscriptions/{subscription_id}/items",
    tag = "Subscriptions",
    request_body = UpdateItemsPayload,
    responses(
        (status = 200, description = "Cesta substituída por completo", body = [SubscriptionItem]),
        (status = 404, description = "Assinatura não encontrada")
    ),
    params(
        ("subscription_id" = Uuid, Path, description = "ID da Assinatura")
    )
)]
pub async fn update_subscription_items(
    State(app_state): State<AppState>,
    Path(subscription_id): Path<Uuid>,
    Json(payload): Json<UpdateItemsPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let items: Vec<(Uuid, Decimal, bool)> = payload
        .items
        .iter()
        .map(|i| (i.product_id, i.quantity, i.is_flexible))
        .collect();

    let updated = app_state
        .subscription_service
        .update_items(subscription_id, &items, payload.actor_id)
        .await?;

    Ok(Json(updated))
}
