// src/models/subscriptions.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "subscription_frequency", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionFrequency {
    Weekly,
    Biweekly,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "subscription_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub address_id: Option<Uuid>,
    pub frequency: SubscriptionFrequency,
    pub status: SubscriptionStatus,
    pub base_price: Decimal,
    pub delivery_fee: Decimal,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    // Cursor de agendamento: só avança quando um pedido é de fato gerado.
    // Invariante: nunca anterior ao último pedido gerado desta assinatura.
    pub next_order_date: NaiveDate,
    pub preferred_delivery_day: Option<String>,
    pub paused_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionItem {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub is_flexible: bool,
}

// Override pontual: a presença de uma linha para (assinatura, data) suprime
// a geração daquele ciclo; não mexe no next_order_date.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSkip {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub skip_date: NaiveDate,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
