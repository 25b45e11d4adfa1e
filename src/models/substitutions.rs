// src/models/substitutions.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Resolução é one-way: PENDING -> APPROVED | REJECTED, nunca reaberta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "substitution_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubstitutionStatus {
    Pending,
    Approved,
    Rejected,
}

// Uma substituição PENDING é uma candidata aguardando a decisão do cliente.
// Um item pode acumular várias candidatas; aprovar uma reescreve o item e
// encerra as irmãs como REJECTED.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Substitution {
    pub id: Uuid,
    pub order_id: Uuid,
    pub order_item_id: Uuid,
    pub original_product_id: Uuid,
    pub substitute_product_id: Uuid,
    pub original_quantity: Decimal,
    pub substitute_quantity: Decimal,
    #[schema(example = "20.00")]
    pub original_price: Decimal,
    #[schema(example = "16.00")]
    pub substitute_price: Decimal,
    // price_difference = substitute_price - original_price
    #[schema(example = "-4.00")]
    pub price_difference: Decimal,
    pub status: SubstitutionStatus,
    pub reason: Option<String>,
    pub customer_response: Option<String>,
    pub proposed_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}
