// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Catálogo mínimo: o suficiente para precificar pedidos de assinatura e
// buscar candidatos a substituição (mesma categoria, faixa de preço).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    #[schema(example = "FRUIT")]
    pub product_type: String,
    #[schema(example = "10.00")]
    pub base_price: Decimal,
    pub is_active: bool,
    pub is_featured: bool,
    pub allow_substitution: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub label: Option<String>,
    pub street: String,
    pub city: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}
