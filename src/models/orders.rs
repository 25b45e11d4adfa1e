// src/models/orders.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Status do Pedido ---
// A tabela de transições abaixo é a ÚNICA fonte de verdade sobre quais
// mudanças de status são permitidas. Nenhum handler ou service pode mudar
// o status de um pedido sem passar por `can_transition_to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Received,
    Confirmed,
    AwaitingPayment,
    Paid,
    InSourcing,
    SubstitutionRequired,
    ReadyForPacking,
    Packed,
    OutForDelivery,
    Delivered,
    Completed,
    Cancelled,
    Failed,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 14] = [
        OrderStatus::Received,
        OrderStatus::Confirmed,
        OrderStatus::AwaitingPayment,
        OrderStatus::Paid,
        OrderStatus::InSourcing,
        OrderStatus::SubstitutionRequired,
        OrderStatus::ReadyForPacking,
        OrderStatus::Packed,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::Failed,
        OrderStatus::Refunded,
    ];

    /// Tabela de transições do ciclo de vida do pedido.
    /// Cancelamento é permitido até OUT_FOR_DELIVERY; depois disso o pedido
    /// só pode falhar (FAILED) e então ser cancelado/reembolsado.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Received, Confirmed)
                | (Received, Cancelled)
                | (Confirmed, AwaitingPayment)
                | (Confirmed, Cancelled)
                | (AwaitingPayment, Paid)
                | (AwaitingPayment, Cancelled)
                | (Paid, InSourcing)
                | (Paid, Cancelled)
                | (InSourcing, SubstitutionRequired)
                | (InSourcing, ReadyForPacking)
                | (InSourcing, Cancelled)
                | (SubstitutionRequired, ReadyForPacking)
                | (SubstitutionRequired, Cancelled)
                | (ReadyForPacking, Packed)
                | (ReadyForPacking, Cancelled)
                | (Packed, OutForDelivery)
                | (Packed, Cancelled)
                | (OutForDelivery, Delivered)
                | (OutForDelivery, Failed)
                | (OutForDelivery, Cancelled)
                | (Delivered, Completed)
                | (Delivered, Failed)
                | (Cancelled, Refunded)
                | (Failed, Cancelled)
                | (Failed, Refunded)
        )
    }

    /// Coluna de timestamp que cada status marca ao ser atingido.
    pub fn timestamp_column(self) -> Option<&'static str> {
        match self {
            OrderStatus::Confirmed => Some("confirmed_at"),
            OrderStatus::Paid => Some("paid_at"),
            OrderStatus::Packed => Some("packed_at"),
            OrderStatus::Delivered => Some("delivered_at"),
            OrderStatus::Completed => Some("completed_at"),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Refunded)
    }
}

// --- Pedido ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    #[schema(example = "FR-20260205-0001")]
    pub order_number: String,
    pub customer_id: Uuid,
    pub address_id: Uuid,
    pub status: OrderStatus,
    #[schema(example = "120.50")]
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub discount: Decimal,
    // Invariante: total = subtotal + delivery_fee - discount
    pub total: Decimal,
    pub requested_delivery_date: NaiveDate,
    pub week_number: i32,
    // Quinta-feira do ciclo de compra coletiva em que o pedido entra
    pub buying_cycle_date: NaiveDate,
    pub subscription_id: Option<Uuid>,
    pub is_subscription_order: bool,
    // Trilha interna, append-only
    pub internal_notes: String,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub packed_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Item do Pedido ---
// Um item está em exatamente um de três estados:
// aguardando sourcing (!is_sourced && !unavailable), separado (is_sourced)
// ou indisponível (unavailable).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    #[schema(example = "2.0")]
    pub quantity: Decimal,
    #[schema(example = "10.00")]
    pub unit_price: Decimal,
    #[schema(example = "20.00")]
    pub total_price: Decimal,
    pub is_sourced: bool,
    pub sourced_qty: Decimal,
    pub unavailable: bool,
    pub created_at: DateTime<Utc>,
}

// --- Pedido completo (cabeçalho + itens + substituições) ---
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub header: Order,
    pub items: Vec<OrderItem>,
    pub substitutions: Vec<crate::models::substitutions::Substitution>,
}

// --- Linha da lista de compras semanal ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListRow {
    pub product_id: Uuid,
    pub product_name: String,
    pub total_quantity: Decimal,
    pub order_numbers: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed_edges() -> Vec<(OrderStatus, OrderStatus)> {
        use OrderStatus::*;
        vec![
            (Received, Confirmed),
            (Received, Cancelled),
            (Confirmed, AwaitingPayment),
            (Confirmed, Cancelled),
            (AwaitingPayment, Paid),
            (AwaitingPayment, Cancelled),
            (Paid, InSourcing),
            (Paid, Cancelled),
            (InSourcing, SubstitutionRequired),
            (InSourcing, ReadyForPacking),
            (InSourcing, Cancelled),
            (SubstitutionRequired, ReadyForPacking),
            (SubstitutionRequired, Cancelled),
            (ReadyForPacking, Packed),
            (ReadyForPacking, Cancelled),
            (Packed, OutForDelivery),
            (Packed, Cancelled),
            (OutForDelivery, Delivered),
            (OutForDelivery, Failed),
            (OutForDelivery, Cancelled),
            (Delivered, Completed),
            (Delivered, Failed),
            (Cancelled, Refunded),
            (Failed, Cancelled),
            (Failed, Refunded),
        ]
    }

    #[test]
    fn test_all_listed_edges_are_legal() {
        for (from, to) in allowed_edges() {
            assert!(
                from.can_transition_to(to),
                "esperava {:?} -> {:?} permitido",
                from,
                to
            );
        }
    }

    #[test]
    fn test_every_other_pair_is_illegal() {
        let allowed = allowed_edges();
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                if allowed.contains(&(from, to)) {
                    continue;
                }
                assert!(
                    !from.can_transition_to(to),
                    "{:?} -> {:?} deveria ser proibido",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_no_self_transitions() {
        for status in OrderStatus::ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for terminal in [OrderStatus::Completed, OrderStatus::Refunded] {
            assert!(terminal.is_terminal());
            for to in OrderStatus::ALL {
                assert!(!terminal.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_received_cannot_jump_to_packed() {
        // Pedido recém-criado não pode pular direto para PACKED
        assert!(!OrderStatus::Received.can_transition_to(OrderStatus::Packed));
    }

    #[test]
    fn test_timestamp_columns() {
        assert_eq!(
            OrderStatus::Confirmed.timestamp_column(),
            Some("confirmed_at")
        );
        assert_eq!(OrderStatus::Paid.timestamp_column(), Some("paid_at"));
        assert_eq!(OrderStatus::Packed.timestamp_column(), Some("packed_at"));
        assert_eq!(
            OrderStatus::Delivered.timestamp_column(),
            Some("delivered_at")
        );
        assert_eq!(
            OrderStatus::Completed.timestamp_column(),
            Some("completed_at")
        );
        assert_eq!(OrderStatus::InSourcing.timestamp_column(), None);
        assert_eq!(OrderStatus::Cancelled.timestamp_column(), None);
    }
}
