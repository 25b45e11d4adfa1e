// src/services/order_service.rs

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{dates, error::AppError},
    db::{AuditRepository, CatalogRepository, OrdersRepository, SubstitutionsRepository},
    models::orders::{Order, OrderDetail, OrderStatus, ShoppingListRow},
    services::notification_service::{NotificationEvent, NotificationService},
};

/// Janela de graça antes do fechamento automático DELIVERED -> COMPLETED.
const AUTO_COMPLETE_GRACE_HOURS: u64 = 24;

/// Máximo de candidatos a substituto propostos por item indisponível.
const MAX_SUBSTITUTE_CANDIDATES: i64 = 3;

/// Resultado do ciclo semanal: lote com sucesso parcial explícito.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuyingCycleOutcome {
    pub cycle_date: NaiveDate,
    pub orders: Vec<Order>,
    pub failures: u32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    pub cycle_date: NaiveDate,
    pub rows: Vec<ShoppingListRow>,
}

#[derive(Clone)]
pub struct OrderService {
    repo: OrdersRepository,
    catalog_repo: CatalogRepository,
    substitutions_repo: SubstitutionsRepository,
    audit_repo: AuditRepository,
    notifications: NotificationService,
    pool: PgPool,
    order_prefix: String,
}

impl OrderService {
    pub fn new(
        repo: OrdersRepository,
        catalog_repo: CatalogRepository,
        substitutions_repo: SubstitutionsRepository,
        audit_repo: AuditRepository,
        notifications: NotificationService,
        pool: PgPool,
        order_prefix: String,
    ) -> Self {
        Self {
            repo,
            catalog_repo,
            substitutions_repo,
            audit_repo,
            notifications,
            pool,
            order_prefix,
        }
    }

    // =========================================================================
    //  CRIAÇÃO
    // =========================================================================

    pub async fn create_order(
        &self,
        customer_id: Uuid,
        address_id: Uuid,
        items: &[(Uuid, Decimal)],
        delivery_fee: Decimal,
        discount: Decimal,
        requested_delivery_date: Option<NaiveDate>,
        notes: Option<&str>,
        actor_id: Uuid,
    ) -> Result<Order, AppError> {
        // Validação antes de qualquer mutação no banco.
        if items.is_empty() {
            return Err(AppError::InvalidPayload(
                "O pedido precisa de pelo menos um item.".into(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let address = self.catalog_repo.get_address(&mut *tx, address_id).await?;
        if address.customer_id != customer_id {
            return Err(AppError::InvalidPayload(
                "O endereço informado não pertence ao cliente.".into(),
            ));
        }

        let today = Utc::now().date_naive();
        let delivery_date = requested_delivery_date.unwrap_or(today);

        // Precifica cada item pelo catálogo atual.
        let mut priced_items = Vec::with_capacity(items.len());
        let mut subtotal = Decimal::ZERO;
        for (product_id, quantity) in items {
            if *quantity <= Decimal::ZERO {
                return Err(AppError::InvalidPayload(
                    "Quantidade do item deve ser maior que zero.".into(),
                ));
            }
            let product = self.catalog_repo.get_product(&mut *tx, *product_id).await?;
            let total_price = product.base_price * quantity;
            subtotal += total_price;
            priced_items.push((product.id, *quantity, product.base_price, total_price));
        }

        let total = subtotal + delivery_fee - discount;
        let order_number = self.next_order_number(&mut tx, today).await?;
        let initial_notes = match notes {
            Some(n) => format!("[{}] {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S"), n),
            None => String::new(),
        };

        let order = self
            .repo
            .create_order(
                &mut *tx,
                &order_number,
                customer_id,
                address_id,
                subtotal,
                delivery_fee,
                discount,
                total,
                delivery_date,
                dates::iso_week_number(delivery_date),
                dates::next_thursday(delivery_date),
                None,
                &initial_notes,
            )
            .await?;

        for (product_id, quantity, unit_price, total_price) in priced_items {
            self.repo
                .add_order_item(&mut *tx, order.id, product_id, quantity, unit_price, total_price)
                .await?;
        }

        self.audit_repo
            .append(
                &mut *tx,
                actor_id,
                "ORDER_CREATED",
                "order",
                order.id,
                json!({ "orderNumber": order.order_number, "total": order.total }),
            )
            .await?;

        tx.commit().await?;
        Ok(order)
    }

    /// Número legível do pedido: prefixo + data + sequência diária.
    pub(crate) async fn next_order_number(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        date: NaiveDate,
    ) -> Result<String, AppError> {
        let count = self.repo.count_orders_created_on(&mut **tx, date).await?;
        Ok(format_order_number(&self.order_prefix, date, count + 1))
    }

    pub async fn get_order_detail(&self, order_id: Uuid) -> Result<OrderDetail, AppError> {
        let order = self.repo.get_order(&self.pool, order_id).await?;
        let items = self.repo.list_order_items(&self.pool, order_id).await?;
        let substitutions = self
            .substitutions_repo
            .list_for_order(&self.pool, order_id)
            .await?;

        Ok(OrderDetail {
            header: order,
            items,
            substitutions,
        })
    }

    // =========================================================================
    //  MÁQUINA DE ESTADOS
    // =========================================================================

    /// Aplica uma transição de status. Tudo (status, timestamp, nota,
    /// auditoria) acontece atomicamente; os efeitos colaterais disparam
    /// DEPOIS do commit e nunca falham a transição.
    pub async fn transition(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        actor_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Order, AppError> {
        let mut tx = self.pool.begin().await?;
        let order = self.repo.get_order_for_update(&mut *tx, order_id).await?;
        let updated = self
            .transition_in_tx(&mut tx, &order, new_status, actor_id, notes)
            .await?;
        tx.commit().await?;

        self.dispatch_side_effects(&updated, actor_id);
        Ok(updated)
    }

    /// Núcleo da transição, para compor com outras mutações na mesma
    /// transação. O caller é responsável pelo lock da linha do pedido e
    /// pelos efeitos colaterais pós-commit.
    pub(crate) async fn transition_in_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        order: &Order,
        new_status: OrderStatus,
        actor_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Order, AppError> {
        // Checagem da tabela ANTES de qualquer mutação.
        if !order.status.can_transition_to(new_status) {
            return Err(AppError::InvalidTransition(order.status, new_status));
        }

        if let Some(notes) = notes {
            let line = format!("[{}] {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S"), notes);
            self.repo
                .append_internal_note(&mut **tx, order.id, &line)
                .await?;
        }

        let updated = self.repo.update_status(&mut **tx, order.id, new_status).await?;

        self.audit_repo
            .append(
                &mut **tx,
                actor_id,
                "ORDER_STATUS_CHANGED",
                "order",
                order.id,
                json!({
                    "orderNumber": order.order_number,
                    "fromStatus": order.status,
                    "toStatus": new_status,
                    "notes": notes,
                }),
            )
            .await?;

        Ok(updated)
    }

    /// Um efeito colateral por status. Todos fire-and-forget.
    pub(crate) fn dispatch_side_effects(&self, order: &Order, actor_id: Uuid) {
        match order.status {
            OrderStatus::Confirmed => self.notifications.notify(
                NotificationEvent::OrderConfirmed,
                order.id,
                &order.order_number,
                order.customer_id,
            ),
            OrderStatus::InSourcing => self.notifications.notify(
                NotificationEvent::SourcingStarted,
                order.id,
                &order.order_number,
                order.customer_id,
            ),
            OrderStatus::SubstitutionRequired => self.notifications.notify(
                NotificationEvent::SubstitutionNeeded,
                order.id,
                &order.order_number,
                order.customer_id,
            ),
            OrderStatus::OutForDelivery => self.notifications.notify(
                NotificationEvent::OutForDelivery,
                order.id,
                &order.order_number,
                order.customer_id,
            ),
            OrderStatus::Delivered => self.schedule_auto_complete(order.id, actor_id),
            _ => {}
        }
    }

    /// Agenda o fechamento automático DELIVERED -> COMPLETED após a janela
    /// de graça. Se o pedido sair de DELIVERED antes (ex.: FAILED), a
    /// própria tabela de transições rejeita o fechamento.
    fn schedule_auto_complete(&self, order_id: Uuid, actor_id: Uuid) {
        let service = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(
                AUTO_COMPLETE_GRACE_HOURS * 3600,
            ))
            .await;
            service.auto_complete(order_id, actor_id).await;
        });
    }

    async fn auto_complete(&self, order_id: Uuid, actor_id: Uuid) {
        let result: Result<(), AppError> = async {
            let mut tx = self.pool.begin().await?;
            let order = self.repo.get_order_for_update(&mut *tx, order_id).await?;
            if order.status != OrderStatus::Delivered {
                // Pedido seguiu outro caminho (FAILED/CANCELLED); nada a fazer.
                return Ok(());
            }
            self.transition_in_tx(
                &mut tx,
                &order,
                OrderStatus::Completed,
                actor_id,
                Some("Fechado automaticamente após a janela de entrega"),
            )
            .await?;
            tx.commit().await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(%order_id, "falha no fechamento automático do pedido: {}", e);
        }
    }

    // =========================================================================
    //  CICLO SEMANAL DE COMPRAS (quinta-feira)
    // =========================================================================

    /// Move todos os pedidos PAGOS do ciclo desta semana para IN_SOURCING.
    /// A falha de um pedido não aborta o lote.
    pub async fn process_weekly_buying_cycle(
        &self,
        actor_id: Uuid,
    ) -> Result<BuyingCycleOutcome, AppError> {
        let cycle_date = dates::next_thursday(Utc::now().date_naive());
        let due = self
            .repo
            .list_paid_orders_for_cycle(&self.pool, cycle_date)
            .await?;

        let mut orders = Vec::new();
        let mut failures = 0u32;
        for order in due {
            match self
                .transition(
                    order.id,
                    OrderStatus::InSourcing,
                    actor_id,
                    Some("Ciclo semanal de compras"),
                )
                .await
            {
                Ok(updated) => orders.push(updated),
                Err(e) => {
                    failures += 1;
                    tracing::error!(
                        order_id = %order.id,
                        "falha ao mover pedido para IN_SOURCING: {}",
                        e
                    );
                }
            }
        }

        Ok(BuyingCycleOutcome {
            cycle_date,
            orders,
            failures,
        })
    }

    /// Lista de compras agregada do ciclo (todos os pedidos PAGOS da semana).
    pub async fn build_shopping_list(&self) -> Result<ShoppingList, AppError> {
        let cycle_date = dates::next_thursday(Utc::now().date_naive());
        let rows = self
            .repo
            .shopping_list_for_cycle(&self.pool, cycle_date)
            .await?;

        Ok(ShoppingList { cycle_date, rows })
    }

    // =========================================================================
    //  ITENS INDISPONÍVEIS (sourcing)
    // =========================================================================

    /// Marca itens como indisponíveis e propõe até 3 candidatos a substituto
    /// por item (mesma categoria, ±20% do preço). Com candidatos o pedido vai
    /// para SUBSTITUTION_REQUIRED; sem nenhum, direto para READY_FOR_PACKING.
    pub async fn check_unavailable_items(
        &self,
        order_id: Uuid,
        item_ids: &[Uuid],
        actor_id: Uuid,
    ) -> Result<Order, AppError> {
        if item_ids.is_empty() {
            return Err(AppError::InvalidPayload(
                "Informe ao menos um item indisponível.".into(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let order = self.repo.get_order_for_update(&mut *tx, order_id).await?;

        let mut substitutions_created = 0u32;
        for item_id in item_ids {
            let item = self.repo.get_order_item(&mut *tx, *item_id).await?;
            if item.order_id != order.id {
                return Err(AppError::InvalidPayload(format!(
                    "O item {} não pertence ao pedido {}.",
                    item.id, order.order_number
                )));
            }

            // Item indisponível sai do total pagável no ato da marcação.
            // A flag `unavailable` passa a significar exatamente "fora do
            // subtotal": uma aprovação posterior devolve o valor do
            // substituto, e uma rejeição não desconta de novo.
            if item.unavailable {
                continue;
            }
            self.repo.mark_item_unavailable(&mut *tx, item.id).await?;
            self.repo
                .adjust_totals(&mut *tx, order.id, -item.total_price)
                .await?;

            let product = self.catalog_repo.get_product(&mut *tx, item.product_id).await?;
            if !product.allow_substitution {
                continue;
            }

            let candidates = self
                .catalog_repo
                .find_substitute_candidates(&mut *tx, &product, MAX_SUBSTITUTE_CANDIDATES)
                .await?;

            for candidate in candidates {
                let original_price = item.unit_price * item.quantity;
                let substitute_price = candidate.base_price * item.quantity;
                self.substitutions_repo
                    .create(
                        &mut *tx,
                        order.id,
                        item.id,
                        product.id,
                        candidate.id,
                        item.quantity,
                        item.quantity,
                        original_price,
                        substitute_price,
                        Some("Produto indisponível no fornecedor"),
                    )
                    .await?;
                substitutions_created += 1;
            }
        }

        let target = sourcing_target(substitutions_created);

        let note = format!(
            "{} item(ns) indisponível(is), {} substituição(ões) proposta(s)",
            item_ids.len(),
            substitutions_created
        );
        let updated = self
            .transition_in_tx(&mut tx, &order, target, actor_id, Some(&note))
            .await?;

        tx.commit().await?;

        self.dispatch_side_effects(&updated, actor_id);
        Ok(updated)
    }
}

/// Destino do pedido depois da checagem de indisponibilidade: com alguma
/// proposta criada ele aguarda o cliente; sem nenhuma (tudo sem candidato ou
/// substituição desabilitada) segue direto para a embalagem.
fn sourcing_target(substitutions_created: u32) -> OrderStatus {
    if substitutions_created > 0 {
        OrderStatus::SubstitutionRequired
    } else {
        OrderStatus::ReadyForPacking
    }
}

/// Formata o número do pedido: prefixo + yyyymmdd + sequência diária.
fn format_order_number(prefix: &str, date: NaiveDate, seq: i64) -> String {
    format!("{}-{}-{:04}", prefix, date.format("%Y%m%d"), seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_order_number() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 5).unwrap();
        assert_eq!(format_order_number("FR", date, 1), "FR-20260205-0001");
        assert_eq!(format_order_number("FR", date, 123), "FR-20260205-0123");
        assert_eq!(format_order_number("FR", date, 10000), "FR-20260205-10000");
    }

    #[test]
    fn test_unavailable_item_without_candidates_goes_straight_to_packing() {
        // Produto que não permite substituição (ou sem candidato na faixa):
        // nenhuma proposta criada, o pedido pula SUBSTITUTION_REQUIRED.
        assert_eq!(sourcing_target(0), OrderStatus::ReadyForPacking);
    }

    #[test]
    fn test_any_candidate_holds_order_for_customer_decision() {
        assert_eq!(sourcing_target(1), OrderStatus::SubstitutionRequired);
        assert_eq!(sourcing_target(3), OrderStatus::SubstitutionRequired);
    }
}
