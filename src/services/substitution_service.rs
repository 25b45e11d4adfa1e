// src/services/substitution_service.rs

use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AuditRepository, CatalogRepository, OrdersRepository, SubstitutionsRepository},
    models::{
        catalog::Product,
        orders::OrderStatus,
        substitutions::{Substitution, SubstitutionStatus},
    },
    services::{
        notification_service::{NotificationEvent, NotificationService},
        order_service::OrderService,
    },
};

const DEFAULT_SUGGESTION_LIMIT: i64 = 5;

const SUPERSEDED_RESPONSE: &str = "Substituída por outra proposta aprovada para o mesmo item";

#[derive(Clone)]
pub struct SubstitutionService {
    repo: SubstitutionsRepository,
    orders_repo: OrdersRepository,
    catalog_repo: CatalogRepository,
    audit_repo: AuditRepository,
    order_service: OrderService,
    notifications: NotificationService,
    pool: PgPool,
}

impl SubstitutionService {
    pub fn new(
        repo: SubstitutionsRepository,
        orders_repo: OrdersRepository,
        catalog_repo: CatalogRepository,
        audit_repo: AuditRepository,
        order_service: OrderService,
        notifications: NotificationService,
        pool: PgPool,
    ) -> Self {
        Self {
            repo,
            orders_repo,
            catalog_repo,
            audit_repo,
            order_service,
            notifications,
            pool,
        }
    }

    // =========================================================================
    //  PROPOSTA
    // =========================================================================

    /// Cria a proposta e move o pedido para SUBSTITUTION_REQUIRED na MESMA
    /// transação: ou o caller recebe a proposta com o pedido já no status
    /// certo, ou nada é gravado.
    pub async fn propose_substitution(
        &self,
        order_id: Uuid,
        order_item_id: Uuid,
        original_product_id: Uuid,
        substitute_product_id: Uuid,
        substitute_quantity: Decimal,
        reason: Option<&str>,
        actor_id: Uuid,
    ) -> Result<Substitution, AppError> {
        if substitute_quantity <= Decimal::ZERO {
            return Err(AppError::InvalidPayload(
                "Quantidade do substituto deve ser maior que zero.".into(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let order = self.orders_repo.get_order_for_update(&mut *tx, order_id).await?;

        // Só aceita proposta em pedidos que estão (ou podem entrar) em
        // SUBSTITUTION_REQUIRED; rejeitar aqui evita gravar uma proposta
        // órfã em um pedido já embalado ou cancelado.
        if order.status != OrderStatus::SubstitutionRequired
            && !order.status.can_transition_to(OrderStatus::SubstitutionRequired)
        {
            return Err(AppError::InvalidTransition(
                order.status,
                OrderStatus::SubstitutionRequired,
            ));
        }

        let item = self.orders_repo.get_order_item(&mut *tx, order_item_id).await?;
        if item.order_id != order.id {
            return Err(AppError::ResourceNotFound(format!(
                "Item {} no pedido {}",
                order_item_id, order.order_number
            )));
        }
        if item.product_id != original_product_id {
            return Err(AppError::InvalidPayload(
                "O produto original informado não confere com o item do pedido.".into(),
            ));
        }

        let substitute = self
            .catalog_repo
            .get_product(&mut *tx, substitute_product_id)
            .await?;

        let (original_price, substitute_price) = substitution_pricing(
            item.unit_price,
            item.quantity,
            substitute.base_price,
            substitute_quantity,
        );

        let substitution = self
            .repo
            .create(
                &mut *tx,
                order.id,
                item.id,
                item.product_id,
                substitute.id,
                item.quantity,
                substitute_quantity,
                original_price,
                substitute_price,
                reason,
            )
            .await?;

        self.audit_repo
            .append(
                &mut *tx,
                actor_id,
                "SUBSTITUTION_PROPOSED",
                "substitution",
                substitution.id,
                json!({
                    "orderNumber": order.order_number,
                    "originalProductId": substitution.original_product_id,
                    "substituteProductId": substitution.substitute_product_id,
                    "priceDifference": substitution.price_difference,
                }),
            )
            .await?;

        if order.status == OrderStatus::SubstitutionRequired {
            tx.commit().await?;
            self.notifications.notify(
                NotificationEvent::SubstitutionNeeded,
                order.id,
                &order.order_number,
                order.customer_id,
            );
        } else {
            let updated = self
                .order_service
                .transition_in_tx(
                    &mut tx,
                    &order,
                    OrderStatus::SubstitutionRequired,
                    actor_id,
                    Some("Substituição proposta"),
                )
                .await?;
            tx.commit().await?;
            self.order_service.dispatch_side_effects(&updated, actor_id);
        }

        Ok(substitution)
    }

    // =========================================================================
    //  RESOLUÇÃO
    // =========================================================================

    /// Aprova: reescreve o item do pedido in-place com o substituto, ajusta
    /// os totais e encerra as candidatas irmãs do mesmo item, tudo na mesma
    /// transação. O delta dos totais depende de o item já ter sido descontado
    /// (marcado indisponível) ou não; ver `approval_total_delta`.
    pub async fn approve_substitution(
        &self,
        substitution_id: Uuid,
        customer_response: Option<&str>,
        actor_id: Uuid,
    ) -> Result<Substitution, AppError> {
        let mut tx = self.pool.begin().await?;

        let substitution = self.repo.get_for_update(&mut *tx, substitution_id).await?;
        if substitution.status != SubstitutionStatus::Pending {
            return Err(AppError::AlreadyResolved);
        }

        // Lock do pedido: serializa resoluções concorrentes no mesmo pedido.
        let order = self
            .orders_repo
            .get_order_for_update(&mut *tx, substitution.order_id)
            .await?;
        let item = self
            .orders_repo
            .get_order_item(&mut *tx, substitution.order_item_id)
            .await?;

        let resolved = self
            .repo
            .resolve(
                &mut *tx,
                substitution.id,
                SubstitutionStatus::Approved,
                customer_response,
            )
            .await?;

        // Candidatas irmãs do mesmo item ficam sem objeto depois desta
        // aprovação; sem isto elas travariam o pedido em
        // SUBSTITUTION_REQUIRED para sempre.
        let superseded = self
            .repo
            .supersede_pending_for_item(&mut *tx, item.id, substitution.id, SUPERSEDED_RESPONSE)
            .await?;

        let delta = approval_total_delta(
            item.unavailable,
            substitution.price_difference,
            substitution.substitute_price,
        );

        let unit_price = substitution.substitute_price / substitution.substitute_quantity;
        self.orders_repo
            .apply_substitution_to_item(
                &mut *tx,
                substitution.order_item_id,
                substitution.substitute_product_id,
                substitution.substitute_quantity,
                unit_price,
                substitution.substitute_price,
            )
            .await?;

        if !delta.is_zero() {
            self.orders_repo
                .adjust_totals(&mut *tx, substitution.order_id, delta)
                .await?;
        }

        self.audit_repo
            .append(
                &mut *tx,
                actor_id,
                "SUBSTITUTION_APPROVED",
                "substitution",
                substitution.id,
                json!({
                    "orderNumber": order.order_number,
                    "totalDelta": delta,
                    "supersededCandidates": superseded,
                    "customerResponse": customer_response,
                }),
            )
            .await?;

        tx.commit().await?;

        self.check_order_substitutions_complete(substitution.order_id, actor_id)
            .await?;

        Ok(resolved)
    }

    /// Rejeita UMA candidata. O item só sai do total pagável quando ainda
    /// estava contando (fluxo de proposta avulsa); um item já marcado
    /// indisponível já foi descontado, então rejeições subsequentes apenas
    /// encerram a candidata. Irmãs PENDING continuam abertas: o cliente
    /// ainda pode aprovar outra.
    pub async fn reject_substitution(
        &self,
        substitution_id: Uuid,
        customer_response: Option<&str>,
        actor_id: Uuid,
    ) -> Result<Substitution, AppError> {
        let mut tx = self.pool.begin().await?;

        let substitution = self.repo.get_for_update(&mut *tx, substitution_id).await?;
        if substitution.status != SubstitutionStatus::Pending {
            return Err(AppError::AlreadyResolved);
        }

        let order = self
            .orders_repo
            .get_order_for_update(&mut *tx, substitution.order_id)
            .await?;
        let item = self
            .orders_repo
            .get_order_item(&mut *tx, substitution.order_item_id)
            .await?;

        let resolved = self
            .repo
            .resolve(
                &mut *tx,
                substitution.id,
                SubstitutionStatus::Rejected,
                customer_response,
            )
            .await?;

        let delta = rejection_total_delta(item.unavailable, item.total_price);
        if let Some(delta) = delta {
            self.orders_repo
                .mark_item_unavailable(&mut *tx, item.id)
                .await?;
            self.orders_repo
                .adjust_totals(&mut *tx, substitution.order_id, delta)
                .await?;
        }

        self.audit_repo
            .append(
                &mut *tx,
                actor_id,
                "SUBSTITUTION_REJECTED",
                "substitution",
                substitution.id,
                json!({
                    "orderNumber": order.order_number,
                    "totalDelta": delta,
                    "customerResponse": customer_response,
                }),
            )
            .await?;

        tx.commit().await?;

        self.check_order_substitutions_complete(substitution.order_id, actor_id)
            .await?;

        Ok(resolved)
    }

    /// Ponto de convergência: reavaliação pura do estado atual, segura para
    /// chamadas redundantes/concorrentes. Só transiciona quando o pedido
    /// ainda está em SUBSTITUTION_REQUIRED, então o destravamento para
    /// READY_FOR_PACKING acontece exatamente uma vez.
    pub async fn check_order_substitutions_complete(
        &self,
        order_id: Uuid,
        actor_id: Uuid,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let order = self.orders_repo.get_order_for_update(&mut *tx, order_id).await?;
        if order.status != OrderStatus::SubstitutionRequired {
            return Ok(false);
        }

        let pending = self.repo.count_pending_for_order(&mut *tx, order_id).await?;
        let all_resolved = self.orders_repo.all_items_resolved(&mut *tx, order_id).await?;
        if !unlocks_packing(pending, all_resolved) {
            return Ok(false);
        }

        self.order_service
            .transition_in_tx(
                &mut tx,
                &order,
                OrderStatus::ReadyForPacking,
                actor_id,
                Some("Todas as substituições resolvidas"),
            )
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Aprova em lote todas as substituições pendentes sem diferença de
    /// preço, pelo caminho normal de aprovação (preserva os invariantes).
    pub async fn auto_approve_zero_difference(
        &self,
        order_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Vec<Substitution>, AppError> {
        let pending = self
            .repo
            .list_pending_zero_difference(&self.pool, order_id)
            .await?;

        let mut approved = Vec::new();
        for substitution in pending {
            match self
                .approve_substitution(
                    substitution.id,
                    Some("Aprovado automaticamente (mesmo preço)"),
                    actor_id,
                )
                .await
            {
                Ok(resolved) => approved.push(resolved),
                // Outra resolução chegou primeiro; nada a fazer.
                Err(AppError::AlreadyResolved) => continue,
                Err(e) => {
                    tracing::error!(
                        substitution_id = %substitution.id,
                        "falha na aprovação automática: {}",
                        e
                    );
                }
            }
        }

        Ok(approved)
    }

    /// Leitura pura: sugestões de substituto para um produto.
    pub async fn suggested_substitutes(
        &self,
        product_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Product>, AppError> {
        let product = self.catalog_repo.get_product(&self.pool, product_id).await?;
        let limit = limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT).clamp(1, 20);

        self.catalog_repo
            .suggested_substitutes(&self.pool, &product, limit)
            .await
    }
}

/// Preço total original e do substituto para uma proposta.
fn substitution_pricing(
    original_unit_price: Decimal,
    original_quantity: Decimal,
    substitute_base_price: Decimal,
    substitute_quantity: Decimal,
) -> (Decimal, Decimal) {
    (
        original_unit_price * original_quantity,
        substitute_base_price * substitute_quantity,
    )
}

/// Delta de subtotal/total ao aprovar. Um item ainda contando no subtotal
/// troca pelo delta de preço; um item já descontado (indisponível) volta ao
/// pedido pelo preço cheio do substituto.
fn approval_total_delta(
    item_dropped: bool,
    price_difference: Decimal,
    substitute_price: Decimal,
) -> Decimal {
    if item_dropped {
        substitute_price
    } else {
        price_difference
    }
}

/// Delta de subtotal/total ao rejeitar. `None` quando o item já está fora
/// do total (nada a descontar de novo).
fn rejection_total_delta(item_dropped: bool, item_total_price: Decimal) -> Option<Decimal> {
    if item_dropped {
        None
    } else {
        Some(-item_total_price)
    }
}

/// O pedido destrava para READY_FOR_PACKING quando não resta nenhuma
/// substituição PENDING e todo item está separado ou indisponível.
fn unlocks_packing(pending_count: i64, all_items_resolved: bool) -> bool {
    pending_count == 0 && all_items_resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_pricing_cheaper_substitute() {
        // Item original: 2 x 10.00 = 20.00; substituto: 2 x 8.00 = 16.00
        let (original, substitute) =
            substitution_pricing(dec("10"), dec("2"), dec("8"), dec("2"));
        assert_eq!(original, dec("20"));
        assert_eq!(substitute, dec("16"));
        assert_eq!(substitute - original, dec("-4"));
    }

    #[test]
    fn test_pricing_same_price_has_zero_difference() {
        let (original, substitute) =
            substitution_pricing(dec("5"), dec("3"), dec("5"), dec("3"));
        assert_eq!(substitute - original, Decimal::ZERO);
    }

    #[test]
    fn test_pricing_fractional_quantities() {
        // 1.5 kg a 12.00 = 18.00; substituto 2 kg a 9.50 = 19.00
        let (original, substitute) =
            substitution_pricing(dec("12.00"), dec("1.5"), dec("9.50"), dec("2"));
        assert_eq!(original, dec("18.00"));
        assert_eq!(substitute, dec("19.00"));
        assert_eq!(substitute - original, dec("1.00"));
    }

    #[test]
    fn test_approving_counted_item_applies_price_difference() {
        // Item a 10.00 x2 ainda no subtotal; substituto 8.00 x2: delta -4.
        let delta = approval_total_delta(false, dec("-4"), dec("16"));
        assert_eq!(delta, dec("-4"));
    }

    #[test]
    fn test_approving_dropped_item_restores_substitute_price() {
        // Item já descontado na marcação de indisponibilidade: a aprovação
        // devolve o preço cheio do substituto, não só a diferença.
        let delta = approval_total_delta(true, dec("-4"), dec("16"));
        assert_eq!(delta, dec("16"));
    }

    #[test]
    fn test_rejecting_counted_item_deducts_its_total() {
        assert_eq!(rejection_total_delta(false, dec("20")), Some(dec("-20")));
    }

    #[test]
    fn test_rejecting_dropped_item_deducts_nothing() {
        // Segunda rejeição (ou candidata de item já indisponível): o valor
        // já saiu do total uma vez e não pode sair de novo.
        assert_eq!(rejection_total_delta(true, dec("20")), None);
    }

    #[test]
    fn test_packing_blocked_while_any_substitution_pending() {
        assert!(!unlocks_packing(2, true));
        assert!(!unlocks_packing(1, true));
    }

    #[test]
    fn test_packing_blocked_while_items_unresolved() {
        assert!(!unlocks_packing(0, false));
    }

    #[test]
    fn test_packing_unlocks_exactly_when_pending_drains_and_items_resolve() {
        // Duas pendentes -> resolve a primeira (ainda 1 pendente) -> nada;
        // resolve a segunda -> destrava.
        assert!(!unlocks_packing(1, true));
        assert!(unlocks_packing(0, true));
    }
}
