// src/services/subscription_service.rs

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{dates, error::AppError},
    db::{AuditRepository, CatalogRepository, OrdersRepository, SubscriptionsRepository},
    models::{
        orders::{Order, OrderStatus},
        subscriptions::{
            Subscription, SubscriptionFrequency, SubscriptionItem, SubscriptionSkip,
            SubscriptionStatus,
        },
    },
    services::order_service::OrderService,
};

/// Resultado do job diário de materialização de assinaturas.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub orders: Vec<Order>,
    pub skipped: u32,
    pub failures: u32,
}

#[derive(Clone)]
pub struct SubscriptionService {
    repo: SubscriptionsRepository,
    orders_repo: OrdersRepository,
    catalog_repo: CatalogRepository,
    audit_repo: AuditRepository,
    order_service: OrderService,
    pool: PgPool,
}

impl SubscriptionService {
    pub fn new(
        repo: SubscriptionsRepository,
        orders_repo: OrdersRepository,
        catalog_repo: CatalogRepository,
        audit_repo: AuditRepository,
        order_service: OrderService,
        pool: PgPool,
    ) -> Self {
        Self {
            repo,
            orders_repo,
            catalog_repo,
            audit_repo,
            order_service,
            pool,
        }
    }

    // =========================================================================
    //  GERAÇÃO DIÁRIA
    // =========================================================================

    /// Materializa um pedido para cada assinatura devida hoje. Uma assinatura
    /// com defeito (sem itens, sem endereço) não aborta o lote.
    pub async fn generate_subscription_orders(
        &self,
        actor_id: Uuid,
    ) -> Result<GenerationOutcome, AppError> {
        let today = Utc::now().date_naive();
        let due = self.repo.list_due(&self.pool, today).await?;

        let mut orders = Vec::new();
        let mut skipped = 0u32;
        let mut failures = 0u32;
        for subscription in due {
            match self.generate_one(&subscription, today, actor_id).await {
                Ok(Some(order)) => orders.push(order),
                Ok(None) => skipped += 1,
                Err(e) => {
                    failures += 1;
                    tracing::error!(
                        subscription_id = %subscription.id,
                        "falha ao gerar pedido da assinatura: {}",
                        e
                    );
                }
            }
        }

        Ok(GenerationOutcome {
            orders,
            skipped,
            failures,
        })
    }

    /// Gera o pedido de UMA assinatura. Pedido, itens, avanço do cursor e
    /// auditoria ficam na mesma transação: rerodar o job no mesmo dia não
    /// duplica pedidos. `Ok(None)` significa ciclo suprimido, sem pedido.
    async fn generate_one(
        &self,
        subscription: &Subscription,
        today: NaiveDate,
        actor_id: Uuid,
    ) -> Result<Option<Order>, AppError> {
        let address_id = match subscription.address_id {
            Some(id) => id,
            None => self
                .catalog_repo
                .get_default_address(&self.pool, subscription.customer_id)
                .await?
                .ok_or_else(|| {
                    AppError::ResourceNotFound(format!(
                        "Endereço padrão do cliente {}",
                        subscription.customer_id
                    ))
                })?
                .id,
        };

        let mut tx = self.pool.begin().await?;

        // Relê sob lock: outro worker pode ter gerado e avançado o cursor
        // entre o list_due e aqui.
        let locked = self.repo.get_for_update(&mut *tx, subscription.id).await?;
        if locked.status != SubscriptionStatus::Active || locked.next_order_date > today {
            return Ok(None);
        }

        let delivery_date = locked.next_order_date;
        let next_cursor = dates::advance_by_frequency(delivery_date, locked.frequency);

        // Skip pontual: suprime só este ciclo e move o cursor adiante.
        if self.repo.has_skip(&mut *tx, locked.id, delivery_date).await? {
            self.repo
                .advance_cursor(&mut *tx, locked.id, next_cursor)
                .await?;
            self.audit_repo
                .append(
                    &mut *tx,
                    actor_id,
                    "SUBSCRIPTION_CYCLE_SKIPPED",
                    "subscription",
                    locked.id,
                    json!({ "skipDate": delivery_date, "nextOrderDate": next_cursor }),
                )
                .await?;
            tx.commit().await?;
            return Ok(None);
        }

        // Cesta lida sob o mesmo lock da assinatura: um update_items
        // concorrente não mistura itens antigos com o pedido novo.
        let items = self.repo.list_items(&mut *tx, locked.id).await?;
        if items.is_empty() {
            return Err(AppError::InvalidPayload(format!(
                "Assinatura {} não tem itens.",
                locked.id
            )));
        }

        // Precifica pelo catálogo atual, não pelo base_price congelado.
        let mut priced_items = Vec::with_capacity(items.len());
        let mut subtotal = Decimal::ZERO;
        for item in &items {
            let product = self.catalog_repo.get_product(&mut *tx, item.product_id).await?;
            let total_price = product.base_price * item.quantity;
            subtotal += total_price;
            priced_items.push((product.id, item.quantity, product.base_price, total_price));
        }
        let total = subtotal + locked.delivery_fee;

        let order_number = self.order_service.next_order_number(&mut tx, today).await?;
        let initial_notes = format!(
            "[{}] Gerado automaticamente da assinatura {}\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S"),
            locked.id
        );

        let order = self
            .orders_repo
            .create_order(
                &mut *tx,
                &order_number,
                locked.customer_id,
                address_id,
                subtotal,
                locked.delivery_fee,
                Decimal::ZERO,
                total,
                delivery_date,
                dates::iso_week_number(delivery_date),
                dates::next_thursday(delivery_date),
                Some(locked.id),
                &initial_notes,
            )
            .await?;

        for (product_id, quantity, unit_price, total_price) in priced_items {
            self.orders_repo
                .add_order_item(&mut *tx, order.id, product_id, quantity, unit_price, total_price)
                .await?;
        }

        self.repo
            .advance_cursor(&mut *tx, locked.id, next_cursor)
            .await?;

        self.audit_repo
            .append(
                &mut *tx,
                actor_id,
                "SUBSCRIPTION_ORDER_GENERATED",
                "subscription",
                locked.id,
                json!({
                    "orderNumber": order.order_number,
                    "orderId": order.id,
                    "total": order.total,
                    "nextOrderDate": next_cursor,
                }),
            )
            .await?;

        tx.commit().await?;

        // Pedidos de assinatura nascem confirmados; o cliente já aceitou a
        // recorrência. Se a confirmação falhar, o pedido fica em RECEIVED e
        // a operação resolve manualmente.
        match self
            .order_service
            .transition(
                order.id,
                OrderStatus::Confirmed,
                actor_id,
                Some("Gerado automaticamente da assinatura"),
            )
            .await
        {
            Ok(confirmed) => Ok(Some(confirmed)),
            Err(e) => {
                tracing::warn!(
                    order_id = %order.id,
                    "pedido de assinatura gerado mas não confirmado: {}",
                    e
                );
                Ok(Some(order))
            }
        }
    }

    // =========================================================================
    //  CICLO DE VIDA DA ASSINATURA
    // =========================================================================

    pub async fn create_subscription(
        &self,
        customer_id: Uuid,
        address_id: Option<Uuid>,
        frequency: SubscriptionFrequency,
        delivery_fee: Decimal,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        preferred_delivery_day: Option<&str>,
        items: &[(Uuid, Decimal, bool)],
        actor_id: Uuid,
    ) -> Result<Subscription, AppError> {
        if items.is_empty() {
            return Err(AppError::InvalidPayload(
                "A assinatura precisa de pelo menos um item.".into(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        if let Some(id) = address_id {
            let address = self.catalog_repo.get_address(&mut *tx, id).await?;
            if address.customer_id != customer_id {
                return Err(AppError::InvalidPayload(
                    "O endereço informado não pertence ao cliente.".into(),
                ));
            }
        }

        // base_price de referência: soma dos itens ao preço atual do catálogo.
        let mut base_price = Decimal::ZERO;
        for (product_id, quantity, _) in items {
            if *quantity <= Decimal::ZERO {
                return Err(AppError::InvalidPayload(
                    "Quantidade do item deve ser maior que zero.".into(),
                ));
            }
            let product = self.catalog_repo.get_product(&mut *tx, *product_id).await?;
            base_price += product.base_price * quantity;
        }

        let subscription = self
            .repo
            .create(
                &mut *tx,
                customer_id,
                address_id,
                frequency,
                base_price,
                delivery_fee,
                start_date,
                end_date,
                preferred_delivery_day,
            )
            .await?;

        for (product_id, quantity, is_flexible) in items {
            self.repo
                .insert_item(&mut *tx, subscription.id, *product_id, *quantity, *is_flexible)
                .await?;
        }

        self.audit_repo
            .append(
                &mut *tx,
                actor_id,
                "SUBSCRIPTION_CREATED",
                "subscription",
                subscription.id,
                json!({
                    "frequency": subscription.frequency,
                    "startDate": subscription.start_date,
                    "basePrice": subscription.base_price,
                }),
            )
            .await?;

        tx.commit().await?;
        Ok(subscription)
    }

    pub async fn pause(
        &self,
        subscription_id: Uuid,
        reason: Option<&str>,
        actor_id: Uuid,
    ) -> Result<Subscription, AppError> {
        let mut tx = self.pool.begin().await?;

        let subscription = self.repo.get_for_update(&mut *tx, subscription_id).await?;
        if subscription.status == SubscriptionStatus::Cancelled {
            return Err(AppError::InvalidPayload(
                "Assinatura cancelada não pode ser pausada.".into(),
            ));
        }

        let paused = self
            .repo
            .set_status(&mut *tx, subscription_id, SubscriptionStatus::Paused)
            .await?;

        self.audit_repo
            .append(
                &mut *tx,
                actor_id,
                "SUBSCRIPTION_PAUSED",
                "subscription",
                subscription_id,
                json!({ "previousStatus": subscription.status, "reason": reason }),
            )
            .await?;

        tx.commit().await?;
        Ok(paused)
    }

    /// Reativa e reprograma o cursor a partir de hoje mais um passo da
    /// frequência. Ciclos perdidos durante a pausa não são recuperados.
    pub async fn resume(
        &self,
        subscription_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Subscription, AppError> {
        let mut tx = self.pool.begin().await?;

        let subscription = self.repo.get_for_update(&mut *tx, subscription_id).await?;
        if subscription.status == SubscriptionStatus::Cancelled {
            return Err(AppError::InvalidPayload(
                "Assinatura cancelada não pode ser reativada.".into(),
            ));
        }

        let today = Utc::now().date_naive();
        let next_order_date = dates::advance_by_frequency(today, subscription.frequency);

        self.repo
            .set_status(&mut *tx, subscription_id, SubscriptionStatus::Active)
            .await?;
        let resumed = self
            .repo
            .set_next_order_date(&mut *tx, subscription_id, next_order_date)
            .await?;

        self.audit_repo
            .append(
                &mut *tx,
                actor_id,
                "SUBSCRIPTION_RESUMED",
                "subscription",
                subscription_id,
                json!({ "nextOrderDate": next_order_date }),
            )
            .await?;

        tx.commit().await?;
        Ok(resumed)
    }

    pub async fn cancel(
        &self,
        subscription_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Subscription, AppError> {
        let mut tx = self.pool.begin().await?;

        let subscription = self.repo.get_for_update(&mut *tx, subscription_id).await?;
        if subscription.status == SubscriptionStatus::Cancelled {
            return Ok(subscription);
        }

        let cancelled = self
            .repo
            .set_status(&mut *tx, subscription_id, SubscriptionStatus::Cancelled)
            .await?;

        self.audit_repo
            .append(
                &mut *tx,
                actor_id,
                "SUBSCRIPTION_CANCELLED",
                "subscription",
                subscription_id,
                json!({ "previousStatus": subscription.status }),
            )
            .await?;

        tx.commit().await?;
        Ok(cancelled)
    }

    pub async fn skip_date(
        &self,
        subscription_id: Uuid,
        skip_date: NaiveDate,
        reason: Option<&str>,
        actor_id: Uuid,
    ) -> Result<SubscriptionSkip, AppError> {
        let mut tx = self.pool.begin().await?;

        // Garante que a assinatura existe antes de aceitar o skip.
        self.repo.get(&mut *tx, subscription_id).await?;

        let skip = self
            .repo
            .insert_skip(&mut *tx, subscription_id, skip_date, reason)
            .await?;

        self.audit_repo
            .append(
                &mut *tx,
                actor_id,
                "SUBSCRIPTION_DATE_SKIPPED",
                "subscription",
                subscription_id,
                json!({ "skipDate": skip_date, "reason": reason }),
            )
            .await?;

        tx.commit().await?;
        Ok(skip)
    }

    /// Substituição completa da cesta: apaga tudo e recria, sem diff.
    pub async fn update_items(
        &self,
        subscription_id: Uuid,
        items: &[(Uuid, Decimal, bool)],
        actor_id: Uuid,
    ) -> Result<Vec<SubscriptionItem>, AppError> {
        if items.is_empty() {
            return Err(AppError::InvalidPayload(
                "A assinatura precisa de pelo menos um item.".into(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        self.repo.get_for_update(&mut *tx, subscription_id).await?;
        self.repo.delete_items(&mut *tx, subscription_id).await?;

        let mut created = Vec::with_capacity(items.len());
        for (product_id, quantity, is_flexible) in items {
            if *quantity <= Decimal::ZERO {
                return Err(AppError::InvalidPayload(
                    "Quantidade do item deve ser maior que zero.".into(),
                ));
            }
            let item = self
                .repo
                .insert_item(&mut *tx, subscription_id, *product_id, *quantity, *is_flexible)
                .await?;
            created.push(item);
        }

        self.audit_repo
            .append(
                &mut *tx,
                actor_id,
                "SUBSCRIPTION_ITEMS_REPLACED",
                "subscription",
                subscription_id,
                json!({ "itemCount": created.len() }),
            )
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    pub async fn get_subscription(&self, subscription_id: Uuid) -> Result<Subscription, AppError> {
        self.repo.get(&self.pool, subscription_id).await
    }
}
