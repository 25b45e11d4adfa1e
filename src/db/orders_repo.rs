// src/db/orders_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::orders::{Order, OrderItem, OrderStatus, ShoppingListRow},
};

#[derive(Clone)]
pub struct OrdersRepository {
    pool: PgPool,
}

impl OrdersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  PEDIDOS
    // =========================================================================

    pub async fn create_order<'e, E>(
        &self,
        executor: E,
        order_number: &str,
        customer_id: Uuid,
        address_id: Uuid,
        subtotal: Decimal,
        delivery_fee: Decimal,
        discount: Decimal,
        total: Decimal,
        requested_delivery_date: NaiveDate,
        week_number: i32,
        buying_cycle_date: NaiveDate,
        subscription_id: Option<Uuid>,
        internal_notes: &str,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (
                order_number, customer_id, address_id,
                subtotal, delivery_fee, discount, total,
                requested_delivery_date, week_number, buying_cycle_date,
                subscription_id, is_subscription_order, internal_notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11 IS NOT NULL, $12)
            RETURNING *
            "#,
        )
        .bind(order_number)
        .bind(customer_id)
        .bind(address_id)
        .bind(subtotal)
        .bind(delivery_fee)
        .bind(discount)
        .bind(total)
        .bind(requested_delivery_date)
        .bind(week_number)
        .bind(buying_cycle_date)
        .bind(subscription_id)
        .bind(internal_notes)
        .fetch_one(executor)
        .await?;

        Ok(order)
    }

    pub async fn get_order<'e, E>(&self, executor: E, order_id: Uuid) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Pedido {}", order_id)))?;

        Ok(order)
    }

    /// Busca o pedido travando a linha (FOR UPDATE). Toda mutação de totais
    /// ou de status serializa neste lock para não perder updates
    /// concorrentes.
    pub async fn get_order_for_update<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(order_id)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Pedido {}", order_id)))?;

        Ok(order)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // A coluna extra vem de um match sobre o enum, nunca de input do caller.
        let set_timestamp = match new_status.timestamp_column() {
            Some(column) => format!(", {} = NOW()", column),
            None => String::new(),
        };

        let sql = format!(
            "UPDATE orders SET status = $1, updated_at = NOW(){} WHERE id = $2 RETURNING *",
            set_timestamp
        );

        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(new_status)
            .bind(order_id)
            .fetch_one(executor)
            .await?;

        Ok(order)
    }

    pub async fn append_internal_note<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        note: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE orders SET internal_notes = internal_notes || $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(order_id)
        .bind(note)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Ajuste RELATIVO de totais (subtotal e total recebem o mesmo delta).
    /// Update relativo no próprio SQL: duas resoluções concorrentes de
    /// substituição nunca perdem um delta.
    pub async fn adjust_totals<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        delta: Decimal,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET subtotal = subtotal + $2,
                total = total + $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(delta)
        .fetch_one(executor)
        .await?;

        Ok(order)
    }

    pub async fn list_paid_orders_for_cycle<'e, E>(
        &self,
        executor: E,
        cycle_date: NaiveDate,
    ) -> Result<Vec<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE status = 'PAID'
              AND buying_cycle_date = $1
              AND is_subscription_order = FALSE
            ORDER BY created_at
            "#,
        )
        .bind(cycle_date)
        .fetch_all(executor)
        .await?;

        Ok(orders)
    }

    /// Sequência diária para o número do pedido (prefixo + data + contagem).
    pub async fn count_orders_created_on<'e, E>(
        &self,
        executor: E,
        date: NaiveDate,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Cast fixado em UTC: o `::date` puro depende do TimeZone da sessão
        // e quebraria a sequência diária perto da meia-noite.
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM orders WHERE (created_at AT TIME ZONE 'UTC')::date = $1",
        )
        .bind(date)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }

    // =========================================================================
    //  ITENS
    // =========================================================================

    pub async fn add_order_item<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
        unit_price: Decimal,
        total_price: Decimal,
    ) -> Result<OrderItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, OrderItem>(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, unit_price, total_price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price)
        .bind(total_price)
        .fetch_one(executor)
        .await?;

        Ok(item)
    }

    pub async fn get_order_item<'e, E>(
        &self,
        executor: E,
        order_item_id: Uuid,
    ) -> Result<OrderItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE id = $1")
            .bind(order_item_id)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Item {}", order_item_id)))?;

        Ok(item)
    }

    pub async fn list_order_items<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
    ) -> Result<Vec<OrderItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items =
            sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1")
                .bind(order_id)
                .fetch_all(executor)
                .await?;

        Ok(items)
    }

    /// Reescreve o item in-place quando uma substituição é aprovada:
    /// produto, quantidade e preços trocados, item marcado como separado.
    pub async fn apply_substitution_to_item<'e, E>(
        &self,
        executor: E,
        order_item_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
        unit_price: Decimal,
        total_price: Decimal,
    ) -> Result<OrderItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, OrderItem>(
            r#"
            UPDATE order_items
            SET product_id = $2,
                quantity = $3,
                unit_price = $4,
                total_price = $5,
                is_sourced = TRUE,
                sourced_qty = $3,
                unavailable = FALSE
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(order_item_id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price)
        .bind(total_price)
        .fetch_one(executor)
        .await?;

        Ok(item)
    }

    pub async fn mark_item_unavailable<'e, E>(
        &self,
        executor: E,
        order_item_id: Uuid,
    ) -> Result<OrderItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, OrderItem>(
            r#"
            UPDATE order_items
            SET unavailable = TRUE, is_sourced = FALSE, sourced_qty = 0
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(order_item_id)
        .fetch_one(executor)
        .await?;

        Ok(item)
    }

    /// Verdadeiro quando todo item do pedido já está separado ou indisponível.
    pub async fn all_items_resolved<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let resolved = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT NOT EXISTS (
                SELECT 1 FROM order_items
                WHERE order_id = $1 AND is_sourced = FALSE AND unavailable = FALSE
            )
            "#,
        )
        .bind(order_id)
        .fetch_one(executor)
        .await?;

        Ok(resolved)
    }

    // =========================================================================
    //  LISTA DE COMPRAS SEMANAL
    // =========================================================================

    /// Agrega todos os pedidos PAGOS do ciclo por produto, somando quantidades
    /// e listando os números de pedido que contribuem.
    pub async fn shopping_list_for_cycle<'e, E>(
        &self,
        executor: E,
        cycle_date: NaiveDate,
    ) -> Result<Vec<ShoppingListRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ShoppingListRow>(
            r#"
            SELECT
                p.id AS product_id,
                p.name AS product_name,
                SUM(oi.quantity) AS total_quantity,
                ARRAY_AGG(DISTINCT o.order_number) AS order_numbers
            FROM orders o
            JOIN order_items oi ON oi.order_id = o.id
            JOIN products p ON p.id = oi.product_id
            WHERE o.status = 'PAID'
              AND o.buying_cycle_date = $1
              AND oi.unavailable = FALSE
            GROUP BY p.id, p.name
            ORDER BY p.name
            "#,
        )
        .bind(cycle_date)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }
}
