// src/db/subscriptions_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::subscriptions::{
        Subscription, SubscriptionFrequency, SubscriptionItem, SubscriptionSkip,
        SubscriptionStatus,
    },
};

#[derive(Clone)]
pub struct SubscriptionsRepository {
    pool: PgPool,
}

impl SubscriptionsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  ASSINATURAS
    // =========================================================================

    pub async fn create<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        address_id: Option<Uuid>,
        frequency: SubscriptionFrequency,
        base_price: Decimal,
        delivery_fee: Decimal,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        preferred_delivery_day: Option<&str>,
    ) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (
                customer_id, address_id, frequency,
                base_price, delivery_fee,
                start_date, end_date, next_order_date, preferred_delivery_day
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $6, $8)
            RETURNING *
            "#,
        )
        .bind(customer_id)
        .bind(address_id)
        .bind(frequency)
        .bind(base_price)
        .bind(delivery_fee)
        .bind(start_date)
        .bind(end_date)
        .bind(preferred_delivery_day)
        .fetch_one(executor)
        .await?;

        Ok(subscription)
    }

    pub async fn get<'e, E>(
        &self,
        executor: E,
        subscription_id: Uuid,
    ) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscription =
            sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = $1")
                .bind(subscription_id)
                .fetch_optional(executor)
                .await?
                .ok_or_else(|| {
                    AppError::ResourceNotFound(format!("Assinatura {}", subscription_id))
                })?;

        Ok(subscription)
    }

    pub async fn get_for_update<'e, E>(
        &self,
        executor: E,
        subscription_id: Uuid,
    ) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscription = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE id = $1 FOR UPDATE",
        )
        .bind(subscription_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::ResourceNotFound(format!("Assinatura {}", subscription_id)))?;

        Ok(subscription)
    }

    /// Assinaturas devidas: ativas, com cursor vencido e dentro da vigência.
    pub async fn list_due<'e, E>(
        &self,
        executor: E,
        today: NaiveDate,
    ) -> Result<Vec<Subscription>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscriptions = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT * FROM subscriptions
            WHERE status = 'ACTIVE'
              AND next_order_date <= $1
              AND (end_date IS NULL OR end_date >= $1)
            ORDER BY next_order_date
            "#,
        )
        .bind(today)
        .fetch_all(executor)
        .await?;

        Ok(subscriptions)
    }

    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        subscription_id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET status = $2,
                paused_at = CASE WHEN $2 = 'PAUSED'::subscription_status THEN NOW() ELSE NULL END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(subscription_id)
        .bind(status)
        .fetch_one(executor)
        .await?;

        Ok(subscription)
    }

    /// Avança o cursor de agendamento. Sempre chamado na MESMA transação que
    /// insere o pedido gerado; rerodar o job no mesmo dia não gera dobrado.
    pub async fn advance_cursor<'e, E>(
        &self,
        executor: E,
        subscription_id: Uuid,
        next_order_date: NaiveDate,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE subscriptions SET next_order_date = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(subscription_id)
        .bind(next_order_date)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn set_next_order_date<'e, E>(
        &self,
        executor: E,
        subscription_id: Uuid,
        next_order_date: NaiveDate,
    ) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET next_order_date = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(subscription_id)
        .bind(next_order_date)
        .fetch_one(executor)
        .await?;

        Ok(subscription)
    }

    // =========================================================================
    //  SKIPS
    // =========================================================================

    pub async fn has_skip<'e, E>(
        &self,
        executor: E,
        subscription_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM subscription_skips WHERE subscription_id = $1 AND skip_date = $2)",
        )
        .bind(subscription_id)
        .bind(date)
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }

    pub async fn insert_skip<'e, E>(
        &self,
        executor: E,
        subscription_id: Uuid,
        skip_date: NaiveDate,
        reason: Option<&str>,
    ) -> Result<SubscriptionSkip, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let skip = sqlx::query_as::<_, SubscriptionSkip>(
            r#"
            INSERT INTO subscription_skips (subscription_id, skip_date, reason)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(subscription_id)
        .bind(skip_date)
        .bind(reason)
        .fetch_one(executor)
        .await?;

        Ok(skip)
    }

    // =========================================================================
    //  ITENS (replace completo, sem diff)
    // =========================================================================

    pub async fn delete_items<'e, E>(
        &self,
        executor: E,
        subscription_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM subscription_items WHERE subscription_id = $1")
            .bind(subscription_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn insert_item<'e, E>(
        &self,
        executor: E,
        subscription_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
        is_flexible: bool,
    ) -> Result<SubscriptionItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, SubscriptionItem>(
            r#"
            INSERT INTO subscription_items (subscription_id, product_id, quantity, is_flexible)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(subscription_id)
        .bind(product_id)
        .bind(quantity)
        .bind(is_flexible)
        .fetch_one(executor)
        .await?;

        Ok(item)
    }

    pub async fn list_items<'e, E>(
        &self,
        executor: E,
        subscription_id: Uuid,
    ) -> Result<Vec<SubscriptionItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, SubscriptionItem>(
            "SELECT * FROM subscription_items WHERE subscription_id = $1",
        )
        .bind(subscription_id)
        .fetch_all(executor)
        .await?;

        Ok(items)
    }
}
