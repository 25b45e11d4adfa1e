// src/db/substitutions_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::substitutions::{Substitution, SubstitutionStatus},
};

#[derive(Clone)]
pub struct SubstitutionsRepository {
    pool: PgPool,
}

impl SubstitutionsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        order_item_id: Uuid,
        original_product_id: Uuid,
        substitute_product_id: Uuid,
        original_quantity: Decimal,
        substitute_quantity: Decimal,
        original_price: Decimal,
        substitute_price: Decimal,
        reason: Option<&str>,
    ) -> Result<Substitution, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let substitution = sqlx::query_as::<_, Substitution>(
            r#"
            INSERT INTO substitutions (
                order_id, order_item_id,
                original_product_id, substitute_product_id,
                original_quantity, substitute_quantity,
                original_price, substitute_price, price_difference,
                reason
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8 - $7, $9)
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(order_item_id)
        .bind(original_product_id)
        .bind(substitute_product_id)
        .bind(original_quantity)
        .bind(substitute_quantity)
        .bind(original_price)
        .bind(substitute_price)
        .bind(reason)
        .fetch_one(executor)
        .await?;

        Ok(substitution)
    }

    pub async fn get_for_update<'e, E>(
        &self,
        executor: E,
        substitution_id: Uuid,
    ) -> Result<Substitution, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let substitution = sqlx::query_as::<_, Substitution>(
            "SELECT * FROM substitutions WHERE id = $1 FOR UPDATE",
        )
        .bind(substitution_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::ResourceNotFound(format!("Substituição {}", substitution_id)))?;

        Ok(substitution)
    }

    /// Resolve uma substituição (aprovada ou rejeitada). One-way: o service
    /// garante que só substituições PENDING chegam aqui.
    pub async fn resolve<'e, E>(
        &self,
        executor: E,
        substitution_id: Uuid,
        new_status: SubstitutionStatus,
        customer_response: Option<&str>,
    ) -> Result<Substitution, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let substitution = sqlx::query_as::<_, Substitution>(
            r#"
            UPDATE substitutions
            SET status = $2, customer_response = $3, responded_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(substitution_id)
        .bind(new_status)
        .bind(customer_response)
        .fetch_one(executor)
        .await?;

        Ok(substitution)
    }

    /// Resolve em lote as candidatas PENDING restantes do MESMO item quando
    /// uma delas é aprovada. Superadas viram REJECTED sem nenhum efeito
    /// sobre o item ou os totais do pedido.
    pub async fn supersede_pending_for_item<'e, E>(
        &self,
        executor: E,
        order_item_id: Uuid,
        approved_substitution_id: Uuid,
        customer_response: &str,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE substitutions
            SET status = 'REJECTED', customer_response = $3, responded_at = NOW()
            WHERE order_item_id = $1
              AND id <> $2
              AND status = 'PENDING'
            "#,
        )
        .bind(order_item_id)
        .bind(approved_substitution_id)
        .bind(customer_response)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn count_pending_for_order<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM substitutions WHERE order_id = $1 AND status = 'PENDING'",
        )
        .bind(order_id)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }

    pub async fn list_pending_zero_difference<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
    ) -> Result<Vec<Substitution>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let substitutions = sqlx::query_as::<_, Substitution>(
            r#"
            SELECT * FROM substitutions
            WHERE order_id = $1 AND status = 'PENDING' AND price_difference = 0
            ORDER BY proposed_at
            "#,
        )
        .bind(order_id)
        .fetch_all(executor)
        .await?;

        Ok(substitutions)
    }

    pub async fn list_for_order<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
    ) -> Result<Vec<Substitution>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let substitutions = sqlx::query_as::<_, Substitution>(
            "SELECT * FROM substitutions WHERE order_id = $1 ORDER BY proposed_at",
        )
        .bind(order_id)
        .fetch_all(executor)
        .await?;

        Ok(substitutions)
    }
}
