// src/db/catalog_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::catalog::{Address, Product},
};

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_product<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Produto {}", product_id)))?;

        Ok(product)
    }

    /// Candidatos a substituto: mesma categoria, ativos, preço dentro de
    /// ±20% do original, ordenados do mais barato para o mais caro.
    pub async fn find_substitute_candidates<'e, E>(
        &self,
        executor: E,
        product: &Product,
        limit: i64,
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let candidates = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE category_id = $1
              AND id <> $2
              AND is_active = TRUE
              AND base_price BETWEEN $3 * 0.8 AND $3 * 1.2
            ORDER BY base_price ASC
            LIMIT $4
            "#,
        )
        .bind(product.category_id)
        .bind(product.id)
        .bind(product.base_price)
        .bind(limit)
        .fetch_all(executor)
        .await?;

        Ok(candidates)
    }

    /// Sugestões para o cliente: mesma categoria E mesmo tipo, destaque
    /// primeiro, depois preço crescente. Leitura pura.
    pub async fn suggested_substitutes<'e, E>(
        &self,
        executor: E,
        product: &Product,
        limit: i64,
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let suggestions = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE category_id = $1
              AND product_type = $2
              AND id <> $3
              AND is_active = TRUE
            ORDER BY is_featured DESC, base_price ASC
            LIMIT $4
            "#,
        )
        .bind(product.category_id)
        .bind(&product.product_type)
        .bind(product.id)
        .bind(limit)
        .fetch_all(executor)
        .await?;

        Ok(suggestions)
    }

    pub async fn get_address<'e, E>(
        &self,
        executor: E,
        address_id: Uuid,
    ) -> Result<Address, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let address = sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE id = $1")
            .bind(address_id)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Endereço {}", address_id)))?;

        Ok(address)
    }

    pub async fn get_default_address<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
    ) -> Result<Option<Address>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let address = sqlx::query_as::<_, Address>(
            r#"
            SELECT * FROM addresses
            WHERE customer_id = $1 AND is_default = TRUE
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(executor)
        .await?;

        Ok(address)
    }
}
