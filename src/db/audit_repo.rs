// src/db/audit_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::audit::{AuditLog, AuditQuery},
};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 500;

// Trilha de auditoria append-only. Só INSERT e SELECT, nunca UPDATE/DELETE.
#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append<'e, E>(
        &self,
        executor: E,
        actor_id: Uuid,
        action: &str,
        entity: &str,
        entity_id: Uuid,
        metadata: serde_json::Value,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO audit_log (actor_id, action, entity, entity_id, metadata)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(actor_id)
        .bind(action)
        .bind(entity)
        .bind(entity_id)
        .bind(metadata)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Consulta paginada com filtros opcionais (entidade, ação, ator, período).
    pub async fn query(&self, filter: &AuditQuery) -> Result<Vec<AuditLog>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM audit_log WHERE 1 = 1");

        if let Some(entity) = &filter.entity {
            qb.push(" AND entity = ").push_bind(entity);
        }
        if let Some(entity_id) = filter.entity_id {
            qb.push(" AND entity_id = ").push_bind(entity_id);
        }
        if let Some(action) = &filter.action {
            qb.push(" AND action = ").push_bind(action);
        }
        if let Some(actor_id) = filter.actor_id {
            qb.push(" AND actor_id = ").push_bind(actor_id);
        }
        if let Some(from) = filter.from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND created_at <= ").push_bind(to);
        }

        let page = filter.page.unwrap_or(1).max(1);
        let page_size = filter
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page_size)
            .push(" OFFSET ")
            .push_bind((page - 1) * page_size);

        let logs = qb
            .build_query_as::<AuditLog>()
            .fetch_all(&self.pool)
            .await?;

        Ok(logs)
    }
}
