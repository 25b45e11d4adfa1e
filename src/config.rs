// src/config.rs

use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{env, time::Duration};

use crate::{
    db::{
        AuditRepository, CatalogRepository, OrdersRepository, SubscriptionsRepository,
        SubstitutionsRepository,
    },
    services::{NotificationService, OrderService, SubscriptionService, SubstitutionService},
};

const DEFAULT_ORDER_PREFIX: &str = "FR";

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    // Segredo compartilhado com o scheduler externo (endpoints /api/cron/*)
    pub cron_secret: String,
    pub order_service: OrderService,
    pub substitution_service: SubstitutionService,
    pub subscription_service: SubscriptionService,
    pub audit_repo: AuditRepository,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let cron_secret = env::var("CRON_SECRET").expect("CRON_SECRET deve ser definido");
        let order_prefix =
            env::var("ORDER_NUMBER_PREFIX").unwrap_or_else(|_| DEFAULT_ORDER_PREFIX.to_string());

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let orders_repo = OrdersRepository::new(db_pool.clone());
        let catalog_repo = CatalogRepository::new(db_pool.clone());
        let substitutions_repo = SubstitutionsRepository::new(db_pool.clone());
        let subscriptions_repo = SubscriptionsRepository::new(db_pool.clone());
        let audit_repo = AuditRepository::new(db_pool.clone());
        let notifications = NotificationService::new();

        let order_service = OrderService::new(
            orders_repo.clone(),
            catalog_repo.clone(),
            substitutions_repo.clone(),
            audit_repo.clone(),
            notifications.clone(),
            db_pool.clone(),
            order_prefix,
        );

        let substitution_service = SubstitutionService::new(
            substitutions_repo,
            orders_repo.clone(),
            catalog_repo.clone(),
            audit_repo.clone(),
            order_service.clone(),
            notifications,
            db_pool.clone(),
        );

        let subscription_service = SubscriptionService::new(
            subscriptions_repo,
            orders_repo,
            catalog_repo,
            audit_repo.clone(),
            order_service.clone(),
            db_pool.clone(),
        );

        Ok(Self {
            db_pool,
            cron_secret,
            order_service,
            substitution_service,
            subscription_service,
            audit_repo,
        })
    }
}
