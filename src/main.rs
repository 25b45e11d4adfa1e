//src/main.rs

use axum::{
    Router,
    routing::{get, post, put},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod services;

use crate::config::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é adequado aqui: se a configuração falhar, a aplicação não
    // deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let order_routes = Router::new()
        .route("/", post(handlers::orders::create_order))
        .route("/{order_id}", get(handlers::orders::get_order))
        .route(
            "/{order_id}/transition",
            post(handlers::orders::transition_order),
        )
        .route(
            "/{order_id}/unavailable-items",
            post(handlers::orders::report_unavailable_items),
        )
        .route(
            "/{order_id}/substitutions/auto-approve",
            post(handlers::substitutions::auto_approve_substitutions),
        );

    let substitution_routes = Router::new()
        .route("/", post(handlers::substitutions::propose_substitution))
        .route(
            "/{substitution_id}/approve",
            post(handlers::substitutions::approve_substitution),
        )
        .route(
            "/{substitution_id}/reject",
            post(handlers::substitutions::reject_substitution),
        );

    let subscription_routes = Router::new()
        .route("/", post(handlers::subscriptions::create_subscription))
        .route(
            "/{subscription_id}",
            get(handlers::subscriptions::get_subscription),
        )
        .route(
            "/{subscription_id}/pause",
            post(handlers::subscriptions::pause_subscription),
        )
        .route(
            "/{subscription_id}/resume",
            post(handlers::subscriptions::resume_subscription),
        )
        .route(
            "/{subscription_id}/cancel",
            post(handlers::subscriptions::cancel_subscription),
        )
        .route(
            "/{subscription_id}/skip",
            post(handlers::subscriptions::skip_subscription_date),
        )
        .route(
            "/{subscription_id}/items",
            put(handlers::subscriptions::update_subscription_items),
        );

    let cron_routes = Router::new()
        .route(
            "/daily-subscriptions",
            get(handlers::cron::daily_subscriptions),
        )
        .route(
            "/weekly-buying-cycle",
            get(handlers::cron::weekly_buying_cycle),
        );

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route(
            "/api/products/{product_id}/suggested-substitutes",
            get(handlers::substitutions::suggested_substitutes),
        )
        .route("/api/audit", get(handlers::audit::query_audit_log))
        .nest("/api/orders", order_routes)
        .nest("/api/substitutions", substitution_routes)
        .nest("/api/subscriptions", subscription_routes)
        .nest("/api/cron", cron_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state);

    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.expect("Erro no servidor Axum");
}
