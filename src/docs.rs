// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};

use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Orders ---
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::transition_order,
        handlers::orders::report_unavailable_items,

        // --- Substitutions ---
        handlers::substitutions::propose_substitution,
        handlers::substitutions::approve_substitution,
        handlers::substitutions::reject_substitution,
        handlers::substitutions::auto_approve_substitutions,
        handlers::substitutions::suggested_substitutes,

        // --- Subscriptions ---
        handlers::subscriptions::create_subscription,
        handlers::subscriptions::get_subscription,
        handlers::subscriptions::pause_subscription,
        handlers::subscriptions::resume_subscription,
        handlers::subscriptions::cancel_subscription,
        handlers::subscriptions::skip_subscription_date,
        handlers::subscriptions::update_subscription_items,

        // --- Cron ---
        handlers::cron::daily_subscriptions,
        handlers::cron::weekly_buying_cycle,

        // --- Audit ---
        handlers::audit::query_audit_log,
    ),
    components(
        schemas(
            // --- Orders ---
            models::orders::OrderStatus,
            models::orders::Order,
            models::orders::OrderItem,
            models::orders::OrderDetail,
            models::orders::ShoppingListRow,

            // --- Substitutions ---
            models::substitutions::SubstitutionStatus,
            models::substitutions::Substitution,

            // --- Subscriptions ---
            models::subscriptions::SubscriptionFrequency,
            models::subscriptions::SubscriptionStatus,
            models::subscriptions::Subscription,
            models::subscriptions::SubscriptionItem,
            models::subscriptions::SubscriptionSkip,

            // --- Catalog ---
            models::catalog::Product,
            models::catalog::Address,

            // --- Audit ---
            models::audit::AuditLog,

            // --- Resultados de lote ---
            services::order_service::BuyingCycleOutcome,
            services::order_service::ShoppingList,
            services::subscription_service::GenerationOutcome,
            handlers::cron::WeeklyCycleResponse,

            // --- Payloads ---
            handlers::orders::OrderItemPayload,
            handlers::orders::CreateOrderPayload,
            handlers::orders::TransitionOrderPayload,
            handlers::orders::UnavailableItemsPayload,
            handlers::substitutions::ProposeSubstitutionPayload,
            handlers::substitutions::ResolveSubstitutionPayload,
            handlers::substitutions::AutoApprovePayload,
            handlers::subscriptions::SubscriptionItemPayload,
            handlers::subscriptions::CreateSubscriptionPayload,
            handlers::subscriptions::ActorPayload,
            handlers::subscriptions::PauseSubscriptionPayload,
            handlers::subscriptions::SkipDatePayload,
            handlers::subscriptions::UpdateItemsPayload,
        )
    ),
    tags(
        (name = "Orders", description = "Ciclo de vida do pedido (máquina de estados)"),
        (name = "Substitutions", description = "Propostas e resolução de substituições"),
        (name = "Subscriptions", description = "Assinaturas recorrentes e geração de pedidos"),
        (name = "Cron", description = "Gatilhos agendados (diário e semanal)"),
        (name = "Audit", description = "Trilha de auditoria append-only")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "cron_secret",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
