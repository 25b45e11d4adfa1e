// src/services/notification_service.rs

use uuid::Uuid;

// Eventos que geram aviso ao cliente ou à equipe de separação.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationEvent {
    OrderConfirmed,
    SourcingStarted,
    SubstitutionNeeded,
    OutForDelivery,
}

impl NotificationEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationEvent::OrderConfirmed => "ORDER_CONFIRMED",
            NotificationEvent::SourcingStarted => "SOURCING_STARTED",
            NotificationEvent::SubstitutionNeeded => "SUBSTITUTION_NEEDED",
            NotificationEvent::OutForDelivery => "OUT_FOR_DELIVERY",
        }
    }
}

#[derive(Clone, Default)]
pub struct NotificationService;

impl NotificationService {
    pub fn new() -> Self {
        Self
    }

    /// Fire-and-forget: roda em uma task separada e NUNCA bloqueia nem falha
    /// a mutação que disparou o evento. Erros são logados e engolidos.
    pub fn notify(
        &self,
        event: NotificationEvent,
        order_id: Uuid,
        order_number: &str,
        customer_id: Uuid,
    ) {
        let order_number = order_number.to_string();
        tokio::spawn(async move {
            if let Err(e) = deliver(event, order_id, &order_number, customer_id).await {
                tracing::warn!(
                    evento = event.as_str(),
                    %order_id,
                    "falha ao enviar notificação: {e}"
                );
            }
        });
    }
}

// O mecanismo de entrega (e-mail/SMS/push) fica fora deste núcleo; aqui o
// evento é publicado no log estruturado para o coletor externo.
async fn deliver(
    event: NotificationEvent,
    order_id: Uuid,
    order_number: &str,
    customer_id: Uuid,
) -> anyhow::Result<()> {
    tracing::info!(
        evento = event.as_str(),
        %order_id,
        %order_number,
        %customer_id,
        "notificação publicada"
    );
    Ok(())
}
