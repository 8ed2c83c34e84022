//! Best-effort event emission over NATS.
//!
//! The bus is optional: without a configured NATS connection every
//! publish is a no-op. Publish failures are logged and swallowed; event
//! delivery never gates an order mutation.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Cancelled {
        order_id: Uuid,
        refunded: bool,
    },
    StatusChanged {
        order_id: Uuid,
        field: String,
        previous_value: String,
        new_value: String,
    },
}

impl OrderEvent {
    fn subject(&self) -> &'static str {
        match self {
            OrderEvent::Cancelled { .. } => "orders.cancelled",
            OrderEvent::StatusChanged { .. } => "orders.status_changed",
        }
    }
}

#[derive(Clone, Default)]
pub struct EventBus {
    nats: Option<async_nats::Client>,
}

impl EventBus {
    pub fn new(nats: Option<async_nats::Client>) -> Self {
        Self { nats }
    }

    pub fn disabled() -> Self {
        Self { nats: None }
    }

    pub async fn publish(&self, event: OrderEvent) {
        let Some(client) = &self.nats else {
            return;
        };
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("failed to encode order event: {e}");
                return;
            }
        };
        let subject = event.subject();
        if let Err(e) = client.publish(subject.to_string(), payload.into()).await {
            tracing::warn!("failed to publish {subject}: {e}");
        }
    }
}
