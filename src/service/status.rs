//! General status mutation path.
//!
//! Handles every non-cancellation transition across the three status
//! axes. Proposed values are validated against their enumerations
//! before anything is written; each field that actually changes gets
//! exactly one audit entry. A proposed order status of `cancelled`
//! delegates to [`CancellationService`] so refund dispatch and the
//! cancelled-at timestamp live in a single code path.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{
    FulfillmentStatus, NewStatusHistoryEntry, Order, OrderStatus, PaymentStatus, StatusField,
};
use crate::events::{EventBus, OrderEvent};
use crate::storage::{OrderChanges, OrderStore};
use crate::{OrderError, Result};

use super::CancellationService;

/// Proposed field values; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub fulfillment_status: Option<String>,
}

pub struct StatusUpdateService {
    store: Arc<dyn OrderStore>,
    cancellations: Arc<CancellationService>,
    events: EventBus,
}

impl StatusUpdateService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        cancellations: Arc<CancellationService>,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            cancellations,
            events,
        }
    }

    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        update: StatusUpdate,
        actor: &str,
        reason: Option<String>,
    ) -> Result<Order> {
        let mut order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        // Validate every proposed value before any write.
        let proposed_status = update
            .status
            .as_deref()
            .map(OrderStatus::parse)
            .transpose()?;
        let proposed_payment = update
            .payment_status
            .as_deref()
            .map(PaymentStatus::parse)
            .transpose()?;
        let proposed_fulfillment = update
            .fulfillment_status
            .as_deref()
            .map(FulfillmentStatus::parse)
            .transpose()?;

        // Cancellation never goes through the generic field write.
        if proposed_status == Some(OrderStatus::Cancelled)
            && order.order_status()? != OrderStatus::Cancelled
        {
            let result = self
                .cancellations
                .cancel_order(order_id, actor, reason.clone())
                .await?;
            order = result.order;
        }

        let now = Utc::now();
        let mut changes = OrderChanges::default();
        let mut entries = Vec::new();

        if let Some(new_status) = proposed_status {
            let current = order.order_status()?;
            if new_status != OrderStatus::Cancelled && new_status != current {
                changes.status = Some(new_status.as_str().to_string());
                entries.push(NewStatusHistoryEntry::new(
                    order_id,
                    StatusField::Status,
                    current.as_str(),
                    new_status.as_str(),
                    actor,
                    reason.clone(),
                ));
            }
        }

        if let Some(new_payment) = proposed_payment {
            let current = order.payment_status()?;
            if new_payment != current {
                changes.payment_status = Some(new_payment.as_str().to_string());
                if new_payment == PaymentStatus::Paid && order.paid_at.is_none() {
                    changes.paid_at = Some(now);
                }
                entries.push(NewStatusHistoryEntry::new(
                    order_id,
                    StatusField::PaymentStatus,
                    current.as_str(),
                    new_payment.as_str(),
                    actor,
                    reason.clone(),
                ));
            }
        }

        if let Some(new_fulfillment) = proposed_fulfillment {
            let current = order.fulfillment_status()?;
            if new_fulfillment != current {
                changes.fulfillment_status = Some(new_fulfillment.as_str().to_string());
                entries.push(NewStatusHistoryEntry::new(
                    order_id,
                    StatusField::FulfillmentStatus,
                    current.as_str(),
                    new_fulfillment.as_str(),
                    actor,
                    reason.clone(),
                ));
            }
        }

        if entries.is_empty() {
            return Ok(order);
        }

        let updated = self.store.update_order(order_id, changes, now).await?;
        for entry in entries {
            self.events
                .publish(OrderEvent::StatusChanged {
                    order_id,
                    field: entry.field.as_str().to_string(),
                    previous_value: entry.previous_value.clone(),
                    new_value: entry.new_value.clone(),
                })
                .await;
            self.store.insert_status_history(entry).await?;
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::{RefundDispatch, RefundOutcome};
    use crate::storage::memory::MemoryOrderStore;
    use async_trait::async_trait;

    struct AlwaysRefund;

    #[async_trait]
    impl RefundDispatch for AlwaysRefund {
        async fn process_refund(
            &self,
            _provider: Option<&str>,
            _payment_reference: Option<&str>,
        ) -> RefundOutcome {
            RefundOutcome::success("re_9")
        }
    }

    fn test_order(status: &str, payment_status: &str, fulfillment_status: &str) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::now_v7(),
            order_number: "ORD-00001002".to_string(),
            customer_email: "customer@example.com".to_string(),
            status: status.to_string(),
            payment_status: payment_status.to_string(),
            fulfillment_status: fulfillment_status.to_string(),
            subtotal: "20.00".to_string(),
            shipping_total: "0.00".to_string(),
            tax_total: "0.00".to_string(),
            total: "20.00".to_string(),
            currency: "USD".to_string(),
            payment_provider: Some("card".to_string()),
            payment_reference: Some("pi_555".to_string()),
            paid_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn service(store: Arc<MemoryOrderStore>) -> StatusUpdateService {
        let cancellations = Arc::new(CancellationService::new(
            store.clone(),
            Arc::new(AlwaysRefund),
            EventBus::disabled(),
        ));
        StatusUpdateService::new(store, cancellations, EventBus::disabled())
    }

    #[tokio::test]
    async fn applies_a_single_transition_with_one_audit_entry() {
        let store = Arc::new(MemoryOrderStore::new());
        let order = test_order("processing", "paid", "unfulfilled");
        let order_id = order.id;
        store.put_order(order);

        let updated = service(store.clone())
            .update_order_status(
                order_id,
                StatusUpdate {
                    status: Some("shipped".to_string()),
                    ..Default::default()
                },
                "ops@x",
                Some("left the warehouse".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(updated.status, "shipped");
        let history = store.list_status_history(order_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].field, "status");
        assert_eq!(history[0].previous_value, "processing");
        assert_eq!(history[0].new_value, "shipped");
        assert_eq!(history[0].actor, "ops@x");
    }

    #[tokio::test]
    async fn rejects_unknown_enum_values_without_writing() {
        let store = Arc::new(MemoryOrderStore::new());
        let order = test_order("pending", "pending", "unfulfilled");
        let order_id = order.id;
        store.put_order(order);

        let err = service(store.clone())
            .update_order_status(
                order_id,
                StatusUpdate {
                    payment_status: Some("authorized".to_string()),
                    ..Default::default()
                },
                "ops@x",
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrderError::InvalidStatus {
                field: "payment_status",
                ..
            }
        ));
        assert_eq!(store.history_len(), 0);
        let unchanged = store.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(unchanged.payment_status, "pending");
    }

    #[tokio::test]
    async fn first_paid_transition_stamps_paid_at_once() {
        let store = Arc::new(MemoryOrderStore::new());
        let order = test_order("pending", "pending", "unfulfilled");
        let order_id = order.id;
        store.put_order(order);
        let service = service(store.clone());

        let updated = service
            .update_order_status(
                order_id,
                StatusUpdate {
                    payment_status: Some("paid".to_string()),
                    ..Default::default()
                },
                "webhook",
                None,
            )
            .await
            .unwrap();
        let first_paid_at = updated.paid_at.unwrap();

        // Correcting payment status away and back must not move paid_at.
        service
            .update_order_status(
                order_id,
                StatusUpdate {
                    payment_status: Some("pending".to_string()),
                    ..Default::default()
                },
                "ops@x",
                None,
            )
            .await
            .unwrap();
        let again = service
            .update_order_status(
                order_id,
                StatusUpdate {
                    payment_status: Some("paid".to_string()),
                    ..Default::default()
                },
                "ops@x",
                None,
            )
            .await
            .unwrap();

        assert_eq!(again.paid_at.unwrap(), first_paid_at);
    }

    #[tokio::test]
    async fn equal_values_are_no_ops() {
        let store = Arc::new(MemoryOrderStore::new());
        let order = test_order("processing", "paid", "partial");
        let order_id = order.id;
        store.put_order(order);

        let result = service(store.clone())
            .update_order_status(
                order_id,
                StatusUpdate {
                    status: Some("processing".to_string()),
                    payment_status: Some("paid".to_string()),
                    fulfillment_status: Some("partial".to_string()),
                },
                "ops@x",
                None,
            )
            .await
            .unwrap();

        assert_eq!(result.status, "processing");
        assert_eq!(store.history_len(), 0);
    }

    #[tokio::test]
    async fn multi_field_update_writes_one_entry_per_field() {
        let store = Arc::new(MemoryOrderStore::new());
        let order = test_order("processing", "paid", "partial");
        let order_id = order.id;
        store.put_order(order);

        let updated = service(store.clone())
            .update_order_status(
                order_id,
                StatusUpdate {
                    status: Some("shipped".to_string()),
                    fulfillment_status: Some("fulfilled".to_string()),
                    ..Default::default()
                },
                "ops@x",
                None,
            )
            .await
            .unwrap();

        assert_eq!(updated.status, "shipped");
        assert_eq!(updated.fulfillment_status, "fulfilled");
        let history = store.list_status_history(order_id).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn proposed_cancellation_delegates_to_the_refund_path() {
        let store = Arc::new(MemoryOrderStore::new());
        let order = test_order("processing", "paid", "unfulfilled");
        let order_id = order.id;
        store.put_order(order);

        let updated = service(store.clone())
            .update_order_status(
                order_id,
                StatusUpdate {
                    status: Some("cancelled".to_string()),
                    ..Default::default()
                },
                "admin@x",
                Some("fraud review".to_string()),
            )
            .await
            .unwrap();

        // The dedicated path ran: refund applied, cancelled_at stamped.
        assert_eq!(updated.status, "cancelled");
        assert_eq!(updated.payment_status, "refunded");
        assert!(updated.cancelled_at.is_some());

        let history = store.list_status_history(order_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().any(|e| e.field == "payment_status"
            && e.reason.as_deref().unwrap_or("").contains("re_9")));
    }

    #[tokio::test]
    async fn cancelling_an_already_cancelled_order_via_update_is_a_no_op() {
        let store = Arc::new(MemoryOrderStore::new());
        let mut order = test_order("cancelled", "refunded", "unfulfilled");
        order.cancelled_at = Some(Utc::now());
        let order_id = order.id;
        store.put_order(order);

        let result = service(store.clone())
            .update_order_status(
                order_id,
                StatusUpdate {
                    status: Some("cancelled".to_string()),
                    ..Default::default()
                },
                "admin@x",
                None,
            )
            .await
            .unwrap();

        assert_eq!(result.status, "cancelled");
        assert_eq!(store.history_len(), 0);
    }
}
