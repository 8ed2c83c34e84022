//! Order cancellation with automatic refund dispatch.
//!
//! Cancellation is deliberately allowed to outrun the refund: once an
//! operator cancels, the order must leave the fulfillment pipeline even
//! if the provider cannot return the money yet. A failed refund is
//! surfaced in the result for manual reconciliation, never used to
//! block the cancellation itself.
//!
//! The refund call happens before any storage write because it is an
//! external side effect that cannot be rolled back. The storage-level
//! conditional update is the authoritative guard against two racing
//! cancel calls; the in-memory status check only provides an early
//! exit that avoids refunding an order already known to be cancelled.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    NewStatusHistoryEntry, Order, OrderStatus, PaymentStatus, StatusField,
};
use crate::events::{EventBus, OrderEvent};
use crate::payments::{RefundDispatch, RefundOutcome, NO_PAYMENT_INFO};
use crate::storage::{OrderChanges, OrderStore};
use crate::{OrderError, Result};

#[derive(Debug, Serialize)]
pub struct CancellationResult {
    pub order: Order,
    /// Present iff a refund was attempted; absent for unpaid orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund: Option<RefundOutcome>,
}

pub struct CancellationService {
    store: Arc<dyn OrderStore>,
    refunds: Arc<dyn RefundDispatch>,
    events: EventBus,
}

impl CancellationService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        refunds: Arc<dyn RefundDispatch>,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            refunds,
            events,
        }
    }

    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        actor: &str,
        reason: Option<String>,
    ) -> Result<CancellationResult> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        let previous_status = order.order_status()?;
        if previous_status == OrderStatus::Cancelled {
            return Err(OrderError::AlreadyCancelled);
        }

        let refund = if order.payment_status()? == PaymentStatus::Paid
            && order.payment_reference.is_some()
        {
            let outcome = self
                .refunds
                .process_refund(
                    order.payment_provider.as_deref(),
                    order.payment_reference.as_deref(),
                )
                .await;
            if !outcome.success {
                tracing::warn!(
                    %order_id,
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "refund failed; proceeding with cancellation"
                );
            }
            Some(outcome)
        } else {
            None
        };

        let refund_succeeded = refund.as_ref().is_some_and(|o| o.success);
        let refunded_status = refund_succeeded.then_some(PaymentStatus::Refunded);

        let now = Utc::now();
        let Some(cancelled) = self
            .store
            .mark_cancelled(order_id, refunded_status, now)
            .await?
        else {
            // A concurrent cancel won the conditional update.
            if refund_succeeded {
                tracing::error!(
                    %order_id,
                    refund_id = refund
                        .as_ref()
                        .and_then(|o| o.refund_id.as_deref())
                        .unwrap_or("unknown"),
                    "refund succeeded but order was cancelled concurrently; reconcile manually"
                );
            }
            return Err(OrderError::AlreadyCancelled);
        };

        self.store
            .insert_status_history(NewStatusHistoryEntry::new(
                order_id,
                StatusField::Status,
                previous_status.as_str(),
                OrderStatus::Cancelled.as_str(),
                actor,
                reason,
            ))
            .await?;

        if refund_succeeded {
            let refund_id = refund
                .as_ref()
                .and_then(|o| o.refund_id.as_deref())
                .unwrap_or("unknown");
            self.store
                .insert_status_history(NewStatusHistoryEntry::new(
                    order_id,
                    StatusField::PaymentStatus,
                    PaymentStatus::Paid.as_str(),
                    PaymentStatus::Refunded.as_str(),
                    actor,
                    Some(format!(
                        "Automatic refund on cancellation. Refund ID: {refund_id}"
                    )),
                ))
                .await?;
        }

        self.events
            .publish(OrderEvent::Cancelled {
                order_id,
                refunded: refund_succeeded,
            })
            .await;

        tracing::info!(%order_id, refunded = refund_succeeded, "order cancelled");

        Ok(CancellationResult {
            order: cancelled,
            refund,
        })
    }

    /// Re-attempt a refund that failed during cancellation.
    ///
    /// Bypasses the cancellation state guard (the order must already be
    /// cancelled) but still records the payment-status transition when
    /// the provider accepts the retry.
    pub async fn retry_refund(&self, order_id: Uuid, actor: &str) -> Result<RefundOutcome> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        if order.order_status()? != OrderStatus::Cancelled {
            return Err(OrderError::NotCancelled);
        }
        if order.payment_status()? != PaymentStatus::Paid || order.payment_reference.is_none() {
            return Ok(RefundOutcome::failure(NO_PAYMENT_INFO));
        }

        let outcome = self
            .refunds
            .process_refund(
                order.payment_provider.as_deref(),
                order.payment_reference.as_deref(),
            )
            .await;

        if outcome.success {
            let refund_id = outcome.refund_id.as_deref().unwrap_or("unknown");
            self.store
                .update_order(
                    order_id,
                    OrderChanges {
                        payment_status: Some(PaymentStatus::Refunded.as_str().to_string()),
                        ..Default::default()
                    },
                    Utc::now(),
                )
                .await?;
            self.store
                .insert_status_history(NewStatusHistoryEntry::new(
                    order_id,
                    StatusField::PaymentStatus,
                    PaymentStatus::Paid.as_str(),
                    PaymentStatus::Refunded.as_str(),
                    actor,
                    Some(format!(
                        "Refund retry after cancellation. Refund ID: {refund_id}"
                    )),
                ))
                .await?;
        } else {
            tracing::warn!(
                %order_id,
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "refund retry failed"
            );
        }

        Ok(outcome)
    }
}
