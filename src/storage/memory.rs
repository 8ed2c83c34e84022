//! In-memory `OrderStore` for orchestrator tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{NewStatusHistoryEntry, Order, PaymentStatus, StatusHistoryEntry};
use crate::Result;

use super::{OrderChanges, OrderStore};

#[derive(Default)]
pub struct MemoryOrderStore {
    orders: Mutex<HashMap<Uuid, Order>>,
    history: Mutex<Vec<StatusHistoryEntry>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_order(&self, order: Order) {
        self.orders.lock().unwrap().insert(order.id, order);
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().unwrap().len()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.orders.lock().unwrap().get(&id).cloned())
    }

    async fn update_order(
        &self,
        id: Uuid,
        changes: OrderChanges,
        now: DateTime<Utc>,
    ) -> Result<Order> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders.get_mut(&id).ok_or(sqlx::Error::RowNotFound)?;
        if let Some(status) = changes.status {
            order.status = status;
        }
        if let Some(payment_status) = changes.payment_status {
            order.payment_status = payment_status;
        }
        if let Some(fulfillment_status) = changes.fulfillment_status {
            order.fulfillment_status = fulfillment_status;
        }
        if let Some(paid_at) = changes.paid_at {
            order.paid_at = Some(paid_at);
        }
        order.updated_at = now;
        Ok(order.clone())
    }

    async fn mark_cancelled(
        &self,
        id: Uuid,
        payment_status: Option<PaymentStatus>,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders.get_mut(&id).ok_or(sqlx::Error::RowNotFound)?;
        if order.status == "cancelled" {
            return Ok(None);
        }
        order.status = "cancelled".to_string();
        if let Some(payment_status) = payment_status {
            order.payment_status = payment_status.as_str().to_string();
        }
        order.cancelled_at = Some(now);
        order.updated_at = now;
        Ok(Some(order.clone()))
    }

    async fn insert_status_history(
        &self,
        entry: NewStatusHistoryEntry,
    ) -> Result<StatusHistoryEntry> {
        let row = StatusHistoryEntry {
            id: Uuid::now_v7(),
            order_id: entry.order_id,
            field: entry.field.as_str().to_string(),
            previous_value: entry.previous_value,
            new_value: entry.new_value,
            actor: entry.actor,
            reason: entry.reason,
            created_at: Utc::now(),
        };
        self.history.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn list_status_history(&self, order_id: Uuid) -> Result<Vec<StatusHistoryEntry>> {
        let history = self.history.lock().unwrap();
        Ok(history
            .iter()
            .rev()
            .filter(|e| e.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn list_refund_history(&self, order_id: Uuid) -> Result<Vec<StatusHistoryEntry>> {
        let history = self.history.lock().unwrap();
        Ok(history
            .iter()
            .rev()
            .filter(|e| {
                e.order_id == order_id
                    && matches!(e.new_value.as_str(), "refunded" | "cancelled")
            })
            .cloned()
            .collect())
    }
}
