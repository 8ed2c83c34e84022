//! Order and audit-trail persistence.
//!
//! The storage engine itself is a collaborator; this module exposes the
//! repository seam the orchestrators depend on, plus the Postgres
//! implementation used in production. Rows are created by the checkout
//! flow (out of scope here), so the store only reads and mutates.

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{NewStatusHistoryEntry, Order, PaymentStatus, StatusHistoryEntry};
use crate::Result;

/// Partial update applied to an order row. `None` fields keep their
/// current value; `updated_at` is always written.
#[derive(Debug, Clone, Default)]
pub struct OrderChanges {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub fulfillment_status: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>>;

    /// Apply a partial update and return the refreshed row.
    async fn update_order(
        &self,
        id: Uuid,
        changes: OrderChanges,
        now: DateTime<Utc>,
    ) -> Result<Order>;

    /// Conditionally cancel: the row-level guard against racing cancel
    /// calls. Sets status to `cancelled` (plus `payment_status` when a
    /// refund succeeded) only if the order is not already cancelled.
    /// Returns `None` when the guard rejects the write.
    async fn mark_cancelled(
        &self,
        id: Uuid,
        payment_status: Option<PaymentStatus>,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>>;

    async fn insert_status_history(
        &self,
        entry: NewStatusHistoryEntry,
    ) -> Result<StatusHistoryEntry>;

    /// All entries for an order, newest first.
    async fn list_status_history(&self, order_id: Uuid) -> Result<Vec<StatusHistoryEntry>>;

    /// Entries whose new value is `refunded` or `cancelled`, newest
    /// first. Backs the refund audit view.
    async fn list_refund_history(&self, order_id: Uuid) -> Result<Vec<StatusHistoryEntry>>;
}

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    async fn update_order(
        &self,
        id: Uuid,
        changes: OrderChanges,
        now: DateTime<Utc>,
    ) -> Result<Order> {
        let order = sqlx::query_as::<_, Order>(
            "UPDATE orders SET \
                status = COALESCE($2, status), \
                payment_status = COALESCE($3, payment_status), \
                fulfillment_status = COALESCE($4, fulfillment_status), \
                paid_at = COALESCE($5, paid_at), \
                updated_at = $6 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(changes.status)
        .bind(changes.payment_status)
        .bind(changes.fulfillment_status)
        .bind(changes.paid_at)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(order)
    }

    async fn mark_cancelled(
        &self,
        id: Uuid,
        payment_status: Option<PaymentStatus>,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            "UPDATE orders SET \
                status = 'cancelled', \
                payment_status = COALESCE($2, payment_status), \
                cancelled_at = $3, \
                updated_at = $3 \
             WHERE id = $1 AND status <> 'cancelled' RETURNING *",
        )
        .bind(id)
        .bind(payment_status.map(|s| s.as_str()))
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    async fn insert_status_history(
        &self,
        entry: NewStatusHistoryEntry,
    ) -> Result<StatusHistoryEntry> {
        let row = sqlx::query_as::<_, StatusHistoryEntry>(
            "INSERT INTO order_status_history \
                (id, order_id, field, previous_value, new_value, actor, reason, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW()) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(entry.order_id)
        .bind(entry.field.as_str())
        .bind(&entry.previous_value)
        .bind(&entry.new_value)
        .bind(&entry.actor)
        .bind(&entry.reason)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_status_history(&self, order_id: Uuid) -> Result<Vec<StatusHistoryEntry>> {
        let rows = sqlx::query_as::<_, StatusHistoryEntry>(
            "SELECT * FROM order_status_history WHERE order_id = $1 \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_refund_history(&self, order_id: Uuid) -> Result<Vec<StatusHistoryEntry>> {
        let rows = sqlx::query_as::<_, StatusHistoryEntry>(
            "SELECT * FROM order_status_history WHERE order_id = $1 \
                AND new_value IN ('refunded', 'cancelled') \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
