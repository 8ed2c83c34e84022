//! Status audit trail records.
//!
//! One row per field transition, written only by the orchestrators and
//! never updated or deleted afterwards. Rows carry who made the change,
//! why, and when; display order is newest-first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which of the three status fields a history entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusField {
    Status,
    PaymentStatus,
    FulfillmentStatus,
}

impl StatusField {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusField::Status => "status",
            StatusField::PaymentStatus => "payment_status",
            StatusField::FulfillmentStatus => "fulfillment_status",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub order_id: Uuid,
    pub field: String,
    pub previous_value: String,
    pub new_value: String,
    /// Operator identity, or a sentinel like `system` for automated
    /// transitions.
    pub actor: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for one audit entry; id and timestamp are assigned by
/// the store.
#[derive(Debug, Clone)]
pub struct NewStatusHistoryEntry {
    pub order_id: Uuid,
    pub field: StatusField,
    pub previous_value: String,
    pub new_value: String,
    pub actor: String,
    pub reason: Option<String>,
}

impl NewStatusHistoryEntry {
    pub fn new(
        order_id: Uuid,
        field: StatusField,
        previous_value: impl Into<String>,
        new_value: impl Into<String>,
        actor: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        Self {
            order_id,
            field,
            previous_value: previous_value.into(),
            new_value: new_value.into(),
            actor: actor.into(),
            reason,
        }
    }
}
