//! Order aggregate and its status enumerations.
//!
//! Three independent status axes live on every order: the pipeline
//! status, the monetary status, and the fulfillment status. They are
//! stored as lowercase text and parsed into closed enums at the service
//! boundary; an unknown stored value is a data-integrity error.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::parse_decimal;
use crate::OrderError;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    /// Human-facing sequential number, display only.
    pub order_number: String,
    pub customer_email: String,
    pub status: String,
    pub payment_status: String,
    pub fulfillment_status: String,
    pub subtotal: String,
    pub shipping_total: String,
    pub tax_total: String,
    pub total: String,
    pub currency: String,
    /// Which processor captured the payment, if any.
    pub payment_provider: Option<String>,
    /// Opaque processor-side reference. Absent when no payment was
    /// ever initiated (pay-on-delivery, abandoned checkout).
    pub payment_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn order_status(&self) -> Result<OrderStatus, OrderError> {
        OrderStatus::parse(&self.status)
    }

    pub fn payment_status(&self) -> Result<PaymentStatus, OrderError> {
        PaymentStatus::parse(&self.payment_status)
    }

    pub fn fulfillment_status(&self) -> Result<FulfillmentStatus, OrderError> {
        FulfillmentStatus::parse(&self.fulfillment_status)
    }

    pub fn subtotal_amount(&self) -> Result<Decimal, OrderError> {
        parse_decimal(&self.subtotal)
    }

    pub fn shipping_amount(&self) -> Result<Decimal, OrderError> {
        parse_decimal(&self.shipping_total)
    }

    pub fn tax_amount(&self) -> Result<Decimal, OrderError> {
        parse_decimal(&self.tax_total)
    }

    pub fn total_amount(&self) -> Result<Decimal, OrderError> {
        parse_decimal(&self.total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn parse(s: &str) -> Result<Self, OrderError> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(OrderError::InvalidStatus {
                field: "status",
                value: s.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn parse(s: &str) -> Result<Self, OrderError> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            _ => Err(OrderError::InvalidStatus {
                field: "payment_status",
                value: s.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentStatus {
    Unfulfilled,
    Partial,
    Fulfilled,
}

impl FulfillmentStatus {
    pub fn parse(s: &str) -> Result<Self, OrderError> {
        match s {
            "unfulfilled" => Ok(FulfillmentStatus::Unfulfilled),
            "partial" => Ok(FulfillmentStatus::Partial),
            "fulfilled" => Ok(FulfillmentStatus::Fulfilled),
            _ => Err(OrderError::InvalidStatus {
                field: "fulfillment_status",
                value: s.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Unfulfilled => "unfulfilled",
            FulfillmentStatus::Partial => "partial",
            FulfillmentStatus::Fulfilled => "fulfilled",
        }
    }
}

/// Closed set of payment processors this service can refund against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProvider {
    Card,
    Wallet,
}

impl PaymentProvider {
    /// Returns `None` for providers this service does not know; the
    /// dispatcher turns that into a failure outcome rather than an error.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "card" => Some(PaymentProvider::Card),
            "wallet" => Some(PaymentProvider::Wallet),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Card => "card",
            PaymentProvider::Wallet => "wallet",
        }
    }
}
