//! Storefront Orders - Order Management Service
//!
//! Self-hosted order management for a storefront: cancellation with
//! provider-aware refunds, status transitions, and an append-only
//! status audit trail.
//!
//! ## Features
//! - Order cancellation with automatic refund dispatch
//! - Card and wallet payment provider adapters
//! - Order / payment / fulfillment status transitions
//! - Immutable per-field status history
//! - Refund retry for cancelled orders with stranded payments

use thiserror::Error;

pub mod config;
pub mod decimal;
pub mod domain;
pub mod events;
pub mod http;
pub mod payments;
pub mod service;
pub mod storage;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("order not found")]
    NotFound,

    #[error("order is already cancelled")]
    AlreadyCancelled,

    #[error("invalid {field} value: {value}")]
    InvalidStatus { field: &'static str, value: String },

    #[error("order is not cancelled")]
    NotCancelled,

    #[error("malformed decimal value: {0}")]
    MalformedDecimal(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, OrderError>;
