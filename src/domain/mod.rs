//! Domain model
pub mod history;
pub mod order;

pub use history::{NewStatusHistoryEntry, StatusField, StatusHistoryEntry};
pub use order::{FulfillmentStatus, Order, OrderStatus, PaymentProvider, PaymentStatus};
