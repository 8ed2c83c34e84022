//! Order mutation orchestrators.
//!
//! All order writes flow through these two services: the dedicated
//! cancellation path (with refund dispatch) and the general status
//! update path. Both append one audit entry per field actually changed.

pub mod cancellation;
pub mod status;

pub use cancellation::{CancellationResult, CancellationService};
pub use status::{StatusUpdate, StatusUpdateService};
