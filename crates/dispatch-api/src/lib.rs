//! Client for the remote Orders API: the canonical order model, the strict
//! wire normalization boundary and the `OrdersApi` seam the cache talks to.

pub mod client;
pub mod error;
pub mod model;
pub mod wire;

pub use client::{ApiFuture, HttpOrdersApi, OrdersApi};
pub use error::{ApiError, ApiResult};
pub use model::{AssignmentInput, Order, OrderAssignment, OrderStatus, OrderUpdate};
