//! Assignment cache for the dispatch back office.
//!
//! Screens ask for "the assignments of date X" and get an answer immediately
//! from local state; the cache keeps that state reconciled with the Orders
//! API in the background and pushes local edits back on a best-effort basis.

pub mod adapter;
pub mod assignment;
pub mod cache;
pub mod error;
pub mod subscription;

pub use assignment::{Assignment, CastRef, placeholder_assignments};
pub use cache::{AssignmentCache, CacheOptions};
pub use error::{ServiceError, ServiceResult};
pub use subscription::{Subscribers, Subscription};
