//! Shared kernel for the dispatch back office: configuration, errors and
//! the identifier types every other crate speaks.

pub mod config;
pub mod constants;
pub mod error;
pub mod time;
pub mod types;
