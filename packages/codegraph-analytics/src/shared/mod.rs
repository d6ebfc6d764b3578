//! Shared models and utilities

pub mod cancel;
pub mod constants;
pub mod metrics;
pub mod models;
