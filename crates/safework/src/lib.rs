//! Occupational health risk management for at-risk employees.
//!
//! The [`risk`] module holds the lifecycle state machine, the activity recorder, and the
//! aggregation engine. [`config`], [`telemetry`], and [`error`] carry the process-level
//! concerns shared with the `safework-api` service.

pub mod config;
pub mod error;
pub mod risk;
pub mod telemetry;
