//! Core types shared across changefinder facilities
//!
//! This crate provides foundational types used by the engine's error and
//! logging facilities and by the CLI:
//!
//! - **Correlation types**: RunId
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::RunId;
