//! `cx-domain` — shared types for the Cx gateway.
//!
//! Holds the crate-wide [`error::Error`] type, the [`config::Config`]
//! tree, the subscriber-data value types ([`types`]), and the structured
//! [`trace::TraceEvent`]s emitted across all gateway crates.

pub mod config;
pub mod error;
pub mod trace;
pub mod types;
