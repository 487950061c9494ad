//! Shared domain types for taskweave.
//!
//! This crate contains the plain-data types used across the workspace:
//! task specifications and results, workflow results, definition-file
//! shapes, and engine configuration.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono.

pub mod config;
pub mod task;
pub mod workflow;
