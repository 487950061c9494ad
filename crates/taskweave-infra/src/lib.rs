//! Infrastructure layer for taskweave.
//!
//! Contains the adapters for the ports defined in `taskweave-core`: the
//! TOML config loader, the append-only JSONL audit sink, and the built-in
//! task handlers used by definition files.

pub mod audit;
pub mod config;
pub mod handlers;
