//! Workflow engine core: registration, validation, wave execution, and audit.
//!
//! - `definition` -- YAML parsing, structural checks, orchestrator assembly
//! - `registry` -- task map in registration order, referential/cycle/handler validation
//! - `dag` -- dependency-depth wave plan for dry runs
//! - `state` -- shared per-execution status, result, and running-set tracking
//! - `selector` -- ready-set computation and upstream failure propagation
//! - `retry` -- retry policy arithmetic
//! - `hooks` -- optional lifecycle callbacks
//! - `runner` -- per-task attempt loop with timeout and backoff
//! - `orchestrator` -- bounded wave-based execution loop
//! - `audit` -- deterministic result hashing and the audit sink port
//! - `visualize` -- Mermaid / DOT graph rendering

pub mod audit;
pub mod dag;
pub mod definition;
pub mod hooks;
pub mod orchestrator;
pub mod registry;
pub mod retry;
pub mod runner;
pub mod selector;
pub mod state;
pub mod visualize;

pub use definition::WorkflowError;
