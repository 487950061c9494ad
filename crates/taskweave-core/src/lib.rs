//! Workflow engine core for taskweave.
//!
//! This crate owns the scheduling logic and the "ports" the infrastructure
//! layer plugs into (task handlers, audit sinks). It depends only on
//! `taskweave-types` -- never on `taskweave-infra` or any filesystem/process
//! adapter.

pub mod handler;
pub mod workflow;

pub use handler::{BoxTaskHandler, HandlerError, HandlerRegistry, TaskHandler, handler_fn};
pub use workflow::WorkflowError;
pub use workflow::orchestrator::Orchestrator;
pub use workflow::registry::Task;
