//! Task handler abstraction.
//!
//! A handler is the business logic a task invokes. The engine only sees the
//! `TaskHandler` capability: one async method that receives the task's
//! resolved inputs, the read-only workflow context, and the task spec, and
//! returns a JSON output or an error.
//!
//! - `TaskHandler` -- the trait implementors write (native async fn in traits)
//! - `BoxTaskHandler` -- type-erased handler stored on each task
//! - `HandlerRegistry` -- name-keyed handlers for definition files

pub mod box_handler;
pub mod registry;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use taskweave_types::task::TaskSpec;

pub use box_handler::{BoxTaskHandler, TaskHandlerDyn};
pub use registry::HandlerRegistry;

/// Resolved inputs for one task: static inputs plus `upstream-<id>` entries.
pub type TaskInputs = BTreeMap<String, Value>;

/// Errors a handler may return. The runner turns these into a failed attempt.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Business logic failed.
    #[error("{0}")]
    Failed(String),

    /// The handler could not use the inputs it was given.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// I/O failure inside the handler.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability invoked by the runner for each attempt of a task.
///
/// Handlers must not touch orchestrator state; every effect flows through
/// the returned value.
pub trait TaskHandler: Send + Sync {
    fn handle(
        &self,
        inputs: TaskInputs,
        context: Arc<Value>,
        task: Arc<TaskSpec>,
    ) -> impl Future<Output = Result<Value, HandlerError>> + Send;
}

/// Adapter turning an async closure into a [`TaskHandler`].
pub struct FnHandler<F> {
    f: F,
}

impl<F, Fut> TaskHandler for FnHandler<F>
where
    F: Fn(TaskInputs, Arc<Value>, Arc<TaskSpec>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, HandlerError>> + Send,
{
    fn handle(
        &self,
        inputs: TaskInputs,
        context: Arc<Value>,
        task: Arc<TaskSpec>,
    ) -> impl Future<Output = Result<Value, HandlerError>> + Send {
        (self.f)(inputs, context, task)
    }
}

/// Build a handler from an async closure.
///
/// ```
/// use serde_json::json;
/// use taskweave_core::handler_fn;
///
/// let handler = handler_fn(|inputs, _ctx, task| async move {
///     Ok(json!({ "task": task.id, "inputs": inputs.len() }))
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(TaskInputs, Arc<Value>, Arc<TaskSpec>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, HandlerError>> + Send,
{
    FnHandler { f }
}
