//! BoxTaskHandler -- object-safe dynamic dispatch wrapper for TaskHandler.
//!
//! 1. Define an object-safe `TaskHandlerDyn` trait with boxed futures
//! 2. Blanket-impl `TaskHandlerDyn` for all `T: TaskHandler`
//! 3. `BoxTaskHandler` wraps `Arc<dyn TaskHandlerDyn>` and delegates

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use taskweave_types::task::TaskSpec;

use super::{HandlerError, TaskHandler, TaskInputs};

/// Object-safe version of [`TaskHandler`] with boxed futures.
///
/// A blanket implementation is provided for all types implementing
/// `TaskHandler`.
pub trait TaskHandlerDyn: Send + Sync {
    fn handle_boxed<'a>(
        &'a self,
        inputs: TaskInputs,
        context: Arc<Value>,
        task: Arc<TaskSpec>,
    ) -> Pin<Box<dyn Future<Output = Result<Value, HandlerError>> + Send + 'a>>;
}

impl<T: TaskHandler> TaskHandlerDyn for T {
    fn handle_boxed<'a>(
        &'a self,
        inputs: TaskInputs,
        context: Arc<Value>,
        task: Arc<TaskSpec>,
    ) -> Pin<Box<dyn Future<Output = Result<Value, HandlerError>> + Send + 'a>> {
        Box::pin(self.handle(inputs, context, task))
    }
}

/// Type-erased task handler.
///
/// Cloning is cheap (shared `Arc`), so the same handler can back several
/// tasks and be moved into spawned runner futures.
#[derive(Clone)]
pub struct BoxTaskHandler {
    inner: Arc<dyn TaskHandlerDyn>,
}

impl BoxTaskHandler {
    pub fn new<T: TaskHandler + 'static>(handler: T) -> Self {
        Self {
            inner: Arc::new(handler),
        }
    }

    pub async fn handle(
        &self,
        inputs: TaskInputs,
        context: Arc<Value>,
        task: Arc<TaskSpec>,
    ) -> Result<Value, HandlerError> {
        self.inner.handle_boxed(inputs, context, task).await
    }
}

impl fmt::Debug for BoxTaskHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxTaskHandler").finish_non_exhaustive()
    }
}
