//! FailureHandler port - 失敗タスクのリトライ / dead-letter 判断

use async_trait::async_trait;

use super::Backend;
use crate::domain::{TaskError, TaskMessage};

/// Decides what happens to a task whose handler failed.
///
/// The runner calls this exactly once per failed execution, inline, before
/// it gives its worker slot back. Implementations report through `backend`
/// (typically `retry` or `kill`) and log their own errors.
#[async_trait]
pub trait FailureHandler: Send + Sync {
    async fn handle_failure(&self, backend: &dyn Backend, msg: TaskMessage, error: &TaskError);
}
