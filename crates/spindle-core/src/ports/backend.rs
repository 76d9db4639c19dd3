//! Backend port - 永続キュー（Redis / InMemory など）
//!
//! The processor never owns durable state. Everything that must survive a
//! crash (pending, in-progress, scheduled, dead) lives behind this trait.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{TaskId, TaskMessage};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("malformed task message: {0}")]
    Malformed(String),

    #[error("{0} is not in progress")]
    NotFound(TaskId),

    #[error("backend operation failed: {0}")]
    OperationFailed(String),
}

/// Storage the processor pulls work from and reports results to.
///
/// # 前提
/// - dequeue / complete / retry / kill / restore はそれぞれアトミック
/// - dequeue したメッセージは完了報告まで "in-progress" に残る
#[async_trait]
pub trait Backend: Send + Sync {
    /// Move one pending message to in-progress and return it.
    ///
    /// Waits up to `timeout`. `Ok(None)` means nothing arrived in time,
    /// which is not an error.
    async fn dequeue(&self, timeout: Duration) -> Result<Option<TaskMessage>, BackendError>;

    /// Mark an in-progress message as done.
    async fn complete(&self, msg: &TaskMessage) -> Result<(), BackendError>;

    /// Move every in-progress message back to pending.
    ///
    /// Called once at startup to pick up tasks a dead process left behind.
    /// Returns how many were restored.
    async fn restore_unfinished(&self) -> Result<usize, BackendError>;

    /// Take a failed message out of in-progress and run it again at `retry_at`.
    async fn retry(&self, msg: TaskMessage, retry_at: DateTime<Utc>) -> Result<(), BackendError>;

    /// Take a failed message out of in-progress and dead-letter it.
    async fn kill(&self, msg: TaskMessage) -> Result<(), BackendError>;
}
