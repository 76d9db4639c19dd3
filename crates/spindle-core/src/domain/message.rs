//! TaskMessage - the backend's record of a queued task.

use serde::{Deserialize, Serialize};

use super::{TaskId, TaskType};

/// Queue a message lands in when none is given.
pub const DEFAULT_QUEUE: &str = "default";

/// Retries allowed when none is given.
pub const DEFAULT_MAX_RETRY: u32 = 25;

/// A queued unit of work as the backend stores it.
///
/// The processor treats everything except `task_type`/`payload` as opaque
/// and only hands the message back to the backend. Backends and the failure
/// policy may update `retried`/`error_msg`, so the runner always works on its
/// own clone taken at dequeue time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMessage {
    pub id: TaskId,
    pub task_type: TaskType,
    pub payload: Vec<u8>,
    pub queue: String,

    /// Maximum number of retries before the task is dead-lettered.
    pub retry: u32,

    /// Retries performed so far.
    pub retried: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

impl TaskMessage {
    pub fn new(task_type: impl Into<TaskType>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id: TaskId::generate(),
            task_type: task_type.into(),
            payload: payload.into(),
            queue: DEFAULT_QUEUE.to_string(),
            retry: DEFAULT_MAX_RETRY,
            retried: 0,
            error_msg: None,
        }
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    pub fn with_max_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    /// Has this task used up its retries?
    pub fn retry_exhausted(&self) -> bool {
        self.retried >= self.retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_uses_defaults() {
        let msg = TaskMessage::new("report.build", vec![1, 2, 3]);
        assert_eq!(msg.queue, DEFAULT_QUEUE);
        assert_eq!(msg.retry, DEFAULT_MAX_RETRY);
        assert_eq!(msg.retried, 0);
        assert!(msg.error_msg.is_none());
    }

    #[test]
    fn retry_exhausted_when_retried_reaches_max() {
        let mut msg = TaskMessage::new("t", vec![]).with_max_retry(2);
        assert!(!msg.retry_exhausted());
        msg.retried = 2;
        assert!(msg.retry_exhausted());
    }

    #[test]
    fn zero_max_retry_is_exhausted_immediately() {
        let msg = TaskMessage::new("t", vec![]).with_max_retry(0);
        assert!(msg.retry_exhausted());
    }
}
