//! Errors - タスク実行の失敗

use thiserror::Error;

use super::TaskType;

/// Why a task did not complete.
///
/// Whatever the handler returns (or a panic it raised) ends up here before
/// it is handed to the failure policy.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{0}")]
    Failed(String),

    /// The handler panicked; carries the panic message.
    #[error("panic: {0}")]
    Panicked(String),

    #[error("handler not found for task_type={0}")]
    HandlerNotFound(TaskType),

    #[error("payload decode: {0}")]
    Decode(#[from] serde_json::Error),
}

impl TaskError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_is_prefixed() {
        let err = TaskError::Panicked("boom".to_string());
        assert_eq!(err.to_string(), "panic: boom");
        assert!(err.is_panic());
    }

    #[test]
    fn failed_message_is_verbatim() {
        let err = TaskError::msg("smtp unavailable");
        assert_eq!(err.to_string(), "smtp unavailable");
        assert!(!err.is_panic());
    }
}
