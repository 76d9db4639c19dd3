use serde::{Deserialize, Serialize};
use std::fmt;

use super::TaskMessage;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskType(String);

impl TaskType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TaskType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// The unit of work a handler sees: a type plus an opaque payload.
///
/// Built from a [`TaskMessage`] right after dequeue. Backend metadata
/// (id, retry counters, queue name) is deliberately not visible here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    task_type: TaskType,
    payload: Vec<u8>,
}

impl Task {
    pub fn new(task_type: impl Into<TaskType>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            task_type: task_type.into(),
            payload: payload.into(),
        }
    }

    pub fn task_type(&self) -> &TaskType {
        &self.task_type
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl From<&TaskMessage> for Task {
    fn from(msg: &TaskMessage) -> Self {
        Self {
            task_type: msg.task_type.clone(),
            payload: msg.payload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_from_message_copies_type_and_payload() {
        let msg = TaskMessage::new("email.send", b"{\"to\":\"a@b.c\"}".to_vec());
        let task = Task::from(&msg);
        assert_eq!(task.task_type().as_str(), "email.send");
        assert_eq!(task.payload(), msg.payload.as_slice());
    }
}
