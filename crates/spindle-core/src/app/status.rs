//! Status - キューの状態スナップショット

use serde::{Deserialize, Serialize};

/// How many messages sit in each part of a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub scheduled: usize,
    pub dead: usize,
    pub done: usize,
}

impl QueueCounts {
    /// Nothing left to run now or later.
    pub fn is_settled(&self) -> bool {
        self.pending == 0 && self.in_progress == 0 && self.scheduled == 0
    }
}
