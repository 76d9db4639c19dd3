//! InMemoryBackend - 開発・テスト用のバックエンド
//!
//! # 実装詳細
//! - pending: VecDeque（FIFO）
//! - in_progress: dequeue 済み・未完了
//! - scheduled: リトライ待ち（BinaryHeap、最も早い retry_at が先頭）
//! - dead: リトライを使い切ったタスク
//! - tokio::sync::Mutex + Notify で blocking dequeue

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::app::status::QueueCounts;
use crate::domain::{TaskId, TaskMessage};
use crate::ports::{Backend, BackendError};

/// Retry entry for the min-heap.
#[derive(Debug)]
struct ScheduledTask {
    retry_at: DateTime<Utc>,
    seq: u64,
    msg: TaskMessage,
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.retry_at == other.retry_at && self.seq == other.seq
    }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering: earlier times have higher priority
        other
            .retry_at
            .cmp(&self.retry_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct InMemoryState {
    pending: VecDeque<TaskMessage>,
    in_progress: Vec<TaskMessage>,
    scheduled: BinaryHeap<ScheduledTask>,
    dead: Vec<TaskMessage>,
    done: usize,
    next_seq: u64,
}

impl InMemoryState {
    /// Move retries whose time has come to the back of pending.
    fn promote_due(&mut self, now: DateTime<Utc>) {
        while let Some(entry) = self.scheduled.peek() {
            if entry.retry_at > now {
                break; // Heap is sorted, so we can stop
            }
            if let Some(entry) = self.scheduled.pop() {
                self.pending.push_back(entry.msg);
            }
        }
    }

    fn take_in_progress(&mut self, id: TaskId) -> Result<TaskMessage, BackendError> {
        let pos = self
            .in_progress
            .iter()
            .position(|m| m.id == id)
            .ok_or(BackendError::NotFound(id))?;
        Ok(self.in_progress.swap_remove(pos))
    }

    fn counts(&self) -> QueueCounts {
        QueueCounts {
            pending: self.pending.len(),
            in_progress: self.in_progress.len(),
            scheduled: self.scheduled.len(),
            dead: self.dead.len(),
            done: self.done,
        }
    }
}

/// Process-local [`Backend`]. Nothing survives a restart, but the
/// in-progress bookkeeping behaves like a durable backend's, so crash
/// recovery can be exercised by dequeuing without completing.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<InMemoryState>>,
    notify: Arc<Notify>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message to the back of the pending queue.
    pub async fn enqueue(&self, msg: TaskMessage) -> TaskId {
        let id = msg.id;
        self.state.lock().await.pending.push_back(msg);
        self.notify.notify_one();
        id
    }

    pub async fn counts(&self) -> QueueCounts {
        self.state.lock().await.counts()
    }

    pub async fn dead_tasks(&self) -> Vec<TaskMessage> {
        self.state.lock().await.dead.clone()
    }

    /// Messages waiting for a retry, earliest first.
    pub async fn scheduled_tasks(&self) -> Vec<(DateTime<Utc>, TaskMessage)> {
        let state = self.state.lock().await;
        let mut entries: Vec<&ScheduledTask> = state.scheduled.iter().collect();
        entries.sort_by(|a, b| b.cmp(a));
        entries
            .into_iter()
            .map(|e| (e.retry_at, e.msg.clone()))
            .collect()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn dequeue(&self, timeout: Duration) -> Result<Option<TaskMessage>, BackendError> {
        let deadline = Instant::now() + timeout;
        loop {
            let next_retry = {
                let mut state = self.state.lock().await;
                state.promote_due(Utc::now());

                if let Some(msg) = state.pending.pop_front() {
                    state.in_progress.push(msg.clone());
                    return Ok(Some(msg));
                }

                state.scheduled.peek().map(|entry| entry.retry_at)
            };

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            // 次の retry 予定と deadline の早い方まで待つ
            let wake_at = match next_retry {
                Some(at) => {
                    let until = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                    deadline.min(now + until)
                }
                None => deadline,
            };

            tokio::select! {
                _ = self.notify.notified() => {},
                _ = tokio::time::sleep_until(wake_at) => {},
            }
        }
    }

    async fn complete(&self, msg: &TaskMessage) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.take_in_progress(msg.id)?;
        state.done += 1;
        Ok(())
    }

    async fn restore_unfinished(&self) -> Result<usize, BackendError> {
        let restored = {
            let mut state = self.state.lock().await;
            let orphans: Vec<TaskMessage> = state.in_progress.drain(..).collect();
            let n = orphans.len();
            state.pending.extend(orphans);
            n
        };
        if restored > 0 {
            self.notify.notify_one();
        }
        Ok(restored)
    }

    async fn retry(&self, msg: TaskMessage, retry_at: DateTime<Utc>) -> Result<(), BackendError> {
        {
            let mut state = self.state.lock().await;
            state.take_in_progress(msg.id)?;
            let seq = state.next_seq;
            state.next_seq += 1;
            state.scheduled.push(ScheduledTask { retry_at, seq, msg });
        } // Lock released here

        // 待機中の dequeue に wake 時刻を再計算させる
        self.notify.notify_one();
        Ok(())
    }

    async fn kill(&self, msg: TaskMessage) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.take_in_progress(msg.id)?;
        state.dead.push(msg);
        Ok(())
    }
}
