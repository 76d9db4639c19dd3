//! DispatchLoop - キューからタスクを取り出してワーカーに渡すループ
//!
//! # フロー（1 イテレーション）
//! 1. shutdown 確認（ノンブロッキング）→ 立っていれば即終了
//! 2. Backend::dequeue(timeout)
//! 3. timeout → 何もせず次へ / error → ログを出して次へ
//! 4. 成功 → Slot を取得（満杯ならここで待つ）→ TaskRunner を spawn

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info};

use super::pool::WorkerPool;
use super::runner::TaskRunner;
use crate::ports::Backend;

pub struct DispatchLoop {
    backend: Arc<dyn Backend>,
    pool: WorkerPool,
    runner: TaskRunner,
    dequeue_timeout: Duration,
}

impl DispatchLoop {
    pub fn new(
        backend: Arc<dyn Backend>,
        pool: WorkerPool,
        runner: TaskRunner,
        dequeue_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            pool,
            runner,
            dequeue_timeout,
        }
    }

    /// Run until `shutdown_rx` reads `true`.
    ///
    /// Spawned runners are not awaited here; the pool drain does that.
    pub async fn run(self, shutdown_rx: watch::Receiver<bool>) {
        loop {
            if *shutdown_rx.borrow() {
                info!("dispatch loop stopped");
                return;
            }
            self.exec().await;
        }
    }

    /// Pull at most one task and hand it to a runner.
    async fn exec(&self) {
        let msg = match self.backend.dequeue(self.dequeue_timeout).await {
            Ok(Some(msg)) => msg,
            // タイムアウトは正常系
            Ok(None) => return,
            Err(e) => {
                error!(error = %e, "unexpected error while pulling a task out of queue");
                return;
            }
        };

        debug!(task_id = %msg.id, task_type = %msg.task_type, queue = %msg.queue, "dequeued task");

        // 満杯ならここで待つ。この間 shutdown は見ない
        let slot = match self.pool.acquire().await {
            Ok(slot) => slot,
            Err(e) => {
                // The message stays in-progress and is picked up by the next
                // restore_unfinished.
                error!(task_id = %msg.id, error = %e, "could not acquire a worker slot");
                return;
            }
        };

        // runner は detach。完了待ちは terminate の drain で行う
        let _ = self.runner.spawn(msg, slot);
    }
}
