//! TaskRunner - 1 タスクの実行・結果報告・スロット返却
//!
//! # フロー
//! 1. Handler 実行（panic は catch して TaskError::Panicked に変換）
//! 2. 成功: Backend::complete / 失敗: FailureHandler::handle_failure
//! 3. Slot 返却（必ず 2 の後）

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::pool::Slot;
use crate::domain::{Task, TaskError, TaskMessage};
use crate::ports::{Backend, FailureHandler, Handler};

/// Everything a runner needs, shared by all runners of one processor.
#[derive(Clone)]
pub struct TaskRunner {
    backend: Arc<dyn Backend>,
    handler: Arc<dyn Handler>,
    failure: Arc<dyn FailureHandler>,
}

impl TaskRunner {
    pub fn new(
        backend: Arc<dyn Backend>,
        handler: Arc<dyn Handler>,
        failure: Arc<dyn FailureHandler>,
    ) -> Self {
        Self {
            backend,
            handler,
            failure,
        }
    }

    /// Run `msg` on its own tokio task. `slot` is released when it finishes.
    ///
    /// `msg` is moved in, so the runner owns a snapshot that later backend
    /// mutations of the original cannot reach.
    pub fn spawn(&self, msg: TaskMessage, slot: Slot) -> JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move {
            runner.run(msg).await;
            slot.release();
        })
    }

    /// Execute and reconcile one task. Never panics on behalf of the handler.
    pub async fn run(&self, msg: TaskMessage) {
        let task = Task::from(&msg);
        match perform(self.handler.as_ref(), &task).await {
            Ok(()) => {
                debug!(task_id = %msg.id, task_type = %msg.task_type, "task succeeded");
                if let Err(e) = self.backend.complete(&msg).await {
                    error!(task_id = %msg.id, error = %e, "could not mark task as done");
                }
            }
            Err(err) => {
                warn!(
                    task_id = %msg.id,
                    task_type = %msg.task_type,
                    error = %err,
                    "task failed"
                );
                self.failure
                    .handle_failure(self.backend.as_ref(), msg, &err)
                    .await;
            }
        }
    }
}

/// Call the handler, turning a panic into [`TaskError::Panicked`].
///
/// The call itself happens inside the guarded future, so a handler that
/// panics before returning its future is caught too.
pub async fn perform(handler: &dyn Handler, task: &Task) -> Result<(), TaskError> {
    match AssertUnwindSafe(async { handler.process_task(task).await })
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pool::WorkerPool;
    use crate::domain::{TaskId, TaskMessage};
    use crate::ports::{BackendError, HandlerFunc};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::future::Future;
    use std::num::NonZeroUsize;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Complete(TaskId),
        Failure(TaskId, String),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
        reject_complete: bool,
    }

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Backend for Recorder {
        async fn dequeue(&self, _timeout: Duration) -> Result<Option<TaskMessage>, BackendError> {
            Ok(None)
        }

        async fn complete(&self, msg: &TaskMessage) -> Result<(), BackendError> {
            self.calls.lock().unwrap().push(Call::Complete(msg.id));
            if self.reject_complete {
                return Err(BackendError::Unavailable("down".to_string()));
            }
            Ok(())
        }

        async fn restore_unfinished(&self) -> Result<usize, BackendError> {
            Ok(0)
        }

        async fn retry(&self, _msg: TaskMessage, _at: DateTime<Utc>) -> Result<(), BackendError> {
            Ok(())
        }

        async fn kill(&self, _msg: TaskMessage) -> Result<(), BackendError> {
            Ok(())
        }
    }

    #[async_trait]
    impl FailureHandler for Recorder {
        async fn handle_failure(&self, _backend: &dyn Backend, msg: TaskMessage, error: &TaskError) {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Failure(msg.id, error.to_string()));
        }
    }

    async fn explode(_task: Task) -> Result<(), TaskError> {
        panic!("handler exploded");
    }

    async fn bad_type(task: Task) -> Result<(), TaskError> {
        panic!("bad type {}", task.task_type());
    }

    fn runner_with(recorder: Arc<Recorder>, handler: Arc<dyn Handler>) -> TaskRunner {
        TaskRunner::new(recorder.clone(), handler, recorder)
    }

    #[tokio::test]
    async fn success_reports_complete_only() {
        let recorder = Arc::new(Recorder::default());
        let runner = runner_with(
            recorder.clone(),
            Arc::new(HandlerFunc::new(|_t: Task| async { Ok(()) })),
        );
        let msg = TaskMessage::new("ok", vec![]);

        runner.run(msg.clone()).await;

        assert_eq!(recorder.calls(), vec![Call::Complete(msg.id)]);
    }

    #[tokio::test]
    async fn error_reports_failure_only() {
        let recorder = Arc::new(Recorder::default());
        let runner = runner_with(
            recorder.clone(),
            Arc::new(HandlerFunc::new(|_t: Task| async {
                Err(TaskError::msg("upstream 503"))
            })),
        );
        let msg = TaskMessage::new("flaky", vec![]);

        runner.run(msg.clone()).await;

        assert_eq!(
            recorder.calls(),
            vec![Call::Failure(msg.id, "upstream 503".to_string())]
        );
    }

    #[tokio::test]
    async fn panic_is_converted_to_failure() {
        let recorder = Arc::new(Recorder::default());
        let runner = runner_with(
            recorder.clone(),
            Arc::new(HandlerFunc::new(explode)),
        );
        let msg = TaskMessage::new("explode", vec![]);

        runner.run(msg.clone()).await;

        assert_eq!(
            recorder.calls(),
            vec![Call::Failure(msg.id, "panic: handler exploded".to_string())]
        );
    }

    #[tokio::test]
    async fn formatted_panic_message_is_kept() {
        let handler = HandlerFunc::new(bad_type);
        let err = perform(&handler, &Task::new("x", vec![])).await.unwrap_err();
        assert_eq!(err.to_string(), "panic: bad type x");
    }

    /// Handler written without `#[async_trait]` that panics while building
    /// its future rather than while it is polled.
    struct PanicsEagerly;

    impl Handler for PanicsEagerly {
        fn process_task<'life0, 'life1, 'async_trait>(
            &'life0 self,
            task: &'life1 Task,
        ) -> Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'async_trait>>
        where
            'life0: 'async_trait,
            'life1: 'async_trait,
            Self: 'async_trait,
        {
            panic!("no future for {}", task.task_type());
        }
    }

    #[tokio::test]
    async fn eager_panic_is_converted_to_failure() {
        let recorder = Arc::new(Recorder::default());
        let runner = runner_with(recorder.clone(), Arc::new(PanicsEagerly));
        let pool = WorkerPool::new(NonZeroUsize::new(1).unwrap());
        let slot = pool.acquire().await.unwrap();
        let msg = TaskMessage::new("eager", vec![]);

        runner
            .spawn(msg.clone(), slot)
            .await
            .expect("runner task itself must not panic");

        assert_eq!(
            recorder.calls(),
            vec![Call::Failure(msg.id, "panic: no future for eager".to_string())]
        );
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn complete_error_is_swallowed() {
        let recorder = Arc::new(Recorder {
            reject_complete: true,
            ..Default::default()
        });
        let runner = runner_with(
            recorder.clone(),
            Arc::new(HandlerFunc::new(|_t: Task| async { Ok(()) })),
        );
        let msg = TaskMessage::new("ok", vec![]);

        runner.run(msg.clone()).await;

        // complete は 1 回だけ、リトライしない
        assert_eq!(recorder.calls(), vec![Call::Complete(msg.id)]);
    }

    #[tokio::test]
    async fn spawned_runner_releases_slot_after_panic() {
        let recorder = Arc::new(Recorder::default());
        let runner = runner_with(
            recorder.clone(),
            Arc::new(HandlerFunc::new(explode)),
        );
        let pool = WorkerPool::new(NonZeroUsize::new(1).unwrap());
        let slot = pool.acquire().await.unwrap();
        assert_eq!(pool.in_flight(), 1);

        runner
            .spawn(TaskMessage::new("explode", vec![]), slot)
            .await
            .expect("runner task itself must not panic");

        assert_eq!(pool.in_flight(), 0);
        assert_eq!(recorder.calls().len(), 1);
    }
}
