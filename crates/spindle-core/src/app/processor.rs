//! Processor - start / terminate のライフサイクル管理
//!
//! # 起動
//! 1. Backend::restore_unfinished()（前回プロセスの in-progress を pending に戻す）
//! 2. DispatchLoop を spawn して即 return
//!
//! # 停止
//! 1. shutdown シグナルを送る
//! 2. DispatchLoop の終了を待つ（新規の取り出しが止まる）
//! 3. WorkerPool を drain（実行中タスクが全部終わるまで待つ）

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::config::ProcessorConfig;
use super::dispatch_loop::DispatchLoop;
use super::pool::WorkerPool;
use super::runner::TaskRunner;
use crate::domain::ProcessorState;
use crate::impls::RetryPolicy;
use crate::ports::{Backend, FailureHandler, Handler};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("processor cannot go from {from} to {to}")]
    InvalidTransition {
        from: ProcessorState,
        to: ProcessorState,
    },
}

/// Pulls tasks from a [`Backend`] and runs them on at most
/// `config.concurrency` concurrent workers.
///
/// # 使用例
/// ```ignore
/// let mut processor = Processor::new(backend, Arc::new(registry), ProcessorConfig::default());
/// processor.start().await?;
/// // ...
/// processor.terminate().await?;
/// ```
///
/// One-shot: once terminated it cannot be started again.
pub struct Processor {
    backend: Arc<dyn Backend>,
    handler: Arc<dyn Handler>,
    failure: Arc<dyn FailureHandler>,
    config: ProcessorConfig,
    pool: WorkerPool,
    state: ProcessorState,
    shutdown_tx: watch::Sender<bool>,
    dispatch: Option<JoinHandle<()>>,
}

impl Processor {
    /// Failed tasks go to [`RetryPolicy::default`] unless
    /// [`with_failure_handler`](Self::with_failure_handler) says otherwise.
    pub fn new(backend: Arc<dyn Backend>, handler: Arc<dyn Handler>, config: ProcessorConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            backend,
            handler,
            failure: Arc::new(RetryPolicy::default()),
            pool: WorkerPool::new(config.concurrency),
            config,
            state: ProcessorState::Created,
            shutdown_tx,
            dispatch: None,
        }
    }

    pub fn with_failure_handler(mut self, failure: Arc<dyn FailureHandler>) -> Self {
        self.failure = failure;
        self
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Tasks currently holding a worker slot.
    pub fn in_flight(&self) -> usize {
        self.pool.in_flight()
    }

    /// Restore unfinished tasks, then start the dispatch loop.
    ///
    /// Returns as soon as the loop is spawned. Recovery errors are logged
    /// and do not stop the processor from starting.
    pub async fn start(&mut self) -> Result<(), LifecycleError> {
        self.ensure_can_become(ProcessorState::Running)?;
        info!(
            concurrency = self.pool.capacity(),
            dequeue_timeout = ?self.config.dequeue_timeout,
            "processor starting"
        );

        // restore は dispatch loop より先に完了させる
        self.restore().await;

        let runner = TaskRunner::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.handler),
            Arc::clone(&self.failure),
        );
        let dispatch = DispatchLoop::new(
            Arc::clone(&self.backend),
            self.pool.clone(),
            runner,
            self.config.dequeue_timeout,
        );
        let shutdown_rx = self.shutdown_tx.subscribe();
        self.dispatch = Some(tokio::spawn(dispatch.run(shutdown_rx)));

        self.state = ProcessorState::Running;
        Ok(())
    }

    /// Stop taking new tasks and wait for every running task to finish.
    ///
    /// Blocks for at most one dequeue timeout before the loop notices, plus
    /// however long the in-flight tasks take. After this returns the
    /// processor makes no further backend calls.
    pub async fn terminate(&mut self) -> Result<(), LifecycleError> {
        self.ensure_can_become(ProcessorState::Terminating)?;
        self.state = ProcessorState::Terminating;
        info!("processor shutting down");

        self.shutdown_tx.send_replace(true);
        if let Some(handle) = self.dispatch.take()
            && let Err(e) = handle.await
        {
            error!(error = %e, "dispatch loop exited abnormally");
        }

        info!(in_flight = self.pool.in_flight(), "waiting for all workers to finish");
        match self.pool.drain().await {
            Ok(_drained) => info!("all workers have finished"),
            Err(e) => error!(error = %e, "could not drain worker pool"),
        }

        self.state = ProcessorState::Terminated;
        Ok(())
    }

    async fn restore(&self) {
        match self.backend.restore_unfinished().await {
            Ok(0) => {}
            Ok(n) => info!(restored = n, "restored unfinished tasks"),
            Err(e) => error!(error = %e, "could not restore unfinished tasks"),
        }
    }

    fn ensure_can_become(&self, next: ProcessorState) -> Result<(), LifecycleError> {
        if self.state.can_transition_to(next) {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition {
                from: self.state,
                to: next,
            })
        }
    }
}

impl Drop for Processor {
    fn drop(&mut self) {
        // terminate されずに drop された場合も取り出しだけは止める
        if self.state == ProcessorState::Running {
            warn!("processor dropped while running; in-flight tasks are not awaited");
            self.shutdown_tx.send_replace(true);
        }
    }
}
