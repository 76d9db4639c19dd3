//! Retry policy: the default [`FailureHandler`].
//!
//! Failed tasks are retried with exponential backoff plus random jitter
//! until the message's own `retry` limit is used up, then dead-lettered.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{error, info, warn};

use crate::domain::{TaskError, TaskMessage};
use crate::ports::{Backend, FailureHandler};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Upper bound of the uniform random delay added on top.
    pub max_jitter: Duration,

    /// Backoff never grows past this.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_jitter: Duration::from_secs(1),
            max_delay: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl RetryPolicy {
    /// Deterministic part of the backoff.
    ///
    /// `retried` is the number of retries already done (0 for the first
    /// failure): delay = base_delay * multiplier^retried, capped at `max_delay`.
    ///
    /// Example with base_delay=2s, multiplier=2.0:
    /// - retried 0: 2s
    /// - retried 1: 4s
    /// - retried 2: 8s
    pub fn next_delay(&self, retried: u32) -> Duration {
        let exp = i32::try_from(retried).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exp);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    fn jitter(&self) -> Duration {
        let max_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }

    /// When the next attempt of a task that has been retried `retried` times should run.
    pub fn retry_at(&self, retried: u32, now: DateTime<Utc>) -> DateTime<Utc> {
        let delay = self.next_delay(retried) + self.jitter();
        chrono::Duration::from_std(delay)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[async_trait]
impl FailureHandler for RetryPolicy {
    async fn handle_failure(&self, backend: &dyn Backend, mut msg: TaskMessage, error: &TaskError) {
        msg.error_msg = Some(error.to_string());
        let task_id = msg.id;

        if msg.retry_exhausted() {
            warn!(
                %task_id,
                task_type = %msg.task_type,
                retried = msg.retried,
                "retry exhausted, moving task to the dead queue"
            );
            if let Err(e) = backend.kill(msg).await {
                error!(%task_id, error = %e, "could not move task to the dead queue");
            }
            return;
        }

        let retry_at = self.retry_at(msg.retried, Utc::now());
        msg.retried += 1;
        info!(
            %task_id,
            task_type = %msg.task_type,
            retried = msg.retried,
            %retry_at,
            "scheduling retry"
        );
        if let Err(e) = backend.retry(msg, retry_at).await {
            error!(%task_id, error = %e, "could not schedule task for retry");
        }
    }
}
