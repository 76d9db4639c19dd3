//! ProcessorConfig - プロセッサの設定

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_CONCURRENCY: &str = "SPINDLE_CONCURRENCY";
pub const ENV_DEQUEUE_TIMEOUT_MS: &str = "SPINDLE_DEQUEUE_TIMEOUT_MS";

const DEFAULT_CONCURRENCY: usize = 10;
const DEFAULT_DEQUEUE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
}

/// Tunables for a [`Processor`](super::Processor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Maximum number of tasks executing at once.
    pub concurrency: NonZeroUsize,

    /// How long one dequeue may block.
    ///
    /// Also bounds how long the dispatch loop takes to notice a stop
    /// request while the queue is empty.
    pub dequeue_timeout: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            concurrency: NonZeroUsize::new(DEFAULT_CONCURRENCY).unwrap_or(NonZeroUsize::MIN),
            dequeue_timeout: DEFAULT_DEQUEUE_TIMEOUT,
        }
    }
}

impl ProcessorConfig {
    pub fn with_concurrency(mut self, concurrency: NonZeroUsize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_dequeue_timeout(mut self, timeout: Duration) -> Self {
        self.dequeue_timeout = timeout;
        self
    }

    /// Read overrides from the process environment.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_CONCURRENCY) {
            let n = parse_positive(ENV_CONCURRENCY, &raw)?;
            let n = usize::try_from(n).map_err(|_| ConfigError::InvalidNumber {
                key: ENV_CONCURRENCY,
                value: raw.clone(),
            })?;
            config.concurrency =
                NonZeroUsize::new(n).ok_or(ConfigError::Zero { key: ENV_CONCURRENCY })?;
        }

        if let Some(raw) = lookup(ENV_DEQUEUE_TIMEOUT_MS) {
            let ms = parse_positive(ENV_DEQUEUE_TIMEOUT_MS, &raw)?;
            config.dequeue_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    let n: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: raw.to_string(),
    })?;
    if n == 0 {
        return Err(ConfigError::Zero { key });
    }
    Ok(n)
}
