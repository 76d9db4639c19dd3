//! Handler port - ユーザーのビジネスロジック

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::domain::{Task, TaskError};

/// Processes one task.
///
/// Returning `Err` (or panicking) hands the task to the failure policy.
///
/// # 使用例
/// ```ignore
/// struct SendEmail;
///
/// #[async_trait]
/// impl Handler for SendEmail {
///     async fn process_task(&self, task: &Task) -> Result<(), TaskError> {
///         let req: EmailRequest = serde_json::from_slice(task.payload())?;
///         mailer::send(req).await.map_err(|e| TaskError::msg(e.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait Handler: Send + Sync {
    async fn process_task(&self, task: &Task) -> Result<(), TaskError>;
}

/// Adapts an async closure into a [`Handler`].
///
/// The closure gets its own copy of the task so the returned future can be
/// `'static`.
pub struct HandlerFunc<F, Fut> {
    f: F,
    _marker: PhantomData<fn() -> Fut>,
}

impl<F, Fut> HandlerFunc<F, Fut>
where
    F: Fn(Task) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), TaskError>> + Send,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFunc<F, Fut>
where
    F: Fn(Task) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), TaskError>> + Send,
{
    async fn process_task(&self, task: &Task) -> Result<(), TaskError> {
        (self.f)(task.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handler_func_forwards_task() {
        let handler = HandlerFunc::new(|task: Task| async move {
            if task.payload() == b"ok" {
                Ok(())
            } else {
                Err(TaskError::msg("bad payload"))
            }
        });

        assert!(handler.process_task(&Task::new("t", b"ok".to_vec())).await.is_ok());
        let err = handler
            .process_task(&Task::new("t", b"nope".to_vec()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "bad payload");
    }
}
