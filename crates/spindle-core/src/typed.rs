//! Typed - JSON payload を型付きで受け取る Handler
//!
//! - **表層（Typed）**: `Payload` trait, `TypedHandle<T>` trait - 型安全
//! - **内部（Dyn）**: `TypedHandler<T, H>` が `Handler` に型消去する

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{Task, TaskError, TaskMessage};
use crate::ports::Handler;

/// Associates a payload type with its task type.
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct SendWelcome {
///     user_id: u64,
/// }
///
/// impl Payload for SendWelcome {
///     const TYPE: &'static str = "email.welcome.v1";
/// }
/// ```
pub trait Payload: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 命名規約: `{domain}.{action}.v{major}`
    const TYPE: &'static str;

    /// Build a message carrying this payload as JSON.
    fn to_message(&self) -> Result<TaskMessage, serde_json::Error> {
        Ok(TaskMessage::new(Self::TYPE, serde_json::to_vec(self)?))
    }
}

/// Handles an already-decoded payload.
#[async_trait]
pub trait TypedHandle<T: Payload>: Send + Sync {
    async fn handle(&self, payload: T) -> Result<(), TaskError>;
}

/// Decodes the JSON payload, then calls the typed handler.
pub struct TypedHandler<T: Payload, H: TypedHandle<T>> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Payload, H: TypedHandle<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Payload, H: TypedHandle<T>> Handler for TypedHandler<T, H> {
    async fn process_task(&self, task: &Task) -> Result<(), TaskError> {
        let payload: T = serde_json::from_slice(task.payload())?;
        self.handler.handle(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Greet {
        name: String,
    }

    impl Payload for Greet {
        const TYPE: &'static str = "test.greet.v1";
    }

    #[derive(Default)]
    struct Collect {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TypedHandle<Greet> for Collect {
        async fn handle(&self, payload: Greet) -> Result<(), TaskError> {
            self.seen.lock().unwrap().push(payload.name);
            Ok(())
        }
    }

    #[test]
    fn to_message_sets_type_and_json_payload() {
        let msg = Greet { name: "ada".into() }.to_message().unwrap();
        assert_eq!(msg.task_type.as_str(), Greet::TYPE);
        let back: Greet = serde_json::from_slice(&msg.payload).unwrap();
        assert_eq!(back.name, "ada");
    }

    #[tokio::test]
    async fn typed_handler_decodes_payload() {
        let handler = TypedHandler::<Greet, _>::new(Collect::default());
        let msg = Greet { name: "ada".into() }.to_message().unwrap();

        handler.process_task(&Task::from(&msg)).await.unwrap();

        assert_eq!(*handler.handler.seen.lock().unwrap(), vec!["ada".to_string()]);
    }

    #[tokio::test]
    async fn bad_json_is_a_decode_error() {
        let handler = TypedHandler::<Greet, _>::new(Collect::default());
        let err = handler
            .process_task(&Task::new(Greet::TYPE, b"not json".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Decode(_)));
    }
}
