use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Task, TaskError, TaskType};
use crate::ports::Handler;
use crate::typed::{Payload, TypedHandle, TypedHandler};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate handler for task_type={0}")]
    DuplicateHandler(TaskType),
}

/// Routes each task to the handler registered for its type.
///
/// Design:
/// - Built during initialization (mutable).
/// - Used during runtime (immutable, shared behind `Arc`).
///
/// Tasks with an unknown type fail with [`TaskError::HandlerNotFound`] and
/// go through the normal failure policy.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TaskType, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        task_type: impl Into<TaskType>,
        handler: Arc<dyn Handler>,
    ) -> Result<(), RegistryError> {
        let task_type = task_type.into();
        if self.handlers.contains_key(&task_type) {
            return Err(RegistryError::DuplicateHandler(task_type));
        }
        self.handlers.insert(task_type, handler);
        Ok(())
    }

    /// Register a handler that receives the payload decoded as `T`.
    pub fn register_typed<T, H>(&mut self, handler: H) -> Result<(), RegistryError>
    where
        T: Payload,
        H: TypedHandle<T> + 'static,
    {
        self.register(T::TYPE, Arc::new(TypedHandler::new(handler)))
    }

    pub fn get(&self, task_type: &TaskType) -> Option<&Arc<dyn Handler>> {
        self.handlers.get(task_type)
    }

    pub fn registered_types(&self) -> Vec<TaskType> {
        self.handlers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[async_trait]
impl Handler for HandlerRegistry {
    async fn process_task(&self, task: &Task) -> Result<(), TaskError> {
        let handler = self
            .get(task.task_type())
            .ok_or_else(|| TaskError::HandlerNotFound(task.task_type().clone()))?;

        handler.process_task(task).await
    }
}
