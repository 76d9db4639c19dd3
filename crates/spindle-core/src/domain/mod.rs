//! Domain model (ids, tasks, messages, lifecycle state, errors).

pub mod errors;
pub mod ids;
pub mod message;
pub mod state;
pub mod task;

pub use self::errors::TaskError;
pub use self::ids::TaskId;
pub use self::message::{DEFAULT_MAX_RETRY, DEFAULT_QUEUE, TaskMessage};
pub use self::state::ProcessorState;
pub use self::task::{Task, TaskType};
