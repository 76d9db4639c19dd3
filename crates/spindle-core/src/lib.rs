//! spindle-core
//!
//! In-process task dispatch: pulls tasks from a backend and runs them on a
//! bounded set of workers.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, message, state, errors）
//! - **ports**: 抽象化レイヤー（Backend, Handler, FailureHandler）
//! - **app**: アプリケーションロジック（processor, dispatch_loop, pool, runner, registry）
//! - **typed**: 型付き payload の Handler
//! - **impls**: 実装（InMemoryBackend, RetryPolicy）

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod typed;

pub use app::{HandlerRegistry, Processor, ProcessorConfig};
pub use domain::{Task, TaskError, TaskId, TaskMessage};
pub use ports::{Backend, FailureHandler, Handler, HandlerFunc};
