//! Ports - 外部コラボレーターとの境界
//!
//! - **Backend**: 永続キュー（dequeue / complete / restore / retry / kill）
//! - **Handler**: タスクを処理するユーザーコード
//! - **FailureHandler**: 失敗時のリトライ・dead-letter ポリシー

pub mod backend;
pub mod failure;
pub mod handler;

pub use self::backend::{Backend, BackendError};
pub use self::failure::FailureHandler;
pub use self::handler::{Handler, HandlerFunc};
