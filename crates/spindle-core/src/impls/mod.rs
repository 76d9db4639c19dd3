//! Impls - ports の実装
//!
//! - **InMemoryBackend**: 開発・テスト用のバックエンド
//! - **RetryPolicy**: デフォルトの FailureHandler（指数バックオフ → dead-letter）

pub mod inmem_backend;
pub mod retry;

pub use self::inmem_backend::InMemoryBackend;
pub use self::retry::RetryPolicy;
