//! App - アプリケーション層
//!
//! ports を組み合わせてタスク処理を実装します。
//!
//! # 主要コンポーネント
//! - **Processor**: start / terminate のライフサイクル
//! - **DispatchLoop**: dequeue → スロット確保 → runner へ引き渡し
//! - **WorkerPool**: 同時実行数の上限（セマフォ）
//! - **TaskRunner**: 1 タスクの実行と結果の報告
//! - **HandlerRegistry**: task_type ごとの Handler 振り分け

pub mod config;
pub mod dispatch_loop;
pub mod pool;
pub mod processor;
pub mod registry;
pub mod runner;
pub mod status;

// 主要な型を再エクスポート
pub use self::config::{ConfigError, ProcessorConfig};
pub use self::dispatch_loop::DispatchLoop;
pub use self::pool::{Drained, PoolError, Slot, WorkerPool};
pub use self::processor::{LifecycleError, Processor};
pub use self::registry::{HandlerRegistry, RegistryError};
pub use self::runner::{TaskRunner, perform};
pub use self::status::QueueCounts;
