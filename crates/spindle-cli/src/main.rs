use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::time::{Duration, sleep};
use tracing::info;

use spindle_core::app::{HandlerRegistry, Processor, ProcessorConfig};
use spindle_core::domain::{Task, TaskError, TaskMessage};
use spindle_core::impls::{InMemoryBackend, RetryPolicy};
use spindle_core::ports::HandlerFunc;
use spindle_core::typed::{Payload, TypedHandle};

#[derive(Debug, Serialize, Deserialize)]
struct Hello {
    name: String,
}

impl Payload for Hello {
    const TYPE: &'static str = "demo.hello.v1";
}

/// 最初の n 回はわざと失敗する
struct HelloHandler {
    remaining_failures: AtomicU32,
}

impl HelloHandler {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl TypedHandle<Hello> for HelloHandler {
    async fn handle(&self, payload: Hello) -> Result<(), TaskError> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(TaskError::Failed(format!("intentional failure (left={left})")));
        }

        println!("Hello, {}!", payload.name);
        Ok(())
    }
}

async fn crash(_task: Task) -> Result<(), TaskError> {
    panic!("crash handler always panics");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    // (A) 設定は環境変数から（SPINDLE_CONCURRENCY / SPINDLE_DEQUEUE_TIMEOUT_MS）
    let config = ProcessorConfig::from_env()?;
    let backend = Arc::new(InMemoryBackend::new());

    // (B) Handler を登録
    let mut registry = HandlerRegistry::new();
    registry.register_typed::<Hello, _>(HelloHandler::new(2))?;
    registry.register(
        "demo.nap.v1",
        Arc::new(HandlerFunc::new(|task: Task| async move {
            sleep(Duration::from_millis(200)).await;
            info!(bytes = task.payload().len(), "nap finished");
            Ok(())
        })),
    )?;
    registry.register("demo.crash.v1", Arc::new(HandlerFunc::new(crash)))?;

    // (C) タスク投入
    for name in ["spindle", "tokio"] {
        let id = backend.enqueue(Hello { name: name.to_string() }.to_message()?).await;
        println!("enqueued task: {id}");
    }
    // 型を介さず JSON を直接積むこともできる
    let raw = serde_json::to_vec(&serde_json::json!({ "name": "ferris" }))?;
    let id = backend.enqueue(TaskMessage::new(Hello::TYPE, raw)).await;
    println!("enqueued task: {id}");
    for i in 0..6u8 {
        backend.enqueue(TaskMessage::new("demo.nap.v1", vec![i; 16])).await;
    }
    backend
        .enqueue(TaskMessage::new("demo.crash.v1", vec![]).with_max_retry(1))
        .await;
    backend
        .enqueue(TaskMessage::new("demo.unknown.v1", vec![]).with_max_retry(0))
        .await;

    // デモなので待ち時間を短くする
    let policy = RetryPolicy {
        base_delay: Duration::from_millis(200),
        max_jitter: Duration::from_millis(50),
        ..RetryPolicy::default()
    };
    let mut processor = Processor::new(backend.clone(), Arc::new(registry), config)
        .with_failure_handler(Arc::new(policy));
    processor.start().await?;

    // (D) 全部片付くか Ctrl-C まで待つ
    let settled = async {
        loop {
            if backend.counts().await.is_settled() {
                break;
            }
            sleep(Duration::from_millis(50)).await;
        }
    };
    tokio::select! {
        _ = settled => info!("queue settled"),
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    // (E) graceful shutdown
    processor.terminate().await?;

    println!("counts: {:?}", backend.counts().await);
    for msg in backend.dead_tasks().await {
        println!(
            "dead: id={} type={} retried={} error={:?}",
            msg.id, msg.task_type, msg.retried, msg.error_msg
        );
    }
    Ok(())
}
