//! 后台任务管理
//!
//! 审计 worker 和通知 worker 的注册、panic 捕获和关闭。
//! 两个 worker 都在各自的 mpsc 发送端全部释放后自然退出。

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinHandle;

/// 已注册的后台任务
struct RegisteredTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

/// 后台任务管理器
///
/// ```ignore
/// let mut tasks = BackgroundTasks::new();
/// tasks.spawn("audit_worker", audit_worker.run(audit_rx));
/// // ... serve ...
/// drop(state); // 释放发送端
/// tasks.shutdown(Duration::from_secs(5)).await;
/// ```
#[derive(Default)]
pub struct BackgroundTasks {
    tasks: Vec<RegisteredTask>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册并启动一个后台任务
    ///
    /// 任务会被包装以捕获 panic，如果任务异常退出会记录错误日志。
    pub fn spawn<F>(&mut self, name: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let wrapped_future = async move {
            let result: Result<(), Box<dyn std::any::Any + Send>> =
                AssertUnwindSafe(future).catch_unwind().await;
            match result {
                Ok(()) => tracing::info!(task = %name, "Background task finished"),
                Err(panic_info) => {
                    let panic_msg: String = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        (*s).to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    tracing::error!(
                        task = %name,
                        panic = %panic_msg,
                        "Background task panicked! This is a bug that should be reported."
                    );
                }
            }
        };

        let handle = tokio::spawn(wrapped_future);
        tracing::debug!(task = %name, "Registered background task");
        self.tasks.push(RegisteredTask { name, handle });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// 返回已异常结束的任务数量
    pub fn check_health(&self) -> usize {
        let finished: Vec<_> = self
            .tasks
            .iter()
            .filter(|t| t.handle.is_finished())
            .map(|t| t.name)
            .collect();
        for name in &finished {
            tracing::error!(task = %name, "Background task unexpectedly finished");
        }
        finished.len()
    }

    /// 等待所有任务排空队列后退出，超时则中止
    ///
    /// 调用前必须先释放所有发送端 (ServerState)，否则 worker 不会结束。
    pub async fn shutdown(self, timeout: Duration) {
        tracing::info!("Shutting down {} background tasks...", self.tasks.len());

        for task in self.tasks {
            let abort = task.handle.abort_handle();
            match tokio::time::timeout(timeout, task.handle).await {
                Ok(_) => tracing::debug!(task = %task.name, "Background task stopped"),
                Err(_) => {
                    tracing::warn!(task = %task.name, "Background task did not stop in time, aborting");
                    abort.abort();
                }
            }
        }
    }
}
