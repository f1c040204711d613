//! A small wrapper around a tokio runtime handle that ties every spawned task to a
//! shared shutdown signal.
//!
//! The feed client's read loop, its ping/subscribe sends, the alert engine's
//! evaluation/heartbeat tickers and every per-incident reset timer are all spawned
//! through a `TaskExecutor` so that a single shutdown trigger (Ctrl-C, or the
//! retry-budget-exhausted path) tears all of them down together instead of leaking
//! detached tasks.

use futures::future::{select, Either};
use slog::{debug, o};
use std::future::Future;
use std::pin::Pin;

/// Receiving end of the shutdown signal. Closes (all sends complete, channel becomes
/// empty and disconnected) when the corresponding [`ShutdownSender`] is dropped.
pub type ShutdownReceiver = async_channel::Receiver<()>;

/// Create a linked shutdown sender/receiver pair. Drop the sender to signal shutdown.
pub fn shutdown_channel() -> (async_channel::Sender<()>, ShutdownReceiver) {
    async_channel::bounded(1)
}

/// Handle used to spawn tasks that are automatically cancelled on shutdown.
#[derive(Clone)]
pub struct TaskExecutor {
    handle: tokio::runtime::Handle,
    exit: ShutdownReceiver,
    log: slog::Logger,
}

impl TaskExecutor {
    pub fn new(handle: tokio::runtime::Handle, exit: ShutdownReceiver, log: slog::Logger) -> Self {
        Self { handle, exit, log }
    }

    /// A receiver that resolves once shutdown has been signaled.
    pub fn exit(&self) -> ShutdownReceiver {
        self.exit.clone()
    }

    pub fn handle(&self) -> &tokio::runtime::Handle {
        &self.handle
    }

    pub fn log(&self) -> &slog::Logger {
        &self.log
    }

    /// Spawn a future that runs until either it completes or shutdown is signaled,
    /// whichever comes first.
    pub fn spawn(&self, task: impl Future<Output = ()> + Send + 'static, name: &'static str) {
        let log = self.log.new(o!("task" => name));
        let exit = self.exit.clone();

        let fut = async move {
            let exit_signaled = exit.recv();
            futures::pin_mut!(exit_signaled);
            let task: Pin<Box<dyn Future<Output = ()> + Send>> = Box::pin(task);

            match select(task, exit_signaled).await {
                Either::Left(((), _)) => debug!(log, "task completed"),
                Either::Right((_, _)) => debug!(log, "task shutting down"),
            }
        };

        self.handle.spawn(fut);
    }

    /// Spawn a future on a blocking thread, for code that cannot be made async
    /// (e.g. a synchronous websocket handshake in a vendored client).
    pub fn spawn_blocking<F, R>(&self, task: F, name: &'static str) -> tokio::task::JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let log = self.log.new(o!("blocking_task" => name));
        let handle = self.handle.spawn_blocking(task);
        debug!(log, "spawned blocking task");
        handle
    }
}
