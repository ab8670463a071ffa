//! Background execution for fetch and merge probes
//!
//! A [`TaskHandle`] is the control side's only link to a running operation:
//! a channel of [`TaskEvent`]s plus a [`CancelToken`]. The operation runs on
//! tokio's blocking pool and reports through a [`Reporter`].
//!
//! Delivery rules:
//! - progress events arrive in the order the operation produced them
//! - exactly one [`TaskEvent::Finished`] arrives, after all progress
//! - once [`TaskHandle::cancel`] returns, nothing more is delivered

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use reconcile_git::FetchProgress;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{Error, Result};

/// Cooperative cancellation flag shared between control side and worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Intermediate status published by a running operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Free-text status line
    Status(String),
    /// Object transfer statistics from a fetch
    Transfer(FetchProgress),
    /// One reference pair finished its merge probe
    Evaluated {
        done: usize,
        total: usize,
        reference: String,
    },
}

/// Something delivered from a running operation to the control side.
#[derive(Debug)]
pub enum TaskEvent<T> {
    Progress(Progress),
    Finished(Result<T>),
}

/// Worker-side sender. Not `Clone`: the operation cannot leak it past its return.
#[derive(Debug)]
pub struct Reporter<T> {
    tx: UnboundedSender<TaskEvent<T>>,
    token: CancelToken,
}

impl<T> Reporter<T> {
    /// Publish progress. Returns `false` once the task was cancelled.
    pub fn report(&self, progress: Progress) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        // The receiver may be gone already; that is the same as cancellation
        self.tx.send(TaskEvent::Progress(progress)).is_ok()
    }

    pub fn status(&self, message: impl Into<String>) -> bool {
        self.report(Progress::Status(message.into()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

/// Control-side handle to a background operation.
#[derive(Debug)]
pub struct TaskHandle<T> {
    rx: UnboundedReceiver<TaskEvent<T>>,
    token: CancelToken,
    finished: bool,
}

impl<T> TaskHandle<T> {
    /// Next event if one is ready. Never blocks.
    pub fn try_next(&mut self) -> Option<TaskEvent<T>> {
        if self.is_closed() {
            return None;
        }
        let event = self.rx.try_recv().ok()?;
        self.note(&event);
        Some(event)
    }

    /// Wait for the next event without blocking the thread.
    ///
    /// Returns `None` after completion, after cancellation, or if the worker
    /// went away without reporting.
    pub async fn next(&mut self) -> Option<TaskEvent<T>> {
        if self.is_closed() {
            return None;
        }
        let event = self.rx.recv().await?;
        if self.token.is_cancelled() {
            return None;
        }
        self.note(&event);
        Some(event)
    }

    /// Stop delivering events and ask the worker to stop. Idempotent.
    pub fn cancel(&mut self) {
        self.token.cancel();
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the completion event was delivered
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn is_closed(&self) -> bool {
        self.finished || self.token.is_cancelled()
    }

    fn note(&mut self, event: &TaskEvent<T>) {
        if matches!(event, TaskEvent::Finished(_)) {
            self.finished = true;
        }
    }
}

impl<T> Drop for TaskHandle<T> {
    fn drop(&mut self) {
        if !self.finished {
            self.token.cancel();
        }
    }
}

/// Run `operation` on the runtime's blocking pool.
///
/// A panic inside the operation is delivered as [`Error::TaskPanicked`].
pub fn spawn<T, F>(runtime: &Handle, operation: F) -> TaskHandle<T>
where
    T: Send + 'static,
    F: FnOnce(&Reporter<T>) -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let token = CancelToken::new();
    let reporter = Reporter {
        tx,
        token: token.clone(),
    };

    runtime.spawn_blocking(move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| operation(&reporter)))
            .unwrap_or_else(|payload| {
                Err(Error::TaskPanicked {
                    message: panic_message(payload.as_ref()),
                })
            });

        if reporter.is_cancelled() {
            tracing::debug!("Discarding result of cancelled background task");
            return;
        }
        let _ = reporter.tx.send(TaskEvent::Finished(outcome));
    });

    TaskHandle {
        rx,
        token,
        finished: false,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
