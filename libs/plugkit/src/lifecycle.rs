//! Start/stop control for a plugin's long-running background task, such as a
//! queue consume loop.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Stopped = 0,
    Running = 1,
    Stopping = 2,
}

impl Status {
    const fn from_u8(x: u8) -> Self {
        match x {
            1 => Status::Running,
            2 => Status::Stopping,
            _ => Status::Stopped,
        }
    }
}

/// Why `stop` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The task had already returned on its own.
    Finished,
    /// The task observed cancellation and returned.
    Cancelled,
    /// The task ignored cancellation and was aborted.
    Timeout,
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("task '{0}' is already running")]
    AlreadyStarted(&'static str),
}

pub struct Lifecycle {
    name: &'static str,
    status: Arc<AtomicU8>,
    handle: Mutex<Option<JoinHandle<()>>>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl Lifecycle {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            status: Arc::new(AtomicU8::new(Status::Stopped as u8)),
            handle: Mutex::new(None),
            cancel: Mutex::new(None),
        }
    }

    pub fn status(&self) -> Status {
        Status::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.status() == Status::Running
    }

    /// Spawn `make(token)` as the background task. The task should return
    /// once `token` is cancelled.
    pub fn start<F, Fut>(&self, token: CancellationToken, make: F) -> Result<(), LifecycleError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.status
            .compare_exchange(
                Status::Stopped as u8,
                Status::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| LifecycleError::AlreadyStarted(self.name))?;

        *self.cancel.lock() = Some(token.clone());

        let name = self.name;
        let status = self.status.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = make(token).await {
                tracing::error!(task = name, error = %e, "background task failed");
            }
            status.store(Status::Stopped as u8, Ordering::Release);
            tracing::debug!(task = name, "background task finished");
        });
        *self.handle.lock() = Some(handle);
        Ok(())
    }

    /// Cancel the task and wait up to `timeout` for it to return.
    pub async fn stop(&self, timeout: Duration) -> StopReason {
        let Some(handle) = self.handle.lock().take() else {
            return StopReason::Finished;
        };
        if handle.is_finished() {
            self.cancel.lock().take();
            let _ = handle.await;
            return StopReason::Finished;
        }

        let _ = self.status.compare_exchange(
            Status::Running as u8,
            Status::Stopping as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if let Some(tok) = self.cancel.lock().take() {
            tok.cancel();
        }

        let abort = handle.abort_handle();
        let reason = match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => StopReason::Cancelled,
            Ok(Err(e)) => {
                tracing::warn!(task = self.name, error = %e, "background task join error");
                StopReason::Cancelled
            }
            Err(_) => {
                tracing::warn!(task = self.name, "stop timed out; aborting task");
                abort.abort();
                StopReason::Timeout
            }
        };
        self.status.store(Status::Stopped as u8, Ordering::Release);
        tracing::info!(task = self.name, ?reason, "background task stopped");
        reason
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        if let Some(tok) = self.cancel.get_mut().take() {
            tok.cancel();
        }
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn start_then_stop_cancels() {
        let lc = Lifecycle::new("t");
        assert_eq!(lc.status(), Status::Stopped);

        lc.start(CancellationToken::new(), |cancel| async move {
            cancel.cancelled().await;
            Ok(())
        })
        .unwrap();
        assert!(lc.is_running());

        assert_eq!(lc.stop(Duration::from_millis(200)).await, StopReason::Cancelled);
        assert_eq!(lc.status(), Status::Stopped);
    }

    #[tokio::test]
    async fn second_start_fails_while_running() {
        let lc = Lifecycle::new("dup");
        lc.start(CancellationToken::new(), |c| async move {
            c.cancelled().await;
            Ok(())
        })
        .unwrap();

        let err = lc
            .start(CancellationToken::new(), |_| async { Ok(()) })
            .unwrap_err();
        assert!(matches!(err, LifecycleError::AlreadyStarted("dup")));
        lc.stop(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn finished_task_reports_finished() {
        let lc = Lifecycle::new("short");
        lc.start(CancellationToken::new(), |_| async { anyhow::bail!("boom") })
            .unwrap();
        sleep(Duration::from_millis(20)).await;
        assert_eq!(lc.status(), Status::Stopped);
        assert_eq!(lc.stop(Duration::from_millis(50)).await, StopReason::Finished);
    }

    #[tokio::test]
    async fn stubborn_task_is_aborted() {
        let lc = Lifecycle::new("stubborn");
        lc.start(CancellationToken::new(), |_| async {
            sleep(Duration::from_secs(1000)).await;
            Ok(())
        })
        .unwrap();
        assert_eq!(lc.stop(Duration::from_millis(30)).await, StopReason::Timeout);
        assert_eq!(lc.status(), Status::Stopped);
    }

    #[tokio::test]
    async fn parent_token_cancellation_reaches_task() {
        let parent = CancellationToken::new();
        let lc = Lifecycle::new("child");
        lc.start(parent.child_token(), |c| async move {
            c.cancelled().await;
            Ok(())
        })
        .unwrap();
        parent.cancel();
        sleep(Duration::from_millis(20)).await;
        assert_eq!(lc.status(), Status::Stopped);
    }
}
