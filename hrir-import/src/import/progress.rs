//! Progress-polled background stages
//!
//! The loader and onset stages run as exactly one blocking task while the
//! invoking task polls a shared atomic counter at a fixed cadence, purely for
//! progress display. The counter is never used for correctness; completion
//! comes from the task's own join.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::error::{Error, Result};

/// Fixed poll cadence for progress display
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run `work` on the blocking pool, reporting `n of total` for `stage` each
/// time the poll interval elapses without the task finishing.
pub(crate) async fn run_polled<T, F>(
    stage: &str,
    total: usize,
    counter: Arc<AtomicUsize>,
    work: F,
) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let mut handle = tokio::task::spawn_blocking(work);
    let value = loop {
        match tokio::time::timeout(POLL_INTERVAL, &mut handle).await {
            Ok(joined) => {
                let result =
                    joined.map_err(|e| Error::Task(format!("{stage} task failed: {e}")))?;
                break result?;
            }
            Err(_elapsed) => {
                info!("{stage}... {} of {}", counter.load(Ordering::Relaxed), total);
            }
        }
    };
    info!("{stage}... {total} of {total}");
    Ok(value)
}
