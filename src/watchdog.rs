use crate::error::ErrorInfo;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-call abort signal: the caller's token plus a deadline.
///
/// Every suspension point of a call awaits through [`Watchdog::guard`], so
/// whichever fires first (caller cancel or deadline) drops the pending I/O
/// future and the call resolves to an `Aborted` error.
#[derive(Debug)]
pub(crate) struct Watchdog {
    signal: CancellationToken,
    deadline: Instant,
    timeout: Duration,
}

impl Watchdog {
    /// Starts the clock. The deadline is measured from this call.
    pub(crate) fn arm(cancel: &CancellationToken, timeout: Duration) -> Self {
        Self {
            signal: cancel.child_token(),
            deadline: Instant::now() + timeout,
            timeout,
        }
    }

    pub(crate) async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, ErrorInfo> {
        tokio::select! {
            biased;
            _ = self.signal.cancelled() => Err(ErrorInfo::aborted("cancelled by caller")),
            _ = tokio::time::sleep_until(self.deadline) => {
                self.signal.cancel();
                Err(ErrorInfo::aborted(format!("timed out after {:?}", self.timeout)))
            }
            out = fut => Ok(out),
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.signal.cancel();
    }
}
