use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::ProbeSettings;
use crate::error::ProbeError;
use crate::summary::Summary;

/// Everything a probe needs besides the URL: settings, the shared run
/// summary and the run's cancellation token. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ProbeContext {
    pub settings: Arc<ProbeSettings>,
    pub summary: Arc<Summary>,
    pub cancel: CancellationToken,
}

impl ProbeContext {
    pub fn new(settings: ProbeSettings) -> Self {
        Self::with_cancel(settings, CancellationToken::new())
    }

    pub fn with_cancel(settings: ProbeSettings, cancel: CancellationToken) -> Self {
        Self {
            settings: Arc::new(settings),
            summary: Arc::new(Summary::new()),
            cancel,
        }
    }

    /// Runs `fut` unless the run gets cancelled first.
    pub async fn cancellable<T>(&self, fut: impl Future<Output = T>) -> Result<T, ProbeError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ProbeError::Cancelled),
            out = fut => Ok(out),
        }
    }

    /// Sleeps for `delay`, returning early with an error on cancellation.
    pub async fn sleep(&self, delay: Duration) -> Result<(), ProbeError> {
        self.cancellable(tokio::time::sleep(delay)).await
    }
}
