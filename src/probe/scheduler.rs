use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::http_probe::result::ProbeResult;
use crate::station::StationEntry;

/// Probes one station entry, sending every result it produces.
#[async_trait]
pub trait StationProbe: Send + Sync + 'static {
    async fn probe_station(&self, entry: &StationEntry, results: &UnboundedSender<ProbeResult>);
}

/// Runs station probes in parallel, at most `limit` at a time.
#[derive(Debug, Clone)]
pub struct Scheduler {
    limit: usize,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(limit: usize, cancel: CancellationToken) -> Self {
        Self {
            limit: limit.max(1),
            cancel,
        }
    }

    /// Starts one task per entry and returns the stream of their results.
    ///
    /// The stream ends once every task has finished. Entries still waiting
    /// for a slot when the run is cancelled are dropped without a result.
    pub fn spawn<P>(&self, prober: Arc<P>, entries: Vec<StationEntry>) -> UnboundedReceiver<ProbeResult>
    where
        P: StationProbe + ?Sized,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let slots = Arc::new(Semaphore::new(self.limit));
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let mut tasks = JoinSet::new();

            for entry in entries {
                let prober = prober.clone();
                let slots = slots.clone();
                let cancel = cancel.clone();
                let tx = tx.clone();

                tasks.spawn(async move {
                    let _permit = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            debug!(station = %entry.name, "cancelled before start");
                            return;
                        }
                        permit = slots.acquire_owned() => match permit {
                            Ok(permit) => permit,
                            Err(_) => return,
                        },
                    };
                    prober.probe_station(&entry, &tx).await;
                });
            }

            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "station task failed");
                }
            }
            // last sender: closing it ends the result stream
            drop(tx);
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks how many probes run at the same time.
    #[derive(Default)]
    struct CountingProbe {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl StationProbe for CountingProbe {
        async fn probe_station(&self, entry: &StationEntry, results: &UnboundedSender<ProbeResult>) {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            let _ = results.send(ProbeResult::ok(&entry.name, &entry.url, None));
        }
    }

    fn entries(count: usize) -> Vec<StationEntry> {
        (0..count)
            .map(|i| StationEntry::new(format!("Station {i}"), format!("http://s{i}.example/live.mp3")))
            .collect()
    }

    async fn drain(mut rx: UnboundedReceiver<ProbeResult>) -> Vec<ProbeResult> {
        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        results
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_bound_is_respected() {
        let probe = Arc::new(CountingProbe::default());
        let scheduler = Scheduler::new(5, CancellationToken::new());

        let results = drain(scheduler.spawn(probe.clone(), entries(40))).await;

        assert_eq!(results.len(), 40);
        let peak = probe.peak.load(Ordering::SeqCst);
        assert!(peak <= 5, "peak concurrency was {peak}");
        assert!(peak >= 2, "probes never overlapped");
    }

    #[tokio::test]
    async fn test_empty_run_ends_stream() {
        let scheduler = Scheduler::new(3, CancellationToken::new());
        let results = drain(scheduler.spawn(Arc::new(CountingProbe::default()), Vec::new())).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_run_skips_waiting_entries() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let scheduler = Scheduler::new(2, cancel);

        let results = drain(scheduler.spawn(Arc::new(CountingProbe::default()), entries(10))).await;

        assert!(results.is_empty());
    }

    #[test]
    fn test_zero_limit_still_makes_progress() {
        assert_eq!(Scheduler::new(0, CancellationToken::new()).limit, 1);
    }
}
