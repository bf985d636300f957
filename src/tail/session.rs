//! Poll loop driving a live tail
//!
//! A [`TailSession`] owns its filter, its offset tracker and its cancellation
//! token. Each tick annotates the filter's sources with the current cursors,
//! fetches one batch, orders it, advances the cursors and hands the batch to a
//! sink. Fetch failures never end the loop; they only lengthen the delay
//! before the next tick.

use crate::client::Fetcher;
use crate::config::TailSettings;
use crate::tail::cursor::OffsetTracker;
use crate::tail::render::RecordSink;
use crate::tail::sequencer::sequence;
use crate::types::{FilterSpec, Record};
use crate::{LogTailError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Result of one fetch
#[derive(Debug)]
pub enum PollOutcome {
    /// New records, in arrival order
    Records(Vec<Record>),
    /// Nothing new this round
    Empty,
    /// The fetch failed
    Failed(LogTailError),
}

impl From<Result<Vec<Record>>> for PollOutcome {
    fn from(result: Result<Vec<Record>>) -> Self {
        match result {
            Ok(records) if records.is_empty() => PollOutcome::Empty,
            Ok(records) => PollOutcome::Records(records),
            Err(e) => PollOutcome::Failed(e),
        }
    }
}

/// Inter-tick delay: the poll interval after a good tick, doubling after
/// consecutive failures up to a cap
#[derive(Debug, Clone)]
pub struct Backoff {
    interval: Duration,
    max: Duration,
    failures: u32,
}

impl Backoff {
    /// Create a backoff over `interval`, capped at `max`
    pub fn new(interval: Duration, max: Duration) -> Self {
        Self {
            interval,
            max: max.max(interval),
            failures: 0,
        }
    }

    /// Delay after a successful tick
    pub fn succeeded(&mut self) -> Duration {
        self.failures = 0;
        self.interval
    }

    /// Delay after a failed tick
    pub fn failed(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let factor = 1u32.checked_shl(self.failures.min(16)).unwrap_or(u32::MAX);
        self.interval.saturating_mul(factor).min(self.max)
    }
}

/// Counters reported when a session stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TailStats {
    /// Fetches attempted
    pub ticks: u64,
    /// Records handed to the sink
    pub records: u64,
    /// Fetches that failed
    pub failures: u64,
}

enum Tick {
    Completed,
    Failed,
    Stopped,
}

/// One live tail
pub struct TailSession {
    spec: FilterSpec,
    tracker: Arc<OffsetTracker>,
    cancel: CancellationToken,
    poll_interval: Duration,
    max_backoff: Duration,
}

impl TailSession {
    /// Create a session for a filter with a fresh tracker
    pub fn new(spec: FilterSpec, settings: &TailSettings) -> Self {
        Self {
            spec,
            tracker: Arc::new(OffsetTracker::new()),
            cancel: CancellationToken::new(),
            poll_interval: settings.poll_interval(),
            max_backoff: settings.max_backoff(),
        }
    }

    /// Stop this session when `token` is cancelled
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The session's filter, without cursors
    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// Shared handle to the session's tracker
    pub fn tracker(&self) -> Arc<OffsetTracker> {
        Arc::clone(&self.tracker)
    }

    /// Token that stops the session when cancelled, from any task or thread
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request a stop; takes effect before the next fetch
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether a stop was requested
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The filter the next fetch will send
    pub fn next_request(&self) -> FilterSpec {
        self.spec.with_sources(self.tracker.annotate(&self.spec.sources))
    }

    /// Run until cancelled.
    ///
    /// Returns early only if the sink fails.
    pub async fn run<F, S>(&self, fetcher: &F, sink: &mut S) -> Result<TailStats>
    where
        F: Fetcher + ?Sized,
        S: RecordSink + ?Sized,
    {
        info!(
            sources = self.spec.sources.len(),
            interval_ms = self.poll_interval.as_millis() as u64,
            "tail session started"
        );

        let mut stats = TailStats::default();
        let mut backoff = Backoff::new(self.poll_interval, self.max_backoff);

        while !self.cancel.is_cancelled() {
            let delay = match self.tick(fetcher, sink, &mut stats).await? {
                Tick::Completed => backoff.succeeded(),
                Tick::Failed => backoff.failed(),
                Tick::Stopped => break,
            };

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!(
            ticks = stats.ticks,
            records = stats.records,
            failures = stats.failures,
            "tail session stopped"
        );
        Ok(stats)
    }

    async fn tick<F, S>(&self, fetcher: &F, sink: &mut S, stats: &mut TailStats) -> Result<Tick>
    where
        F: Fetcher + ?Sized,
        S: RecordSink + ?Sized,
    {
        stats.ticks += 1;
        let request = self.next_request();

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(Tick::Stopped),
            result = fetcher.fetch(&request) => PollOutcome::from(result),
        };

        // A batch that lands after a stop request is dropped.
        if self.cancel.is_cancelled() {
            return Ok(Tick::Stopped);
        }

        match outcome {
            PollOutcome::Records(mut records) => {
                sequence(&mut records);
                self.tracker.update(&records);
                sink.emit(&records)?;
                stats.records += records.len() as u64;
                debug!(count = records.len(), "rendered batch");
                Ok(Tick::Completed)
            }
            PollOutcome::Empty => Ok(Tick::Completed),
            PollOutcome::Failed(e) => {
                stats.failures += 1;
                if e.is_transient() {
                    warn!(error = %e, "fetch failed, retrying");
                } else {
                    error!(error = %e, "fetch failed, retrying");
                }
                Ok(Tick::Failed)
            }
        }
    }
}
