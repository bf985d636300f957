//! Round-trip delivery probe
//!
//! The probe writes a record carrying a fresh token through the ingestion path
//! and polls the same filtering service the live tail uses until a record with
//! exactly that message comes back, the service fails, or the deadline passes.
//!
//! ```text
//! ARMED --ingest--> WAITING --match--> FOUND
//!                      |--fetch error--> ERROR
//!                      `--deadline-----> TIMEOUT
//! ```
//!
//! Every path reports through one [`ProbeCompletion`]; only the first report
//! is delivered.

use crate::client::{Fetcher, Ingestor};
use crate::config::ProbeSettings;
use crate::tail::builder::FilterBuilder;
use crate::tail::cursor::OffsetTracker;
use crate::types::{FilterSpec, Record, Source};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Terminal state of a probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The tagged record came back
    Found,
    /// The deadline passed first
    Timeout,
    /// Ingestion or fetching failed
    Error(String),
}

impl ProbeOutcome {
    /// Process exit status for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            ProbeOutcome::Found => 0,
            ProbeOutcome::Error(_) => 1,
            ProbeOutcome::Timeout => 2,
        }
    }

    /// Whether the record came back
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Found)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Found => write!(f, "found"),
            ProbeOutcome::Timeout => write!(f, "timed out"),
            ProbeOutcome::Error(e) => write!(f, "failed: {}", e),
        }
    }
}

/// What a finished probe reports
#[derive(Debug, Clone)]
pub struct ProbeReport {
    /// Terminal state
    pub outcome: ProbeOutcome,
    /// Wall-clock time from arming to the terminal state
    pub elapsed: Duration,
    /// Token the probe looked for
    pub token: String,
}

/// Single-use completion handle.
///
/// Clones share one slot; the first [`resolve`](Self::resolve) delivers its
/// outcome and every later call is a no-op returning `false`.
#[derive(Debug, Clone)]
pub struct ProbeCompletion {
    sender: Arc<Mutex<Option<oneshot::Sender<ProbeOutcome>>>>,
}

impl ProbeCompletion {
    /// Create a handle and the receiver of its single outcome
    pub fn new() -> (Self, oneshot::Receiver<ProbeOutcome>) {
        let (tx, rx) = oneshot::channel();
        let completion = Self {
            sender: Arc::new(Mutex::new(Some(tx))),
        };
        (completion, rx)
    }

    /// Deliver `outcome` unless an outcome was already delivered
    pub fn resolve(&self, outcome: ProbeOutcome) -> bool {
        let Some(sender) = self.sender.lock().take() else {
            debug!(%outcome, "probe already resolved, ignoring");
            return false;
        };
        // Receiver may already be dropped.
        let _ = sender.send(outcome);
        true
    }

    /// Whether an outcome was delivered
    pub fn is_resolved(&self) -> bool {
        self.sender.lock().is_none()
    }
}

/// Token and deadline of one probe run
#[derive(Debug, Clone)]
pub struct CorrelationProbe {
    token: String,
    started: Instant,
    deadline: Instant,
}

impl CorrelationProbe {
    /// Generate a fresh token with a deadline `timeout` from now
    pub fn arm(timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            token: format!("logtail-probe-{}", Uuid::new_v4().simple()),
            started,
            deadline: started + timeout,
        }
    }

    /// Message body of the injected record
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Instant at which the probe times out
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time since the probe was armed
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whether `record` is the injected one
    pub fn matches(&self, record: &Record) -> bool {
        record.message == self.token
    }
}

/// Write-then-observe check against one source
pub struct RoundTripProbe {
    fetcher: Arc<dyn Fetcher>,
    ingestor: Arc<dyn Ingestor>,
    source: Source,
    source_token: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl RoundTripProbe {
    /// Probe `source`, ingesting with `source_token`
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        ingestor: Arc<dyn Ingestor>,
        source: Source,
        source_token: impl Into<String>,
        settings: &ProbeSettings,
    ) -> Self {
        Self {
            fetcher,
            ingestor,
            source,
            source_token: source_token.into(),
            timeout: settings.timeout(),
            poll_interval: settings.poll_interval(),
        }
    }

    /// Override the deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the delay between polls
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run the probe to a terminal state
    pub async fn run(&self) -> ProbeReport {
        let probe = CorrelationProbe::arm(self.timeout);
        let report = |outcome: ProbeOutcome| ProbeReport {
            outcome,
            elapsed: probe.elapsed(),
            token: probe.token().to_string(),
        };

        let spec = match FilterBuilder::new(vec![self.source.clone()]).build() {
            Ok(spec) => spec,
            Err(e) => return report(ProbeOutcome::Error(e.to_string())),
        };

        let (completion, mut rx) = ProbeCompletion::new();
        let cancel = CancellationToken::new();
        let watcher = tokio::spawn(watch(
            Arc::clone(&self.fetcher),
            spec,
            probe.clone(),
            completion.clone(),
            cancel.clone(),
            self.poll_interval,
        ));

        info!(token = %probe.token(), source = %self.source.name, "probe armed");
        match tokio::time::timeout_at(
            probe.deadline(),
            self.ingestor.ingest(probe.token(), &self.source_token),
        )
        .await
        {
            Ok(Ok(())) => info!("test record ingested, waiting for it"),
            Ok(Err(e)) => {
                completion.resolve(ProbeOutcome::Error(format!("ingest failed: {}", e)));
            }
            Err(_) => {
                completion.resolve(ProbeOutcome::Timeout);
            }
        }

        let deadline = tokio::time::sleep_until(probe.deadline());
        tokio::pin!(deadline);
        let outcome = tokio::select! {
            biased;
            outcome = &mut rx => outcome,
            _ = &mut deadline => {
                completion.resolve(ProbeOutcome::Timeout);
                (&mut rx).await
            }
        }
        .unwrap_or_else(|_| ProbeOutcome::Error("probe ended without an outcome".to_string()));

        cancel.cancel();
        watcher.abort();

        let finished = report(outcome);
        let elapsed_ms = finished.elapsed.as_millis() as u64;
        match &finished.outcome {
            ProbeOutcome::Found => info!(elapsed_ms, "probe found"),
            ProbeOutcome::Timeout => warn!(elapsed_ms, "probe timed out"),
            ProbeOutcome::Error(e) => warn!(elapsed_ms, error = %e, "probe failed"),
        }
        finished
    }
}

async fn watch(
    fetcher: Arc<dyn Fetcher>,
    spec: FilterSpec,
    probe: CorrelationProbe,
    completion: ProbeCompletion,
    cancel: CancellationToken,
    poll_interval: Duration,
) {
    let tracker = OffsetTracker::new();

    while !cancel.is_cancelled() && !completion.is_resolved() {
        let request = spec.with_sources(tracker.annotate(&spec.sources));
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = fetcher.fetch(&request) => result,
        };

        match result {
            Ok(records) => {
                if records.iter().any(|r| probe.matches(r)) {
                    completion.resolve(ProbeOutcome::Found);
                    return;
                }
                tracker.update(&records);
            }
            Err(e) => {
                completion.resolve(ProbeOutcome::Error(e.to_string()));
                return;
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }
}
