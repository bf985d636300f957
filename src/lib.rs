//! # LogTail - Live Log Tailing for a Hosted Log Service
//!
//! LogTail polls a remote filtering service for new log records spread across
//! many independently-advancing sources, orders each batch, tracks per-source
//! progress so nothing is re-delivered or skipped, and renders records as they
//! arrive.
//!
//! ## Features
//!
//! - **Filter Construction**: sources, free-text queries, field conditions and
//!   `now-<N><unit>` date shorthands
//! - **Per-Source Cursors**: monotonic high-water offsets, one tracker per session
//! - **Cancellable Poll Loop**: fixed inter-poll delay with failure backoff
//! - **Round-Trip Probe**: inject a tagged record and wait for it to come back
//!
//! ## Quick Start
//!
//! ### Tail
//! ```no_run
//! use logtail::client::RemoteClient;
//! use logtail::config::TailSettings;
//! use logtail::tail::{FilterBuilder, LineRenderer, TailSession};
//! use logtail::types::Source;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RemoteClient::connect("/tmp/logtail.sock").await?;
//!     let spec = FilterBuilder::new(vec![Source::new("1", "api", "team-1")])
//!         .with_start("now-10m")
//!         .build()?;
//!
//!     let session = TailSession::new(spec, &TailSettings::default());
//!     let mut renderer = LineRenderer::stdout("text");
//!     session.run(&client, &mut renderer).await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Probe
//! ```no_run
//! use logtail::client::RemoteClient;
//! use logtail::config::ProbeSettings;
//! use logtail::tail::RoundTripProbe;
//! use logtail::types::Source;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(RemoteClient::connect("/tmp/logtail.sock").await?);
//!     let probe = RoundTripProbe::new(
//!         client.clone(),
//!         client,
//!         Source::new("1", "api", "team-1"),
//!         "ingest-token",
//!         &ProbeSettings::default(),
//!     );
//!     let report = probe.run().await;
//!     println!("{} after {:?}", report.outcome, report.elapsed);
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod tail;
pub mod types;

/// Common error types used throughout LogTail
pub mod error {
    use std::fmt;

    /// LogTail error types
    #[derive(Debug)]
    pub enum LogTailError {
        /// I/O operation failed
        Io(std::io::Error),
        /// Serialization/deserialization failed
        Serde(serde_json::Error),
        /// Configuration error
        Config(String),
        /// Filter could not be built from the given inputs
        Filter(String),
        /// Connection error
        Connection(String),
        /// The remote service rejected or failed a request
        Remote(String),
        /// Writing rendered output failed
        Render(String),
    }

    impl LogTailError {
        /// Whether a poll loop may keep going after this error
        pub fn is_transient(&self) -> bool {
            matches!(
                self,
                LogTailError::Io(_)
                    | LogTailError::Serde(_)
                    | LogTailError::Connection(_)
                    | LogTailError::Remote(_)
            )
        }
    }

    impl fmt::Display for LogTailError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                LogTailError::Io(e) => write!(f, "I/O error: {}", e),
                LogTailError::Serde(e) => write!(f, "Serialization error: {}", e),
                LogTailError::Config(e) => write!(f, "Configuration error: {}", e),
                LogTailError::Filter(e) => write!(f, "Filter error: {}", e),
                LogTailError::Connection(e) => write!(f, "Connection error: {}", e),
                LogTailError::Remote(e) => write!(f, "Remote error: {}", e),
                LogTailError::Render(e) => write!(f, "Render error: {}", e),
            }
        }
    }

    impl std::error::Error for LogTailError {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            match self {
                LogTailError::Io(e) => Some(e),
                LogTailError::Serde(e) => Some(e),
                _ => None,
            }
        }
    }

    impl From<std::io::Error> for LogTailError {
        fn from(err: std::io::Error) -> Self {
            LogTailError::Io(err)
        }
    }

    impl From<serde_json::Error> for LogTailError {
        fn from(err: serde_json::Error) -> Self {
            LogTailError::Serde(err)
        }
    }

    /// Result type alias for LogTail operations
    pub type Result<T> = std::result::Result<T, LogTailError>;
}

pub use error::{LogTailError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::{Fetcher, Ingestor, RemoteClient, ViewStore};
    pub use crate::config::{CliConfig, ClientConfig, ProbeSettings, TailSettings};
    pub use crate::tail::{
        FilterBuilder, LineRenderer, OffsetTracker, ProbeOutcome, RecordSink, RoundTripProbe,
        TailSession,
    };
    pub use crate::types::{FilterSpec, Record, Source, View};
    pub use crate::{LogTailError, Result};
}
