//! Live tail engine
//!
//! Filter construction, per-source cursors, batch ordering, rendering, the
//! poll loop and the round-trip probe.

pub mod builder;
pub mod cursor;
pub mod probe;
pub mod render;
pub mod sequencer;
pub mod session;

pub use builder::{parse_date_shorthand, FilterBuilder};
pub use cursor::OffsetTracker;
pub use probe::{CorrelationProbe, ProbeCompletion, ProbeOutcome, ProbeReport, RoundTripProbe};
pub use render::{LineRenderer, OutputFormat, RecordSink};
pub use sequencer::sequence;
pub use session::{Backoff, PollOutcome, TailSession, TailStats};
