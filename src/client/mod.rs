//! Remote log service collaborators
//!
//! The tail core only depends on the traits below; [`RemoteClient`] binds them
//! to the service over a Unix socket.

pub mod remote;
pub mod wire;

use crate::types::{FilterSpec, Record, View};
use crate::Result;
use async_trait::async_trait;

pub use remote::RemoteClient;

/// Fetches one batch of filtered records
///
/// Implementations must be safe to call from several tasks at once.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the records matching the filter, in any order
    async fn fetch(&self, spec: &FilterSpec) -> Result<Vec<Record>>;
}

/// Writes a record through the ingestion path
#[async_trait]
pub trait Ingestor: Send + Sync {
    /// Ingest `message` into the source identified by `source_token`
    async fn ingest(&self, message: &str, source_token: &str) -> Result<()>;
}

/// Persists filters as named views
#[async_trait]
pub trait ViewStore: Send + Sync {
    /// Save a view and return the identifier assigned to it
    async fn save_view(&self, view: &View) -> Result<String>;
}
