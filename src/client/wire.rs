//! Line-delimited JSON envelopes exchanged with the log service

use crate::types::{FilterSpec, Record, View};
use crate::{LogTailError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One request line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Fetch a batch of filtered records
    Fetch {
        /// Filter with per-source starting offsets
        filter: FilterSpec,
    },
    /// Ingest one record
    Ingest {
        /// Ingestion key of the target source
        source_token: String,
        /// Record message
        message: String,
        /// Host the record was written from
        hostname: String,
        /// Process that wrote the record
        pid: u32,
        /// Time the record was written
        timestamp: DateTime<Utc>,
    },
    /// Persist a view
    SaveView {
        /// View to store
        view: View,
    },
}

impl Request {
    /// Encode as one newline-terminated JSON line
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// One response line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Whether the request succeeded
    pub ok: bool,
    /// Records of a fetch
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<Record>,
    /// Identifier of a saved view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Successful fetch
    pub fn records(records: Vec<Record>) -> Self {
        Self {
            ok: true,
            records,
            ..Default::default()
        }
    }

    /// Successful save
    pub fn saved(id: impl Into<String>) -> Self {
        Self {
            ok: true,
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Successful request with no payload
    pub fn ack() -> Self {
        Self {
            ok: true,
            ..Default::default()
        }
    }

    /// Failed request
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Encode as one newline-terminated JSON line
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Turn a failure response into an error
    pub fn into_result(self) -> Result<Self> {
        if self.ok {
            Ok(self)
        } else {
            Err(LogTailError::Remote(
                self.error.unwrap_or_else(|| "request failed".to_string()),
            ))
        }
    }
}
