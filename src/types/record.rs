//! Delivered log records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One log line delivered by the remote filtering service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Timestamp the record was logged at
    pub timestamp: DateTime<Utc>,

    /// Name of the source that produced the record
    pub source_name: String,

    /// Severity level as reported by the service
    pub level: String,

    /// Log message body
    pub message: String,

    /// Position in the source's stream, unique and increasing per source
    pub offset: u64,
}

impl Record {
    /// Create a record stamped with the current time
    pub fn new(
        source_name: impl Into<String>,
        level: impl Into<String>,
        message: impl Into<String>,
        offset: u64,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            source_name: source_name.into(),
            level: level.into(),
            message: message.into(),
            offset,
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Format as one human-readable line
    pub fn to_human_readable(&self) -> String {
        let timestamp = self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        format!(
            "{} {} {} {}",
            timestamp,
            self.source_name,
            self.level.to_uppercase(),
            self.message
        )
    }
}
