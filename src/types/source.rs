//! Log source identity

use crate::{LogTailError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A log-producing entity with its own independent offset space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Remote identifier of the source
    pub id: String,

    /// Source name, as it appears on delivered records
    pub name: String,

    /// Team owning the source
    pub team_id: String,

    /// First offset the next fetch should return; `None` means no watermark yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_offset: Option<u64>,
}

impl Source {
    /// Create a source with no starting offset
    pub fn new(id: impl Into<String>, name: impl Into<String>, team_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            team_id: team_id.into(),
            starting_offset: None,
        }
    }

    /// Set the owning team
    pub fn with_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = team_id.into();
        self
    }

    /// Copy of this source pointing at the given starting offset
    pub fn at_offset(&self, starting_offset: Option<u64>) -> Self {
        Self {
            starting_offset,
            ..self.clone()
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Parses `NAME` or `NAME=ID`. Without an explicit id the name doubles as the id.
impl FromStr for Source {
    type Err = LogTailError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, id) = match s.split_once('=') {
            Some((name, id)) => (name.trim(), id.trim()),
            None => (s.trim(), s.trim()),
        };

        if name.is_empty() {
            return Err(LogTailError::Filter(format!("source '{}' has no name", s)));
        }
        if id.is_empty() {
            return Err(LogTailError::Filter(format!("source '{}' has no id", s)));
        }

        Ok(Source::new(id, name, ""))
    }
}
