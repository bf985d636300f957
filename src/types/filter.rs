//! Filter descriptors sent with every poll, and their persisted view shape

use crate::types::Source;
use crate::{LogTailError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Time window of a filter; an absent bound means "no bound"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Inclusive lower bound
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound
    pub end: Option<DateTime<Utc>>,
}

/// Comparison applied by a field filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
    /// Field contains the value
    Contains,
    /// Field does not contain the value
    NotContains,
    /// Field equals the value
    Equals,
    /// Field differs from the value
    NotEquals,
    /// Field is greater than the value
    Gt,
    /// Field is greater than or equal to the value
    Gte,
    /// Field is less than the value
    Lt,
    /// Field is less than or equal to the value
    Lte,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterOperator::Contains => "CONTAINS",
            FilterOperator::NotContains => "NOT_CONTAINS",
            FilterOperator::Equals => "EQUALS",
            FilterOperator::NotEquals => "NOT_EQUALS",
            FilterOperator::Gt => "GT",
            FilterOperator::Gte => "GTE",
            FilterOperator::Lt => "LT",
            FilterOperator::Lte => "LTE",
        };
        f.write_str(name)
    }
}

impl FromStr for FilterOperator {
    type Err = LogTailError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        match normalized.as_str() {
            "contains" | "~" => Ok(FilterOperator::Contains),
            "not_contains" | "!~" => Ok(FilterOperator::NotContains),
            "equals" | "eq" | "=" | "==" => Ok(FilterOperator::Equals),
            "not_equals" | "ne" | "!=" => Ok(FilterOperator::NotEquals),
            "gt" | ">" => Ok(FilterOperator::Gt),
            "gte" | ">=" => Ok(FilterOperator::Gte),
            "lt" | "<" => Ok(FilterOperator::Lt),
            "lte" | "<=" => Ok(FilterOperator::Lte),
            _ => Err(LogTailError::Filter(format!(
                "unknown field operator '{}' (expected one of contains, not_contains, equals, \
                 not_equals, gt, gte, lt, lte)",
                s
            ))),
        }
    }
}

/// Condition on one structured field of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFilter {
    /// Field name
    pub name: String,
    /// Value to compare against
    pub value: String,
    /// Comparison operator
    pub operator: FilterOperator,
}

/// Order in which the service walks each source's stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    /// Oldest to newest
    #[default]
    Forward,
    /// Newest to oldest
    Backward,
}

/// Descriptor of the records one poll should request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Time window
    pub date_range: DateRange,
    /// Sources to read, each annotated with its cursor
    pub sources: Vec<Source>,
    /// Free-text terms, OR-combined; empty matches everything
    pub text_queries: Vec<String>,
    /// Optional field condition
    pub field_filter: Option<FieldFilter>,
    /// Maximum records per poll
    pub batch_size: u32,
    /// Scroll direction
    pub scroll_direction: ScrollDirection,
}

impl FilterSpec {
    /// Copy of this filter with its sources replaced
    pub fn with_sources(&self, sources: Vec<Source>) -> Self {
        Self {
            sources,
            ..self.clone()
        }
    }
}

/// A named, persisted filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// Identifier assigned by the view store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// View name
    pub name: String,
    /// Sources, without cursors
    pub sources: Vec<Source>,
    /// Time window
    #[serde(default)]
    pub date_range: DateRange,
    /// Free-text terms
    #[serde(default)]
    pub text_queries: Vec<String>,
    /// Optional field condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_filter: Option<FieldFilter>,
    /// Scroll direction
    #[serde(default)]
    pub scroll_direction: ScrollDirection,
}

impl View {
    /// Capture a filter as a view. Cursors are session state and are dropped.
    pub fn from_spec(name: impl Into<String>, spec: &FilterSpec) -> Self {
        Self {
            id: None,
            name: name.into(),
            sources: spec.sources.iter().map(|s| s.at_offset(None)).collect(),
            date_range: spec.date_range,
            text_queries: spec.text_queries.clone(),
            field_filter: spec.field_filter.clone(),
            scroll_direction: spec.scroll_direction,
        }
    }

    /// Parse a view exported as JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
