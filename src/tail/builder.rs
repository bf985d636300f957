//! Filter construction from user inputs
//!
//! Turns flags, interactively chosen values or a saved view into a
//! [`FilterSpec`]. Building never touches the network.

use crate::types::{DateRange, FieldFilter, FilterOperator, FilterSpec, ScrollDirection, Source, View};
use crate::{LogTailError, Result};
use chrono::{DateTime, Duration, Utc};
use std::num::IntErrorKind;
use tracing::{debug, warn};

/// Batch size used when none is configured
pub const DEFAULT_BATCH_SIZE: u32 = 100;

/// Resolve a date shorthand relative to `now`.
///
/// `now`, `now-` and `now-<N><unit>` with `unit` one of `s`, `m`, `h`, `d` are
/// understood. Anything else resolves to `now`. A count too large to represent
/// is an error.
pub fn parse_date_shorthand(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let Some(offset) = input.trim().strip_prefix("now-") else {
        return Ok(now);
    };
    let split = match offset.char_indices().last() {
        Some((split, _)) if split > 0 => split,
        _ => return Ok(now),
    };

    let (count, unit) = offset.split_at(split);
    let unit_seconds: i64 = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return Ok(now),
    };

    if !count.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(now);
    }
    let count: i64 = match count.parse() {
        Ok(count) => count,
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => {
            return Err(out_of_range(input));
        }
        Err(_) => return Ok(now),
    };

    count
        .checked_mul(unit_seconds)
        .and_then(Duration::try_seconds)
        .and_then(|delta| now.checked_sub_signed(delta))
        .ok_or_else(|| out_of_range(input))
}

fn out_of_range(input: &str) -> LogTailError {
    LogTailError::Filter(format!("date '{}' is out of range", input))
}

#[derive(Debug, Clone)]
enum DateBound {
    Shorthand(String),
    Fixed(DateTime<Utc>),
}

impl DateBound {
    fn resolve(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        match self {
            DateBound::Shorthand(s) => parse_date_shorthand(s, now),
            DateBound::Fixed(at) => Ok(*at),
        }
    }
}

/// Builder for [`FilterSpec`]
#[derive(Debug, Clone)]
pub struct FilterBuilder {
    sources: Vec<Source>,
    start: Option<DateBound>,
    end: Option<DateBound>,
    text_queries: Vec<String>,
    field: Option<(String, String, String)>,
    batch_size: u32,
    scroll_direction: ScrollDirection,
}

impl FilterBuilder {
    /// Start a filter over the given sources
    pub fn new(sources: Vec<Source>) -> Self {
        Self {
            sources,
            start: None,
            end: None,
            text_queries: Vec::new(),
            field: None,
            batch_size: DEFAULT_BATCH_SIZE,
            scroll_direction: ScrollDirection::Forward,
        }
    }

    /// Start from a saved view's stored filter
    pub fn from_view(view: &View) -> Self {
        let mut builder = Self::new(view.sources.iter().map(|s| s.at_offset(None)).collect());
        builder.start = view.date_range.start.map(DateBound::Fixed);
        builder.end = view.date_range.end.map(DateBound::Fixed);
        builder.text_queries = view.text_queries.clone();
        builder.field = view
            .field_filter
            .as_ref()
            .map(|f| (f.name.clone(), f.value.clone(), f.operator.to_string()));
        builder.scroll_direction = view.scroll_direction;
        builder
    }

    /// Add a source
    pub fn with_source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    /// Lower time bound as a date shorthand; empty means unset
    pub fn with_start(mut self, start: &str) -> Self {
        if !start.trim().is_empty() {
            self.start = Some(DateBound::Shorthand(start.to_string()));
        }
        self
    }

    /// Upper time bound as a date shorthand; only honored with a start bound
    pub fn with_end(mut self, end: &str) -> Self {
        if !end.trim().is_empty() {
            self.end = Some(DateBound::Shorthand(end.to_string()));
        }
        self
    }

    /// Add free-text queries; blank terms are skipped
    pub fn with_queries<I, S>(mut self, queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text_queries.extend(
            queries
                .into_iter()
                .map(Into::into)
                .filter(|q| !q.trim().is_empty()),
        );
        self
    }

    /// Field condition; kept only when name, value and operator are all non-empty
    pub fn with_field_filter(mut self, name: &str, value: &str, operator: &str) -> Self {
        self.field = Some((name.to_string(), value.to_string(), operator.to_string()));
        self
    }

    /// Maximum records per poll
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Scroll direction
    pub fn with_scroll_direction(mut self, direction: ScrollDirection) -> Self {
        self.scroll_direction = direction;
        self
    }

    /// Build against the current instant
    pub fn build(&self) -> Result<FilterSpec> {
        self.build_at(Utc::now())
    }

    /// Build with date shorthands resolved against `now`
    pub fn build_at(&self, now: DateTime<Utc>) -> Result<FilterSpec> {
        if self.sources.is_empty() {
            return Err(LogTailError::Filter("at least one source is required".to_string()));
        }
        if let Some(source) = self.sources.iter().find(|s| s.id.is_empty()) {
            return Err(LogTailError::Filter(format!("source '{}' has no id", source.name)));
        }
        if self.batch_size == 0 {
            return Err(LogTailError::Filter("batch size must be positive".to_string()));
        }

        Ok(FilterSpec {
            date_range: self.date_range(now)?,
            sources: self.sources.clone(),
            text_queries: self.text_queries.clone(),
            field_filter: self.field_filter()?,
            batch_size: self.batch_size,
            scroll_direction: self.scroll_direction,
        })
    }

    fn date_range(&self, now: DateTime<Utc>) -> Result<DateRange> {
        let Some(start) = &self.start else {
            if self.end.is_some() {
                debug!("ignoring end bound without a start bound");
            }
            // Only records newer than the tail itself.
            return Ok(DateRange {
                start: Some(now - Duration::seconds(1)),
                end: None,
            });
        };

        let start = start.resolve(now)?;
        let end = self.end.as_ref().map(|end| end.resolve(now)).transpose()?;
        if let Some(end) = end {
            if end < start {
                return Err(LogTailError::Filter(format!(
                    "end bound {} is before start bound {}",
                    end.to_rfc3339(),
                    start.to_rfc3339()
                )));
            }
        }

        Ok(DateRange {
            start: Some(start),
            end,
        })
    }

    fn field_filter(&self) -> Result<Option<FieldFilter>> {
        let Some((name, value, operator)) = &self.field else {
            return Ok(None);
        };

        let parts = [name, value, operator];
        if parts.iter().all(|p| p.trim().is_empty()) {
            return Ok(None);
        }
        if parts.iter().any(|p| p.trim().is_empty()) {
            warn!(field = %name, "field filter needs a name, a value and an operator; ignoring it");
            return Ok(None);
        }

        Ok(Some(FieldFilter {
            name: name.trim().to_string(),
            value: value.clone(),
            operator: operator.parse::<FilterOperator>()?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap()
    }

    fn sources() -> Vec<Source> {
        vec![Source::new("1", "api", "team")]
    }

    #[test]
    fn test_shorthand_units() {
        let now = now();
        assert_eq!(parse_date_shorthand("now-2d", now).unwrap(), now - Duration::hours(48));
        assert_eq!(parse_date_shorthand("now-10m", now).unwrap(), now - Duration::minutes(10));
        assert_eq!(parse_date_shorthand("now-3h", now).unwrap(), now - Duration::hours(3));
        assert_eq!(parse_date_shorthand("now-45s", now).unwrap(), now - Duration::seconds(45));
        assert_eq!(parse_date_shorthand("now-0m", now).unwrap(), now);
    }

    #[test]
    fn test_shorthand_fallbacks_resolve_to_now() {
        let now = now();
        for input in ["now", "now-", "", "yesterday", "now-5w", "now-m", "now-+5m", "now-1.5h", "NOW-2d", "now-5é"] {
            assert_eq!(parse_date_shorthand(input, now).unwrap(), now, "input {:?}", input);
        }
    }

    #[test]
    fn test_shorthand_out_of_range() {
        let now = now();
        assert!(matches!(
            parse_date_shorthand("now-99999999999999999999d", now),
            Err(LogTailError::Filter(_))
        ));
        assert!(matches!(
            parse_date_shorthand("now-9223372036854775807d", now),
            Err(LogTailError::Filter(_))
        ));
    }

    #[test]
    fn test_default_start_is_one_second_back() {
        let spec = FilterBuilder::new(sources()).build_at(now()).unwrap();
        assert_eq!(spec.date_range.start, Some(now() - Duration::seconds(1)));
        assert_eq!(spec.date_range.end, None);
        assert_eq!(spec.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(spec.scroll_direction, ScrollDirection::Forward);
        assert!(spec.text_queries.is_empty());
        assert!(spec.field_filter.is_none());
    }

    #[test]
    fn test_end_requires_start() {
        let spec = FilterBuilder::new(sources())
            .with_end("now-1m")
            .build_at(now())
            .unwrap();
        assert_eq!(spec.date_range.end, None);

        let spec = FilterBuilder::new(sources())
            .with_start("now-1h")
            .with_end("now-1m")
            .build_at(now())
            .unwrap();
        assert_eq!(spec.date_range.start, Some(now() - Duration::hours(1)));
        assert_eq!(spec.date_range.end, Some(now() - Duration::minutes(1)));
    }

    #[test]
    fn test_end_before_start_is_rejected() {
        let result = FilterBuilder::new(sources())
            .with_start("now-1m")
            .with_end("now-1h")
            .build_at(now());
        assert!(matches!(result, Err(LogTailError::Filter(_))));
    }

    #[test]
    fn test_field_filter_needs_all_parts() {
        let spec = FilterBuilder::new(sources())
            .with_field_filter("status", "", "equals")
            .build_at(now())
            .unwrap();
        assert!(spec.field_filter.is_none());

        let spec = FilterBuilder::new(sources())
            .with_field_filter("status", "500", "gte")
            .build_at(now())
            .unwrap();
        let field = spec.field_filter.unwrap();
        assert_eq!(field.name, "status");
        assert_eq!(field.value, "500");
        assert_eq!(field.operator, FilterOperator::Gte);
    }

    #[test]
    fn test_unmapped_operator_fails_fast() {
        let result = FilterBuilder::new(sources())
            .with_field_filter("status", "500", "about")
            .build_at(now());
        assert!(matches!(result, Err(LogTailError::Filter(_))));
    }

    #[test]
    fn test_queries_skip_blanks() {
        let spec = FilterBuilder::new(sources())
            .with_queries(["timeout", "  ", "refused"])
            .build_at(now())
            .unwrap();
        assert_eq!(spec.text_queries, vec!["timeout", "refused"]);
    }

    #[test]
    fn test_missing_inputs_fail_before_network() {
        assert!(matches!(
            FilterBuilder::new(Vec::new()).build_at(now()),
            Err(LogTailError::Filter(_))
        ));
        assert!(matches!(
            FilterBuilder::new(vec![Source::new("", "api", "team")]).build_at(now()),
            Err(LogTailError::Filter(_))
        ));
        assert!(matches!(
            FilterBuilder::new(sources()).with_batch_size(0).build_at(now()),
            Err(LogTailError::Filter(_))
        ));
    }

    #[test]
    fn test_from_view_round_trip() {
        let original = FilterBuilder::new(sources())
            .with_source(Source::new("2", "worker", "team"))
            .with_start("now-1d")
            .with_queries(["panic"])
            .with_field_filter("region", "eu", "not_equals")
            .with_scroll_direction(ScrollDirection::Backward)
            .build_at(now())
            .unwrap();

        let view = View::from_spec("panics", &original);
        let rebuilt = FilterBuilder::from_view(&view).build_at(now()).unwrap();

        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_from_view_without_dates_tails_from_now() {
        let view = View::from_json(r#"{"name": "v", "sources": [{"id": "1", "name": "api", "team_id": "t"}]}"#)
            .unwrap();
        let spec = FilterBuilder::from_view(&view).build_at(now()).unwrap();
        assert_eq!(spec.date_range.start, Some(now() - Duration::seconds(1)));
    }
}
