//! Core data types for LogTail

pub mod filter;
pub mod record;
pub mod source;

pub use filter::{DateRange, FieldFilter, FilterOperator, FilterSpec, ScrollDirection, View};
pub use record::Record;
pub use source::Source;
