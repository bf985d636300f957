//! Configuration management for LogTail

pub mod settings;

pub use settings::{CliConfig, ClientConfig, ProbeSettings, TailSettings};
