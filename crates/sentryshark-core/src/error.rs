//! Error taxonomy for the analysis pipeline.
//!
//! Only `SourceOpenError` and `ConfigError` are fatal to a run; everything
//! else is recovered locally by the component that raised it (see the
//! per-module documentation for where each variant is caught).

use thiserror::Error;

pub use crate::packet::decode::PacketDecodeError;
pub use crate::source::SourceError as SourceOpenError;

/// A detection cannot be emitted because a required evidence field is
/// missing from the packet or window that would have produced it.
/// Recovered by the detector that encountered it, by not emitting.
#[derive(Debug, Error)]
pub enum DetectorInputError {
    #[error("missing {field} required to emit a {label} detection")]
    MissingField {
        field: &'static str,
        label: &'static str,
    },
}

/// An `AnalyzerConfig` is invalid. Fatal at `Analyzer::new`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown engine id: {0}")]
    UnknownEngine(String),
    #[error("parameter {parameter} for engine {engine} is out of range: {value}")]
    InvalidParameter {
        engine: &'static str,
        parameter: &'static str,
        value: f64,
    },
}

/// Umbrella error returned by the top-level `analyze_*` entry points.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("capture could not be opened: {0}")]
    SourceOpen(#[from] SourceOpenError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
