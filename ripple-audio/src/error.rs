//! Engine error types

use thiserror::Error;

/// Errors surfaced on the control path (prepare, parameter lookup)
///
/// The audio path never returns errors: degenerate input is a no-op and
/// modulation results are clamped into range.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(f64),
    #[error("invalid block size: {0}")]
    InvalidBlockSize(usize),
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),
    #[error("invalid value for {id}: {value}")]
    InvalidValue { id: &'static str, value: String },
}
