use thiserror::Error;

use crate::predict::PredictError;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("invalid tle format")]
    InvalidTleFormat,
    #[error("satellite name must be 1 to {max} characters, got {len}")]
    InvalidName { len: usize, max: usize },
    #[error("tle line {line} must be exactly {expected} characters, got {len}")]
    InvalidLineLength {
        line: u8,
        len: usize,
        expected: usize,
    },
    #[error("tle line {line} must start with '{line}'")]
    InvalidLinePrefix { line: u8 },
    #[error("tle payload must be printable ascii")]
    NotAscii,
    #[error("a tle handoff is already in flight")]
    HandoffBusy,
    #[error("predict error: {0}")]
    Predict(#[from] PredictError),
}
