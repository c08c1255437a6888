use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("invalid TLE: {0}")]
    InvalidTle(String),
    #[error("propagation error: {0}")]
    Propagation(String),
    #[error("invalid time: {0}")]
    InvalidTime(String),
    #[error("propagator not initialized")]
    NotInitialized,
}
