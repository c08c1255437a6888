use serde::Serialize;

use crate::shared::TargetPosition;

/// Topocentric pointing angles of a satellite as seen from the observer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LookAngles {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub range_km: f64,
}

/// Output of one predictor step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub julian_date: f64,
    pub instantaneous: LookAngles,
    /// Clamped angular rates fed into the extrapolation, degrees per second.
    pub azimuth_rate: f64,
    pub elevation_rate: f64,
    pub target: TargetPosition,
}
