use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("azimuth {0} outside [0, 360)")]
    AzimuthOutOfRange(f64),
    #[error("elevation {value} outside [{min}, {max}]")]
    ElevationOutOfRange { value: f64, min: f64, max: f64 },
    #[error("emergency stop latched")]
    EmergencyStopLatched,
    #[error("emergency stop input still asserted")]
    EmergencyStopAsserted,
    #[error("control loop not running")]
    LoopStopped,
}
