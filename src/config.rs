use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub station: StationConfig,
    pub mount: MountConfig,
    pub control: ControlConfig,
    pub driver: DriverConfig,
    pub homing: HomingConfig,
    pub tracking: TrackingConfig,
}

/// Fixed site fed to the simulated GPS receiver.
#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub coordinates: String,
    #[serde(default)]
    pub altitude_m: f64,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            coordinates: "0.0, 0.0".to_string(),
            altitude_m: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    pub gear_ratio: f64,
    pub encoder_ppr: u32,
    pub min_elevation: f64,
    pub max_elevation: f64,
    pub overtravel_margin_deg: f64,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            gear_ratio: 75.0,
            encoder_ppr: 1,
            min_elevation: 0.0,
            max_elevation: 90.0,
            overtravel_margin_deg: 5.0,
        }
    }
}

impl MountConfig {
    /// Quadrature decoding counts four edges per encoder pulse.
    pub fn degrees_per_pulse(&self) -> f64 {
        360.0 / (self.gear_ratio * f64::from(self.encoder_ppr) * 4.0)
    }

    pub fn clamp_elevation(&self, elevation: f64) -> f64 {
        elevation.clamp(self.min_elevation, self.max_elevation)
    }

    pub fn overtravel(&self, elevation: f64) -> bool {
        elevation < self.min_elevation - self.overtravel_margin_deg
            || elevation > self.max_elevation + self.overtravel_margin_deg
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub rate_hz: f64,
    pub pid: PidGains,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            rate_hz: 100.0,
            pid: PidGains::default(),
        }
    }
}

impl ControlConfig {
    pub fn dt(&self) -> f64 {
        1.0 / self.rate_hz
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(self.dt())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub max_integral: f64,
    pub tolerance_deg: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 3.0,
            ki: 0.15,
            kd: 0.8,
            max_integral: 50.0,
            tolerance_deg: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Smallest PWM duty that still turns the motor.
    pub min_pwm: u8,
    /// Brake instead of coast when idle or stopped.
    pub brake: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            min_pwm: 50,
            brake: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HomingConfig {
    pub speed: u8,
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            speed: 80,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub rate_hz: f64,
    #[serde(deserialize_with = "deserialize_duration")]
    pub lookahead: Duration,
    pub max_rate_deg_s: f64,
    /// Samples closer together than this do not update the velocity estimate.
    #[serde(deserialize_with = "deserialize_duration")]
    pub min_interval: Duration,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            rate_hz: 10.0,
            lookahead: Duration::from_secs(2),
            max_rate_deg_s: 2.0,
            min_interval: Duration::from_millis(10),
        }
    }
}

impl TrackingConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate_hz)
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if !(self.control.rate_hz > 0.0) {
            return invalid("control.rate_hz must be positive");
        }
        if !(self.tracking.rate_hz > 0.0) {
            return invalid("tracking.rate_hz must be positive");
        }
        if !(self.mount.gear_ratio > 0.0) || self.mount.encoder_ppr == 0 {
            return invalid("mount.gear_ratio and mount.encoder_ppr must be positive");
        }
        if self.mount.min_elevation >= self.mount.max_elevation {
            return invalid("mount.min_elevation must be below mount.max_elevation");
        }
        if self.control.pid.max_integral < 0.0 || self.control.pid.tolerance_deg < 0.0 {
            return invalid("control.pid limits must not be negative");
        }
        if !(self.tracking.max_rate_deg_s > 0.0) {
            return invalid("tracking.max_rate_deg_s must be positive");
        }
        Ok(())
    }
}
