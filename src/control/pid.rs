//! Per-axis PID regulator.
//!
//! Output is a signed motor duty in [-255, 255]. Does not allocate.

use crate::config::PidGains;

pub const MAX_DUTY: f64 = 255.0;

/// PID regulator with integral clamp and a dead zone around the setpoint.
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    /// Accumulated error, deg·s
    integral: f64,
    /// Error seen on the previous update, deg
    last_error: f64,
}

impl PidController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral: 0.0,
            last_error: 0.0,
        }
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn last_error(&self) -> f64 {
        self.last_error
    }

    /// Clear integrator and derivative history.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
    }

    /// Run one update on `error` (deg) over `dt` seconds.
    ///
    /// The integral is clamped to ±`max_integral` before it contributes, and the
    /// derivative is taken on the error so a setpoint jump kicks the output.
    pub fn update(&mut self, error: f64, dt: f64) -> f64 {
        let max_integral = self.gains.max_integral;
        self.integral = (self.integral + error * dt).clamp(-max_integral, max_integral);

        let derivative = (error - self.last_error) / dt;
        self.last_error = error;

        let output =
            self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative;
        output.clamp(-MAX_DUTY, MAX_DUTY)
    }

    /// Inside the position tolerance the history is cleared and the output is
    /// zero.
    pub fn regulate(&mut self, error: f64, dt: f64) -> f64 {
        if error.abs() <= self.gains.tolerance_deg {
            self.reset();
            0.0
        } else {
            self.update(error, dt)
        }
    }
}
