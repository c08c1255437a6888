use serde::Serialize;
use std::sync::Arc;
use strum_macros::Display;

use super::{EmergencyStop, Encoder, PidController};
use crate::config::DriverConfig;
use crate::hardware::{MotorCommand, MotorDriver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AxisId {
    Azimuth,
    Elevation,
}

impl AxisId {
    /// Whether the axis is continuous and its error takes the short way round.
    pub fn wraps(self) -> bool {
        matches!(self, AxisId::Azimuth)
    }
}

/// Normalize an angle to [0, 360).
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Shortest signed rotation from `current` to `target`, in (-180, 180].
pub fn wrap_azimuth_error(target: f64, current: f64) -> f64 {
    let error = wrap_degrees(target - current);
    if error > 180.0 {
        error - 360.0
    } else {
        error
    }
}

/// Output stage for one motor, gated by the emergency stop.
///
/// A command is checked against the latch both before and after it reaches
/// the driver. If the trip handler runs between the control loop's check and
/// its write, the second check puts the safe output back.
pub struct MotorStage {
    driver: Arc<dyn MotorDriver>,
    estop: Arc<EmergencyStop>,
    config: DriverConfig,
}

impl MotorStage {
    pub fn new(driver: Arc<dyn MotorDriver>, estop: Arc<EmergencyStop>, config: DriverConfig) -> Self {
        Self {
            driver,
            estop,
            config,
        }
    }

    /// Map a signed duty onto a driver command: saturate, lift small duties to
    /// the driver's minimum, and idle according to the brake setting.
    pub fn shape(&self, duty: i16) -> MotorCommand {
        let duty = duty.clamp(-255, 255);
        let min = i16::from(self.config.min_pwm);
        match duty {
            0 if self.config.brake => MotorCommand::Brake,
            0 => MotorCommand::Coast,
            d if d.abs() < min => MotorCommand::Speed(d.signum() * min),
            d => MotorCommand::Speed(d),
        }
    }

    /// Drive at `duty`. Returns the duty that actually reached the driver.
    pub fn drive(&self, duty: i16) -> i16 {
        self.apply(self.shape(duty))
    }

    /// Coast and release the driver enable.
    pub fn disable(&self) {
        self.apply(MotorCommand::Disabled);
    }

    fn apply(&self, command: MotorCommand) -> i16 {
        if self.estop.is_latched() {
            self.driver.apply(self.estop.safe_output());
            return 0;
        }
        self.driver.apply(command);
        if self.estop.is_latched() {
            self.driver.apply(self.estop.safe_output());
            return 0;
        }
        command.duty()
    }
}

/// One mount axis: feedback, regulator and output stage.
///
/// Azimuth and elevation share this type; they differ only in
/// [`AxisId::wraps`].
pub struct Axis {
    id: AxisId,
    encoder: Encoder,
    pid: PidController,
    stage: MotorStage,
    last_duty: i16,
}

impl Axis {
    pub fn new(id: AxisId, encoder: Encoder, pid: PidController, stage: MotorStage) -> Self {
        Self {
            id,
            encoder,
            pid,
            stage,
            last_duty: 0,
        }
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Measured angle. Continuous axes are normalized to [0, 360).
    pub fn measure(&self) -> f64 {
        let degrees = self.encoder.read_degrees();
        if self.id.wraps() {
            wrap_degrees(degrees)
        } else {
            degrees
        }
    }

    /// Control error towards `target` given a `measured` angle.
    pub fn error(&self, target: f64, measured: f64) -> f64 {
        if self.id.wraps() {
            wrap_azimuth_error(target, measured)
        } else {
            target - measured
        }
    }

    /// Regulate towards the error and drive the motor. Returns the applied duty.
    pub fn regulate(&mut self, error: f64, dt: f64) -> i16 {
        let duty = self.pid.regulate(error, dt) as i16;
        self.drive(duty)
    }

    /// Drive open-loop at `duty`, bypassing the regulator.
    pub fn drive(&mut self, duty: i16) -> i16 {
        self.last_duty = self.stage.drive(duty);
        self.last_duty
    }

    /// Stop driving and forget the regulator history.
    pub fn hold(&mut self) {
        self.pid.reset();
        self.drive(0);
    }

    /// Release the driver entirely.
    pub fn disable(&mut self) {
        self.pid.reset();
        self.stage.disable();
        self.last_duty = 0;
    }

    /// Duty that reached the driver on the last command.
    pub fn last_duty(&self) -> i16 {
        self.last_duty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::{SimMotor, SimTrip};
    use crate::shared::SharedState;

    fn stage(config: DriverConfig) -> (MotorStage, Arc<SimMotor>, Arc<SimTrip>) {
        let motor = Arc::new(SimMotor::default());
        let input = Arc::new(SimTrip::new());
        let estop = EmergencyStop::arm(
            input.clone(),
            [motor.clone(), Arc::new(SimMotor::default())],
            MotorCommand::Coast,
            Arc::new(SharedState::new()),
        );
        (MotorStage::new(motor.clone(), estop, config), motor, input)
    }

    #[test]
    fn azimuth_error_takes_short_way() {
        assert_eq!(wrap_azimuth_error(10.0, 350.0), 20.0);
        assert_eq!(wrap_azimuth_error(350.0, 10.0), -20.0);
        assert_eq!(wrap_azimuth_error(180.0, 0.0), 180.0);
        assert_eq!(wrap_azimuth_error(0.0, 180.0), 180.0);
        assert_eq!(wrap_azimuth_error(90.0, 90.0), 0.0);
    }

    #[test]
    fn wrap_degrees_stays_in_range() {
        assert_eq!(wrap_degrees(360.0), 0.0);
        assert_eq!(wrap_degrees(-90.0), 270.0);
        assert_eq!(wrap_degrees(725.0), 5.0);
        assert!(wrap_degrees(-1e-18) < 360.0);
    }

    #[test]
    fn shape_applies_min_pwm_and_idle_mode() {
        let (coast, _, _) = stage(DriverConfig {
            min_pwm: 50,
            brake: false,
        });
        assert_eq!(coast.shape(0), MotorCommand::Coast);
        assert_eq!(coast.shape(10), MotorCommand::Speed(50));
        assert_eq!(coast.shape(-10), MotorCommand::Speed(-50));
        assert_eq!(coast.shape(120), MotorCommand::Speed(120));
        assert_eq!(coast.shape(i16::MAX), MotorCommand::Speed(255));

        let (brake, _, _) = stage(DriverConfig {
            min_pwm: 0,
            brake: true,
        });
        assert_eq!(brake.shape(0), MotorCommand::Brake);
        assert_eq!(brake.shape(3), MotorCommand::Speed(3));
    }

    #[test]
    fn latched_stop_overrides_every_command() {
        let (stage, motor, input) = stage(DriverConfig::default());
        assert_eq!(stage.drive(200), 200);
        assert_eq!(motor.last(), MotorCommand::Speed(200));

        input.assert();
        assert_eq!(motor.last(), MotorCommand::Coast);
        assert_eq!(stage.drive(200), 0);
        assert_eq!(motor.last(), MotorCommand::Coast);
    }
}
