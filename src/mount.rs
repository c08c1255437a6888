//! Operator-facing mount handle and the wiring of both loops.

use crossbeam::channel::{self, Sender};
use std::sync::Arc;

use crate::config::{Config, MountConfig};
use crate::control::{
    wrap_degrees, Axis, AxisId, ControlError, DriveCommand, DriveLoop, EmergencyStop, Encoder,
    MotorStage, PidController,
};
use crate::hardware::{MotorCommand, MotorDriver, PositionSensor, TripSensor};
use crate::predict::{PositionPredictor, Propagator};
use crate::shared::{GpsFix, MountStatus, SharedState, TargetPosition};
use crate::tracker::{ElementSet, Mailbox, TrackerError, TrackingLoop};

/// Hardware behind one axis.
#[derive(Clone)]
pub struct AxisHardware {
    pub sensor: Arc<dyn PositionSensor>,
    pub index: Arc<dyn TripSensor>,
    pub motor: Arc<dyn MotorDriver>,
}

#[derive(Clone)]
pub struct MountHardware {
    pub azimuth: AxisHardware,
    pub elevation: AxisHardware,
    pub emergency_stop: Arc<dyn TripSensor>,
}

/// Command surface of a running mount.
///
/// Everything here is safe to call from any thread while the drive and
/// tracking loops run. Requests that touch the motors are queued to the drive
/// loop and take effect on its next tick.
pub struct Mount {
    shared: Arc<SharedState>,
    estop: Arc<EmergencyStop>,
    commands: Sender<DriveCommand>,
    mailbox: Arc<Mailbox<ElementSet>>,
    mount: MountConfig,
}

impl Mount {
    /// Wire `hardware` into a mount. The returned loops have to be driven by
    /// the caller, see [`crate::control::run_control_loop`] and
    /// [`crate::tracker::run_tracking_loop`].
    pub fn new<P: Propagator>(
        config: &Config,
        hardware: MountHardware,
        propagator: P,
    ) -> (Mount, DriveLoop, TrackingLoop<P>) {
        let shared = Arc::new(SharedState::new());
        let safe_output = if config.driver.brake {
            MotorCommand::Brake
        } else {
            MotorCommand::Coast
        };
        let estop = EmergencyStop::arm(
            hardware.emergency_stop.clone(),
            [
                hardware.azimuth.motor.clone(),
                hardware.elevation.motor.clone(),
            ],
            safe_output,
            shared.clone(),
        );

        let build_axis = |id: AxisId, axis: AxisHardware| {
            let encoder = Encoder::new(
                id,
                axis.sensor,
                shared.clone(),
                config.mount.degrees_per_pulse(),
            );
            encoder.attach_index(axis.index.as_ref());
            let stage = MotorStage::new(axis.motor, estop.clone(), config.driver);
            Axis::new(id, encoder, PidController::new(config.control.pid), stage)
        };
        let azimuth = build_axis(AxisId::Azimuth, hardware.azimuth);
        let elevation = build_axis(AxisId::Elevation, hardware.elevation);

        let (commands, receiver) = channel::unbounded();
        let drive = DriveLoop::new(
            azimuth,
            elevation,
            estop.clone(),
            shared.clone(),
            receiver,
            config.mount,
            config.homing,
            config.control.rate_hz,
        );

        let mailbox = Arc::new(Mailbox::new());
        let predictor = PositionPredictor::new(propagator, config.tracking, config.mount);
        let tracking = TrackingLoop::new(shared.clone(), mailbox.clone(), predictor);

        let mount = Mount {
            shared,
            estop,
            commands,
            mailbox,
            mount: config.mount,
        };
        (mount, drive, tracking)
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    /// Feed a GPS fix, as the receiver driver would.
    pub fn update_gps(&self, fix: GpsFix) {
        self.shared.update_gps(fix);
    }

    /// Home both axes. Tracking stops and the target is dropped first.
    pub fn begin_homing(&self) -> Result<(), ControlError> {
        if self.estop.is_latched() {
            log::warn!("Homing refused: emergency stop latched");
            return Err(ControlError::EmergencyStopLatched);
        }
        self.shared.set_tracking(false);
        self.shared.invalidate_target();
        self.send(DriveCommand::BeginHoming)
    }

    /// Stop tracking, abort homing and release both motors.
    pub fn stop_all_motors(&self) -> Result<(), ControlError> {
        self.shared.set_tracking(false);
        self.shared.invalidate_target();
        log::info!("Stopping all motors");
        self.send(DriveCommand::StopAllMotors)
    }

    /// Point at a fixed position. Tracking is switched off.
    pub fn set_manual_target(&self, azimuth: f64, elevation: f64) -> Result<(), ControlError> {
        if !(azimuth.is_finite() && (0.0..360.0).contains(&azimuth)) {
            return Err(ControlError::AzimuthOutOfRange(azimuth));
        }
        let (min, max) = (self.mount.min_elevation, self.mount.max_elevation);
        if !(elevation.is_finite() && (min..=max).contains(&elevation)) {
            return Err(ControlError::ElevationOutOfRange {
                value: elevation,
                min,
                max,
            });
        }
        if self.estop.is_latched() {
            return Err(ControlError::EmergencyStopLatched);
        }

        self.shared.set_tracking(false);
        self.shared.set_target(TargetPosition::new(azimuth, elevation));
        log::info!("Manual target az {:.2} el {:.2}", azimuth, elevation);
        Ok(())
    }

    pub fn reset_emergency_stop(&self) -> Result<(), ControlError> {
        self.estop.reset()
    }

    /// Queue a new element set for the tracking loop.
    pub fn submit_tle(&self, elements: ElementSet) -> Result<(), TrackerError> {
        match self.mailbox.submit(elements) {
            Ok(()) => {
                log::info!("TLE for {} queued", elements.name());
                Ok(())
            }
            Err(e) => {
                log::warn!("TLE for {} refused: {}", elements.name(), e);
                Err(e)
            }
        }
    }

    pub fn status(&self) -> MountStatus {
        let degrees_per_pulse = self.mount.degrees_per_pulse();
        let azimuth_count = self.shared.azimuth.count();
        let elevation_count = self.shared.elevation.count();
        MountStatus {
            azimuth_deg: wrap_degrees(f64::from(azimuth_count) * degrees_per_pulse),
            elevation_deg: f64::from(elevation_count) * degrees_per_pulse,
            azimuth_count,
            elevation_count,
            azimuth_index_found: self.shared.azimuth.index_found(),
            elevation_index_found: self.shared.elevation.index_found(),
            target: self.shared.target(),
            gps_valid: self.shared.gps_valid(),
            tle_valid: self.shared.tle_valid(),
            tracking: self.shared.tracking(),
            emergency_stop: self.shared.emergency_stop(),
            handoff_pending: self.mailbox.is_pending(),
            mode: self.shared.mode(),
            homing: self.shared.homing(),
        }
    }

    fn send(&self, command: DriveCommand) -> Result<(), ControlError> {
        self.commands
            .send(command)
            .map_err(|_| ControlError::LoopStopped)
    }
}
