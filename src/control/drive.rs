use crossbeam::channel::{Receiver, TryRecvError};
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::{Axis, EmergencyStop, HomingSequencer, HomingState};
use crate::config::{HomingConfig, MountConfig};
use crate::shared::SharedState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    EmergencyStop,
    Overtravel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    Disabled,
    Homing,
    Tracking,
    Manual,
    Fault(FaultKind),
}

/// Operator requests executed at the start of the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveCommand {
    BeginHoming,
    StopAllMotors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub mode: DriveMode,
    pub azimuth_duty: i16,
    pub elevation_duty: i16,
}

/// Fixed-cadence motor drive loop.
///
/// Every tick either runs one homing step or closes both position loops on
/// the shared target. The emergency stop is checked first; while latched no
/// control math runs and every output is held at the safe state.
pub struct DriveLoop {
    azimuth: Axis,
    elevation: Axis,
    estop: Arc<EmergencyStop>,
    shared: Arc<SharedState>,
    commands: Receiver<DriveCommand>,
    mount: MountConfig,
    homing_config: HomingConfig,
    rate_hz: f64,
    homing: Option<HomingSequencer>,
    overtravel: bool,
}

impl DriveLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        azimuth: Axis,
        elevation: Axis,
        estop: Arc<EmergencyStop>,
        shared: Arc<SharedState>,
        commands: Receiver<DriveCommand>,
        mount: MountConfig,
        homing_config: HomingConfig,
        rate_hz: f64,
    ) -> Self {
        Self {
            azimuth,
            elevation,
            estop,
            shared,
            commands,
            mount,
            homing_config,
            rate_hz,
            homing: None,
            overtravel: false,
        }
    }

    pub fn tick(&mut self) -> TickReport {
        while let Ok(command) = self.commands.try_recv() {
            self.handle(command);
        }

        if self.estop.is_latched() {
            if self.homing.take().is_some() {
                log::warn!("Homing aborted by emergency stop");
                self.shared.set_homing(HomingState::Aborted);
            }
            self.azimuth.hold();
            self.elevation.hold();
            return self.report(DriveMode::Fault(FaultKind::EmergencyStop));
        }

        if let Some(homing) = &mut self.homing {
            return match homing.tick(&mut self.azimuth, &mut self.elevation) {
                Some(outcome) => {
                    self.homing = None;
                    self.shared.set_homing(outcome);
                    self.azimuth.disable();
                    self.elevation.disable();
                    self.report(DriveMode::Disabled)
                }
                None => {
                    self.shared.set_homing(homing.state());
                    self.report(DriveMode::Homing)
                }
            };
        }

        if self.overtravel {
            self.azimuth.disable();
            self.elevation.disable();
            return self.report(DriveMode::Fault(FaultKind::Overtravel));
        }

        let azimuth = self.azimuth.measure();
        let elevation = self.elevation.measure();

        if self.mount.overtravel(elevation) {
            log::error!(
                "Elevation overtravel at {:.2} deg, motors stopped and tracking cleared",
                elevation
            );
            self.overtravel = true;
            self.shared.set_tracking(false);
            self.shared.invalidate_target();
            self.azimuth.disable();
            self.elevation.disable();
            return self.report(DriveMode::Fault(FaultKind::Overtravel));
        }

        let target = self.shared.target();
        if !target.valid {
            self.azimuth.disable();
            self.elevation.disable();
            return self.report(DriveMode::Disabled);
        }

        let mode = if self.shared.tracking() {
            DriveMode::Tracking
        } else {
            DriveMode::Manual
        };

        let dt = 1.0 / self.rate_hz;
        let target_elevation = self.mount.clamp_elevation(target.elevation_deg);
        let azimuth_error = self.azimuth.error(target.azimuth_deg, azimuth);
        let elevation_error = self.elevation.error(target_elevation, elevation);
        self.azimuth.regulate(azimuth_error, dt);
        self.elevation.regulate(elevation_error, dt);

        self.report(mode)
    }

    fn handle(&mut self, command: DriveCommand) {
        match command {
            DriveCommand::BeginHoming => {
                if self.estop.is_latched() {
                    log::warn!("Homing refused: emergency stop latched");
                    return;
                }
                self.overtravel = false;
                self.shared.set_tracking(false);
                self.shared.invalidate_target();
                self.azimuth.hold();
                self.elevation.hold();
                let sequencer = HomingSequencer::new(&self.homing_config, self.rate_hz);
                self.shared.set_homing(sequencer.state());
                self.homing = Some(sequencer);
            }
            DriveCommand::StopAllMotors => {
                if self.homing.take().is_some() {
                    log::warn!("Homing aborted by stop");
                    self.shared.set_homing(HomingState::Aborted);
                }
                self.azimuth.disable();
                self.elevation.disable();
            }
        }
    }

    fn report(&self, mode: DriveMode) -> TickReport {
        self.shared.set_mode(mode);
        TickReport {
            mode,
            azimuth_duty: self.azimuth.last_duty(),
            elevation_duty: self.elevation.last_duty(),
        }
    }

    /// Release both drivers, used when the loop exits.
    pub fn shutdown(&mut self) {
        self.homing = None;
        self.azimuth.disable();
        self.elevation.disable();
        self.shared.set_mode(DriveMode::Disabled);
    }
}

/// Run `drive` at a fixed period on the calling thread until `stop` fires or
/// its sender is dropped. Deadlines are absolute, so a slow tick shortens the
/// following sleep instead of shifting the cadence.
pub fn run_control_loop(mut drive: DriveLoop, period: Duration, stop: Receiver<()>) {
    log::info!("Control loop running every {:?}", period);
    let mut deadline = Instant::now();
    let mut overruns: u64 = 0;

    loop {
        match stop.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        drive.tick();

        deadline += period;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        } else {
            overruns += 1;
            log::debug!("Control tick overran by {:?} ({} total)", now - deadline, overruns);
            deadline = now;
        }
    }

    drive.shutdown();
    log::info!("Control loop stopped");
}
