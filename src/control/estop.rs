use std::sync::{Arc, Weak};

use super::ControlError;
use crate::hardware::{MotorCommand, MotorDriver, TripSensor};
use crate::shared::SharedState;

/// Latched emergency stop.
///
/// The latch is set from the trip handler, which also puts both motor drivers
/// in the safe state before it returns. Nothing in the control loop has to run
/// for the motors to stop.
pub struct EmergencyStop {
    input: Arc<dyn TripSensor>,
    drivers: [Arc<dyn MotorDriver>; 2],
    safe_output: MotorCommand,
    shared: Arc<SharedState>,
}

impl EmergencyStop {
    /// Build the monitor and register it on `input`.
    ///
    /// An input that is already asserted latches immediately.
    pub fn arm(
        input: Arc<dyn TripSensor>,
        drivers: [Arc<dyn MotorDriver>; 2],
        safe_output: MotorCommand,
        shared: Arc<SharedState>,
    ) -> Arc<Self> {
        let stop = Arc::new(Self {
            input,
            drivers,
            safe_output,
            shared,
        });

        let weak: Weak<Self> = Arc::downgrade(&stop);
        stop.input.on_trip(Box::new(move || {
            if let Some(stop) = weak.upgrade() {
                stop.trigger();
            }
        }));

        if stop.input.is_tripped() {
            stop.trigger();
        }
        stop
    }

    pub fn is_latched(&self) -> bool {
        self.shared.emergency_stop()
    }

    pub fn safe_output(&self) -> MotorCommand {
        self.safe_output
    }

    /// Trip handler body. Safe to call repeatedly.
    pub fn trigger(&self) {
        let was_latched = self.shared.swap_emergency_stop(true);
        for driver in &self.drivers {
            driver.apply(self.safe_output);
        }
        self.shared.set_tracking(false);
        self.shared.invalidate_target();

        if !was_latched {
            log::error!("Emergency stop latched, motors forced to {:?}", self.safe_output);
        }
    }

    /// Operator reset. Refused while the physical input is still asserted.
    pub fn reset(&self) -> Result<(), ControlError> {
        if self.input.is_tripped() {
            log::warn!("Emergency stop reset refused: input still asserted");
            return Err(ControlError::EmergencyStopAsserted);
        }
        if self.shared.swap_emergency_stop(false) {
            log::info!("Emergency stop reset");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::{SimMotor, SimTrip};

    fn setup() -> (Arc<SimTrip>, Arc<SimMotor>, Arc<SimMotor>, Arc<SharedState>, Arc<EmergencyStop>) {
        let input = Arc::new(SimTrip::new());
        let az = Arc::new(SimMotor::default());
        let el = Arc::new(SimMotor::default());
        let shared = Arc::new(SharedState::new());
        let stop = EmergencyStop::arm(
            input.clone(),
            [az.clone(), el.clone()],
            MotorCommand::Brake,
            shared.clone(),
        );
        (input, az, el, shared, stop)
    }

    #[test]
    fn edge_latches_and_forces_safe_output() {
        let (input, az, el, shared, stop) = setup();
        az.apply(MotorCommand::Speed(200));
        el.apply(MotorCommand::Speed(-120));
        shared.set_tracking(true);

        input.assert();

        assert!(stop.is_latched());
        assert_eq!(az.last(), MotorCommand::Brake);
        assert_eq!(el.last(), MotorCommand::Brake);
        assert!(!shared.tracking());
        assert!(!shared.target().valid);
    }

    #[test]
    fn reset_is_refused_while_input_asserted() {
        let (input, _az, _el, _shared, stop) = setup();
        input.assert();

        assert!(matches!(
            stop.reset(),
            Err(ControlError::EmergencyStopAsserted)
        ));
        assert!(stop.is_latched());

        input.release();
        stop.reset().unwrap();
        assert!(!stop.is_latched());
    }

    #[test]
    fn latch_survives_input_release() {
        let (input, _az, _el, _shared, stop) = setup();
        input.pulse();
        assert!(stop.is_latched());
        assert!(!input.is_tripped());
    }

    #[test]
    fn asserted_at_arm_time_latches() {
        let input = Arc::new(SimTrip::new());
        input.assert();
        let shared = Arc::new(SharedState::new());
        let stop = EmergencyStop::arm(
            input,
            [Arc::new(SimMotor::default()), Arc::new(SimMotor::default())],
            MotorCommand::Coast,
            shared,
        );
        assert!(stop.is_latched());
    }
}
