//! Simulated mount hardware.
//!
//! Each [`SimAxis`] is a first-order plant: the motor duty sets the shaft
//! speed, the shaft position feeds a quadrature counter, and crossing the
//! index position pulses the index sensor. Time only advances through
//! [`SimMount::step`], so tests drive the plant deterministically.

use crossbeam::atomic::AtomicCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::{MotorCommand, MotorDriver, PositionSensor, TripHandler, TripSensor};
use crate::mount::{AxisHardware, MountHardware};

/// Digital input raised by the test harness or the plant.
#[derive(Default)]
pub struct SimTrip {
    asserted: AtomicBool,
    handlers: Mutex<Vec<TripHandler>>,
}

impl SimTrip {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive the input active. Handlers run on the inactive-to-active edge only.
    pub fn assert(&self) {
        if !self.asserted.swap(true, Ordering::SeqCst) {
            let handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
            for handler in handlers.iter() {
                handler();
            }
        }
    }

    pub fn release(&self) {
        self.asserted.store(false, Ordering::SeqCst);
    }

    pub fn pulse(&self) {
        self.assert();
        self.release();
    }
}

impl TripSensor for SimTrip {
    fn on_trip(&self, handler: TripHandler) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    fn is_tripped(&self) -> bool {
        self.asserted.load(Ordering::SeqCst)
    }
}

/// Motor driver that remembers what it was told.
pub struct SimMotor {
    last: AtomicCell<MotorCommand>,
}

impl Default for SimMotor {
    fn default() -> Self {
        Self {
            last: AtomicCell::new(MotorCommand::Disabled),
        }
    }
}

impl SimMotor {
    pub fn last(&self) -> MotorCommand {
        self.last.load()
    }

    pub fn duty(&self) -> i16 {
        self.last().duty()
    }
}

impl MotorDriver for SimMotor {
    fn apply(&self, command: MotorCommand) {
        self.last.store(command);
    }
}

/// Quadrature counter over a simulated shaft, in encoder counts.
#[derive(Default)]
pub struct SimEncoder {
    shaft: AtomicCell<f64>,
    offset: AtomicCell<f64>,
}

impl PositionSensor for SimEncoder {
    fn read(&self) -> i32 {
        (self.shaft.load() - self.offset.load()).round() as i32
    }

    fn zero(&self) {
        self.offset.store(self.shaft.load());
    }
}

pub struct SimAxis {
    pub motor: Arc<SimMotor>,
    pub encoder: Arc<SimEncoder>,
    pub index: Arc<SimTrip>,
    /// Shaft position of the index mark, in counts.
    index_at: f64,
    /// Shaft speed at full duty, in counts per second.
    full_speed: f64,
}

impl SimAxis {
    pub fn new(full_speed: f64, index_at: f64) -> Self {
        Self {
            motor: Arc::new(SimMotor::default()),
            encoder: Arc::new(SimEncoder::default()),
            index: Arc::new(SimTrip::new()),
            index_at,
            full_speed,
        }
    }

    pub fn shaft(&self) -> f64 {
        self.encoder.shaft.load()
    }

    /// Move the shaft without the motor, e.g. to set up a scenario.
    pub fn set_shaft(&self, counts: f64) {
        self.encoder.shaft.store(counts);
    }

    pub fn step(&self, dt: f64) {
        let before = self.shaft();
        let after = before + self.full_speed * f64::from(self.motor.duty()) / 255.0 * dt;
        self.encoder.shaft.store(after);

        let crossed = (before - self.index_at).signum() != (after - self.index_at).signum();
        if crossed || after == self.index_at {
            self.index.pulse();
        }
    }

    fn hardware(&self) -> AxisHardware {
        AxisHardware {
            sensor: self.encoder.clone(),
            index: self.index.clone(),
            motor: self.motor.clone(),
        }
    }
}

pub struct SimMount {
    pub azimuth: SimAxis,
    pub elevation: SimAxis,
    pub emergency_stop: Arc<SimTrip>,
}

impl SimMount {
    /// Both axes at full duty move `full_speed` counts per second and carry
    /// their index mark `index_at` counts from where the shaft starts.
    pub fn new(full_speed: f64, index_at: f64) -> Self {
        Self {
            azimuth: SimAxis::new(full_speed, index_at),
            elevation: SimAxis::new(full_speed, index_at),
            emergency_stop: Arc::new(SimTrip::new()),
        }
    }

    pub fn hardware(&self) -> MountHardware {
        MountHardware {
            azimuth: self.azimuth.hardware(),
            elevation: self.elevation.hardware(),
            emergency_stop: self.emergency_stop.clone(),
        }
    }

    pub fn step(&self, dt: f64) {
        self.azimuth.step(dt);
        self.elevation.step(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn trip_handlers_fire_once_per_edge() {
        let trip = SimTrip::new();
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        trip.on_trip(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        trip.assert();
        trip.assert();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(trip.is_tripped());

        trip.release();
        trip.assert();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn encoder_zero_keeps_shaft_position() {
        let axis = SimAxis::new(100.0, -1000.0);
        axis.set_shaft(42.0);
        assert_eq!(axis.encoder.read(), 42);
        axis.encoder.zero();
        assert_eq!(axis.encoder.read(), 0);
        assert_eq!(axis.shaft(), 42.0);
    }

    #[test]
    fn crossing_the_index_pulses_the_sensor() {
        let axis = SimAxis::new(1.0, -5.0);
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        axis.index.on_trip(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        axis.motor.apply(MotorCommand::Speed(-255));
        for _ in 0..4 {
            axis.step(1.0);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        axis.step(1.5);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!axis.index.is_tripped());
    }
}
