use std::sync::Arc;

use super::AxisId;
use crate::hardware::{PositionSensor, TripSensor};
use crate::shared::SharedState;

/// Quadrature position reader for one axis.
///
/// Publishes every reading into the shared [`crate::shared::AxisPosition`] so
/// status surfaces see the same count the controller used.
pub struct Encoder {
    axis: AxisId,
    sensor: Arc<dyn PositionSensor>,
    shared: Arc<SharedState>,
    degrees_per_pulse: f64,
}

impl Encoder {
    pub fn new(
        axis: AxisId,
        sensor: Arc<dyn PositionSensor>,
        shared: Arc<SharedState>,
        degrees_per_pulse: f64,
    ) -> Self {
        Self {
            axis,
            sensor,
            shared,
            degrees_per_pulse,
        }
    }

    pub fn read(&self) -> i32 {
        let count = self.sensor.read();
        self.shared.axis(self.axis).set_count(count);
        count
    }

    /// Current shaft angle in degrees, unwrapped.
    pub fn read_degrees(&self) -> f64 {
        f64::from(self.read()) * self.degrees_per_pulse
    }

    pub fn index_found(&self) -> bool {
        self.shared.axis(self.axis).index_found()
    }

    pub fn clear_index(&self) {
        self.shared.axis(self.axis).clear_index();
    }

    /// Wire the index sensor so each edge zeroes the counter and sets the latch.
    pub fn attach_index(&self, index: &dyn TripSensor) {
        let axis = self.axis;
        let sensor = self.sensor.clone();
        let shared = self.shared.clone();
        index.on_trip(Box::new(move || {
            sensor.zero();
            shared.axis(axis).mark_index();
        }));
    }
}
