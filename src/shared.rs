//! State shared between the control loop, the tracking loop and the operator.
//!
//! Every field is either a single atomic or a small `Copy` record replaced as a
//! whole through [`AtomicCell`], so a reader never observes a half-written
//! target or GPS fix. Nothing in here takes a lock that the control loop could
//! block on.

use chrono::{DateTime, Datelike, Timelike, Utc};
use crossbeam::atomic::AtomicCell;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use crate::control::{AxisId, DriveMode, HomingState};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TargetPosition {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub valid: bool,
}

impl TargetPosition {
    pub const INVALID: TargetPosition = TargetPosition {
        azimuth_deg: 0.0,
        elevation_deg: 0.0,
        valid: false,
    };

    pub fn new(azimuth_deg: f64, elevation_deg: f64) -> Self {
        Self {
            azimuth_deg,
            elevation_deg,
            valid: true,
        }
    }
}

/// Target plus a counter bumped on every write. Angles are kept as raw bits
/// so the whole record can be compare-exchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TargetSlot {
    azimuth_bits: u64,
    elevation_bits: u64,
    valid: bool,
    generation: u32,
}

impl TargetSlot {
    fn new(target: TargetPosition, generation: u32) -> Self {
        Self {
            azimuth_bits: target.azimuth_deg.to_bits(),
            elevation_bits: target.elevation_deg.to_bits(),
            valid: target.valid,
            generation,
        }
    }

    fn target(&self) -> TargetPosition {
        TargetPosition {
            azimuth_deg: f64::from_bits(self.azimuth_bits),
            elevation_deg: f64::from_bits(self.elevation_bits),
            valid: self.valid,
        }
    }
}

/// UTC calendar time as reported by the GPS receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct UtcStamp {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl UtcStamp {
    pub fn from_datetime(time: DateTime<Utc>) -> Self {
        Self {
            year: time.year(),
            month: time.month(),
            day: time.day(),
            hour: time.hour(),
            minute: time.minute(),
            second: time.second(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GpsFix {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
    pub time: UtcStamp,
    pub valid: bool,
}

/// Encoder count and index latch of one axis.
#[derive(Debug, Default)]
pub struct AxisPosition {
    count: AtomicI32,
    index_found: AtomicBool,
}

impl AxisPosition {
    pub fn count(&self) -> i32 {
        self.count.load(Ordering::Acquire)
    }

    pub fn set_count(&self, count: i32) {
        self.count.store(count, Ordering::Release);
    }

    pub fn index_found(&self) -> bool {
        self.index_found.load(Ordering::Acquire)
    }

    pub fn clear_index(&self) {
        self.index_found.store(false, Ordering::Release);
    }

    /// Index edge: the count restarts at zero and the latch is set.
    pub fn mark_index(&self) {
        self.count.store(0, Ordering::Release);
        self.index_found.store(true, Ordering::Release);
    }
}

pub struct SharedState {
    pub azimuth: AxisPosition,
    pub elevation: AxisPosition,
    target: AtomicCell<TargetSlot>,
    gps: AtomicCell<GpsFix>,
    tle_valid: AtomicBool,
    tracking: AtomicBool,
    emergency_stop: AtomicBool,
    mode: AtomicCell<DriveMode>,
    homing: AtomicCell<HomingState>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            azimuth: AxisPosition::default(),
            elevation: AxisPosition::default(),
            target: AtomicCell::new(TargetSlot::new(TargetPosition::INVALID, 0)),
            gps: AtomicCell::new(GpsFix::default()),
            tle_valid: AtomicBool::new(false),
            tracking: AtomicBool::new(false),
            emergency_stop: AtomicBool::new(false),
            mode: AtomicCell::new(DriveMode::Disabled),
            homing: AtomicCell::new(HomingState::Idle),
        }
    }
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn axis(&self, axis: AxisId) -> &AxisPosition {
        match axis {
            AxisId::Azimuth => &self.azimuth,
            AxisId::Elevation => &self.elevation,
        }
    }

    pub fn target(&self) -> TargetPosition {
        self.target.load().target()
    }

    /// Write counter of the target. Pass it to [`SharedState::publish_target`]
    /// to publish only if nothing else wrote the target in between.
    pub fn target_generation(&self) -> u32 {
        self.target.load().generation
    }

    /// Unconditional write, used by the operator and the safety paths.
    pub fn set_target(&self, target: TargetPosition) {
        let mut current = self.target.load();
        loop {
            let next = TargetSlot::new(target, current.generation.wrapping_add(1));
            match self.target.compare_exchange(current, next) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn invalidate_target(&self) {
        self.set_target(TargetPosition::INVALID);
    }

    /// Store `target` only if the target is still at `generation`. Returns
    /// false when another write got there first.
    pub fn publish_target(&self, generation: u32, target: TargetPosition) -> bool {
        let current = self.target.load();
        if current.generation != generation {
            return false;
        }
        let next = TargetSlot::new(target, generation.wrapping_add(1));
        self.target.compare_exchange(current, next).is_ok()
    }

    pub fn gps(&self) -> GpsFix {
        self.gps.load()
    }

    /// Called by the GPS receiver with every validated fix.
    pub fn update_gps(&self, fix: GpsFix) {
        self.gps.store(fix);
    }

    pub fn gps_valid(&self) -> bool {
        self.gps.load().valid
    }

    pub fn tle_valid(&self) -> bool {
        self.tle_valid.load(Ordering::Acquire)
    }

    pub fn set_tle_valid(&self, valid: bool) {
        self.tle_valid.store(valid, Ordering::Release);
    }

    pub fn tracking(&self) -> bool {
        self.tracking.load(Ordering::Acquire)
    }

    pub fn set_tracking(&self, tracking: bool) {
        self.tracking.store(tracking, Ordering::Release);
    }

    pub fn emergency_stop(&self) -> bool {
        self.emergency_stop.load(Ordering::SeqCst)
    }

    /// Returns the previous latch value.
    pub(crate) fn swap_emergency_stop(&self, latched: bool) -> bool {
        self.emergency_stop.swap(latched, Ordering::SeqCst)
    }

    pub fn mode(&self) -> DriveMode {
        self.mode.load()
    }

    pub(crate) fn set_mode(&self, mode: DriveMode) {
        self.mode.store(mode);
    }

    pub fn homing(&self) -> HomingState {
        self.homing.load()
    }

    pub(crate) fn set_homing(&self, state: HomingState) {
        self.homing.store(state);
    }
}

/// Read-only snapshot for status surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct MountStatus {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub azimuth_count: i32,
    pub elevation_count: i32,
    pub azimuth_index_found: bool,
    pub elevation_index_found: bool,
    pub target: TargetPosition,
    pub gps_valid: bool,
    pub tle_valid: bool,
    pub tracking: bool,
    pub emergency_stop: bool,
    pub handoff_pending: bool,
    pub mode: DriveMode,
    pub homing: HomingState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn index_mark_zeroes_and_latches() {
        let position = AxisPosition::default();
        position.set_count(1234);
        position.mark_index();
        assert_eq!(position.count(), 0);
        assert!(position.index_found());
        position.clear_index();
        assert!(!position.index_found());
    }

    #[test]
    fn stamp_splits_calendar_fields() {
        let time = Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap();
        let stamp = UtcStamp::from_datetime(time);
        assert_eq!(
            stamp,
            UtcStamp {
                year: 2025,
                month: 3,
                day: 14,
                hour: 15,
                minute: 9,
                second: 26,
            }
        );
    }

    #[test]
    fn publish_after_invalidation_is_refused() {
        let shared = SharedState::new();
        let seen = shared.target_generation();
        shared.invalidate_target();
        assert!(!shared.publish_target(seen, TargetPosition::new(120.0, 30.0)));
        assert!(!shared.target().valid);

        let seen = shared.target_generation();
        assert!(shared.publish_target(seen, TargetPosition::new(120.0, 30.0)));
        assert_eq!(shared.target(), TargetPosition::new(120.0, 30.0));
        assert!(!shared.publish_target(seen, TargetPosition::new(121.0, 30.0)));
    }

    #[test]
    fn manual_write_supersedes_pending_publish() {
        let shared = SharedState::new();
        let seen = shared.target_generation();
        shared.set_target(TargetPosition::new(10.0, 10.0));
        assert!(!shared.publish_target(seen, TargetPosition::new(200.0, 60.0)));
        assert_eq!(shared.target(), TargetPosition::new(10.0, 10.0));
    }

    #[test]
    fn fresh_state_is_idle() {
        let shared = SharedState::new();
        assert!(!shared.target().valid);
        assert!(!shared.gps_valid());
        assert!(!shared.tracking());
        assert!(!shared.emergency_stop());
        assert_eq!(shared.mode(), DriveMode::Disabled);
    }
}
