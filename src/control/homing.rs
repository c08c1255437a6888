use serde::Serialize;

use super::{Axis, AxisId};
use crate::config::HomingConfig;

/// Elevation is homed first so the dish is clear before azimuth sweeps.
const ORDER: [AxisId; 2] = [AxisId::Elevation, AxisId::Azimuth];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisHoming {
    Homed,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum HomingState {
    Idle,
    Running {
        axis: AxisId,
    },
    Completed {
        elevation: AxisHoming,
        azimuth: AxisHoming,
    },
    Aborted,
}

impl HomingState {
    pub fn is_running(&self) -> bool {
        matches!(self, HomingState::Running { .. })
    }
}

/// Cooperative homing sequence, advanced once per control tick.
///
/// Each axis in turn has its index latch cleared and is driven in reverse at a
/// fixed duty until the index handler sets the latch or the timeout expires.
/// A timed-out axis is left un-homed; the sequence moves on and never retries.
#[derive(Debug)]
pub struct HomingSequencer {
    speed: i16,
    timeout_ticks: u32,
    current: usize,
    elapsed: u32,
    started: bool,
    results: [AxisHoming; 2],
}

impl HomingSequencer {
    pub fn new(config: &HomingConfig, rate_hz: f64) -> Self {
        let timeout_ticks = (config.timeout.as_secs_f64() * rate_hz).ceil() as u32;
        Self {
            speed: i16::from(config.speed),
            timeout_ticks,
            current: 0,
            elapsed: 0,
            started: false,
            results: [AxisHoming::TimedOut; 2],
        }
    }

    pub fn state(&self) -> HomingState {
        match ORDER.get(self.current) {
            Some(&axis) => HomingState::Running { axis },
            None => self.outcome(),
        }
    }

    fn outcome(&self) -> HomingState {
        HomingState::Completed {
            elevation: self.results[0],
            azimuth: self.results[1],
        }
    }

    /// Advance one tick. Returns the final state once both axes are done.
    pub fn tick(&mut self, azimuth: &mut Axis, elevation: &mut Axis) -> Option<HomingState> {
        let Some(&id) = ORDER.get(self.current) else {
            return Some(self.outcome());
        };
        let axis = match id {
            AxisId::Azimuth => azimuth,
            AxisId::Elevation => elevation,
        };

        if !self.started {
            log::info!("Homing {} axis", id);
            axis.hold();
            axis.encoder().clear_index();
            self.started = true;
            self.elapsed = 0;
        }

        if axis.encoder().index_found() {
            axis.hold();
            log::info!("{} homed", id);
            self.finish_axis(AxisHoming::Homed);
        } else if self.elapsed >= self.timeout_ticks {
            axis.hold();
            log::error!("{} home timeout, axis left un-homed", id);
            self.finish_axis(AxisHoming::TimedOut);
        } else {
            axis.drive(-self.speed);
            self.elapsed += 1;
        }

        if self.current >= ORDER.len() {
            let outcome = self.outcome();
            log::info!("Homing finished: {:?}", outcome);
            Some(outcome)
        } else {
            None
        }
    }

    fn finish_axis(&mut self, result: AxisHoming) {
        self.results[self.current] = result;
        self.current += 1;
        self.started = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn timeout_is_counted_in_ticks() {
        let config = HomingConfig {
            speed: 80,
            timeout: Duration::from_secs(30),
        };
        let sequencer = HomingSequencer::new(&config, 100.0);
        assert_eq!(sequencer.timeout_ticks, 3000);
        assert_eq!(
            sequencer.state(),
            HomingState::Running {
                axis: AxisId::Elevation
            }
        );
    }

    #[test]
    fn running_state_reports_running() {
        assert!(HomingState::Running {
            axis: AxisId::Azimuth
        }
        .is_running());
        assert!(!HomingState::Aborted.is_running());
    }
}
