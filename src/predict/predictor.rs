use super::{julian_date, ObserverSite, Prediction, PredictError, Propagator};
use crate::config::{MountConfig, TrackingConfig};
use crate::control::wrap_degrees;
use crate::shared::{TargetPosition, UtcStamp};
use crate::tracker::ElementSet;

/// Elevation commanded while the satellite is below the horizon.
const STOW_ELEVATION: f64 = 0.0;

#[derive(Debug, Clone, Copy)]
struct Sample {
    julian_date: f64,
    azimuth: f64,
    elevation: f64,
}

/// Turns propagator output into a mount target.
///
/// The target leads the instantaneous position by the configured lookahead,
/// extrapolated with an angular rate taken from the difference to the last
/// accepted sample. Samples closer than `min_interval` to that sample leave
/// the rate estimate untouched, which matters because GPS time only resolves
/// whole seconds. A sample older than the last one restarts the history.
pub struct PositionPredictor<P> {
    propagator: P,
    tracking: TrackingConfig,
    mount: MountConfig,
    loaded: bool,
    previous: Option<Sample>,
    azimuth_rate: f64,
    elevation_rate: f64,
}

impl<P: Propagator> PositionPredictor<P> {
    pub fn new(propagator: P, tracking: TrackingConfig, mount: MountConfig) -> Self {
        Self {
            propagator,
            tracking,
            mount,
            loaded: false,
            previous: None,
            azimuth_rate: 0.0,
            elevation_rate: 0.0,
        }
    }

    pub fn propagator(&self) -> &P {
        &self.propagator
    }

    /// Point the propagator at `site` and load `elements`. Rate history from
    /// the previous satellite is discarded.
    pub fn load(&mut self, elements: &ElementSet, site: ObserverSite) -> Result<(), PredictError> {
        self.propagator.set_site(site);
        self.propagator.init(elements)?;
        self.loaded = true;
        self.reset();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.previous = None;
        self.azimuth_rate = 0.0;
        self.elevation_rate = 0.0;
    }

    /// Predict the target for GPS time `time`.
    ///
    /// A rejected time or a propagation failure leaves the rate history as it
    /// was.
    pub fn predict(&mut self, time: &UtcStamp) -> Result<Prediction, PredictError> {
        if !self.loaded {
            return Err(PredictError::NotInitialized);
        }
        let jd = julian_date(time)?;
        let now = self.propagator.position_at(jd)?;
        let sample = Sample {
            julian_date: jd,
            azimuth: now.azimuth_deg,
            elevation: now.elevation_deg,
        };

        match self.previous {
            Some(previous) => {
                let dt = (sample.julian_date - previous.julian_date) * 86400.0;
                if dt < 0.0 {
                    log::warn!("GPS time stepped back {:.0} s, rate history reset", -dt);
                    self.reset();
                    self.previous = Some(sample);
                } else if dt > self.tracking.min_interval.as_secs_f64() {
                    let max = self.tracking.max_rate_deg_s;
                    let azimuth_delta = unwrap_delta(sample.azimuth - previous.azimuth);
                    let elevation_delta = sample.elevation - previous.elevation;
                    self.azimuth_rate = (azimuth_delta / dt).clamp(-max, max);
                    self.elevation_rate = (elevation_delta / dt).clamp(-max, max);
                    self.previous = Some(sample);
                }
            }
            None => self.previous = Some(sample),
        }

        let lookahead = self.tracking.lookahead.as_secs_f64();
        let azimuth = wrap_degrees(now.azimuth_deg + self.azimuth_rate * lookahead);
        let elevation = if now.elevation_deg < 0.0 {
            STOW_ELEVATION
        } else {
            now.elevation_deg + self.elevation_rate * lookahead
        };

        Ok(Prediction {
            julian_date: jd,
            instantaneous: now,
            azimuth_rate: self.azimuth_rate,
            elevation_rate: self.elevation_rate,
            target: TargetPosition::new(azimuth, self.mount.clamp_elevation(elevation)),
        })
    }
}

fn unwrap_delta(delta: f64) -> f64 {
    if delta > 180.0 {
        delta - 360.0
    } else if delta < -180.0 {
        delta + 360.0
    } else {
        delta
    }
}
