//! Property tests for the pointing invariants.

use proptest::prelude::*;

use sat_mount::config::{MountConfig, PidGains, TrackingConfig};
use sat_mount::control::{wrap_azimuth_error, PidController};
use sat_mount::hardware::sim::SimMount;
use sat_mount::predict::{
    julian_date, LookAngles, ObserverSite, PositionPredictor, PredictError, Propagator,
};
use sat_mount::shared::UtcStamp;
use sat_mount::tracker::{ElementSet, LINE_LEN};
use sat_mount::{Config, Mount};

/// Always reports the same look angles.
struct Pinned {
    azimuth: f64,
    elevation: f64,
}

impl Propagator for Pinned {
    fn set_site(&mut self, _site: ObserverSite) {}

    fn init(&mut self, _elements: &ElementSet) -> Result<(), PredictError> {
        Ok(())
    }

    fn position_at(&self, _julian_date: f64) -> Result<LookAngles, PredictError> {
        Ok(LookAngles {
            azimuth_deg: self.azimuth,
            elevation_deg: self.elevation,
            range_km: 1000.0,
        })
    }
}

fn element_set() -> ElementSet {
    ElementSet::new(
        "PROP",
        "1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992",
        "2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008",
    )
    .unwrap()
}

fn stamp(minute: u32, second: u32) -> UtcStamp {
    UtcStamp {
        year: 2030,
        month: 6,
        day: 15,
        hour: 3,
        minute,
        second,
    }
}

/// Moves at a constant angular rate from a start date.
struct Drifting {
    start_jd: f64,
    azimuth: f64,
    elevation: f64,
    azimuth_rate: f64,
    elevation_rate: f64,
}

impl Propagator for Drifting {
    fn set_site(&mut self, _site: ObserverSite) {}

    fn init(&mut self, _elements: &ElementSet) -> Result<(), PredictError> {
        Ok(())
    }

    fn position_at(&self, julian_date: f64) -> Result<LookAngles, PredictError> {
        let seconds = (julian_date - self.start_jd) * 86400.0;
        Ok(LookAngles {
            azimuth_deg: (self.azimuth + self.azimuth_rate * seconds).rem_euclid(360.0),
            elevation_deg: self.elevation + self.elevation_rate * seconds,
            range_km: 1000.0,
        })
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// The wrapped azimuth error always lands in (-180, 180] and points at
    /// the same direction as the raw difference.
    #[test]
    fn prop_azimuth_error_is_wrapped(target in 0.0f64..360.0, current in 0.0f64..360.0) {
        let error = wrap_azimuth_error(target, current);
        prop_assert!(error > -180.0 && error <= 180.0, "error {error}");
        let residual = (current + error - target).rem_euclid(360.0);
        prop_assert!(residual < 1e-9 || residual > 360.0 - 1e-9);
    }

    /// Whatever the propagator reports, the target elevation is inside the
    /// mechanical limits and the azimuth is normalized.
    #[test]
    fn prop_predicted_target_is_in_limits(
        azimuth in -720.0f64..720.0,
        elevation in -90.0f64..180.0,
    ) {
        let mut predictor = PositionPredictor::new(
            Pinned { azimuth, elevation },
            TrackingConfig::default(),
            MountConfig::default(),
        );
        predictor.load(&element_set(), ObserverSite::default()).unwrap();
        let target = predictor.predict(&stamp(0, 0)).unwrap().target;
        prop_assert!((0.0..=90.0).contains(&target.elevation_deg));
        prop_assert!((0.0..360.0).contains(&target.azimuth_deg));
    }

    /// However fast the satellite appears to move between two samples, the
    /// rate used for extrapolation stays within the configured limit.
    #[test]
    fn prop_extrapolation_rate_is_clamped(
        azimuth in 0.0f64..360.0,
        elevation in 0.0f64..90.0,
        azimuth_rate in -50.0f64..50.0,
        elevation_rate in -50.0f64..50.0,
        gap in 1u32..120,
    ) {
        let mut predictor = PositionPredictor::new(
            Drifting {
                start_jd: julian_date(&stamp(0, 0)).unwrap(),
                azimuth,
                elevation,
                azimuth_rate,
                elevation_rate,
            },
            TrackingConfig::default(),
            MountConfig::default(),
        );
        predictor.load(&element_set(), ObserverSite::default()).unwrap();
        predictor.predict(&stamp(0, 0)).unwrap();
        let prediction = predictor.predict(&stamp(gap / 60, gap % 60)).unwrap();

        let max = TrackingConfig::default().max_rate_deg_s;
        prop_assert!(prediction.azimuth_rate.abs() <= max);
        prop_assert!(prediction.elevation_rate.abs() <= max);
    }

    /// Manual targets either land in range or never reach the shared target.
    #[test]
    fn prop_manual_target_never_leaves_limits(
        azimuth in -400.0f64..800.0,
        elevation in -200.0f64..200.0,
    ) {
        let sim = SimMount::new(10.0, -5.0);
        let (mount, _drive, _tracking) = Mount::new(&Config::default(), sim.hardware(), Pinned {
            azimuth: 0.0,
            elevation: 0.0,
        });
        let accepted = mount.set_manual_target(azimuth, elevation).is_ok();
        let target = mount.shared().target();
        prop_assert_eq!(accepted, target.valid);
        if accepted {
            prop_assert!((0.0..360.0).contains(&target.azimuth_deg));
            prop_assert!((0.0..=90.0).contains(&target.elevation_deg));
        }
    }

    /// PID output stays within the duty range for any error history.
    #[test]
    fn prop_pid_output_is_bounded(errors in prop::collection::vec(-1e6f64..1e6, 1..50)) {
        let mut pid = PidController::new(PidGains::default());
        for error in errors {
            let output = pid.regulate(error, 0.01);
            prop_assert!((-255.0..=255.0).contains(&output), "output {output}");
            prop_assert!(pid.integral().abs() <= PidGains::default().max_integral);
        }
    }

    /// Arbitrary line text is either rejected or stored at full width.
    #[test]
    fn prop_element_set_lines_are_fixed_width(line1 in "1[ -~]{0,80}", line2 in "2[ -~]{0,80}") {
        match ElementSet::new("FUZZ", &line1, &line2) {
            Ok(set) => {
                prop_assert_eq!(set.line1().len(), LINE_LEN);
                prop_assert_eq!(set.line2().len(), LINE_LEN);
            }
            Err(_) => {
                prop_assert!(
                    line1.trim_end().len() != LINE_LEN || line2.trim_end().len() != LINE_LEN
                );
            }
        }
    }
}
