use sgp4::{Constants, Elements};

use super::{datetime_from_julian, LookAngles, ObserverSite, PredictError};
use crate::tracker::ElementSet;

/// Orbital propagator as seen by the tracking loop.
pub trait Propagator: Send {
    fn set_site(&mut self, site: ObserverSite);
    /// Load a new element set, replacing the previous one.
    fn init(&mut self, elements: &ElementSet) -> Result<(), PredictError>;
    /// Look angles at `julian_date` for the configured site.
    fn position_at(&self, julian_date: f64) -> Result<LookAngles, PredictError>;
}

struct Satellite {
    elements: Elements,
    constants: Constants,
}

/// SGP4 propagation with TEME to Earth-fixed rotation by sidereal time.
#[derive(Default)]
pub struct Sgp4Propagator {
    site: ObserverSite,
    satellite: Option<Satellite>,
}

impl Sgp4Propagator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn satellite_name(&self) -> Option<&str> {
        self.satellite
            .as_ref()
            .and_then(|sat| sat.elements.object_name.as_deref())
    }
}

impl Propagator for Sgp4Propagator {
    fn set_site(&mut self, site: ObserverSite) {
        self.site = site;
    }

    fn init(&mut self, set: &ElementSet) -> Result<(), PredictError> {
        let elements = Elements::from_tle(
            Some(set.name().to_string()),
            set.line1().as_bytes(),
            set.line2().as_bytes(),
        )
        .map_err(|e| PredictError::InvalidTle(e.to_string()))?;
        let constants = Constants::from_elements(&elements)
            .map_err(|e| PredictError::InvalidTle(e.to_string()))?;

        self.satellite = Some(Satellite {
            elements,
            constants,
        });
        Ok(())
    }

    fn position_at(&self, julian_date: f64) -> Result<LookAngles, PredictError> {
        let satellite = self.satellite.as_ref().ok_or(PredictError::NotInitialized)?;
        let timestamp = datetime_from_julian(julian_date)?.naive_utc();

        let minutes = satellite
            .elements
            .datetime_to_minutes_since_epoch(&timestamp)
            .map_err(|e| PredictError::Propagation(e.to_string()))?;
        let prediction = satellite
            .constants
            .propagate(minutes)
            .map_err(|e| PredictError::Propagation(e.to_string()))?;

        let sidereal = sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&timestamp));
        Ok(self
            .site
            .look_at(teme_to_ecef_position(prediction.position, sidereal)))
    }
}

fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let (sin_gmst, cos_gmst) = gmst.sin_cos();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}
