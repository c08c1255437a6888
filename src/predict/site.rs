use serde::Serialize;

use super::LookAngles;
use crate::shared::GpsFix;

// WGS-84
const EQUATORIAL_RADIUS_KM: f64 = 6378.137;
const ECCENTRICITY_SQUARED: f64 = 0.006_694_379_990_14;

/// Observer position on the WGS-84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ObserverSite {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl ObserverSite {
    pub fn new(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            altitude_m,
        }
    }

    pub fn from_fix(fix: &GpsFix) -> Self {
        Self::new(fix.latitude_deg, fix.longitude_deg, fix.altitude_m)
    }

    /// Parse `"lat, lon"` in decimal degrees.
    pub fn from_coordinates(coordinates: &str, altitude_m: f64) -> Option<Self> {
        let mut parts = coordinates.split(',').map(str::trim);
        let latitude: f64 = parts.next()?.parse().ok()?;
        let longitude: f64 = parts.next()?.parse().ok()?;
        if parts.next().is_some()
            || !(-90.0..=90.0).contains(&latitude)
            || !(-180.0..=180.0).contains(&longitude)
        {
            return None;
        }
        Some(Self::new(latitude, longitude, altitude_m))
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        let lat = self.latitude_deg.to_radians();
        let lon = self.longitude_deg.to_radians();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lon, cos_lon) = lon.sin_cos();
        let n = EQUATORIAL_RADIUS_KM / (1.0 - ECCENTRICITY_SQUARED * sin_lat * sin_lat).sqrt();
        let alt_km = self.altitude_m / 1000.0;
        [
            (n + alt_km) * cos_lat * cos_lon,
            (n + alt_km) * cos_lat * sin_lon,
            (n * (1.0 - ECCENTRICITY_SQUARED) + alt_km) * sin_lat,
        ]
    }

    /// Azimuth, elevation and range of an Earth-fixed position.
    pub fn look_at(&self, target_ecef_km: [f64; 3]) -> LookAngles {
        let site = self.position_ecef_km();
        let dr = [
            target_ecef_km[0] - site[0],
            target_ecef_km[1] - site[1],
            target_ecef_km[2] - site[2],
        ];
        let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();

        let (east, north, up) = self.to_enu(dr);
        let azimuth_deg = east.atan2(north).to_degrees().rem_euclid(360.0);
        let elevation_deg = if range_km > 0.0 {
            (up / range_km).asin().to_degrees()
        } else {
            0.0
        };

        LookAngles {
            azimuth_deg,
            elevation_deg,
            range_km,
        }
    }

    fn to_enu(&self, dr: [f64; 3]) -> (f64, f64, f64) {
        let (sin_lat, cos_lat) = self.latitude_deg.to_radians().sin_cos();
        let (sin_lon, cos_lon) = self.longitude_deg.to_radians().sin_cos();

        let east = -sin_lon * dr[0] + cos_lon * dr[1];
        let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
        let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
        (east, north, up)
    }
}
