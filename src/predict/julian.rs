use chrono::{DateTime, NaiveDate, Utc};

use super::PredictError;
use crate::shared::UtcStamp;

pub const MIN_YEAR: i32 = 2020;
pub const MAX_YEAR: i32 = 2100;

/// Julian date of the Unix epoch.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// Continuous Julian date of a GPS time stamp.
///
/// Uses the integer proleptic Gregorian day-number formula, which is only
/// trusted for years in [`MIN_YEAR`, `MAX_YEAR`]. Anything outside that window,
/// or a stamp that is not a real calendar date, is rejected.
pub fn julian_date(time: &UtcStamp) -> Result<f64, PredictError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&time.year) {
        return Err(PredictError::InvalidTime(format!(
            "year {} outside [{}, {}]",
            time.year, MIN_YEAR, MAX_YEAR
        )));
    }
    NaiveDate::from_ymd_opt(time.year, time.month, time.day)
        .and_then(|date| date.and_hms_opt(time.hour, time.minute, time.second))
        .ok_or_else(|| PredictError::InvalidTime(format!("{:?} is not a calendar time", time)))?;

    let year = i64::from(time.year);
    let month = i64::from(time.month);
    let day = i64::from(time.day);

    let a = (14 - month) / 12;
    let y = year + 4800 - a;
    let m = month + 12 * a - 3;
    let day_number = day + (153 * m + 2) / 5 + 365 * y + y / 4 - y / 100 + y / 400 - 32045;

    Ok(day_number as f64
        + (f64::from(time.hour) - 12.0) / 24.0
        + f64::from(time.minute) / 1440.0
        + f64::from(time.second) / 86400.0)
}

/// Inverse of [`julian_date`] at sub-second resolution.
pub fn datetime_from_julian(julian_date: f64) -> Result<DateTime<Utc>, PredictError> {
    let seconds = (julian_date - UNIX_EPOCH_JD) * 86400.0;
    if !seconds.is_finite() {
        return Err(PredictError::InvalidTime(format!("julian date {}", julian_date)));
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::<Utc>::from_timestamp(whole as i64, nanos)
        .ok_or_else(|| PredictError::InvalidTime(format!("julian date {}", julian_date)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stamp(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> UtcStamp {
        UtcStamp {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    #[test]
    fn new_year_2024_midnight() {
        let jd = julian_date(&stamp(2024, 1, 1, 0, 0, 0)).unwrap();
        assert_eq!(jd, 2_460_310.5);
    }

    #[test]
    fn noon_is_a_whole_day_number() {
        let jd = julian_date(&stamp(2025, 6, 21, 12, 0, 0)).unwrap();
        assert_eq!(jd.fract(), 0.0);
        let later = julian_date(&stamp(2025, 6, 21, 18, 30, 36)).unwrap();
        assert!((later - jd - 0.271_25).abs() < 1e-6);
    }

    #[test]
    fn leap_day_is_accepted() {
        let leap = julian_date(&stamp(2024, 2, 29, 0, 0, 0)).unwrap();
        let march = julian_date(&stamp(2024, 3, 1, 0, 0, 0)).unwrap();
        assert_eq!(march - leap, 1.0);
    }

    #[test]
    fn rejects_years_outside_window() {
        assert!(matches!(
            julian_date(&stamp(2019, 12, 31, 23, 59, 59)),
            Err(PredictError::InvalidTime(_))
        ));
        assert!(julian_date(&stamp(2101, 1, 1, 0, 0, 0)).is_err());
        assert!(julian_date(&stamp(2100, 12, 31, 0, 0, 0)).is_ok());
    }

    #[test]
    fn rejects_impossible_dates() {
        assert!(julian_date(&stamp(2023, 2, 29, 0, 0, 0)).is_err());
        assert!(julian_date(&stamp(2024, 13, 1, 0, 0, 0)).is_err());
        assert!(julian_date(&stamp(2024, 1, 1, 24, 0, 0)).is_err());
        assert!(julian_date(&stamp(2024, 1, 1, 0, 0, 60)).is_err());
    }

    #[test]
    fn converts_back_to_utc() {
        let time = Utc.with_ymd_and_hms(2024, 7, 4, 9, 15, 30).unwrap();
        let jd = julian_date(&UtcStamp::from_datetime(time)).unwrap();
        let back = datetime_from_julian(jd).unwrap();
        assert!((back - time).num_milliseconds().abs() < 5);
    }
}
