//! Date-index arithmetic
//!
//! Units are keyed by Modified Julian Date. The observing-day MJD rolls
//! over at local noon-ish (UTC 12:00), hence the half-day offset in
//! [`mjd_from_timestamp`].

use chrono::{NaiveDate, Utc};

use crate::errors::{CoreError, Result};

/// MJD of the Unix epoch (1970-01-01)
pub const UNIX_EPOCH_MJD: i32 = 40587;

/// First MJD of the exposure-number prefix scheme
pub const EXPOSURE_PREFIX_EPOCH_MJD: i32 = 55562;

/// Observing-day MJD for a Unix timestamp in seconds
pub fn mjd_from_timestamp(secs: i64) -> i32 {
    (secs as f64 / 86400.0 + UNIX_EPOCH_MJD as f64 + 0.5).floor() as i32
}

/// Observing-day MJD for the current wall clock
pub fn current_mjd() -> i32 {
    mjd_from_timestamp(Utc::now().timestamp())
}

/// Parse a `YYYY-MM-DD` calendar date into its MJD
pub fn date_to_mjd(value: &str) -> Result<i32> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        CoreError::InvalidDate {
            value: value.to_string(),
            reason: e.to_string(),
        }
    })?;
    Ok(naive_date_to_mjd(date))
}

fn naive_date_to_mjd(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (date - epoch).num_days() as i32 + UNIX_EPOCH_MJD
}

/// Calendar date of an MJD
pub fn mjd_to_date(mjd: i32) -> Option<NaiveDate> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    epoch.checked_add_signed(chrono::Duration::days((mjd - UNIX_EPOCH_MJD) as i64))
}

/// Exposure-number prefix for a night: exposure files are numbered
/// `prefix + n` with `prefix = (mjd - 55562) * 10000`
pub fn exposure_prefix(mjd: i32) -> u64 {
    (i64::from(mjd) - i64::from(EXPOSURE_PREFIX_EPOCH_MJD)).max(0) as u64 * 10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_epoch_noon_rolls_over() {
        assert_eq!(mjd_from_timestamp(0), 40587);
        assert_eq!(mjd_from_timestamp(43_199), 40587);
        assert_eq!(mjd_from_timestamp(43_200), 40588);
    }

    #[test]
    fn test_date_to_mjd() {
        assert_eq!(date_to_mjd("1970-01-01").unwrap(), 40587);
        assert_eq!(date_to_mjd("2023-02-25").unwrap(), 60000);
    }

    #[test]
    fn test_date_round_trip() {
        let date = mjd_to_date(60000).unwrap();
        assert_eq!(date.to_string(), "2023-02-25");
    }

    #[test]
    fn test_invalid_date_is_error() {
        let err = date_to_mjd("2023-13-01").unwrap_err();
        assert!(matches!(err, CoreError::InvalidDate { .. }));
    }

    #[test]
    fn test_exposure_prefix() {
        assert_eq!(exposure_prefix(55562), 0);
        assert_eq!(exposure_prefix(55000), 0);
        assert_eq!(exposure_prefix(60000), 44_380_000);
        // beyond the u32 range of exposure numbers
        assert_eq!(exposure_prefix(500_000), 4_444_380_000);
        assert_eq!(exposure_prefix(i32::MAX), 21_474_280_850_000);
    }
}
