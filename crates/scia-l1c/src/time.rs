//! ENVISAT time handling.
//!
//! Binary records carry time as a modified Julian date relative to
//! 2000-01-01T00:00:00 UTC split into days, seconds and microseconds.
//! ASCII headers carry the same instants as `DD-MON-YYYY hh:mm:ss.uuuuuu`.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: i64 = 86_400;
const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_DAY: i64 = SECONDS_PER_DAY * MICROS_PER_SECOND;

const HEADER_TIME_FORMAT: &str = "%d-%b-%Y %H:%M:%S%.6f";

/// Modified Julian date 2000 (days, seconds, microseconds).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mjd {
    pub days: i32,
    pub seconds: u32,
    pub microseconds: u32,
}

impl Mjd {
    pub fn new(days: i32, seconds: u32, microseconds: u32) -> Self {
        Self::from_total_micros(
            days as i64 * MICROS_PER_DAY + seconds as i64 * MICROS_PER_SECOND + microseconds as i64,
        )
    }

    /// Total microseconds since the 2000-01-01 epoch.
    pub fn total_micros(&self) -> i64 {
        self.days as i64 * MICROS_PER_DAY
            + self.seconds as i64 * MICROS_PER_SECOND
            + self.microseconds as i64
    }

    fn from_total_micros(total: i64) -> Self {
        let days = total.div_euclid(MICROS_PER_DAY);
        let rest = total.rem_euclid(MICROS_PER_DAY);
        Self {
            days: days as i32,
            seconds: (rest / MICROS_PER_SECOND) as u32,
            microseconds: (rest % MICROS_PER_SECOND) as u32,
        }
    }

    /// Shift by a (possibly fractional) number of seconds, rounded to the microsecond.
    pub fn add_seconds(&self, seconds: f64) -> Self {
        let delta = (seconds * MICROS_PER_SECOND as f64).round() as i64;
        Self::from_total_micros(self.total_micros() + delta)
    }

    /// Seconds elapsed from `earlier` to `self`.
    pub fn seconds_since(&self, earlier: &Mjd) -> f64 {
        (self.total_micros() - earlier.total_micros()) as f64 / MICROS_PER_SECOND as f64
    }

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Convert to a UTC date-time.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        Self::epoch() + Duration::microseconds(self.total_micros())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let micros = (dt - Self::epoch()).num_microseconds().unwrap_or(i64::MAX);
        Self::from_total_micros(micros)
    }

    /// Parse the ASCII header form, e.g. `12-MAR-2004 09:51:37.000000`.
    pub fn parse_header_time(text: &str) -> Option<Self> {
        let text = text.trim();
        // chrono expects title-case month abbreviations
        let normalised = match text.get(3..6) {
            Some(month) if text.len() > 6 => {
                let mut m = month.to_ascii_lowercase();
                if let Some(first) = m.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                format!("{}{}{}", &text[..3], m, &text[6..])
            }
            _ => return None,
        };
        let naive = NaiveDateTime::parse_from_str(&normalised, HEADER_TIME_FORMAT).ok()?;
        Some(Self::from_datetime(Utc.from_utc_datetime(&naive)))
    }

    /// Format in the ASCII header form with an upper-case month.
    pub fn to_header_time(&self) -> String {
        self.to_datetime()
            .format(HEADER_TIME_FORMAT)
            .to_string()
            .to_uppercase()
    }

    /// Calendar date of this instant.
    pub fn date(&self) -> NaiveDate {
        self.to_datetime().date_naive()
    }
}

impl PartialOrd for Mjd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Mjd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.total_micros().cmp(&other.total_micros())
    }
}

impl fmt::Display for Mjd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}d {}s {}us)",
            self.to_header_time(),
            self.days,
            self.seconds,
            self.microseconds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_epoch_is_year_2000() {
        let dt = Mjd::new(0, 0, 0).to_datetime();
        assert_eq!(dt.year(), 2000);
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 1);
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_add_seconds_normalises_carry() {
        let t = Mjd::new(1500, 86_399, 999_000).add_seconds(0.0625);
        assert_eq!(t, Mjd { days: 1501, seconds: 0, microseconds: 61_500 });
    }

    #[test]
    fn test_negative_days_before_epoch() {
        let t = Mjd::new(0, 0, 0).add_seconds(-1.0);
        assert_eq!(t.days, -1);
        assert_eq!(t.seconds, 86_399);
        assert_eq!(t.to_datetime().year(), 1999);
    }

    #[test]
    fn test_ordering_and_difference() {
        let a = Mjd::new(1500, 10, 0);
        let b = a.add_seconds(1.5);
        assert!(a < b);
        assert!((b.seconds_since(&a) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_header_time_round_trip() {
        let t = Mjd::parse_header_time("12-MAR-2004 09:51:37.250000").unwrap();
        assert_eq!(t.to_header_time(), "12-MAR-2004 09:51:37.250000");
        assert_eq!(t.date(), NaiveDate::from_ymd_opt(2004, 3, 12).unwrap());
    }

    #[test]
    fn test_header_time_rejects_garbage() {
        assert!(Mjd::parse_header_time("not a time").is_none());
        assert!(Mjd::parse_header_time("").is_none());
    }
}
