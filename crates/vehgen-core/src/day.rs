//! Day offset → calendar day mapping.
//!
//! Offset `i` counts backwards from the configured end date: offset 0 is the
//! end date itself, offset 1 the day before, and so on. All instants are
//! local wall-clock with second precision.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// `YYYYMMDD`, used for directory names and blob prefixes.
pub const DAY_ID_FORMAT: &str = "%Y%m%d";

/// Sortable second-precision timestamp, e.g. `2021-06-30T13:04:59`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub const SECONDS_PER_DAY: u32 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub offset: u32,
    pub date: NaiveDate,
    pub id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DayWindow {
    pub fn for_offset(end_date: NaiveDate, offset: u32) -> Result<Self> {
        let date = end_date
            .checked_sub_days(Days::new(u64::from(offset)))
            .ok_or_else(|| {
                Error::Config(format!(
                    "day offset {offset} from {end_date} is outside the supported calendar"
                ))
            })?;
        let midnight = clock(0, 0, 0)?;
        let last_second = clock(23, 59, 59)?;

        Ok(Self {
            offset,
            date,
            id: date.format(DAY_ID_FORMAT).to_string(),
            start: date.and_time(midnight),
            end: date.and_time(last_second),
        })
    }
}

fn clock(h: u32, m: u32, s: u32) -> Result<NaiveTime> {
    NaiveTime::from_hms_opt(h, m, s)
        .ok_or_else(|| Error::Invariant(format!("{h:02}:{m:02}:{s:02} is not a valid time")))
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn offset_zero_is_the_end_date() {
        let w = DayWindow::for_offset(date(2021, 6, 30), 0).unwrap();
        assert_eq!(w.id, "20210630");
        assert_eq!(format_timestamp(w.start), "2021-06-30T00:00:00");
        assert_eq!(format_timestamp(w.end), "2021-06-30T23:59:59");
    }

    #[test]
    fn offsets_cross_month_and_leap_day() {
        let w = DayWindow::for_offset(date(2024, 3, 1), 1).unwrap();
        assert_eq!(w.id, "20240229");
        let w = DayWindow::for_offset(date(2021, 1, 2), 2).unwrap();
        assert_eq!(w.id, "20201231");
    }

    #[test]
    fn offset_beyond_calendar_is_config_error() {
        let err = DayWindow::for_offset(NaiveDate::MIN, 1).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
