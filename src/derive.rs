// Date parsing and the per-row attributes derived from it.
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};

use crate::types::{DonationRecord, Derived};

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%d %B %Y",
];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
];

/// Parse a date cell in any of the layouts seen in donation exports.
/// A time component, if present, is dropped. Returns `None` when nothing
/// fits; the row keeps going with a missing date.
pub fn parse_date_lenient(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn derive_fields(date: Option<NaiveDate>, holidays: &[NaiveDate]) -> Derived {
    match date {
        Some(d) => Derived {
            month: Some(d.month()),
            day_of_week: Some(d.weekday()),
            is_holiday: holidays.contains(&d),
        },
        None => Derived::default(),
    }
}

pub fn derive_all(records: &mut [DonationRecord], holidays: &[NaiveDate]) {
    for r in records.iter_mut() {
        r.derived = derive_fields(r.date, holidays);
    }
    let holiday_rows = records.iter().filter(|r| r.derived.is_holiday).count();
    tracing::info!(rows = records.len(), holiday_rows, "derived date fields");
}
