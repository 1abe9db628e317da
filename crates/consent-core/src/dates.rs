//! Date display formatting and the leave-period reducer
//!
//! The form keeps three mutually dependent values: leave start, leave end,
//! and duration in days (inclusive). Any edit to one of them derives the
//! dependent value through one of the pure transitions below; there is no
//! listener triangle and no hidden ordering between the three fields.

use chrono::{Duration, NaiveDate};

const ISO_FORMAT: &str = "%Y-%m-%d";
const DISPLAY_FORMAT: &str = "%d/%m/%Y";

/// Render an ISO `YYYY-MM-DD` string as `dd/mm/yyyy`.
///
/// An empty string stays empty; a string that does not parse as a full
/// calendar date is returned unchanged rather than dropped.
pub fn format_display_date(iso: &str) -> String {
    if iso.is_empty() {
        return String::new();
    }
    match NaiveDate::parse_from_str(iso, ISO_FORMAT) {
        Ok(date) => date.format(DISPLAY_FORMAT).to_string(),
        Err(_) => iso.to_string(),
    }
}

fn parse_iso(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, ISO_FORMAT).ok()
}

/// Leave start changed: derive the end date from the (inclusive) duration.
/// Returns `None` when the start does not parse or the duration is zero,
/// leaving the end date untouched.
pub fn from_changed(new_from: &str, duration_days: i64) -> Option<String> {
    if duration_days < 1 {
        return None;
    }
    let from = parse_iso(new_from)?;
    Some(
        (from + Duration::days(duration_days - 1))
            .format(ISO_FORMAT)
            .to_string(),
    )
}

/// Duration changed: derive the end date from the current start
pub fn duration_changed(from: &str, new_duration_days: i64) -> Option<String> {
    from_changed(from, new_duration_days)
}

/// Leave end edited directly: recompute the inclusive duration rather than
/// dropping the edit. Returns `None` when either date does not parse or
/// the end precedes the start.
pub fn to_changed(from: &str, new_to: &str) -> Option<i64> {
    let from = parse_iso(from)?;
    let to = parse_iso(new_to)?;
    let days = (to - from).num_days() + 1;
    if days < 1 {
        None
    } else {
        Some(days)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: from_changed and to_changed are inverse transitions
        #[test]
        fn reducer_round_trips(offset in 0i64..3000, duration in 1i64..365) {
            let from = (NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
                + Duration::days(offset))
                .format(ISO_FORMAT)
                .to_string();

            let to = from_changed(&from, duration).unwrap();
            prop_assert_eq!(to_changed(&from, &to), Some(duration));
        }
    }
}
