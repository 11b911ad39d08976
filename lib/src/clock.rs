//! Time normalization for the departure feed.
//!
//! The upstream API reports planned times as bare `YYYY-MM-DDThh:mm:ss`
//! strings in UTC, with no zone suffix. The board displays Sydney wall-clock
//! time, so every timestamp goes through two steps: a strict UTC parse to
//! epoch seconds, then a shift to the fixed standard offset plus a manually
//! evaluated daylight-saving rule. The manual rule exists because the target
//! platform's libc cannot always be taught the Australian transition dates;
//! keeping it as a pure function of an explicit [`TzRule`] also avoids
//! mutating process-wide timezone state.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};

use crate::error::FetchError;

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A fixed-offset timezone with the Australian east-coast daylight-saving
/// rule: DST from 2:00 local on the first Sunday of October through 3:00
/// local on the first Sunday of April.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TzRule {
    /// Offset from UTC outside daylight saving, in seconds.
    pub standard_offset_secs: i64,
    /// Extra offset applied while daylight saving is in effect, in seconds.
    pub dst_offset_secs: i64,
}

/// AEST (UTC+10) with the AEDT (+1h) summer shift.
pub const AEST: TzRule = TzRule {
    standard_offset_secs: 10 * 3600,
    dst_offset_secs: 3600,
};

/// Parse a bare UTC ISO-8601 timestamp (`YYYY-MM-DDThh:mm:ss`) to epoch
/// seconds. Parsing is strict: anything that does not match the full format
/// fails with [`FetchError::MalformedTimestamp`] rather than zero-filling.
pub fn utc_iso_to_epoch(iso: &str) -> Result<i64, FetchError> {
    NaiveDateTime::parse_from_str(iso, ISO_FORMAT)
        .map(|t| t.and_utc().timestamp())
        .map_err(|_| FetchError::MalformedTimestamp(iso.to_string()))
}

/// Format a UTC ISO-8601 timestamp from the feed as local 12-hour wall-clock
/// time, e.g. `04:06 PM`.
pub fn to_local_display(iso: &str, rule: &TzRule) -> Result<String, FetchError> {
    let epoch = utc_iso_to_epoch(iso)?;
    let standard = broken_down(epoch + rule.standard_offset_secs, iso)?;
    let local = if dst_active(&standard) {
        broken_down(
            epoch + rule.standard_offset_secs + rule.dst_offset_secs,
            iso,
        )?
    } else {
        standard
    };
    Ok(format_12h(local.hour(), local.minute()))
}

/// Format the current system time as a 12-hour wall-clock string. The
/// process clock is assumed to already be in the local zone (configured by
/// the time-sync collaborator at boot), so no manual DST shift is applied.
pub fn current_local_display() -> String {
    let now = chrono::Local::now();
    format_12h(now.hour(), now.minute())
}

/// Current UTC epoch seconds from the system clock.
pub fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

fn broken_down(epoch: i64, raw: &str) -> Result<NaiveDateTime, FetchError> {
    DateTime::from_timestamp(epoch, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| FetchError::MalformedTimestamp(raw.to_string()))
}

/// Whether daylight saving is in effect at the given standard-offset local
/// time. Transition Sundays are derived from the day-of-week of the 1st of
/// the month. The end instant is inclusive: at exactly 3:00:00 on the first
/// Sunday of April the clocks have not yet gone back.
fn dst_active(local: &NaiveDateTime) -> bool {
    match local.month() {
        // November through March: always summer time
        11 | 12 | 1..=3 => true,
        // May through September: always standard time
        5..=9 => false,
        // October: starts at 2:00 on the first Sunday
        10 => match local.day().cmp(&first_sunday(local)) {
            Ordering::Greater => true,
            Ordering::Equal => local.hour() >= 2,
            Ordering::Less => false,
        },
        // April: ends at 3:00 on the first Sunday
        4 => match local.day().cmp(&first_sunday(local)) {
            Ordering::Less => true,
            Ordering::Equal => {
                (local.hour(), local.minute(), local.second()) <= (3, 0, 0)
            }
            Ordering::Greater => false,
        },
        _ => false,
    }
}

/// Day-of-month of the first Sunday in the month containing `local`.
fn first_sunday(local: &NaiveDateTime) -> u32 {
    // Day-of-week of the 1st, counting Sunday as 0. Derived arithmetically
    // from the known weekday of the current day to stay infallible.
    let weekday_of_first = (local.weekday().num_days_from_sunday() as i64
        - local.day0() as i64)
        .rem_euclid(7) as u32;
    (7 - weekday_of_first) % 7 + 1
}

fn format_12h(hour: u32, minute: u32) -> String {
    let (hour, meridiem) = match hour {
        0 => (12, "AM"),
        12 => (12, "PM"),
        13..=23 => (hour - 12, "PM"),
        _ => (hour, "AM"),
    };
    format!("{hour:02}:{minute:02} {meridiem}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_parse() {
        assert_eq!(utc_iso_to_epoch("2025-10-09T04:06:00"), Ok(1759982760));
        assert_eq!(utc_iso_to_epoch("1970-01-01T00:00:00"), Ok(0));
    }

    #[test]
    fn test_epoch_parse_is_strict() {
        for bad in [
            "",
            "not-a-time",
            "2025-10-09 04:06:00",
            "2025-10-09T04:06",
            "2025-13-01T00:00:00",
            "2025-10-09T04:06:00Z",
        ] {
            assert_eq!(
                utc_iso_to_epoch(bad),
                Err(FetchError::MalformedTimestamp(bad.to_string())),
                "expected strict failure for {bad:?}"
            );
        }
    }

    #[test]
    fn test_format_12h_conversions() {
        assert_eq!(format_12h(0, 5), "12:05 AM");
        assert_eq!(format_12h(11, 59), "11:59 AM");
        assert_eq!(format_12h(12, 0), "12:00 PM");
        assert_eq!(format_12h(13, 30), "01:30 PM");
        assert_eq!(format_12h(23, 1), "11:01 PM");
    }

    #[test]
    fn test_display_applies_standard_offset() {
        // Winter: UTC+10, no DST. 04:06 UTC -> 14:06 AEST.
        assert_eq!(
            to_local_display("2025-06-09T04:06:00", &AEST).unwrap(),
            "02:06 PM"
        );
    }

    #[test]
    fn test_display_applies_dst_in_summer() {
        // January: UTC+11. 04:06 UTC -> 15:06 AEDT.
        assert_eq!(
            to_local_display("2025-01-09T04:06:00", &AEST).unwrap(),
            "03:06 PM"
        );
    }

    #[test]
    fn test_display_wraps_past_midnight() {
        // 14:00 UTC in June -> 00:00 next day AEST.
        assert_eq!(
            to_local_display("2025-06-10T14:00:00", &AEST).unwrap(),
            "12:00 AM"
        );
    }

    #[test]
    fn test_october_transition_boundary() {
        // First Sunday of October 2025 is the 5th. The instant just before
        // the 2:00 changeover is still on the +10 clock; one local day later
        // the +11 clock applies.
        assert_eq!(
            to_local_display("2025-10-04T15:59:00", &AEST).unwrap(),
            "01:59 AM"
        );
        assert_eq!(
            to_local_display("2025-10-05T16:00:00", &AEST).unwrap(),
            "03:00 AM"
        );
    }

    #[test]
    fn test_october_transition_same_day() {
        // On the transition Sunday itself: 01:59 standard stays, 02:00 jumps.
        assert_eq!(
            to_local_display("2025-10-04T15:59:59", &AEST).unwrap(),
            "01:59 AM"
        );
        assert_eq!(
            to_local_display("2025-10-04T16:00:00", &AEST).unwrap(),
            "03:00 AM"
        );
    }

    #[test]
    fn test_april_transition_is_inclusive() {
        // First Sunday of April 2026 is the 5th. At exactly 03:00:00 standard
        // the clocks have not yet gone back; one second later they have.
        assert_eq!(
            to_local_display("2026-04-04T16:59:00", &AEST).unwrap(),
            "03:59 AM"
        );
        assert_eq!(
            to_local_display("2026-04-04T17:00:00", &AEST).unwrap(),
            "04:00 AM"
        );
        assert_eq!(
            to_local_display("2026-04-04T17:00:01", &AEST).unwrap(),
            "03:00 AM"
        );
        assert_eq!(
            to_local_display("2026-04-05T17:00:00", &AEST).unwrap(),
            "03:00 AM"
        );
    }

    #[test]
    fn test_output_shape() {
        // hh:mm AM|PM, two digits each, uppercase meridiem.
        for iso in [
            "2025-01-01T00:00:00",
            "2025-04-04T12:34:56",
            "2025-07-19T23:59:59",
            "2025-10-05T16:00:00",
        ] {
            let out = to_local_display(iso, &AEST).unwrap();
            let bytes = out.as_bytes();
            assert_eq!(out.len(), 8, "unexpected shape: {out}");
            assert!(bytes[0].is_ascii_digit() && bytes[1].is_ascii_digit());
            assert_eq!(bytes[2], b':');
            assert!(bytes[3].is_ascii_digit() && bytes[4].is_ascii_digit());
            assert_eq!(bytes[5], b' ');
            assert!(out.ends_with("AM") || out.ends_with("PM"));
        }
    }

    #[test]
    fn test_first_sunday_from_weekday_of_first() {
        let parse = |s: &str| NaiveDateTime::parse_from_str(s, ISO_FORMAT).unwrap();
        // Oct 2025: the 1st is a Wednesday, first Sunday the 5th.
        assert_eq!(first_sunday(&parse("2025-10-17T00:00:00")), 5);
        // Mar 2026: the 1st is itself a Sunday.
        assert_eq!(first_sunday(&parse("2026-03-09T00:00:00")), 1);
        // Feb 2025: the 1st is a Saturday, first Sunday the 2nd.
        assert_eq!(first_sunday(&parse("2025-02-28T00:00:00")), 2);
    }
}
