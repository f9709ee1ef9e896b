//! Reference time zone and time-unit normalization
//!
//! Timestamps are epoch milliseconds. Half-day rounding and human-readable
//! formatting both happen in one fixed reference zone (a UTC offset), so the
//! result never depends on the machine the analysis runs on.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

const MILLIS_PER_MINUTE: i64 = 60_000;
const MILLIS_PER_HOUR: i64 = 3_600_000;
const MILLIS_PER_DAY: i64 = 86_400_000;

/// Fixed-offset zone used for rounding and formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceZone {
    offset: FixedOffset,
}

impl ReferenceZone {
    /// Offset east of UTC in minutes; `None` outside +/- 24h
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(|offset| Self { offset })
    }

    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn offset_millis(&self) -> i64 {
        i64::from(self.offset.local_minus_utc()) * 1000
    }

    /// Snap a timestamp to 11:59:00.000 (local hour < 12) or 23:59:00.000
    /// of the same local calendar day.
    pub fn round_half_day(&self, millis: i64) -> i64 {
        let local = millis.saturating_add(self.offset_millis());
        let into_day = local.rem_euclid(MILLIS_PER_DAY);
        let day_start = local.saturating_sub(into_day);
        let hour = into_day / MILLIS_PER_HOUR;
        let snap_hour = if hour < 12 { 11 } else { 23 };
        let snapped = day_start.saturating_add(snap_hour * MILLIS_PER_HOUR + 59 * MILLIS_PER_MINUTE);
        snapped.saturating_sub(self.offset_millis())
    }

    /// `MM-dd-yy HH:mm` in the reference zone
    pub fn format(&self, millis: i64) -> String {
        match DateTime::from_timestamp_millis(millis) {
            Some(utc) => utc
                .with_timezone(&self.offset)
                .format("%m-%d-%y %H:%M")
                .to_string(),
            None => millis.to_string(),
        }
    }
}

impl Default for ReferenceZone {
    /// GMT+1, the zone the reference event logs were recorded in
    fn default() -> Self {
        Self::from_offset_minutes(60).unwrap_or_else(Self::utc)
    }
}

/// Unit that durations and gaps are reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Hours,
    Minutes,
    Seconds,
    Millis,
}

impl TimeUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Hours => "hours",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Seconds => "seconds",
            TimeUnit::Millis => "millis",
        }
    }

    pub fn millis_per_unit(self) -> i64 {
        match self {
            TimeUnit::Hours => MILLIS_PER_HOUR,
            TimeUnit::Minutes => MILLIS_PER_MINUTE,
            TimeUnit::Seconds => 1_000,
            TimeUnit::Millis => 1,
        }
    }

    /// Convert a millisecond quantity into this unit
    pub fn normalize(self, millis: i64) -> f64 {
        millis as f64 / self.millis_per_unit() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = MILLIS_PER_HOUR;

    #[test]
    fn test_round_morning_in_utc() {
        let zone = ReferenceZone::utc();
        // 1970-01-02 10:00 UTC
        let t = MILLIS_PER_DAY + 10 * HOUR;
        assert_eq!(
            zone.round_half_day(t),
            MILLIS_PER_DAY + 11 * HOUR + 59 * MILLIS_PER_MINUTE
        );
    }

    #[test]
    fn test_round_afternoon_in_utc() {
        let zone = ReferenceZone::utc();
        let t = MILLIS_PER_DAY + 13 * HOUR;
        assert_eq!(
            zone.round_half_day(t),
            MILLIS_PER_DAY + 23 * HOUR + 59 * MILLIS_PER_MINUTE
        );
    }

    #[test]
    fn test_noon_belongs_to_second_half() {
        let zone = ReferenceZone::utc();
        let noon = MILLIS_PER_DAY + 12 * HOUR;
        let before = noon - 1;
        assert_ne!(zone.round_half_day(noon), zone.round_half_day(before));
    }

    #[test]
    fn test_round_respects_offset() {
        // 10:30 UTC is 11:30 at GMT+1 (morning), 12:30 at GMT+2 (afternoon)
        let t = MILLIS_PER_DAY + 10 * HOUR + 30 * MILLIS_PER_MINUTE;
        let gmt1 = ReferenceZone::from_offset_minutes(60).unwrap();
        let gmt2 = ReferenceZone::from_offset_minutes(120).unwrap();
        assert_eq!(
            gmt1.round_half_day(t),
            MILLIS_PER_DAY + 10 * HOUR + 59 * MILLIS_PER_MINUTE
        );
        assert_eq!(
            gmt2.round_half_day(t),
            MILLIS_PER_DAY + 21 * HOUR + 59 * MILLIS_PER_MINUTE
        );
    }

    #[test]
    fn test_round_negative_timestamps() {
        let zone = ReferenceZone::utc();
        // 1969-12-31 03:00 UTC
        let t = -21 * HOUR;
        assert_eq!(
            zone.round_half_day(t),
            -MILLIS_PER_DAY + 11 * HOUR + 59 * MILLIS_PER_MINUTE
        );
    }

    #[test]
    fn test_round_extreme_timestamps_do_not_overflow() {
        let zone = ReferenceZone::default();
        zone.round_half_day(i64::MIN);
        zone.round_half_day(i64::MAX);
    }

    #[test]
    fn test_round_is_idempotent() {
        let zone = ReferenceZone::default();
        let t = 1_500_000_000_000;
        let once = zone.round_half_day(t);
        assert_eq!(zone.round_half_day(once), once);
    }

    #[test]
    fn test_format_default_zone() {
        // 2017-01-01 00:00 UTC is 01:00 at GMT+1
        let zone = ReferenceZone::default();
        assert_eq!(zone.format(1_483_228_800_000), "01-01-17 01:00");
    }

    #[test]
    fn test_invalid_offset_rejected() {
        assert!(ReferenceZone::from_offset_minutes(24 * 60).is_none());
        assert!(ReferenceZone::from_offset_minutes(-90).is_some());
    }

    #[test]
    fn test_time_unit_normalize() {
        assert_eq!(TimeUnit::Hours.normalize(5_400_000), 1.5);
        assert_eq!(TimeUnit::Minutes.normalize(90_000), 1.5);
        assert_eq!(TimeUnit::Seconds.normalize(1_500), 1.5);
        assert_eq!(TimeUnit::Millis.normalize(3), 3.0);
        assert_eq!(TimeUnit::default(), TimeUnit::Hours);
    }
}
