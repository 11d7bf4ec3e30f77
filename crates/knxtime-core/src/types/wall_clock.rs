//! The wall-clock value type.
//!
//! A [`WallClock`] is an immutable calendar date plus time of day, tagged as
//! UTC, local standard time, or local daylight-saving time. Conversions are
//! pure functions of the value and the [`TzRule`] passed at the call site;
//! callers must always pass the process-wide active rule and must not convert
//! a value under a different rule than the one used to produce it.

use crate::civil::{self, SECS_PER_DAY};
use crate::tz::{DstVerdict, TzRule};
use core::fmt;

/// Calendar date with derived weekday (0 = Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateOnly {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub day_of_week: u8,
}

/// Which reading of the civil fields a [`WallClock`] carries. Exactly one
/// holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WallKind {
    Utc,
    LocalStandard,
    LocalDst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WallClock {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    /// 0 = Sunday. Always derived, never supplied by callers.
    pub day_of_week: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub kind: WallKind,
}

impl WallClock {
    /// Builds a value from in-range civil fields; the weekday is derived.
    pub fn new(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        kind: WallKind,
    ) -> Self {
        Self {
            year,
            month,
            day,
            day_of_week: civil::weekday_from_days(civil::days_from_civil(year as i32, month, day)),
            hour,
            minute,
            second,
            kind,
        }
    }

    /// Builds a value from possibly out-of-range parts, rolling overflow into
    /// the next larger field (an out-of-range month rolls the year, a day or
    /// time overflow rolls the date). The tag is kept verbatim.
    pub fn from_parts(
        year: i32,
        month: i32,
        day: i32,
        hour: i64,
        minute: i64,
        second: i64,
        kind: WallKind,
    ) -> Self {
        let months = year as i64 * 12 + month as i64 - 1;
        let norm_year = months.div_euclid(12) as i32;
        let norm_month = (months.rem_euclid(12) + 1) as u8;
        let secs = (civil::days_from_civil(norm_year, norm_month, 1) + day as i64 - 1)
            * SECS_PER_DAY
            + hour * 3_600
            + minute * 60
            + second;
        Self::from_civil_secs(secs, kind)
    }

    /// Value for a UTC epoch, tagged UTC.
    pub fn from_epoch_utc(epoch: i64) -> Self {
        Self::from_civil_secs(epoch, WallKind::Utc)
    }

    /// Local value for a UTC epoch; the daylight-saving sub-tag comes from
    /// the rule's verdict at that instant.
    pub fn from_epoch_local(epoch: i64, tz: &TzRule) -> Self {
        if tz.is_dst_at(epoch) {
            Self::from_civil_secs(epoch + tz.dst_offset_secs() as i64, WallKind::LocalDst)
        } else {
            Self::from_civil_secs(epoch + tz.std_offset_secs() as i64, WallKind::LocalStandard)
        }
    }

    fn from_civil_secs(secs: i64, kind: WallKind) -> Self {
        let days = secs.div_euclid(SECS_PER_DAY);
        let tod = secs.rem_euclid(SECS_PER_DAY);
        let (year, month, day) = civil::civil_from_days(days);
        Self {
            year: year as u16,
            month,
            day,
            day_of_week: civil::weekday_from_days(days),
            hour: (tod / 3_600) as u8,
            minute: (tod / 60 % 60) as u8,
            second: (tod % 60) as u8,
            kind,
        }
    }

    pub const fn is_utc(&self) -> bool {
        matches!(self.kind, WallKind::Utc)
    }

    pub const fn is_local(&self) -> bool {
        !self.is_utc()
    }

    /// Meaningful only for local values; always false for UTC.
    pub const fn is_dst(&self) -> bool {
        matches!(self.kind, WallKind::LocalDst)
    }

    pub const fn date(&self) -> DateOnly {
        DateOnly {
            year: self.year,
            month: self.month,
            day: self.day,
            day_of_week: self.day_of_week,
        }
    }

    /// The civil fields as seconds since the Unix epoch, with no zone applied.
    pub fn civil_secs(&self) -> i64 {
        civil::civil_secs(
            self.year as i32,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        )
    }

    /// Seconds since the Unix epoch. For a UTC value this is independent of
    /// the rule; for local values the tag selects the offset to remove.
    pub fn to_epoch(&self, tz: &TzRule) -> i64 {
        match self.kind {
            WallKind::Utc => self.civil_secs(),
            WallKind::LocalStandard => self.civil_secs() - tz.std_offset_secs() as i64,
            WallKind::LocalDst => self.civil_secs() - tz.dst_offset_secs() as i64,
        }
    }

    /// Converts to UTC; the identity on values already tagged UTC.
    pub fn to_utc(&self, tz: &TzRule) -> Self {
        if self.is_utc() {
            return *self;
        }
        Self::from_epoch_utc(self.to_epoch(tz))
    }

    /// Converts to local time; the identity on values already tagged local.
    pub fn to_local(&self, tz: &TzRule) -> Self {
        if self.is_local() {
            return *self;
        }
        Self::from_epoch_local(self.to_epoch(tz), tz)
    }

    /// Adds whole seconds, staying in the same UTC/local family. A local
    /// result re-derives its daylight-saving sub-tag from the new instant, so
    /// arithmetic across a transition lands on the correct side.
    pub fn add_seconds(&self, seconds: i64, tz: &TzRule) -> Self {
        let epoch = self.to_epoch(tz) + seconds;
        if self.is_utc() {
            Self::from_epoch_utc(epoch)
        } else {
            Self::from_epoch_local(epoch, tz)
        }
    }

    pub fn add_minutes(&self, minutes: i64, tz: &TzRule) -> Self {
        self.add_seconds(minutes * 60, tz)
    }

    pub fn add_hours(&self, hours: i64, tz: &TzRule) -> Self {
        self.add_seconds(hours * 3_600, tz)
    }

    pub fn add_days(&self, days: i64, tz: &TzRule) -> Self {
        self.add_seconds(days * SECS_PER_DAY, tz)
    }

    /// Adds calendar months. Day overflow clamps to the last valid day of the
    /// target month (Jan 31 + 1 month is Feb 28 or 29). A local result
    /// re-derives its daylight-saving sub-tag from the rule's verdict; an
    /// ambiguous target instant keeps the current sub-tag.
    pub fn add_months(&self, months: i32, tz: &TzRule) -> Self {
        let total = self.year as i64 * 12 + self.month as i64 - 1 + months as i64;
        let year = total.div_euclid(12) as i32;
        let month = (total.rem_euclid(12) + 1) as u8;
        let day = self.day.min(civil::days_in_month(year, month));
        let mut out = Self::new(
            year as u16,
            month,
            day,
            self.hour,
            self.minute,
            self.second,
            self.kind,
        );
        if out.is_local() {
            out.kind = match tz.verdict_at(out.civil_secs()) {
                DstVerdict::Standard => WallKind::LocalStandard,
                DstVerdict::Dst => WallKind::LocalDst,
                DstVerdict::Ambiguous => self.kind,
            };
        }
        out
    }

    pub const fn day_of_week_name(&self) -> &'static str {
        weekday_name(self.day_of_week)
    }
}

pub const fn weekday_name(day_of_week: u8) -> &'static str {
    match day_of_week {
        0 => "Sunday",
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        6 => "Saturday",
        _ => "Unknown",
    }
}

impl fmt::Display for WallClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            WallKind::Utc => "UTC",
            WallKind::LocalStandard => "ST",
            WallKind::LocalDst => "DST",
        };
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02} ({})",
            self.year, self.month, self.day, self.hour, self.minute, self.second, tag
        )
    }
}
