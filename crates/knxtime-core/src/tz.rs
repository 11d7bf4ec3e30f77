//! POSIX timezone-rule parsing and daylight-saving evaluation.
//!
//! The active timezone of a device is a single POSIX rule string of the form
//! `STD offset [DST [offset] [,start[/time],end[/time]]]` (e.g.
//! `CET-1CEST,M3.5.0/2:00:00,M10.5.0/3:00:00`). [`TzRule`] is the parsed
//! form; every date/time conversion takes the rule explicitly so the
//! dependency on the process-wide zone is visible at the call site.
//!
//! Two synthesized sentinel transition ranges degenerate to rules without
//! transitions: a start day of `0` (zero-based) paired with an end day that
//! can never occur (`>= 366`) yields permanent daylight-saving time, and a
//! start day that can never occur yields permanent standard time. Degenerate
//! rules never report an ambiguous instant.

use crate::civil::{self, SECS_PER_DAY};
use crate::error::TzError;
use core::fmt;

/// Daylight-saving verdict for a local wall-clock instant.
///
/// `Ambiguous` marks instants inside the non-monotonic interval around a
/// transition: the skipped hour of spring-forward and the doubled hour of
/// fall-back. It is a first-class result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DstVerdict {
    Standard,
    Dst,
    Ambiguous,
}

/// Zone abbreviation, stored inline (POSIX names are short).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ZoneName {
    buf: [u8; 15],
    len: u8,
}

impl ZoneName {
    fn from_str(name: &str) -> Result<Self, TzError> {
        if name.len() < 3 || name.len() > 15 {
            return Err(TzError::InvalidName);
        }
        let mut buf = [0u8; 15];
        buf[..name.len()].copy_from_slice(name.as_bytes());
        Ok(Self {
            buf,
            len: name.len() as u8,
        })
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len as usize]).unwrap_or("")
    }
}

impl fmt::Debug for ZoneName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ZoneName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Day designator of a transition rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayRule {
    /// `Jn`: julian day 1..=365, never counting February 29.
    Julian(u16),
    /// `n`: zero-based day 0..=367, counting February 29. Days past the end
    /// of the year never occur.
    ZeroBased(u16),
    /// `Mm.w.d`: weekday `d` (0 = Sunday) of week `w` (5 = last) in month `m`.
    MonthWeekDay { month: u8, week: u8, weekday: u8 },
}

/// One transition point: a day rule plus a local time-of-day in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub day: DayRule,
    pub time_secs: i32,
}

/// When daylight-saving time is in effect over the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DstSpan {
    /// Sentinel `0,366`: permanently in daylight-saving time.
    Always,
    /// Sentinel `366,367`: permanently in standard time.
    Never,
    /// Ordinary pair of yearly transitions. `start` is expressed in local
    /// standard time, `end` in local daylight-saving time.
    Between { start: Transition, end: Transition },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DstRule {
    pub name: ZoneName,
    /// Seconds east of UTC while daylight-saving time is in effect.
    pub offset_secs: i32,
    pub span: DstSpan,
}

/// A parsed POSIX timezone rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TzRule {
    std_name: ZoneName,
    std_offset_secs: i32,
    dst: Option<DstRule>,
}

impl TzRule {
    pub fn parse(input: &str) -> Result<Self, TzError> {
        let mut cur = Cursor::new(input);
        let std_name = cur.name()?;
        let std_offset_secs = -cur.offset(true)?;
        if cur.is_end() {
            return Ok(Self {
                std_name,
                std_offset_secs,
                dst: None,
            });
        }

        let dst_name = cur.name()?;
        let dst_offset_secs = if cur.starts_offset() {
            -cur.offset(true)?
        } else {
            std_offset_secs + 3_600
        };
        if !cur.eat(b',') {
            return Err(TzError::MissingDstRules);
        }
        let start = cur.transition()?;
        if !cur.eat(b',') {
            return Err(TzError::InvalidTransition);
        }
        let end = cur.transition()?;
        if !cur.is_end() {
            return Err(TzError::TrailingInput);
        }

        let span = match (start.day, end.day) {
            (DayRule::ZeroBased(s), _) if s >= 366 => DstSpan::Never,
            (DayRule::ZeroBased(0), DayRule::ZeroBased(e)) if e >= 366 => DstSpan::Always,
            _ => DstSpan::Between { start, end },
        };
        Ok(Self {
            std_name,
            std_offset_secs,
            dst: Some(DstRule {
                name: dst_name,
                offset_secs: dst_offset_secs,
                span,
            }),
        })
    }

    pub fn std_name(&self) -> &str {
        self.std_name.as_str()
    }

    /// Seconds east of UTC in standard time.
    pub const fn std_offset_secs(&self) -> i32 {
        self.std_offset_secs
    }

    /// Seconds east of UTC in daylight-saving time; the standard offset when
    /// the zone has no daylight-saving part.
    pub const fn dst_offset_secs(&self) -> i32 {
        match &self.dst {
            Some(dst) => dst.offset_secs,
            None => self.std_offset_secs,
        }
    }

    /// Difference between daylight-saving and standard time, in seconds.
    /// Zero for zones without a daylight-saving part.
    pub const fn dst_saving_secs(&self) -> i32 {
        self.dst_offset_secs() - self.std_offset_secs
    }

    pub const fn has_dst(&self) -> bool {
        self.dst.is_some()
    }

    /// Whether daylight-saving time is in effect at a UTC instant.
    pub fn is_dst_at(&self, epoch: i64) -> bool {
        let Some(dst) = &self.dst else {
            return false;
        };
        match dst.span {
            DstSpan::Always => true,
            DstSpan::Never => false,
            DstSpan::Between { start, end } => {
                // Transitions are anchored in the year of the local standard
                // reading of the instant.
                let local_days = (epoch + self.std_offset_secs as i64).div_euclid(SECS_PER_DAY);
                let (year, _, _) = civil::civil_from_days(local_days);
                let Some(s) = transition_epoch(&start, year, self.std_offset_secs) else {
                    return false;
                };
                let Some(e) = transition_epoch(&end, year, dst.offset_secs) else {
                    return true;
                };
                if s <= e {
                    epoch >= s && epoch < e
                } else {
                    // Southern hemisphere: daylight saving spans new year.
                    epoch < e || epoch >= s
                }
            }
        }
    }

    /// UTC offset in seconds east at a UTC instant.
    pub fn offset_at(&self, epoch: i64) -> i32 {
        if self.is_dst_at(epoch) {
            self.dst_offset_secs()
        } else {
            self.std_offset_secs
        }
    }

    /// Daylight-saving verdict for a local wall-clock instant, given as civil
    /// seconds with no zone applied.
    ///
    /// The instant is interpreted once as daylight-saving time and once as
    /// standard time; if the rule agrees with exactly one reading the verdict
    /// is that reading, otherwise the instant lies inside the skipped or
    /// doubled hour of a transition and is [`DstVerdict::Ambiguous`].
    pub fn verdict_at(&self, local_secs: i64) -> DstVerdict {
        let as_dst = self.is_dst_at(local_secs - self.dst_offset_secs() as i64);
        let as_std = self.is_dst_at(local_secs - self.std_offset_secs as i64);
        match (as_dst, as_std) {
            (true, true) => DstVerdict::Dst,
            (false, false) => DstVerdict::Standard,
            _ => DstVerdict::Ambiguous,
        }
    }
}

/// UTC instant of a transition in `year`, or `None` if its day rule never
/// occurs that year. `offset_east` is the zone offset the transition's local
/// time is expressed in.
fn transition_epoch(t: &Transition, year: i32, offset_east: i32) -> Option<i64> {
    let day_index = match t.day {
        DayRule::Julian(n) => {
            let mut index = n as i64 - 1;
            if civil::is_leap_year(year) && n > 59 {
                index += 1;
            }
            index
        }
        DayRule::ZeroBased(n) => {
            if n >= civil::days_in_year(year) {
                return None;
            }
            n as i64
        }
        DayRule::MonthWeekDay {
            month,
            week,
            weekday,
        } => {
            let first = civil::days_from_civil(year, month, 1);
            let first_weekday = civil::weekday_from_days(first);
            let mut day_of_month =
                1 + (7 + weekday as i64 - first_weekday as i64) % 7 + (week as i64 - 1) * 7;
            let month_len = civil::days_in_month(year, month) as i64;
            while day_of_month > month_len {
                day_of_month -= 7;
            }
            first - civil::days_from_civil(year, 1, 1) + day_of_month - 1
        }
    };
    let year_start = civil::days_from_civil(year, 1, 1);
    Some((year_start + day_index) * SECS_PER_DAY + t.time_secs as i64 - offset_east as i64)
}

/// Byte cursor over a timezone string.
struct Cursor<'a> {
    s: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            s: s.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.s.get(self.pos).copied()
    }

    fn is_end(&self) -> bool {
        self.pos >= self.s.len()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn starts_offset(&self) -> bool {
        matches!(self.peek(), Some(b'0'..=b'9' | b'+' | b'-'))
    }

    fn name(&mut self) -> Result<ZoneName, TzError> {
        if self.eat(b'<') {
            let start = self.pos;
            while let Some(b) = self.peek() {
                if b == b'>' {
                    let name = core::str::from_utf8(&self.s[start..self.pos])
                        .map_err(|_| TzError::InvalidName)?;
                    self.pos += 1;
                    return ZoneName::from_str(name);
                }
                self.pos += 1;
            }
            return Err(TzError::UnexpectedEnd);
        }
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        let name =
            core::str::from_utf8(&self.s[start..self.pos]).map_err(|_| TzError::InvalidName)?;
        ZoneName::from_str(name)
    }

    fn number(&mut self, max_digits: usize) -> Result<i32, TzError> {
        let start = self.pos;
        let mut value: i32 = 0;
        while let Some(b @ b'0'..=b'9') = self.peek() {
            if self.pos - start >= max_digits {
                return Err(TzError::InvalidOffset);
            }
            value = value * 10 + (b - b'0') as i32;
            self.pos += 1;
        }
        if self.pos == start {
            return Err(TzError::InvalidOffset);
        }
        Ok(value)
    }

    /// `[+|-]hh[:mm[:ss]]` as signed seconds (POSIX convention: positive is
    /// west of UTC).
    fn offset(&mut self, allow_sign: bool) -> Result<i32, TzError> {
        let negative = if allow_sign {
            if self.eat(b'-') {
                true
            } else {
                self.eat(b'+');
                false
            }
        } else {
            false
        };
        let hours = self.number(3)?;
        if hours > 167 {
            return Err(TzError::InvalidOffset);
        }
        let mut secs = hours * 3_600;
        if self.eat(b':') {
            let minutes = self.number(2)?;
            if minutes > 59 {
                return Err(TzError::InvalidOffset);
            }
            secs += minutes * 60;
            if self.eat(b':') {
                let seconds = self.number(2)?;
                if seconds > 59 {
                    return Err(TzError::InvalidOffset);
                }
                secs += seconds;
            }
        }
        Ok(if negative { -secs } else { secs })
    }

    fn transition(&mut self) -> Result<Transition, TzError> {
        let day = if self.eat(b'J') {
            let n = self.number(3).map_err(|_| TzError::InvalidTransition)?;
            if !(1..=365).contains(&n) {
                return Err(TzError::InvalidTransition);
            }
            DayRule::Julian(n as u16)
        } else if self.eat(b'M') {
            let month = self.number(2).map_err(|_| TzError::InvalidTransition)?;
            if !self.eat(b'.') {
                return Err(TzError::InvalidTransition);
            }
            let week = self.number(1).map_err(|_| TzError::InvalidTransition)?;
            if !self.eat(b'.') {
                return Err(TzError::InvalidTransition);
            }
            let weekday = self.number(1).map_err(|_| TzError::InvalidTransition)?;
            if !(1..=12).contains(&month) || !(1..=5).contains(&week) || weekday > 6 {
                return Err(TzError::InvalidTransition);
            }
            DayRule::MonthWeekDay {
                month: month as u8,
                week: week as u8,
                weekday: weekday as u8,
            }
        } else {
            let n = self.number(3).map_err(|_| TzError::InvalidTransition)?;
            if n > 367 {
                return Err(TzError::InvalidTransition);
            }
            DayRule::ZeroBased(n as u16)
        };
        let time_secs = if self.eat(b'/') {
            self.offset(false).map_err(|_| TzError::InvalidTransition)?
        } else {
            7_200
        };
        Ok(Transition { day, time_secs })
    }
}
