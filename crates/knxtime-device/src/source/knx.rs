//! Time acquisition from KNX group telegrams.
//!
//! KNX installations publish date, time-of-day, and the daylight-saving flag
//! as independent group objects with no transactional guarantee; any of the
//! three may arrive late or never. [`KnxTimeSource`] accumulates the
//! fragments of one assembly cycle in a buffer, infers what it safely can
//! across channels, and escalates through bounded timers until the buffer can
//! be committed as one atomic timestamp.

use crate::bus::{GroupChannel, Telegram};
use crate::config::{DstAuthority, KnxSourceConfig};
use crate::manager::{BrokenTime, SourceContext};
use knxtime_core::civil;
use knxtime_core::dpt::{decode_switch, DptDate, DptDateTime, DptTimeOfDay, StatusFlags};
use knxtime_core::encoding::Reader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitState {
    Idle,
    /// Waiting a short grace period after start before requesting reads.
    InitialRead,
    /// Requesting missing fragments from the bus, repeatedly.
    InitialReadRepeat,
    /// A partial set arrived while a valid time exists; waiting briefly for
    /// the rest before force-completing from the seeded values.
    AwaitingFragments,
}

pub struct KnxTimeSource {
    cfg: KnxSourceConfig,
    state: WaitState,
    timer_start_ms: Option<u64>,
    stamp: BrokenTime,
    has_date: bool,
    has_time: bool,
    has_dst_flag: bool,
    /// Tick at which the pending time value was captured.
    received_at_ms: u64,
}

impl KnxTimeSource {
    pub fn new(cfg: KnxSourceConfig) -> Self {
        Self {
            cfg,
            state: WaitState::Idle,
            timer_start_ms: None,
            stamp: BrokenTime::default(),
            has_date: false,
            has_time: false,
            has_dst_flag: false,
            received_at_ms: 0,
        }
    }

    fn elapsed(&self, now_ms: u64, wait_ms: u64) -> bool {
        self.timer_start_ms
            .is_some_and(|start| now_ms.saturating_sub(start) >= wait_ms)
    }

    /// On the first fragment of a cycle, pre-fills the buffer from the
    /// current time so a later force-completion has values for every missing
    /// fragment.
    fn seed_from_current(&mut self, ctx: &mut SourceContext<'_>) {
        if ctx.is_valid() && !self.has_date && !self.has_time && !self.has_dst_flag {
            let now = ctx.local_time();
            self.stamp = BrokenTime {
                year: now.year,
                month: now.month,
                day: now.day,
                hour: now.hour,
                minute: now.minute,
                second: now.second as i32,
                is_dst: now.is_dst(),
            };
            self.received_at_ms = ctx.now_ms();
        }
    }

    fn on_combined(&mut self, payload: &[u8], ctx: &mut SourceContext<'_>) {
        let frame = match DptDateTime::decode(&mut Reader::new(payload)) {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("dropping malformed date/time telegram: {err}");
                return;
            }
        };
        if frame.flags.is_unusable() {
            log::warn!("dropping faulted date/time telegram");
            return;
        }
        self.seed_from_current(ctx);
        self.received_at_ms = ctx.now_ms();
        self.stamp.year = frame.year;
        self.stamp.month = frame.month;
        self.stamp.day = frame.day;
        self.has_date = true;
        self.stamp.hour = frame.hour;
        self.stamp.minute = frame.minute;
        self.stamp.second = frame.second as i32;
        self.has_time = true;
        if self.cfg.dst_authority == DstAuthority::CombinedMessage {
            self.stamp.is_dst = frame.flags.contains(StatusFlags::SUMMERTIME);
            self.has_dst_flag = true;
        }
        self.check_complete(ctx);
    }

    fn on_time_of_day(&mut self, payload: &[u8], ctx: &mut SourceContext<'_>) {
        let tod = match DptTimeOfDay::decode(&mut Reader::new(payload)) {
            Ok(tod) => tod,
            Err(err) => {
                log::warn!("dropping malformed time telegram: {err}");
                return;
            }
        };
        self.seed_from_current(ctx);
        self.received_at_ms = ctx.now_ms();
        self.stamp.hour = tod.hour;
        self.stamp.minute = tod.minute;
        self.stamp.second = tod.second as i32;
        self.has_time = true;
        if ctx.is_valid() && !self.has_date {
            // Backfill the date from the current one. Around midnight the new
            // time may belong to the neighbouring day.
            let now = ctx.local_time();
            let tolerance = self.cfg.midnight_tolerance_min;
            let mut date = (now.year, now.month, now.day);
            if tod.hour == 0
                && tod.minute <= tolerance
                && now.hour == 23
                && now.minute >= 60 - tolerance
            {
                date = shift_date(date, 1);
            } else if tod.hour == 23
                && tod.minute >= 60 - tolerance
                && now.hour == 0
                && now.minute <= tolerance
            {
                date = shift_date(date, -1);
            }
            (self.stamp.year, self.stamp.month, self.stamp.day) = date;
            self.has_date = true;
        }
        self.check_complete(ctx);
    }

    fn on_date(&mut self, payload: &[u8], ctx: &mut SourceContext<'_>) {
        let date = match DptDate::decode(&mut Reader::new(payload)) {
            Ok(date) => date,
            Err(err) => {
                log::warn!("dropping malformed date telegram: {err}");
                return;
            }
        };
        self.seed_from_current(ctx);
        self.stamp.year = date.year;
        self.stamp.month = date.month;
        self.stamp.day = date.day;
        self.has_date = true;
        if ctx.is_valid() && !self.has_time {
            let now = ctx.local_time();
            let candidate = (date.year, date.month, date.day);
            let today = (now.year, now.month, now.day);
            let tolerance = self.cfg.midnight_tolerance_min;
            if candidate == today {
                // Same day; keep waiting for the time telegram.
            } else if candidate == shift_date(today, 1)
                && now.hour == 23
                && now.minute >= 60 - tolerance
            {
                // The next day has just started at the sender.
                self.stamp.hour = 0;
                self.stamp.minute = 0;
                self.stamp.second = 0;
                self.received_at_ms = ctx.now_ms();
                self.has_time = true;
            } else if candidate == shift_date(today, -1)
                && now.hour == 0
                && now.minute <= tolerance
            {
                // The sender is still on the previous day.
                self.stamp.hour = 23;
                self.stamp.minute = 59;
                self.stamp.second = 59;
                self.received_at_ms = ctx.now_ms();
                self.has_time = true;
            }
        }
        self.check_complete(ctx);
    }

    fn on_dst_switch(&mut self, payload: &[u8], ctx: &mut SourceContext<'_>) {
        let dst = match decode_switch(&mut Reader::new(payload)) {
            Ok(dst) => dst,
            Err(err) => {
                log::warn!("dropping malformed daylight-saving telegram: {err}");
                return;
            }
        };
        self.seed_from_current(ctx);
        if dst != self.stamp.is_dst {
            self.stamp.is_dst = dst;
            if !self.has_time && ctx.is_valid() {
                // The seeded time was captured under the previous flag; shift
                // it so the instant stays put under the new one.
                let saving = ctx.dst_offset_secs();
                if dst {
                    self.stamp.second += saving;
                } else {
                    self.stamp.second -= saving;
                }
            }
        }
        self.has_dst_flag = true;
        self.check_complete(ctx);
    }

    fn check_complete(&mut self, ctx: &mut SourceContext<'_>) {
        if self.cfg.dst_authority == DstAuthority::Computed && self.has_date && self.has_time {
            let mut stamp = self.stamp;
            ctx.resolve_dst_flag(&mut stamp);
            self.stamp = stamp;
            self.has_dst_flag = true;
        }
        if self.has_date && self.has_time && self.has_dst_flag {
            self.state = WaitState::Idle;
            self.timer_start_ms = None;
            ctx.commit_local_time(&self.stamp, self.received_at_ms);
            self.has_date = false;
            self.has_time = false;
            self.has_dst_flag = false;
        } else if ctx.is_valid() && self.state == WaitState::Idle {
            self.timer_start_ms = Some(ctx.now_ms());
            self.state = WaitState::AwaitingFragments;
        }
    }

    fn request_missing(&mut self, ctx: &mut SourceContext<'_>) {
        if !self.has_time {
            let channel = if self.cfg.combined_date_time {
                GroupChannel::DateTime
            } else {
                GroupChannel::Time
            };
            ctx.request_read(channel);
        }
        if !self.cfg.combined_date_time && !self.has_date {
            ctx.request_read(GroupChannel::Date);
        }
        if self.cfg.dst_authority == DstAuthority::SwitchChannel && !self.has_dst_flag {
            ctx.request_read(GroupChannel::DstSwitch);
        }
    }
}

fn shift_date((year, month, day): (u16, u8, u8), delta: i64) -> (u16, u8, u8) {
    let days = civil::days_from_civil(year as i32, month, day) + delta;
    let (year, month, day) = civil::civil_from_days(days);
    (year as u16, month, day)
}

impl super::TimeSource for KnxTimeSource {
    fn setup(&mut self, ctx: &mut SourceContext<'_>) {
        if !(self.has_date && self.has_time && self.has_dst_flag) && self.cfg.read_on_start {
            self.state = WaitState::InitialRead;
            self.timer_start_ms = Some(ctx.now_ms());
        }
    }

    fn tick(&mut self, ctx: &mut SourceContext<'_>) {
        match self.state {
            WaitState::Idle => {}
            WaitState::InitialRead | WaitState::InitialReadRepeat => {
                let wait_ms = if self.state == WaitState::InitialRead {
                    self.cfg.initial_read_ms
                } else {
                    self.cfg.repeat_read_ms
                };
                if self.elapsed(ctx.now_ms(), wait_ms) {
                    self.state = WaitState::InitialReadRepeat;
                    if self.has_date && self.has_time {
                        // Nobody answers for the daylight-saving flag; assume
                        // standard time and finish.
                        self.stamp.is_dst = false;
                        self.has_dst_flag = true;
                        self.check_complete(ctx);
                        return;
                    }
                    self.timer_start_ms = Some(ctx.now_ms());
                    self.request_missing(ctx);
                }
            }
            WaitState::AwaitingFragments => {
                if self.elapsed(ctx.now_ms(), self.cfg.partial_wait_ms) {
                    log::debug!("fragment wait elapsed; completing from held time");
                    self.state = WaitState::Idle;
                    self.has_date = true;
                    self.has_time = true;
                    self.has_dst_flag = true;
                    self.check_complete(ctx);
                }
            }
        }
    }

    fn on_telegram(&mut self, telegram: &Telegram, ctx: &mut SourceContext<'_>) {
        match telegram.channel {
            GroupChannel::DateTime if self.cfg.combined_date_time => {
                self.on_combined(&telegram.payload, ctx)
            }
            GroupChannel::Time if !self.cfg.combined_date_time => {
                self.on_time_of_day(&telegram.payload, ctx)
            }
            GroupChannel::Date if !self.cfg.combined_date_time => {
                self.on_date(&telegram.payload, ctx)
            }
            GroupChannel::DstSwitch if self.cfg.dst_authority == DstAuthority::SwitchChannel => {
                self.on_dst_switch(&telegram.payload, ctx)
            }
            _ => {}
        }
    }

    fn supports_dst_switchover(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        "KNX".to_string()
    }

    fn status_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let prefix = match self.state {
            WaitState::Idle => return lines,
            WaitState::InitialRead | WaitState::InitialReadRepeat => "initial",
            WaitState::AwaitingFragments => "missing",
        };
        if !self.has_date {
            let what = if self.cfg.combined_date_time {
                "date/time"
            } else {
                "date"
            };
            lines.push(format!("Waiting for {prefix} {what} telegram"));
        }
        if !self.has_time {
            lines.push(format!("Waiting for {prefix} time telegram"));
        }
        if !self.has_dst_flag && self.cfg.dst_authority == DstAuthority::SwitchChannel {
            lines.push(format!("Waiting for {prefix} daylight-saving telegram"));
        }
        lines
    }
}
