//! The time manager: sole authority over the device clock.
//!
//! Owns the clock, the optional time source, the daylight-saving policy, and
//! the process-wide timezone rule. All conversions everywhere take the active
//! rule from here; a caller must never cache a conversion result across a
//! policy change.

use crate::bus::{GroupBus, GroupChannel, Telegram};
use crate::clock::Clock;
use crate::config::{DstPolicy, TimeConfig};
use crate::error::TimeError;
use crate::source::TimeSource;
use knxtime_core::civil;
use knxtime_core::dpt::{
    encode_switch, knx_weekday, DptDate, DptDateTime, DptTimeOfDay, StatusFlags,
};
use knxtime_core::encoding::Writer;
use knxtime_core::tz::DstVerdict;
use knxtime_core::{TzRule, WallClock};

/// Clock readings at or below this epoch (2024-01-01 01:00:00 UTC) are
/// power-on defaults, never a committed time.
const MIN_TRUSTED_EPOCH: i64 = 1_704_070_800;

/// A broken-down local or UTC timestamp as assembled by a time source.
///
/// The seconds field is signed and may be temporarily out of range while a
/// source corrects an earlier assumption; it is normalized when the value is
/// committed or evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokenTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: i32,
    pub is_dst: bool,
}

impl BrokenTime {
    /// The fields as seconds since the Unix epoch, with no zone applied.
    pub fn civil_secs(&self) -> i64 {
        civil::civil_secs(self.year as i32, self.month, self.day, self.hour, self.minute, 0)
            + self.second as i64
    }
}

pub struct TimeManager {
    clock: Box<dyn Clock>,
    source: Option<Box<dyn TimeSource>>,
    config: TimeConfig,
    configured: bool,
    policy: DstPolicy,
    active_string: String,
    active_rule: TzRule,
    dst_offset_secs: i32,
    source_supports_dst_switch: bool,
    last_publish: Option<(u8, u8, u8)>,
}

impl TimeManager {
    pub fn new(clock: Box<dyn Clock>, config: TimeConfig) -> Result<Self, TimeError> {
        let active_string = build_timezone_string(config.base_rule(), DstPolicy::Calculated);
        let active_rule = TzRule::parse(&active_string)?;
        Ok(Self {
            clock,
            source: None,
            configured: false,
            policy: DstPolicy::Calculated,
            dst_offset_secs: active_rule.dst_saving_secs(),
            active_string,
            active_rule,
            config,
            source_supports_dst_switch: false,
            last_publish: None,
        })
    }

    /// Called once the device configuration state is known. Only a configured
    /// device applies its configured policy and starts its source.
    pub fn setup(
        &mut self,
        configured: bool,
        bus: &mut dyn GroupBus,
        now_ms: u64,
    ) -> Result<(), TimeError> {
        self.configured = configured;
        self.clock.setup();
        self.apply_policy(DstPolicy::Calculated)?;
        self.dst_offset_secs = self.active_rule.dst_saving_secs();
        if configured {
            self.apply_policy(self.config.dst_policy)?;
            self.run_source(bus, now_ms, |source, ctx| source.setup(ctx));
        }
        Ok(())
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Installs a time source, dropping the previous one together with its
    /// in-flight assembly state. On a configured device the new source is
    /// started immediately; otherwise its `setup` runs when [`Self::setup`]
    /// does.
    pub fn set_source(
        &mut self,
        source: Option<Box<dyn TimeSource>>,
        bus: &mut dyn GroupBus,
        now_ms: u64,
    ) {
        self.source = None;
        self.source_supports_dst_switch = source
            .as_ref()
            .is_some_and(|source| source.supports_dst_switchover());
        self.source = source;
        if self.configured {
            self.run_source(bus, now_ms, |source, ctx| source.setup(ctx));
        }
    }

    /// True once any commit has occurred.
    pub fn is_valid(&self, now_ms: u64) -> bool {
        self.clock.get_time(now_ms) > MIN_TRUSTED_EPOCH
    }

    pub fn local_time(&self, now_ms: u64) -> WallClock {
        WallClock::from_epoch_local(self.clock.get_time(now_ms), &self.active_rule)
    }

    pub fn utc_time(&self, now_ms: u64) -> WallClock {
        WallClock::from_epoch_utc(self.clock.get_time(now_ms))
    }

    pub const fn policy(&self) -> DstPolicy {
        self.policy
    }

    /// The rule every conversion must be evaluated under until the next
    /// policy change.
    pub const fn active_rule(&self) -> &TzRule {
        &self.active_rule
    }

    /// Offset between standard and daylight-saving time in seconds. This is
    /// not the offset to UTC.
    pub const fn dst_offset_secs(&self) -> i32 {
        self.dst_offset_secs
    }

    /// Rebuilds the active timezone rule for `policy` and installs it for all
    /// subsequent conversions.
    pub fn set_policy(&mut self, policy: DstPolicy) -> Result<(), TimeError> {
        self.apply_policy(policy)
    }

    pub fn force_dst(&mut self) -> Result<(), TimeError> {
        self.apply_policy(DstPolicy::AlwaysDst)
    }

    pub fn force_standard_time(&mut self) -> Result<(), TimeError> {
        self.apply_policy(DstPolicy::AlwaysStandard)
    }

    pub fn use_calculated_dst(&mut self) -> Result<(), TimeError> {
        self.apply_policy(DstPolicy::Calculated)
    }

    fn apply_policy(&mut self, policy: DstPolicy) -> Result<(), TimeError> {
        let active_string = build_timezone_string(self.config.base_rule(), policy);
        self.active_rule = TzRule::parse(&active_string)?;
        self.active_string = active_string;
        self.policy = policy;
        log::debug!("timezone rule {} for {:?}", self.active_string, policy);
        Ok(())
    }

    /// Daylight-saving verdict of the active rule for a local wall-clock
    /// instant.
    pub fn daylight_saving_at(
        &self,
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
    ) -> DstVerdict {
        self.active_rule
            .verdict_at(civil::civil_secs(year as i32, month, day, hour, minute, 0))
    }

    /// Sets the daylight-saving flag on a candidate broken-down local time.
    ///
    /// An unambiguous verdict wins. Inside the fall-back doubled hour the
    /// flag is kept from the current time, unless the candidate lies more
    /// than the configured threshold behind it, which marks the switch into
    /// standard time as just having happened. Without a valid current time
    /// the flag is guessed as daylight-saving time.
    pub fn resolve_dst_flag(&self, candidate: &mut BrokenTime, now_ms: u64) {
        match self.active_rule.verdict_at(candidate.civil_secs()) {
            DstVerdict::Standard => candidate.is_dst = false,
            DstVerdict::Dst => candidate.is_dst = true,
            DstVerdict::Ambiguous => {
                if self.is_valid(now_ms) {
                    let current = self.local_time(now_ms);
                    candidate.is_dst = current.is_dst();
                    let delta = candidate.civil_secs()
                        - self.local_offset_secs(candidate.is_dst)
                        - current.to_epoch(&self.active_rule);
                    if delta < -(self.config.fold_threshold_secs as i64) {
                        candidate.is_dst = false;
                    }
                } else {
                    candidate.is_dst = true;
                }
            }
        }
    }

    const fn local_offset_secs(&self, is_dst: bool) -> i64 {
        if is_dst {
            self.active_rule.dst_offset_secs() as i64
        } else {
            self.active_rule.std_offset_secs() as i64
        }
    }

    /// Commits an assembled local timestamp. The only mutation path into the
    /// clock besides [`Self::commit_utc_time`].
    pub fn commit_local_time(&mut self, stamp: &BrokenTime, received_at_ms: u64, now_ms: u64) {
        // A source that reports the daylight-saving state itself overrides a
        // non-calculated policy with whatever it just told us.
        if self.source_supports_dst_switch && self.config.dst_policy != DstPolicy::Calculated {
            let implied = if stamp.is_dst {
                DstPolicy::AlwaysDst
            } else {
                DstPolicy::AlwaysStandard
            };
            if implied != self.policy {
                if let Err(err) = self.apply_policy(implied) {
                    log::warn!("cannot apply daylight-saving policy {implied:?}: {err}");
                }
            }
        }
        let epoch = stamp.civil_secs() - self.local_offset_secs(stamp.is_dst);
        log::info!(
            "setting {} +{}ms",
            WallClock::from_epoch_local(epoch, &self.active_rule),
            now_ms.saturating_sub(received_at_ms),
        );
        self.clock.set_time(epoch, received_at_ms, now_ms);
        self.force_publish();
    }

    /// Commits an assembled UTC timestamp; the daylight-saving flag of the
    /// stamp is ignored.
    pub fn commit_utc_time(&mut self, stamp: &BrokenTime, received_at_ms: u64, now_ms: u64) {
        let epoch = stamp.civil_secs();
        log::info!(
            "setting {} +{}ms",
            WallClock::from_epoch_utc(epoch),
            now_ms.saturating_sub(received_at_ms),
        );
        self.clock.set_time(epoch, received_at_ms, now_ms);
        self.force_publish();
    }

    /// Schedules a full re-publish of all time channels on the next tick.
    pub fn force_publish(&mut self) {
        self.last_publish = None;
    }

    /// Commits an explicit local date/time, resolving its daylight-saving
    /// flag first. Diagnostic entry point.
    pub fn set_test_time(
        &mut self,
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        now_ms: u64,
    ) {
        let mut stamp = BrokenTime {
            year,
            month,
            day,
            hour,
            minute,
            second: 0,
            is_dst: false,
        };
        self.resolve_dst_flag(&mut stamp, now_ms);
        self.commit_local_time(&stamp, now_ms, now_ms);
    }

    /// Advances the clock and the active source, then refreshes the outbound
    /// time channels when this device is the time authority.
    pub fn tick(&mut self, bus: &mut dyn GroupBus, now_ms: u64) {
        self.clock.tick(now_ms);
        self.run_source(bus, now_ms, |source, ctx| source.tick(ctx));
        if self.config.publish_time && self.is_valid(now_ms) {
            self.publish_current(bus, now_ms);
        }
    }

    /// Hands an inbound group telegram to the active source.
    pub fn on_telegram(&mut self, telegram: &Telegram, bus: &mut dyn GroupBus, now_ms: u64) {
        self.run_source(bus, now_ms, |source, ctx| source.on_telegram(telegram, ctx));
    }

    fn run_source<F>(&mut self, bus: &mut dyn GroupBus, now_ms: u64, f: F)
    where
        F: FnOnce(&mut dyn TimeSource, &mut SourceContext<'_>),
    {
        if let Some(mut source) = self.source.take() {
            let mut ctx = SourceContext {
                manager: self,
                bus,
                now_ms,
            };
            f(source.as_mut(), &mut ctx);
            self.source = Some(source);
        }
    }

    fn publish_current(&mut self, bus: &mut dyn GroupBus, now_ms: u64) {
        let local = self.local_time(now_ms);
        let second_marker = (local.hour, local.minute, local.second);
        if self.last_publish == Some(second_marker) {
            return;
        }
        let force = self.last_publish.is_none();
        self.last_publish = Some(second_marker);

        let mut tod_buf = [0u8; DptTimeOfDay::WIRE_LEN];
        let mut date_buf = [0u8; DptDate::WIRE_LEN];
        let mut dt_buf = [0u8; DptDateTime::WIRE_LEN];

        let tod = DptTimeOfDay {
            weekday: knx_weekday(local.day_of_week),
            hour: local.hour,
            minute: local.minute,
            second: local.second,
        };
        let date = DptDate {
            year: local.year,
            month: local.month,
            day: local.day,
        };
        let flags = StatusFlags::new(StatusFlags::NO_WORKING_DAY).with(if local.is_dst() {
            StatusFlags::SUMMERTIME
        } else {
            0
        });
        let date_time = DptDateTime {
            year: local.year,
            month: local.month,
            day: local.day,
            weekday: knx_weekday(local.day_of_week),
            hour: local.hour,
            minute: local.minute,
            second: local.second,
            flags,
            quality: 0,
        };
        let switch = encode_switch(local.is_dst());

        let mut frames: Vec<(GroupChannel, &[u8])> = Vec::with_capacity(4);
        let mut w = Writer::new(&mut tod_buf);
        if tod.encode(&mut w).is_ok() {
            let len = w.position();
            frames.push((GroupChannel::Time, &tod_buf[..len]));
        }
        let mut w = Writer::new(&mut date_buf);
        if date.encode(&mut w).is_ok() {
            let len = w.position();
            frames.push((GroupChannel::Date, &date_buf[..len]));
        }
        let mut w = Writer::new(&mut dt_buf);
        if date_time.encode(&mut w).is_ok() {
            let len = w.position();
            frames.push((GroupChannel::DateTime, &dt_buf[..len]));
        }
        frames.push((GroupChannel::DstSwitch, &switch));

        for (channel, payload) in &frames {
            bus.update(*channel, payload);
        }
        // Transmit at every ten-minute boundary, and in full after a commit.
        if force || (local.minute % 10 == 0 && local.second == 0) {
            for (channel, payload) in &frames {
                bus.publish(*channel, payload);
            }
        }
    }

    /// Human-readable status report, one line per fact.
    pub fn status_lines(&self, now_ms: u64) -> Vec<String> {
        let mut lines = Vec::new();
        if self.is_valid(now_ms) {
            let local = self.local_time(now_ms);
            lines.push(self.utc_time(now_ms).to_string());
            lines.push(local.to_string());
            lines.push(local.day_of_week_name().to_string());
        } else {
            lines.push("No valid time".to_string());
        }
        lines.push(format!(
            "Timezone: {}",
            build_timezone_string(self.config.base_rule(), DstPolicy::Calculated)
        ));
        if self.policy != DstPolicy::Calculated {
            lines.push(format!("Used timezone: {}", self.active_string));
        }
        lines.push(
            match self.policy {
                DstPolicy::AlwaysDst => "Mode: daylight saving time",
                DstPolicy::AlwaysStandard => "Mode: standard time",
                DstPolicy::Calculated => "Mode: calculate daylight saving time",
            }
            .to_string(),
        );
        lines.push(format!(
            "Offset for daylight saving time: {}s",
            self.dst_offset_secs
        ));
        if self.is_valid(now_ms) {
            let year = self.local_time(now_ms).year;
            let easter = crate::calendar::easter_sunday(year);
            lines.push(format!(
                "Easter: {:04}-{:02}-{:02}",
                easter.year, easter.month, easter.day
            ));
            let advent = crate::calendar::fourth_advent_sunday(year);
            lines.push(format!(
                "4th advent: {:04}-{:02}-{:02}",
                advent.year, advent.month, advent.day
            ));
        }
        match &self.source {
            None => lines.push("No time source set".to_string()),
            Some(source) => {
                lines.push(format!("Time source: {}", source.describe()));
                lines.extend(source.status_lines());
            }
        }
        lines
    }
}

/// Synthesizes the active timezone string for a policy from the configured
/// base rule.
///
/// `Calculated` takes the base rule verbatim. The forced modes replace the
/// transition-rule suffix with a sentinel range — day `0,366` for permanent
/// daylight-saving time, `366,367` for permanent standard time — so the rule
/// engine never reports a transition. A base rule without a daylight-saving
/// part has nothing to force and is used verbatim in every mode.
pub fn build_timezone_string(base: &str, policy: DstPolicy) -> String {
    if policy == DstPolicy::Calculated {
        return base.to_owned();
    }
    let Some((prefix, _)) = base.split_once(',') else {
        return base.to_owned();
    };
    let sentinel = if policy == DstPolicy::AlwaysDst {
        "0,366"
    } else {
        "366,367"
    };
    format!("{prefix},{sentinel}")
}

/// Coordinator surface handed to the active time source while it runs.
pub struct SourceContext<'a> {
    manager: &'a mut TimeManager,
    bus: &'a mut dyn GroupBus,
    now_ms: u64,
}

impl SourceContext<'_> {
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn is_valid(&self) -> bool {
        self.manager.is_valid(self.now_ms)
    }

    pub fn local_time(&self) -> WallClock {
        self.manager.local_time(self.now_ms)
    }

    pub fn dst_offset_secs(&self) -> i32 {
        self.manager.dst_offset_secs()
    }

    pub fn resolve_dst_flag(&self, candidate: &mut BrokenTime) {
        self.manager.resolve_dst_flag(candidate, self.now_ms);
    }

    pub fn commit_local_time(&mut self, stamp: &BrokenTime, received_at_ms: u64) {
        self.manager
            .commit_local_time(stamp, received_at_ms, self.now_ms);
    }

    pub fn commit_utc_time(&mut self, stamp: &BrokenTime, received_at_ms: u64) {
        self.manager
            .commit_utc_time(stamp, received_at_ms, self.now_ms);
    }

    /// Signals that the source changed the clock through some other path.
    pub fn notify_committed(&mut self) {
        log::info!("time set {}", self.manager.local_time(self.now_ms));
        self.manager.force_publish();
    }

    pub fn request_read(&mut self, channel: GroupChannel) {
        self.bus.request_read(channel);
    }
}

#[cfg(test)]
mod tests {
    use super::{build_timezone_string, BrokenTime, TimeManager, MIN_TRUSTED_EPOCH};
    use crate::bus::{GroupBus, GroupChannel};
    use crate::clock::MillisClock;
    use crate::config::{DstPolicy, TimeConfig};
    use knxtime_core::tz::DstVerdict;

    #[derive(Default)]
    struct NullBus;

    impl GroupBus for NullBus {
        fn request_read(&mut self, _channel: GroupChannel) {}
        fn update(&mut self, _channel: GroupChannel, _payload: &[u8]) {}
        fn publish(&mut self, _channel: GroupChannel, _payload: &[u8]) {}
    }

    fn manager() -> TimeManager {
        let mut manager =
            TimeManager::new(Box::new(MillisClock::new()), TimeConfig::default()).unwrap();
        manager.setup(true, &mut NullBus, 0).unwrap();
        manager
    }

    #[test]
    fn starts_invalid_until_a_commit_raises_the_floor() {
        let mut manager = manager();
        assert!(!manager.is_valid(0));
        manager.set_test_time(2024, 7, 1, 15, 0, 1_000);
        assert!(manager.is_valid(1_000));
        assert_eq!(manager.local_time(1_000).to_string(), "2024-07-01 15:00:00 (DST)");
    }

    #[test]
    fn stale_epochs_stay_untrusted() {
        let manager = manager();
        // A freshly reset clock sits near zero, far below the floor.
        assert!(manager.clock.get_time(0) < MIN_TRUSTED_EPOCH);
        assert!(!manager.is_valid(1_000_000));
    }

    #[test]
    fn verdict_is_ambiguous_only_inside_the_fold() {
        let manager = manager();
        assert_eq!(manager.daylight_saving_at(2024, 10, 27, 1, 59), DstVerdict::Dst);
        assert_eq!(
            manager.daylight_saving_at(2024, 10, 27, 2, 30),
            DstVerdict::Ambiguous
        );
        assert_eq!(
            manager.daylight_saving_at(2024, 10, 27, 3, 0),
            DstVerdict::Standard
        );
    }

    #[test]
    fn forced_policies_erase_ambiguity() {
        let mut manager = manager();
        manager.force_dst().unwrap();
        assert_eq!(manager.daylight_saving_at(2024, 10, 27, 2, 30), DstVerdict::Dst);
        assert_eq!(manager.daylight_saving_at(2024, 1, 1, 0, 0), DstVerdict::Dst);
        manager.force_standard_time().unwrap();
        assert_eq!(
            manager.daylight_saving_at(2024, 3, 31, 2, 30),
            DstVerdict::Standard
        );
        manager.use_calculated_dst().unwrap();
        assert_eq!(
            manager.daylight_saving_at(2024, 3, 31, 2, 30),
            DstVerdict::Ambiguous
        );
    }

    #[test]
    fn fold_resolution_keeps_the_current_flag_nearby() {
        let mut manager = manager();
        // Current time 2024-10-27 02:10 DST.
        let stamp = BrokenTime {
            year: 2024,
            month: 10,
            day: 27,
            hour: 2,
            minute: 10,
            second: 0,
            is_dst: true,
        };
        manager.commit_local_time(&stamp, 0, 0);
        let mut candidate = BrokenTime {
            minute: 30,
            is_dst: false,
            ..stamp
        };
        manager.resolve_dst_flag(&mut candidate, 0);
        assert!(candidate.is_dst);
    }

    #[test]
    fn fold_resolution_steps_to_standard_when_far_behind() {
        let mut manager = manager();
        // Current time 2024-10-27 03:05 standard.
        let stamp = BrokenTime {
            year: 2024,
            month: 10,
            day: 27,
            hour: 3,
            minute: 5,
            second: 0,
            is_dst: false,
        };
        manager.commit_local_time(&stamp, 0, 0);
        let mut candidate = BrokenTime {
            hour: 2,
            minute: 30,
            ..stamp
        };
        manager.resolve_dst_flag(&mut candidate, 0);
        assert!(!candidate.is_dst);
    }

    #[test]
    fn fold_resolution_guesses_dst_without_a_reference() {
        let manager = manager();
        let mut candidate = BrokenTime {
            year: 2024,
            month: 10,
            day: 27,
            hour: 2,
            minute: 30,
            second: 0,
            is_dst: false,
        };
        manager.resolve_dst_flag(&mut candidate, 0);
        assert!(candidate.is_dst);
    }

    #[test]
    fn utc_commit_matches_local_reading() {
        let mut manager = manager();
        let stamp = BrokenTime {
            year: 2024,
            month: 7,
            day: 1,
            hour: 13,
            minute: 2,
            second: 3,
            is_dst: false,
        };
        manager.commit_utc_time(&stamp, 500, 500);
        assert_eq!(manager.utc_time(500).to_string(), "2024-07-01 13:02:03 (UTC)");
        assert_eq!(manager.local_time(500).to_string(), "2024-07-01 15:02:03 (DST)");
    }

    #[test]
    fn denormalized_seconds_are_rolled_on_commit() {
        let mut manager = manager();
        let stamp = BrokenTime {
            year: 2024,
            month: 7,
            day: 1,
            hour: 23,
            minute: 59,
            second: 3_659,
            is_dst: true,
        };
        manager.commit_local_time(&stamp, 0, 0);
        assert_eq!(manager.local_time(0).to_string(), "2024-07-02 00:59:59 (DST)");
    }

    #[test]
    fn sentinel_string_synthesis() {
        let base = "CET-1CEST,M3.5.0/2:00:00,M10.5.0/3:00:00";
        assert_eq!(build_timezone_string(base, DstPolicy::Calculated), base);
        assert_eq!(
            build_timezone_string(base, DstPolicy::AlwaysDst),
            "CET-1CEST,0,366"
        );
        assert_eq!(
            build_timezone_string(base, DstPolicy::AlwaysStandard),
            "CET-1CEST,366,367"
        );
        // Nothing to force without a daylight-saving part.
        assert_eq!(build_timezone_string("JST-9", DstPolicy::AlwaysDst), "JST-9");
    }

    #[test]
    fn status_reports_the_mode() {
        let mut manager = manager();
        let lines = manager.status_lines(0);
        assert!(lines.contains(&"No valid time".to_string()));
        assert!(lines.contains(&"Mode: calculate daylight saving time".to_string()));
        manager.force_dst().unwrap();
        let lines = manager.status_lines(0);
        assert!(lines.contains(&"Used timezone: CET-1CEST,0,366".to_string()));
    }
}
