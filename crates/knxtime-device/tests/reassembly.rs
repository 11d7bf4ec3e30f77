//! End-to-end tests of the KNX fragment reassembly against the manager.

use knxtime_core::dpt::StatusFlags;
use knxtime_device::{
    DstAuthority, GroupBus, GroupChannel, KnxSourceConfig, KnxTimeSource, MillisClock, Telegram,
    TimeConfig, TimeManager,
};

#[derive(Default)]
struct RecordingBus {
    reads: Vec<GroupChannel>,
    updates: Vec<(GroupChannel, Vec<u8>)>,
    published: Vec<(GroupChannel, Vec<u8>)>,
}

impl GroupBus for RecordingBus {
    fn request_read(&mut self, channel: GroupChannel) {
        self.reads.push(channel);
    }

    fn update(&mut self, channel: GroupChannel, payload: &[u8]) {
        self.updates.push((channel, payload.to_vec()));
    }

    fn publish(&mut self, channel: GroupChannel, payload: &[u8]) {
        self.published.push((channel, payload.to_vec()));
    }
}

struct Rig {
    manager: TimeManager,
    bus: RecordingBus,
}

impl Rig {
    fn new(config: TimeConfig, source_cfg: KnxSourceConfig) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut manager = TimeManager::new(Box::new(MillisClock::new()), config).unwrap();
        let mut bus = RecordingBus::default();
        manager.set_source(Some(Box::new(KnxTimeSource::new(source_cfg))), &mut bus, 0);
        manager.setup(true, &mut bus, 0).unwrap();
        Self { manager, bus }
    }

    fn tick(&mut self, now_ms: u64) {
        self.manager.tick(&mut self.bus, now_ms);
    }

    fn feed(&mut self, channel: GroupChannel, payload: &[u8], now_ms: u64) {
        let telegram = Telegram::new(channel, payload);
        self.manager.on_telegram(&telegram, &mut self.bus, now_ms);
    }
}

/// 2024-07-01 15:02:03, Monday, summertime, no-working-day set.
fn combined_frame(flags: u8) -> [u8; 8] {
    [124, 7, 1, 0x2F, 2, 3, flags, 0]
}

#[test]
fn clean_combined_frame_commits_immediately() {
    let mut rig = Rig::new(
        TimeConfig::default(),
        KnxSourceConfig {
            combined_date_time: true,
            dst_authority: DstAuthority::CombinedMessage,
            ..KnxSourceConfig::default()
        },
    );
    assert!(!rig.manager.is_valid(100));

    rig.feed(
        GroupChannel::DateTime,
        &combined_frame(StatusFlags::SUMMERTIME),
        100,
    );
    assert!(rig.manager.is_valid(100));
    assert_eq!(
        rig.manager.local_time(100).to_string(),
        "2024-07-01 15:02:03 (DST)"
    );
    assert_eq!(
        rig.manager.utc_time(100).to_string(),
        "2024-07-01 13:02:03 (UTC)"
    );
}

#[test]
fn faulted_combined_frame_changes_nothing() {
    let mut rig = Rig::new(
        TimeConfig::default(),
        KnxSourceConfig {
            combined_date_time: true,
            dst_authority: DstAuthority::CombinedMessage,
            ..KnxSourceConfig::default()
        },
    );
    for flags in [
        StatusFlags::FAULT,
        StatusFlags::NO_YEAR,
        StatusFlags::NO_DATE,
        StatusFlags::NO_TIME,
    ] {
        rig.feed(GroupChannel::DateTime, &combined_frame(flags), 100);
        assert!(!rig.manager.is_valid(100));
    }
    // A later clean frame still commits; the buffer was left untouched.
    rig.feed(
        GroupChannel::DateTime,
        &combined_frame(StatusFlags::SUMMERTIME),
        200,
    );
    assert!(rig.manager.is_valid(200));
}

#[test]
fn time_only_fragment_completes_from_held_date_after_timeout() {
    let mut rig = Rig::new(
        TimeConfig::default(),
        KnxSourceConfig {
            combined_date_time: false,
            dst_authority: DstAuthority::SwitchChannel,
            read_on_start: false,
            ..KnxSourceConfig::default()
        },
    );
    // Establish a valid prior time: 2024-07-01 12:00:00 local.
    rig.manager.set_test_time(2024, 7, 1, 12, 0, 1_000);
    assert!(rig.manager.is_valid(1_000));

    // Only a time-of-day telegram arrives: 12:30:05 on a Monday.
    rig.feed(GroupChannel::Time, &[0x2C, 30, 5], 10_000);
    // Not yet committed; the daylight-saving fragment is still missing.
    assert_eq!(rig.manager.local_time(10_000).hour, 12);
    assert_eq!(rig.manager.local_time(10_000).minute, 0);

    // After the partial-fragment timeout the commit uses the new time and the
    // previously held date and flag.
    rig.tick(10_000 + 900);
    let local = rig.manager.local_time(10_900);
    assert_eq!(local.to_string(), "2024-07-01 12:30:05 (DST)");
}

#[test]
fn initial_read_requests_each_missing_fragment() {
    let mut rig = Rig::new(
        TimeConfig::default(),
        KnxSourceConfig {
            combined_date_time: false,
            dst_authority: DstAuthority::SwitchChannel,
            read_on_start: true,
            ..KnxSourceConfig::default()
        },
    );
    rig.tick(4_999);
    assert!(rig.bus.reads.is_empty());

    rig.tick(5_000);
    assert_eq!(
        rig.bus.reads,
        vec![
            GroupChannel::Time,
            GroupChannel::Date,
            GroupChannel::DstSwitch
        ]
    );

    // The longer repeat timer re-requests until fragments arrive.
    rig.tick(5_000 + 31_999);
    assert_eq!(rig.bus.reads.len(), 3);
    rig.tick(5_000 + 32_000);
    assert_eq!(rig.bus.reads.len(), 6);
}

#[test]
fn combined_mode_requests_the_date_time_channel() {
    let mut rig = Rig::new(
        TimeConfig::default(),
        KnxSourceConfig {
            combined_date_time: true,
            dst_authority: DstAuthority::CombinedMessage,
            read_on_start: true,
            ..KnxSourceConfig::default()
        },
    );
    rig.tick(5_000);
    assert_eq!(rig.bus.reads, vec![GroupChannel::DateTime]);
}

#[test]
fn missing_dst_answer_defaults_to_standard_time() {
    let mut rig = Rig::new(
        TimeConfig::default(),
        KnxSourceConfig {
            combined_date_time: false,
            dst_authority: DstAuthority::SwitchChannel,
            read_on_start: true,
            ..KnxSourceConfig::default()
        },
    );
    // Date and time arrive during the initial read phase; nobody answers for
    // the daylight-saving flag. Winter date so standard time is plausible.
    rig.feed(GroupChannel::Time, &[0x2F, 2, 3], 1_000);
    rig.feed(GroupChannel::Date, &[2, 12, 24], 1_100);
    assert!(!rig.manager.is_valid(1_100));

    rig.tick(5_000);
    let local = rig.manager.local_time(5_000);
    assert_eq!(local.to_string(), "2024-12-02 15:02:07 (ST)");
}

#[test]
fn separate_fragments_commit_with_computed_dst() {
    let mut rig = Rig::new(
        TimeConfig::default(),
        KnxSourceConfig {
            combined_date_time: false,
            dst_authority: DstAuthority::Computed,
            read_on_start: false,
            ..KnxSourceConfig::default()
        },
    );
    // Date first, then time; the flag is computed from the rule.
    rig.feed(GroupChannel::Date, &[1, 7, 24], 100);
    assert!(!rig.manager.is_valid(100));
    rig.feed(GroupChannel::Time, &[0x2F, 2, 3], 200);
    assert_eq!(
        rig.manager.local_time(200).to_string(),
        "2024-07-01 15:02:03 (DST)"
    );
}

#[test]
fn midnight_heuristic_advances_the_backfilled_date() {
    let mut rig = Rig::new(
        TimeConfig::default(),
        KnxSourceConfig {
            combined_date_time: false,
            dst_authority: DstAuthority::Computed,
            read_on_start: false,
            ..KnxSourceConfig::default()
        },
    );
    // Current time just before midnight.
    rig.manager.set_test_time(2024, 6, 30, 23, 59, 1_000);
    // Incoming time-of-day just after midnight: the new day has started.
    rig.feed(GroupChannel::Time, &[0x20, 1, 0], 2_000);
    let local = rig.manager.local_time(2_000);
    assert_eq!(
        (local.year, local.month, local.day, local.hour, local.minute),
        (2024, 7, 1, 0, 1)
    );
}

#[test]
fn midnight_heuristic_retreats_the_backfilled_date() {
    let mut rig = Rig::new(
        TimeConfig::default(),
        KnxSourceConfig {
            combined_date_time: false,
            dst_authority: DstAuthority::Computed,
            read_on_start: false,
            ..KnxSourceConfig::default()
        },
    );
    // Current time just after midnight; the sender still reports 23:59:30.
    rig.manager.set_test_time(2024, 7, 1, 0, 1, 1_000);
    rig.feed(GroupChannel::Time, &[0xF7, 59, 30], 2_000);
    let local = rig.manager.local_time(2_000);
    assert_eq!(
        (local.month, local.day, local.hour, local.minute),
        (6, 30, 23, 59)
    );
}

#[test]
fn date_fragment_for_tomorrow_backfills_midnight() {
    let mut rig = Rig::new(
        TimeConfig::default(),
        KnxSourceConfig {
            combined_date_time: false,
            dst_authority: DstAuthority::Computed,
            read_on_start: false,
            ..KnxSourceConfig::default()
        },
    );
    rig.manager.set_test_time(2024, 6, 30, 23, 59, 1_000);
    // A date telegram for July 1 while the local clock still shows June 30
    // 23:59: the sender's day has already flipped.
    rig.feed(GroupChannel::Date, &[1, 7, 24], 2_000);
    let local = rig.manager.local_time(2_000);
    assert_eq!(
        (local.month, local.day, local.hour, local.minute, local.second),
        (7, 1, 0, 0, 0)
    );
}

#[test]
fn date_fragment_for_today_waits_for_the_time() {
    let mut rig = Rig::new(
        TimeConfig::default(),
        KnxSourceConfig {
            combined_date_time: false,
            dst_authority: DstAuthority::Computed,
            read_on_start: false,
            ..KnxSourceConfig::default()
        },
    );
    rig.manager.set_test_time(2024, 7, 1, 12, 0, 1_000);
    rig.feed(GroupChannel::Date, &[1, 7, 24], 2_000);
    // No commit from the date alone; the clock still shows the prior time.
    assert_eq!(rig.manager.local_time(2_000).minute, 0);
    // The time fragment completes the cycle.
    rig.feed(GroupChannel::Time, &[0x2C, 30, 5], 3_000);
    assert_eq!(rig.manager.local_time(3_000).minute, 30);
}

#[test]
fn dst_flag_flip_shifts_a_seeded_time() {
    // A switch-channel setup runs with a forced policy that follows the bus.
    let mut rig = Rig::new(
        TimeConfig {
            dst_policy: knxtime_device::DstPolicy::AlwaysStandard,
            ..TimeConfig::default()
        },
        KnxSourceConfig {
            combined_date_time: false,
            dst_authority: DstAuthority::SwitchChannel,
            read_on_start: false,
            ..KnxSourceConfig::default()
        },
    );
    // Current time 2024-10-27 02:30 daylight-saving (inside the fold).
    let before = knxtime_device::BrokenTime {
        year: 2024,
        month: 10,
        day: 27,
        hour: 2,
        minute: 30,
        second: 0,
        is_dst: true,
    };
    rig.manager.commit_local_time(&before, 1_000, 1_000);
    let epoch_before = rig.manager.utc_time(1_000).to_string();

    // The bus announces standard time; no time fragment follows. The seeded
    // time is shifted so the committed instant stays put.
    rig.feed(GroupChannel::DstSwitch, &[0], 1_000);
    rig.tick(1_000 + 900);
    let local = rig.manager.local_time(1_900);
    assert!(!local.is_dst());
    assert_eq!((local.hour, local.minute), (1, 30));
    assert_eq!(rig.manager.utc_time(1_900).to_string(), epoch_before);
}

#[test]
fn commit_adopts_the_policy_implied_by_the_source_flag() {
    // With the daylight-saving flag delegated to the bus, the policy follows
    // whatever the source reports.
    let mut rig = Rig::new(
        TimeConfig {
            dst_policy: knxtime_device::DstPolicy::AlwaysStandard,
            ..TimeConfig::default()
        },
        KnxSourceConfig {
            combined_date_time: true,
            dst_authority: DstAuthority::CombinedMessage,
            read_on_start: false,
            ..KnxSourceConfig::default()
        },
    );
    assert_eq!(rig.manager.policy(), knxtime_device::DstPolicy::AlwaysStandard);
    rig.feed(
        GroupChannel::DateTime,
        &combined_frame(StatusFlags::SUMMERTIME),
        100,
    );
    assert_eq!(rig.manager.policy(), knxtime_device::DstPolicy::AlwaysDst);
    assert_eq!(
        rig.manager.local_time(100).to_string(),
        "2024-07-01 15:02:03 (DST)"
    );
}

#[test]
fn publishing_updates_every_second_and_transmits_on_boundaries() {
    let mut rig = Rig::new(
        TimeConfig {
            publish_time: true,
            ..TimeConfig::default()
        },
        KnxSourceConfig {
            combined_date_time: true,
            dst_authority: DstAuthority::CombinedMessage,
            read_on_start: false,
            ..KnxSourceConfig::default()
        },
    );
    // 2024-07-01 14:09:58 local.
    rig.manager.set_test_time(2024, 7, 1, 14, 9, 0);
    rig.manager.tick(&mut rig.bus, 58_000);

    // The first tick after a commit transmits in full.
    assert_eq!(rig.bus.published.len(), 4);
    assert_eq!(rig.bus.updates.len(), 4);

    // The next second refreshes the values without transmitting.
    rig.manager.tick(&mut rig.bus, 59_000);
    assert_eq!(rig.bus.updates.len(), 8);
    assert_eq!(rig.bus.published.len(), 4);

    // Within the same second nothing changes.
    rig.manager.tick(&mut rig.bus, 59_400);
    assert_eq!(rig.bus.updates.len(), 8);

    // 14:10:00 is a ten-minute boundary: transmit again.
    rig.manager.tick(&mut rig.bus, 60_000);
    assert_eq!(rig.bus.published.len(), 8);

    let (channel, payload) = &rig.bus.published[4];
    assert_eq!(*channel, GroupChannel::Time);
    // Monday 14:10:00.
    assert_eq!(payload.as_slice(), &[0x2E, 10, 0]);
}

#[test]
fn replacing_the_source_discards_inflight_state() {
    let mut rig = Rig::new(
        TimeConfig::default(),
        KnxSourceConfig {
            combined_date_time: false,
            dst_authority: DstAuthority::SwitchChannel,
            read_on_start: false,
            ..KnxSourceConfig::default()
        },
    );
    rig.manager.set_test_time(2024, 7, 1, 12, 0, 1_000);
    // A lone time fragment leaves an assembly cycle in flight.
    rig.feed(GroupChannel::Time, &[0x2C, 30, 5], 10_000);

    // Swapping the source drops the cycle; the timeout that would have
    // committed it passes with no effect.
    let fresh = KnxTimeSource::new(KnxSourceConfig {
        combined_date_time: false,
        dst_authority: DstAuthority::SwitchChannel,
        read_on_start: false,
        ..KnxSourceConfig::default()
    });
    rig.manager.set_source(Some(Box::new(fresh)), &mut rig.bus, 10_100);
    rig.tick(11_000);
    let local = rig.manager.local_time(11_000);
    assert_eq!((local.hour, local.minute), (12, 0));
}

#[test]
fn status_lines_name_the_missing_fragments() {
    let mut rig = Rig::new(
        TimeConfig::default(),
        KnxSourceConfig {
            combined_date_time: false,
            dst_authority: DstAuthority::SwitchChannel,
            read_on_start: true,
            ..KnxSourceConfig::default()
        },
    );
    let lines = rig.manager.status_lines(0);
    assert!(lines.contains(&"No valid time".to_string()));
    assert!(lines.contains(&"Time source: KNX".to_string()));
    assert!(lines.contains(&"Waiting for initial date telegram".to_string()));
    assert!(lines.contains(&"Waiting for initial time telegram".to_string()));
    assert!(lines.contains(&"Waiting for initial daylight-saving telegram".to_string()));
}
