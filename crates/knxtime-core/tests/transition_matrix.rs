//! Daylight-saving verdicts across the 2024 European transitions, checked
//! against the reference matrix for the Germany rule.

use knxtime_core::civil;
use knxtime_core::tz::{DstVerdict, TzRule};
use knxtime_core::{WallClock, WallKind};

const BERLIN: &str = "CET-1CEST,M3.5.0/2:00:00,M10.5.0/3:00:00";

fn verdict(rule: &TzRule, month: u8, day: u8, hour: u8, minute: u8) -> DstVerdict {
    rule.verdict_at(civil::civil_secs(2024, month, day, hour, minute, 0))
}

#[test]
fn berlin_verdict_matrix() {
    use DstVerdict::{Ambiguous, Dst, Standard};
    let rule = TzRule::parse(BERLIN).unwrap();
    let matrix: &[(u8, u8, u8, u8, DstVerdict)] = &[
        (3, 29, 23, 59, Standard),
        (3, 30, 0, 0, Standard),
        (3, 30, 1, 59, Standard),
        (3, 31, 1, 59, Standard),
        (3, 31, 2, 0, Ambiguous),
        (3, 31, 2, 1, Ambiguous),
        (3, 31, 2, 59, Ambiguous),
        (3, 31, 3, 0, Dst),
        (3, 31, 4, 1, Dst),
        (10, 27, 1, 59, Dst),
        (10, 27, 2, 0, Ambiguous),
        (10, 27, 2, 1, Ambiguous),
        (10, 27, 2, 59, Ambiguous),
        (10, 27, 3, 0, Standard),
        (10, 27, 3, 1, Standard),
        (10, 27, 23, 59, Standard),
        (10, 28, 0, 0, Standard),
        (10, 29, 0, 0, Standard),
        (11, 3, 0, 0, Standard),
        (11, 4, 0, 0, Standard),
    ];
    for &(month, day, hour, minute, expected) in matrix {
        assert_eq!(
            verdict(&rule, month, day, hour, minute),
            expected,
            "2024-{month:02}-{day:02} {hour:02}:{minute:02}",
        );
    }
}

#[test]
fn conversion_reference_points() {
    let rule = TzRule::parse(BERLIN).unwrap();

    let dt = WallClock::new(2024, 7, 1, 15, 2, 3, WallKind::LocalDst);
    assert_eq!(dt.to_utc(&rule).to_string(), "2024-07-01 13:02:03 (UTC)");

    let dt = WallClock::new(2024, 7, 1, 15, 2, 3, WallKind::Utc).to_local(&rule);
    assert_eq!(dt.to_string(), "2024-07-01 17:02:03 (DST)");
    let dt = dt.add_days(-1, &rule);
    assert_eq!(dt.to_string(), "2024-06-30 17:02:03 (DST)");
    let dt = dt.add_hours(-1, &rule);
    assert_eq!(dt.to_string(), "2024-06-30 16:02:03 (DST)");

    let dt = WallClock::new(2024, 12, 1, 15, 2, 3, WallKind::LocalStandard);
    assert_eq!(dt.to_utc(&rule).to_string(), "2024-12-01 14:02:03 (UTC)");

    let dt = WallClock::new(2024, 12, 1, 15, 2, 3, WallKind::Utc).to_local(&rule);
    assert_eq!(dt.to_string(), "2024-12-01 16:02:03 (ST)");
    let dt = dt.add_days(-1, &rule).add_hours(-1, &rule);
    assert_eq!(dt.to_string(), "2024-11-30 15:02:03 (ST)");
}

#[test]
fn utc_epoch_is_independent_of_the_route() {
    // Converting a UTC value straight to its epoch must agree with going
    // through local time first.
    let rule = TzRule::parse(BERLIN).unwrap();
    for &(month, day, hour) in &[(1u8, 15u8, 3u8), (7, 1, 13), (10, 27, 0), (10, 27, 2)] {
        let utc = WallClock::new(2024, month, day, hour, 2, 3, WallKind::Utc);
        assert_eq!(utc.to_epoch(&rule), utc.to_local(&rule).to_epoch(&rule));
    }
}
