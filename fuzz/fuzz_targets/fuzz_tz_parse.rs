#![no_main]

use knxtime_core::tz::TzRule;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = core::str::from_utf8(data) {
        if let Ok(rule) = TzRule::parse(input) {
            // Evaluation must be panic-free for any parsed rule.
            let _ = rule.is_dst_at(1_700_000_000);
            let _ = rule.verdict_at(1_700_000_000);
            let _ = rule.offset_at(0);
        }
    }
});
