#![no_main]

use knxtime_core::dpt::{decode_switch, DptDate, DptDateTime, DptTimeOfDay};
use knxtime_core::encoding::Reader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = DptDateTime::decode(&mut Reader::new(data));
    let _ = DptDate::decode(&mut Reader::new(data));
    let _ = DptTimeOfDay::decode(&mut Reader::new(data));
    let _ = decode_switch(&mut Reader::new(data));
});
