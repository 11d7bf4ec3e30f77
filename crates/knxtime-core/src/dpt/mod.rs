//! KNX datapoint codecs for the group payloads the time subsystem speaks.
//!
//! Covered datapoint types: 10.001 time of day, 11.001 date, 19.001
//! date-time, and the 1.x switch used for the daylight-saving flag.

pub mod date;
pub mod date_time;
pub mod switch;
pub mod time_of_day;

pub use date::DptDate;
pub use date_time::{DptDateTime, StatusFlags};
pub use switch::{decode_switch, encode_switch};
pub use time_of_day::DptTimeOfDay;

/// Maps a 0 = Sunday weekday to the encoding DPT 10 and DPT 19 carry on the
/// wire (1 = Monday .. 7 = Sunday).
pub const fn knx_weekday(day_of_week: u8) -> u8 {
    if day_of_week == 0 {
        7
    } else {
        day_of_week
    }
}
