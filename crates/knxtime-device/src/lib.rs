//! Runtime time management for KNX devices.
//!
//! The [`TimeManager`] owns a pluggable [`Clock`], an optional [`TimeSource`],
//! the daylight-saving policy, and the process-wide timezone rule. The host
//! loop drives everything through [`TimeManager::tick`] on a single core;
//! inbound group telegrams are pushed in through [`TimeManager::on_telegram`].
//! The [`KnxTimeSource`] reassembles date, time, and daylight-saving fragments
//! arriving independently on the bus into single atomic commits.

pub mod bus;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod error;
pub mod manager;
pub mod source;

pub use bus::{GroupBus, GroupChannel, Telegram};
pub use calendar::Calendar;
pub use clock::{Clock, HostClock, MillisClock};
pub use config::{DstAuthority, DstPolicy, KnxSourceConfig, Region, TimeConfig};
pub use error::TimeError;
pub use manager::{BrokenTime, SourceContext, TimeManager};
pub use source::knx::KnxTimeSource;
pub use source::TimeSource;
