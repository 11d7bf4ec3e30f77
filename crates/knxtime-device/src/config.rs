//! Device configuration for the time subsystem.
//!
//! Mirrors the device parameters a commissioning tool writes: whether the
//! device is itself the time authority, which region's timezone rule applies,
//! how daylight-saving information is obtained, and the acquisition timing
//! knobs of the KNX time source.

/// Daylight-saving policy applied to all conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DstPolicy {
    AlwaysStandard,
    AlwaysDst,
    #[default]
    Calculated,
}

/// Where the daylight-saving flag of an assembled timestamp comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DstAuthority {
    /// A dedicated switch group object carries the flag.
    SwitchChannel,
    /// The combined date-time telegram's summertime bit carries the flag.
    CombinedMessage,
    /// The device computes the flag from its timezone rule.
    #[default]
    Computed,
}

/// Region presets and their POSIX timezone rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Region {
    Midway,
    Honolulu,
    Anchorage,
    LosAngeles,
    Denver,
    Chicago,
    NewYork,
    SantoDomingo,
    RioDeJaneiro,
    Nuuk,
    CaboVerde,
    London,
    #[default]
    Berlin,
    Athens,
    Moscow,
    Dubai,
    Karachi,
    Dhaka,
    Bangkok,
    Beijing,
    Tokyo,
    Sydney,
    Noumea,
    Wellington,
}

impl Region {
    /// The POSIX rule string for this region.
    pub const fn posix_rule(self) -> &'static str {
        match self {
            Self::Midway => "NUT11",
            Self::Honolulu => "HST11HDT,M3.2.0/2:00:00,M11.1.0/2:00:00",
            Self::Anchorage => "ASKT9AKDT,M3.2.0/2:00:00,M11.1.0/2:00:00",
            Self::LosAngeles => "PST8PDT,M3.2.0/2:00:00,M11.1.0/2:00:00",
            Self::Denver => "MST7MDT,M3.2.0/2:00:00,M11.1.0/2:00:00",
            Self::Chicago => "CST6CDT,M3.2.0/2:00:00,M11.1.0/2:00:00",
            Self::NewYork => "EST5EDT,M3.2.0/2:00:00,M11.1.0/2:00:00",
            Self::SantoDomingo => "GMT-4",
            Self::RioDeJaneiro => "ART3",
            Self::Nuuk => "WGST3WGT,M3.2.0/2:00:00,M11.1.0/2:00:00",
            Self::CaboVerde => "CVT1",
            Self::London => "BST0GMT,M3.2.0/2:00:00,M11.1.0/2:00:00",
            Self::Berlin => "CET-1CEST,M3.5.0/2:00:00,M10.5.0/3:00:00",
            Self::Athens => "EET-2EEST,M3.5.0/3,M10.5.0/4",
            Self::Moscow => "MSK-3MSD,M3.5.0,M10.5.0/3",
            Self::Dubai => "UZT-4",
            Self::Karachi => "UZT-5",
            Self::Dhaka => "BDT-6",
            Self::Bangkok => "WIB-7",
            Self::Beijing => "CST-8",
            Self::Tokyo => "JST-9",
            Self::Sydney => "AEST-9AEDT,M3.2.0/2:00:00,M11.1.0/2:00:00",
            Self::Noumea => "SBT-11",
            Self::Wellington => "ANAT-12",
        }
    }
}

/// Configuration owned by the [`TimeManager`](crate::TimeManager).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeConfig {
    /// Device is the time authority: publish the current time onto the bus.
    pub publish_time: bool,
    /// Region preset providing the base timezone rule.
    pub region: Region,
    /// Explicit POSIX rule overriding the region preset.
    pub timezone: Option<String>,
    /// Daylight-saving policy applied once the device is configured.
    pub dst_policy: DstPolicy,
    /// A candidate inside the fall-back doubled hour that lies this many
    /// seconds or more behind the current time is taken as the first instant
    /// after the switch to standard time.
    pub fold_threshold_secs: u32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            publish_time: false,
            region: Region::Berlin,
            timezone: None,
            dst_policy: DstPolicy::Calculated,
            fold_threshold_secs: 2_700,
        }
    }
}

impl TimeConfig {
    /// The configured base POSIX rule.
    pub fn base_rule(&self) -> &str {
        self.timezone
            .as_deref()
            .unwrap_or_else(|| self.region.posix_rule())
    }
}

/// Configuration of the KNX time source.
///
/// The timing constants are empirically chosen in the field; the defaults are
/// kept rather than re-derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KnxSourceConfig {
    /// Date and time travel together on the date-time channel instead of on
    /// separate date and time channels.
    pub combined_date_time: bool,
    pub dst_authority: DstAuthority,
    /// Request missing fragments from the bus after start-up.
    pub read_on_start: bool,
    /// Delay before the first read request burst.
    pub initial_read_ms: u64,
    /// Delay between repeated read request bursts.
    pub repeat_read_ms: u64,
    /// How long to wait for the remaining fragments once a partial set
    /// arrived and a previously valid time exists.
    pub partial_wait_ms: u64,
    /// Window around midnight in which a lone fragment may shift the
    /// backfilled date by one day.
    pub midnight_tolerance_min: u8,
}

impl Default for KnxSourceConfig {
    fn default() -> Self {
        Self {
            combined_date_time: false,
            dst_authority: DstAuthority::Computed,
            read_on_start: true,
            initial_read_ms: 5_000,
            repeat_read_ms: 32_000,
            partial_wait_ms: 900,
            midnight_tolerance_min: 2,
        }
    }
}
