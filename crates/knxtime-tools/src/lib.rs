use clap::ValueEnum;
use knxtime_device::{DstAuthority, DstPolicy, Region};

/// CLI-friendly names for the timezone region presets.
///
/// Maps human-readable names to [`Region`] variants for use with clap
/// argument parsing.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RegionArg {
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

impl RegionArg {
    /// Convert to the configuration [`Region`] representation.
    pub const fn into_region(self) -> Region {
        match self {
            Self::Midway => Region::Midway,
            Self::Honolulu => Region::Honolulu,
            Self::Anchorage => Region::Anchorage,
            Self::LosAngeles => Region::LosAngeles,
            Self::Denver => Region::Denver,
            Self::Chicago => Region::Chicago,
            Self::NewYork => Region::NewYork,
            Self::SantoDomingo => Region::SantoDomingo,
            Self::RioDeJaneiro => Region::RioDeJaneiro,
            Self::Nuuk => Region::Nuuk,
            Self::CaboVerde => Region::CaboVerde,
            Self::London => Region::London,
            Self::Berlin => Region::Berlin,
            Self::Athens => Region::Athens,
            Self::Moscow => Region::Moscow,
            Self::Dubai => Region::Dubai,
            Self::Karachi => Region::Karachi,
            Self::Dhaka => Region::Dhaka,
            Self::Bangkok => Region::Bangkok,
            Self::Beijing => Region::Beijing,
            Self::Tokyo => Region::Tokyo,
            Self::Sydney => Region::Sydney,
            Self::Noumea => Region::Noumea,
            Self::Wellington => Region::Wellington,
        }
    }
}

/// CLI-friendly daylight-saving policy names.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    Standard,
    Dst,
    Calculated,
}

impl PolicyArg {
    pub const fn into_policy(self) -> DstPolicy {
        match self {
            Self::Standard => DstPolicy::AlwaysStandard,
            Self::Dst => DstPolicy::AlwaysDst,
            Self::Calculated => DstPolicy::Calculated,
        }
    }
}

/// CLI-friendly names for the daylight-saving flag authority.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AuthorityArg {
    Switch,
    Combined,
    Computed,
}

impl AuthorityArg {
    pub const fn into_authority(self) -> DstAuthority {
        match self {
            Self::Switch => DstAuthority::SwitchChannel,
            Self::Combined => DstAuthority::CombinedMessage,
            Self::Computed => DstAuthority::Computed,
        }
    }
}
