use clap::Parser;
use knxtime_core::tz::TzRule;
use knxtime_core::{civil, WallClock, WallKind};
use knxtime_device::manager::build_timezone_string;
use knxtime_tools::{PolicyArg, RegionArg};

/// Evaluate the daylight-saving verdict of a timezone rule for one local
/// wall-clock instant.
#[derive(Parser, Debug)]
#[command(name = "knxtime-tzprobe")]
struct Args {
    #[arg(long, value_enum, default_value = "berlin")]
    region: RegionArg,
    /// Explicit POSIX rule overriding the region preset.
    #[arg(long)]
    timezone: Option<String>,
    #[arg(long, value_enum, default_value = "calculated")]
    policy: PolicyArg,
    #[arg(long, default_value_t = 2024)]
    year: u16,
    #[arg(long, default_value_t = 10)]
    month: u8,
    #[arg(long, default_value_t = 27)]
    day: u8,
    #[arg(long, default_value_t = 2)]
    hour: u8,
    #[arg(long, default_value_t = 30)]
    minute: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let base = args
        .timezone
        .unwrap_or_else(|| args.region.into_region().posix_rule().to_string());
    let active = build_timezone_string(&base, args.policy.into_policy());
    let rule = TzRule::parse(&active)?;

    let local_secs = civil::civil_secs(
        args.year as i32,
        args.month,
        args.day,
        args.hour,
        args.minute,
        0,
    );
    println!("rule:    {active}");
    println!(
        "instant: {:04}-{:02}-{:02} {:02}:{:02} local",
        args.year, args.month, args.day, args.hour, args.minute
    );
    println!("verdict: {:?}", rule.verdict_at(local_secs));
    let as_std = WallClock::new(
        args.year,
        args.month,
        args.day,
        args.hour,
        args.minute,
        0,
        WallKind::LocalStandard,
    );
    let as_dst = WallClock {
        kind: WallKind::LocalDst,
        ..as_std
    };
    println!("as standard time: {}", as_std.to_utc(&rule));
    println!("as daylight time: {}", as_dst.to_utc(&rule));
    Ok(())
}
