use clap::Parser;
use knxtime_core::dpt::{DptDateTime, StatusFlags};
use knxtime_core::encoding::Writer;
use knxtime_device::{
    GroupBus, GroupChannel, KnxSourceConfig, KnxTimeSource, MillisClock, Telegram, TimeConfig,
    TimeManager,
};
use knxtime_tools::{AuthorityArg, PolicyArg, RegionArg};

/// Drive a time manager with one combined date-time telegram and show what
/// the device commits and publishes.
#[derive(Parser, Debug)]
#[command(name = "knxtime-simulate")]
struct Args {
    #[arg(long, value_enum, default_value = "berlin")]
    region: RegionArg,
    #[arg(long, value_enum, default_value = "calculated")]
    policy: PolicyArg,
    #[arg(long, value_enum, default_value = "combined")]
    authority: AuthorityArg,
    /// Local date carried by the telegram, `YYYY-MM-DD`.
    #[arg(long, default_value = "2024-07-01")]
    date: String,
    /// Local time carried by the telegram, `HH:MM:SS`.
    #[arg(long, default_value = "15:02:03")]
    time: String,
    /// Summertime bit of the telegram.
    #[arg(long)]
    summertime: bool,
    /// Publish the committed time back onto the bus.
    #[arg(long)]
    publish: bool,
    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    dump_config: bool,
    /// Milliseconds of simulated run time after the telegram.
    #[arg(long, default_value_t = 3_000)]
    run_ms: u64,
}

struct PrintingBus;

impl GroupBus for PrintingBus {
    fn request_read(&mut self, channel: GroupChannel) {
        println!("bus: read request on {channel:?}");
    }

    fn update(&mut self, _channel: GroupChannel, _payload: &[u8]) {}

    fn publish(&mut self, channel: GroupChannel, payload: &[u8]) {
        println!("bus: publish on {channel:?}: {payload:02X?}");
    }
}

fn split3(s: &str, sep: char) -> Option<(u16, u8, u8)> {
    let mut parts = s.split(sep);
    let a = parts.next()?.parse().ok()?;
    let b = parts.next()?.parse().ok()?;
    let c = parts.next()?.parse().ok()?;
    parts.next().is_none().then_some((a, b, c))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = TimeConfig {
        publish_time: args.publish,
        region: args.region.into_region(),
        dst_policy: args.policy.into_policy(),
        ..TimeConfig::default()
    };
    if args.dump_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }
    let source_config = KnxSourceConfig {
        combined_date_time: true,
        dst_authority: args.authority.into_authority(),
        ..KnxSourceConfig::default()
    };

    let (year, month, day) = split3(&args.date, '-').ok_or("invalid --date")?;
    let (hour, minute, second) = split3(&args.time, ':').ok_or("invalid --time")?;

    let mut manager = TimeManager::new(Box::new(MillisClock::new()), config)?;
    let mut bus = PrintingBus;
    manager.set_source(
        Some(Box::new(KnxTimeSource::new(source_config))),
        &mut bus,
        0,
    );
    manager.setup(true, &mut bus, 0)?;

    let frame = DptDateTime {
        year,
        month,
        day,
        weekday: 0,
        hour: hour as u8,
        minute,
        second,
        flags: StatusFlags::new(StatusFlags::NO_WORKING_DAY).with(if args.summertime {
            StatusFlags::SUMMERTIME
        } else {
            0
        }),
        quality: 0,
    };
    let mut buf = [0u8; DptDateTime::WIRE_LEN];
    let mut w = Writer::new(&mut buf);
    frame.encode(&mut w)?;

    manager.tick(&mut bus, 100);
    manager.on_telegram(&Telegram::new(GroupChannel::DateTime, buf), &mut bus, 200);
    let mut now_ms = 200;
    while now_ms < 200 + args.run_ms {
        now_ms += 250;
        manager.tick(&mut bus, now_ms);
    }

    for line in manager.status_lines(now_ms) {
        println!("{line}");
    }
    Ok(())
}
