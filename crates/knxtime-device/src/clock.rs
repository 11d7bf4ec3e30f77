//! Clock backends.
//!
//! A clock answers "what time is it right now" in Unix epoch seconds. It
//! free-runs only via elapsed ticks and is mutated exclusively through
//! [`Clock::set_time`]; there is no smoothing or drift correction, a time
//! change is an instantaneous jump. Tick timestamps come from the host loop
//! as explicit `now_ms` parameters.

/// A settable epoch clock.
pub trait Clock {
    fn setup(&mut self) {}

    fn tick(&mut self, _now_ms: u64) {}

    /// Sets the clock to `epoch`, as captured at tick `received_at_ms`. The
    /// delay between capture and this call is compensated.
    fn set_time(&mut self, epoch: i64, received_at_ms: u64, now_ms: u64);

    fn get_time(&self, now_ms: u64) -> i64;

    fn is_running(&self) -> bool;
}

/// Clock backed purely by the millisecond tick counter plus a stored offset,
/// for platforms without a host time-of-day facility.
#[derive(Debug, Default)]
pub struct MillisClock {
    offset: i64,
    set_at_ms: u64,
    running: bool,
}

impl MillisClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for MillisClock {
    fn set_time(&mut self, epoch: i64, received_at_ms: u64, _now_ms: u64) {
        self.offset = epoch;
        self.set_at_ms = received_at_ms;
        self.running = true;
    }

    fn get_time(&self, now_ms: u64) -> i64 {
        if !self.running {
            return 0;
        }
        self.offset + (now_ms.saturating_sub(self.set_at_ms) / 1_000) as i64
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

/// Clock delegating to the host wall clock, holding a signed adjustment so a
/// committed time survives without privileges to set the system clock.
#[derive(Debug, Default)]
pub struct HostClock {
    adjust_secs: i64,
}

impl HostClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn host_epoch() -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since) => since.as_secs() as i64,
            Err(before) => -(before.duration().as_secs() as i64),
        }
    }
}

impl Clock for HostClock {
    fn set_time(&mut self, epoch: i64, received_at_ms: u64, now_ms: u64) {
        let latency_secs = (now_ms.saturating_sub(received_at_ms) / 1_000) as i64;
        self.adjust_secs = epoch + latency_secs - Self::host_epoch();
    }

    fn get_time(&self, _now_ms: u64) -> i64 {
        Self::host_epoch() + self.adjust_secs
    }

    fn is_running(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, MillisClock};

    #[test]
    fn millis_clock_tracks_elapsed_ticks() {
        let mut clock = MillisClock::new();
        assert!(!clock.is_running());
        assert_eq!(clock.get_time(10_000), 0);

        clock.set_time(1_720_000_000, 4_000, 4_000);
        assert!(clock.is_running());
        assert_eq!(clock.get_time(4_000), 1_720_000_000);
        assert_eq!(clock.get_time(4_999), 1_720_000_000);
        assert_eq!(clock.get_time(9_000), 1_720_000_005);
    }

    #[test]
    fn millis_clock_compensates_capture_delay() {
        let mut clock = MillisClock::new();
        // The value was captured three seconds before set_time ran; anchoring
        // at the capture tick makes the delay fall out of get_time.
        clock.set_time(1_720_000_000, 1_000, 4_000);
        assert_eq!(clock.get_time(4_000), 1_720_000_003);
    }

    #[test]
    fn two_reads_differ_by_elapsed_ticks_exactly() {
        let mut clock = MillisClock::new();
        clock.set_time(1_720_000_000, 0, 0);
        let a = clock.get_time(12_345);
        let b = clock.get_time(12_345 + 60_000);
        assert_eq!(b - a, 60);
    }
}
