//! Pluggable time acquisition.
//!
//! A [`TimeSource`] decides *how* time is obtained; the
//! [`TimeManager`](crate::TimeManager) keeps authority over the clock and
//! hands the source a [`SourceContext`] for its commit callbacks. Exactly one
//! source is active at a time; replacing it drops all in-flight acquisition
//! state with the old instance.

pub mod knx;

use crate::bus::Telegram;
use crate::manager::SourceContext;

pub trait TimeSource {
    /// Called once the device configuration is loaded.
    fn setup(&mut self, _ctx: &mut SourceContext<'_>) {}

    /// Called by the host loop every cycle.
    fn tick(&mut self, _ctx: &mut SourceContext<'_>) {}

    /// Called for every inbound group telegram.
    fn on_telegram(&mut self, _telegram: &Telegram, _ctx: &mut SourceContext<'_>) {}

    /// Whether this source can supply the daylight-saving flag itself.
    fn supports_dst_switchover(&self) -> bool {
        false
    }

    /// Short human-readable name for diagnostics.
    fn describe(&self) -> String;

    /// Diagnostic detail lines.
    fn status_lines(&self) -> Vec<String> {
        Vec::new()
    }
}
