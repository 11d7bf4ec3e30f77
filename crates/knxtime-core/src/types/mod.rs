pub mod wall_clock;

pub use wall_clock::{DateOnly, WallClock, WallKind};
