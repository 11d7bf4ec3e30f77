//! KNX time primitives in pure Rust.
//!
//! `knxtime-core` provides the wall-clock value type, proleptic-Gregorian
//! calendar math, a POSIX timezone-rule engine, and the KNX datapoint (DPT)
//! codecs used by time-aware devices. It has no runtime dependencies and can
//! be used standalone in embedded or constrained environments.
//!
//! # Feature flags
//!
//! - **`std`** (default) — enables `std::error::Error` implementations.
//! - **`serde`** — derives `Serialize`/`Deserialize` on core types.
//! - **`defmt`** — derives `defmt::Format` for embedded logging.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

/// Proleptic Gregorian day-count arithmetic.
pub mod civil;
/// KNX datapoint codecs for time, date, date-time, and switch payloads.
pub mod dpt;
/// Bounded byte reader/writer for fixed-size group payloads.
pub mod encoding;
/// Error types for decoding, encoding, and timezone-rule parsing.
pub mod error;
/// POSIX timezone-rule parsing and daylight-saving evaluation.
pub mod tz;
/// Wall-clock value types.
pub mod types;

pub use error::{DecodeError, EncodeError, TzError};
pub use tz::{DstVerdict, TzRule};
pub use types::{DateOnly, WallClock, WallKind};
