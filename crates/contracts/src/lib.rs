//! # Contracts
//!
//! Frozen interface contracts shared by every relay crate.
//! Business crates depend on this crate only, never on each other's internals.
//!
//! ## Time Model
//! - All timestamps are seconds (f64) relative to the session start captured by [`SessionClock`]
//! - Outbound timestamps are rounded to milliseconds

mod blueprint;
mod category;
mod clock;
mod codec;
mod error;
mod event;
mod log;
mod sink;

pub use blueprint::*;
pub use category::{CacheCategory, LogCategory};
pub use clock::SessionClock;
pub use codec::{OutboundQueue, PacketCodec};
pub use error::*;
pub use event::{RelayEvent, SensorReadings, SensorRecord, Topic};
pub use log::{Log, LogMessage, Packet, Priority};
pub use sink::*;
