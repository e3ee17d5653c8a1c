//! Software RAID engine: striping, mirroring and parity over a set of block devices.
#![allow(clippy::cargo_common_metadata)]

pub mod config;
pub mod engine;
pub mod error;
pub mod layout;
pub mod metrics;
pub mod retention;

#[cfg(test)]
mod testing;

pub use config::EngineConfig;
pub use engine::{ArrayStatus, DiskStatus, RaidEngine, RaidInfo};
pub use error::{RaidError, RaidResult};
pub use layout::scheme::Scheme;
