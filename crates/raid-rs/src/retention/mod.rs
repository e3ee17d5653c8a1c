//! Retention layer: physical devices, the disk registry, redundancy
//! coordination, persisted metadata and the byte-level volume view.

pub mod array;
pub mod disk;
pub mod meta;
pub mod mirror;
pub mod parity;
pub mod volume;
