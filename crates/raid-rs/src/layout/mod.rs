//! Layout layer: block buffers, scheme identifiers and the translators that
//! map virtual blocks onto disks.

pub mod bits;
pub mod scheme;
pub mod stripe;
