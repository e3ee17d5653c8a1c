//! Behavior shared by the scheme translators.

pub mod translate;
