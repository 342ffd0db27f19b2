//! Utilities that don't belong to the caches themselves.

pub mod recording;
pub mod typedefs;
