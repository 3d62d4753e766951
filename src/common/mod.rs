//! Shared utilities used by both the hub core and the binaries.

pub mod logger;
pub mod time;
