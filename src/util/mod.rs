//! Utility modules for sysprobe.

mod host;

pub use host::{clock_ticks, page_size};
