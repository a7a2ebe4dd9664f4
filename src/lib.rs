//! sysprobe - process and host telemetry snapshots.
//!
//! This library provides:
//! - [`collector`]: per-kernel adapters and the samplers built on them
//! - [`model`]: the canonical snapshot types they produce
//! - [`rates`]: caller-side CPU usage from successive process snapshots

pub mod collector;
pub mod model;
pub mod rates;
pub mod util;
