//! Mock implementations for testing.
//!
//! This module provides `MockFs` and pre-built scenarios for testing the
//! Linux adapter without a real `/proc`, plus a scripted platform for the
//! delta samplers.

mod filesystem;
mod scenarios;
#[cfg(test)]
mod scripted;

pub use filesystem::MockFs;
#[cfg(test)]
pub use scripted::ScriptedPlatform;
