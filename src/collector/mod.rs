//! Process and host collectors for Linux, FreeBSD, OpenBSD and macOS.
//!
//! One [`Platform`] adapter per kernel decodes native records into the
//! canonical model; the samplers on top of it are portable.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Collector                           │
//! │  ┌──────────────┐  ┌───────────────┐  ┌──────────────────┐  │
//! │  │  CpuSampler  │  │NetworkSampler │  │  PowerSampler    │  │
//! │  │  (window)    │  │  (window)     │  │  (discovery)     │  │
//! │  └──────┬───────┘  └───────┬───────┘  └────────┬─────────┘  │
//! │         └──────────────────┼───────────────────┘            │
//! │                     ┌──────▼──────┐                         │
//! │                     │  Platform   │ (trait)                 │
//! │                     └──────┬──────┘                         │
//! └────────────────────────────┼────────────────────────────────┘
//!                              │
//!       ┌──────────────┬───────┴──────┬──────────────┐
//!       │              │              │              │
//! ┌─────▼──────┐ ┌─────▼─────┐ ┌──────▼─────┐ ┌──────▼──────┐
//! │   ProcFs   │ │  FreeBsd  │ │  OpenBsd   │ │   Darwin    │
//! │ (/proc,    │ │ (sysctl)  │ │ (sysctl,   │ │ (libproc,   │
//! │  /sys)     │ │           │ │  sensors)  │ │  Mach)      │
//! └─────┬──────┘ └───────────┘ └────────────┘ └─────────────┘
//!       │
//! ┌─────▼──────┐
//! │ FileSystem │ RealFs / MockFs
//! └────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production
//!
//! ```no_run
//! use sysprobe::collector::{Collector, native};
//!
//! let mut collector = Collector::new(native().unwrap());
//! let processes = collector.processes();
//! let sample = collector.sample_system();
//! println!("{} processes, cpu {:.1}%", processes.len(), sample.cpu_percent);
//! ```
//!
//! ## Testing (with MockFs)
//!
//! ```
//! use std::time::Duration;
//! use sysprobe::collector::{Collector, MockFs, ProcFs};
//!
//! let platform = ProcFs::new(MockFs::typical_system(), "/proc").with_page_size(4096);
//! let mut collector = Collector::new(platform).with_sample_window(Duration::ZERO);
//! assert!(!collector.processes().is_empty());
//! assert_eq!(collector.sample_system().cpu_count, 4);
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod error;
pub mod mock;
pub mod platform;
pub mod power;
pub mod procfs;
pub mod sampler;
pub mod state;
pub mod sysctl;
pub mod traits;
pub mod unsupported;

pub use collector::{Collector, CollectorTiming};
pub use error::CollectError;
pub use mock::MockFs;
pub use platform::{CpuTicks, NativePlatform, NetCounters, Platform, native};
pub use power::PowerSampler;
pub use procfs::ProcFs;
pub use sampler::{CpuSampler, NetworkSampler};
pub use state::ProcessState;
pub use traits::{FileSystem, RealFs};
pub use unsupported::Unsupported;
