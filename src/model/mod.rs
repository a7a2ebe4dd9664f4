//! Canonical data model shared by every platform backend.
//!
//! - [`process`]: one [`ProcessSnapshot`] per live process
//! - [`system`]: host-wide [`SystemSample`] and its parts
//!
//! Platform adapters decode raw kernel data straight into these types; nothing
//! platform-specific crosses this boundary.

mod process;
mod system;

pub use process::{COMMAND_MAX_LEN, ProcessSnapshot, bounded_command};
pub use system::{
    CoreUsage, CpuUsage, MemoryUsage, NetworkTransfer, PowerStatus, SystemSample,
};
