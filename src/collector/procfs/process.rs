//! Process collector reading `/proc/[pid]/stat` and `/proc/[pid]/status`.

use crate::collector::error::CollectError;
use crate::collector::procfs::parser::{parse_proc_stat, parse_status_uid};
use crate::collector::state::ProcessState;
use crate::collector::traits::FileSystem;
use crate::model::{ProcessSnapshot, bounded_command};
use std::io;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Collects per-process snapshots from `/proc/[pid]/` files.
pub struct ProcessCollector<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
    page_size: u64,
}

impl<F: FileSystem> ProcessCollector<F> {
    /// Creates a new process collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    /// * `page_size` - Bytes per page, used to convert rss
    pub fn new(fs: F, proc_path: impl Into<PathBuf>, page_size: u64) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            page_size,
        }
    }

    pub fn set_page_size(&mut self, page_size: u64) {
        self.page_size = page_size;
    }

    /// Collects a snapshot of a single process.
    ///
    /// A missing `stat` or `status` file means the process is gone.
    pub fn collect_process(&self, pid: u32) -> Result<ProcessSnapshot, CollectError> {
        let proc_dir = self.proc_path.join(pid.to_string());

        let stat_content = self
            .fs
            .read_to_string(&proc_dir.join("stat"))
            .map_err(|e| gone_or_io(pid, e))?;
        let stat = parse_proc_stat(&stat_content)?;

        let status_content = self
            .fs
            .read_to_string(&proc_dir.join("status"))
            .map_err(|e| gone_or_io(pid, e))?;
        let uid = parse_status_uid(&status_content)?;

        Ok(ProcessSnapshot {
            pid: stat.pid,
            uid,
            command: bounded_command(&stat.comm, stat.pid),
            cpu_id: stat.processor,
            cpu_time: stat.utime + stat.stime,
            priority: stat.priority,
            nice: stat.nice,
            thread_count: stat.num_threads,
            mem_virtual_size: stat.vsize,
            mem_resident_size: stat.rss.saturating_mul(self.page_size),
            state: ProcessState::from_linux_code(stat.state),
            cpu_usage: 0.0,
        })
    }

    /// Collects snapshots of all processes.
    ///
    /// Processes that disappear or fail to parse during collection are
    /// skipped. An unreadable proc root yields an empty list.
    pub fn collect_all_processes(&self) -> Vec<ProcessSnapshot> {
        let entries = match self.fs.read_dir(&self.proc_path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.proc_path.display(), error = %e, "cannot list proc root");
                return Vec::new();
            }
        };

        let mut processes = Vec::new();

        for entry in entries {
            let Some(pid) = entry
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|name| name.parse::<u32>().ok())
                .filter(|&pid| pid > 0)
            else {
                continue;
            };

            match self.collect_process(pid) {
                Ok(snapshot) => processes.push(snapshot),
                Err(e) => debug!(pid, error = %e, "skipping process"),
            }
        }

        processes
    }
}

fn gone_or_io(pid: u32, e: io::Error) -> CollectError {
    match e.kind() {
        io::ErrorKind::NotFound => CollectError::ProcessGone(pid),
        // ESRCH surfaces when the task exits while its files are open.
        #[cfg(unix)]
        _ if e.raw_os_error() == Some(libc::ESRCH) => CollectError::ProcessGone(pid),
        _ => CollectError::Io(e),
    }
}
