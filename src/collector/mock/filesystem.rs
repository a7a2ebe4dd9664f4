//! In-memory mock filesystem for testing the Linux adapter without a real
//! `/proc` or `/sys`.
//!
//! This lets the procfs and sysfs decoding run on macOS, the BSDs and in CI.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// In-memory filesystem for testing.
///
/// Stores files and directories in memory, allowing tests to simulate
/// kernel pseudo-filesystem states that are hard to reproduce on a live host.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Removes a file, as if the kernel dropped it between two reads.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) {
        self.files.remove(path.as_ref());
    }

    /// Adds a process with the two `/proc/[pid]/` files the adapter reads.
    ///
    /// # Arguments
    /// * `pid` - Process ID
    /// * `stat` - Content of `/proc/[pid]/stat`
    /// * `status` - Content of `/proc/[pid]/status`
    pub fn add_process(&mut self, pid: u32, stat: &str, status: &str) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        self.add_dir(&base);
        self.add_file(base.join("stat"), stat);
        self.add_file(base.join("status"), status);
    }

    /// Adds `/sys/class/power_supply/<name>` with the given attribute files.
    pub fn add_power_supply(&mut self, name: &str, attributes: &[(&str, &str)]) {
        let base = PathBuf::from("/sys/class/power_supply").join(name);
        self.add_dir(&base);
        for (attr, value) in attributes {
            self.add_file(base.join(attr), *value);
        }
    }

    /// Adds `/sys/class/thermal/thermal_zone<index>` with `type` and `temp`.
    pub fn add_thermal_zone(&mut self, index: u32, kind: &str, millidegrees: &str) {
        self.add_thermal_zone_at("/sys", index, kind, millidegrees);
    }

    /// Like [`add_thermal_zone`](Self::add_thermal_zone) under another sysfs root.
    pub fn add_thermal_zone_at(
        &mut self,
        sys_root: &str,
        index: u32,
        kind: &str,
        millidegrees: &str,
    ) {
        let base = PathBuf::from(sys_root).join(format!("class/thermal/thermal_zone{}", index));
        self.add_file(base.join("type"), format!("{}\n", kind));
        self.add_file(base.join("temp"), format!("{}\n", millidegrees));
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.directories.contains(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let mut entries = HashSet::new();

        // Direct children only
        for file_path in self.files.keys() {
            if file_path.parent().is_some_and(|parent| parent == path) {
                entries.insert(file_path.clone());
            }
        }

        for dir_path in &self.directories {
            if dir_path.parent().is_some_and(|parent| parent == path) && dir_path != path {
                entries.insert(dir_path.clone());
            }
        }

        Ok(entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_file() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/meminfo", "MemTotal: 16384 kB\n");

        assert!(fs.exists(Path::new("/proc/meminfo")));
        assert!(fs.exists(Path::new("/proc")));

        let content = fs.read_to_string(Path::new("/proc/meminfo")).unwrap();
        assert_eq!(content, "MemTotal: 16384 kB\n");
    }

    #[test]
    fn test_mock_fs_read_dir() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/1/stat", "stat content");
        fs.add_file("/proc/1/status", "status content");
        fs.add_file("/proc/2/stat", "stat content 2");

        let proc_entries = fs.read_dir(Path::new("/proc")).unwrap();
        assert_eq!(proc_entries.len(), 2); // /proc/1 and /proc/2

        let proc1_entries = fs.read_dir(Path::new("/proc/1")).unwrap();
        assert_eq!(proc1_entries.len(), 2); // stat and status
    }

    #[test]
    fn test_mock_fs_remove_file() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/7/stat", "x");
        fs.remove_file("/proc/7/stat");

        assert!(!fs.exists(Path::new("/proc/7/stat")));
        assert!(fs.exists(Path::new("/proc/7")));
    }

    #[test]
    fn test_mock_fs_sysfs_helpers() {
        let mut fs = MockFs::new();
        fs.add_power_supply("BAT0", &[("energy_full", "100"), ("energy_now", "50")]);
        fs.add_thermal_zone(3, "x86_pkg_temp", "42000");

        assert!(fs.exists(Path::new("/sys/class/power_supply/BAT0/energy_now")));
        let kind = fs
            .read_to_string(Path::new("/sys/class/thermal/thermal_zone3/type"))
            .unwrap();
        assert_eq!(kind, "x86_pkg_temp\n");
    }

    #[test]
    fn test_mock_fs_not_found() {
        let fs = MockFs::new();
        let result = fs.read_to_string(Path::new("/nonexistent"));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
        assert!(fs.read_dir(Path::new("/proc")).is_err());
    }
}
