//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions that parse the content of `/proc` files into
//! structured data, so every quirk of the format can be tested with plain
//! string inputs.

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Minimum number of fields after `(comm)`: `state` through `processor`.
pub const STAT_MIN_FIELDS: usize = 37;

/// Fields of `/proc/[pid]/stat` that make up a process snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStat {
    pub pid: u32,
    pub comm: String,
    pub state: char,
    pub utime: u64,
    pub stime: u64,
    pub priority: i32,
    pub nice: i32,
    pub num_threads: u32,
    /// Virtual size in bytes.
    pub vsize: u64,
    /// Resident set size in pages.
    pub rss: u64,
    pub processor: i32,
}

/// Parses `/proc/[pid]/stat` content.
///
/// The comm field can contain spaces and parentheses, so it is taken as
/// everything between the first `(` and the last `)`.
/// Format: pid (comm) state ppid pgrp session tty_nr ...
pub fn parse_proc_stat(content: &str) -> Result<ProcStat, ParseError> {
    let content = content.trim();

    let open_paren = content
        .find('(')
        .ok_or_else(|| ParseError::new("missing '(' in stat"))?;
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("missing ')' in stat"))?;

    if close_paren <= open_paren {
        return Err(ParseError::new("invalid parentheses in stat"));
    }

    let pid: u32 = content[..open_paren]
        .trim()
        .parse()
        .map_err(|_| ParseError::new("invalid pid"))?;

    let comm = content[open_paren + 1..close_paren].to_string();

    let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();
    if fields.len() < STAT_MIN_FIELDS {
        return Err(ParseError::new(format!(
            "not enough fields in stat: expected {}+, got {}",
            STAT_MIN_FIELDS,
            fields.len()
        )));
    }

    fn field<T: std::str::FromStr>(
        fields: &[&str],
        idx: usize,
        name: &str,
    ) -> Result<T, ParseError> {
        fields[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    }

    // Kernel threads report a negative rss on some kernels.
    let rss: i64 = field(&fields, 21, "rss")?;

    Ok(ProcStat {
        pid,
        comm,
        state: fields[0].chars().next().unwrap_or('?'),
        utime: field(&fields, 11, "utime")?,
        stime: field(&fields, 12, "stime")?,
        priority: field(&fields, 15, "priority")?,
        nice: field(&fields, 16, "nice")?,
        num_threads: field::<i64>(&fields, 17, "num_threads")?.max(0) as u32,
        vsize: field(&fields, 20, "vsize")?,
        rss: rss.max(0) as u64,
        processor: field(&fields, 36, "processor")?,
    })
}

/// Extracts the real uid from `/proc/[pid]/status`.
///
/// The `Uid:` line holds real, effective, saved and filesystem ids; only
/// the first column is used.
pub fn parse_status_uid(content: &str) -> Result<u32, ParseError> {
    let line = content
        .lines()
        .find_map(|line| line.strip_prefix("Uid:"))
        .ok_or_else(|| ParseError::new("missing Uid line in status"))?;

    line.split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ParseError::new("invalid Uid line in status"))
}

/// Parsed data from `/proc/meminfo`. Values in kB.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemInfo {
    pub mem_total: u64,
    pub mem_free: u64,
    pub buffers: u64,
    pub cached: u64,
    pub slab: u64,
    pub shmem: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

/// Parses `/proc/meminfo` content.
///
/// Missing keys stay at zero.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let mut info = MemInfo::default();
    let mut seen = false;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let kb = value
            .split_whitespace()
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        let slot = match key.trim() {
            "MemTotal" => &mut info.mem_total,
            "MemFree" => &mut info.mem_free,
            "Buffers" => &mut info.buffers,
            "Cached" => &mut info.cached,
            "Slab" => &mut info.slab,
            "Shmem" => &mut info.shmem,
            "SwapTotal" => &mut info.swap_total,
            "SwapFree" => &mut info.swap_free,
            _ => continue,
        };
        *slot = kb;
        seen = true;
    }

    if !seen {
        return Err(ParseError::new("no known keys in meminfo"));
    }
    Ok(info)
}

/// Tick counters of one `cpuN` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuTimes {
    pub cpu_id: u32,
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
}

/// Parses the per-core `cpuN` lines of `/proc/stat`.
///
/// The aggregate `cpu` line and every non-cpu line are ignored. Cores are
/// returned in file order.
pub fn parse_cpu_times(content: &str) -> Result<Vec<CpuTimes>, ParseError> {
    let mut cores = Vec::new();

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let Some(label) = parts.next() else {
            continue;
        };
        let Some(id) = label.strip_prefix("cpu") else {
            continue;
        };
        if id.is_empty() {
            continue;
        }
        let cpu_id: u32 = id
            .parse()
            .map_err(|_| ParseError::new(format!("invalid cpu label '{}'", label)))?;

        let mut next = || -> Result<u64, ParseError> {
            parts
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| ParseError::new(format!("short counter line for {}", label)))
        };

        cores.push(CpuTimes {
            cpu_id,
            user: next()?,
            nice: next()?,
            system: next()?,
            idle: next()?,
        });
    }

    Ok(cores)
}

/// Byte counters of one interface from `/proc/net/dev`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetDevStats {
    /// Interface name (eth0, lo, etc.)
    pub interface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Parses `/proc/net/dev` content.
///
/// Format:
/// Inter-|   Receive                                                |  Transmit
///  face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
///    lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0
pub fn parse_net_dev(content: &str) -> Result<Vec<NetDevStats>, ParseError> {
    let mut devices = Vec::new();

    for line in content.lines() {
        if line.contains('|') || line.trim().is_empty() {
            continue;
        }

        let Some((name, counters)) = line.rsplit_once(':') else {
            continue;
        };
        let values: Vec<&str> = counters.split_whitespace().collect();
        if values.len() < 16 {
            continue;
        }

        let get_val =
            |idx: usize| -> u64 { values.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

        devices.push(NetDevStats {
            interface: name.trim().to_string(),
            rx_bytes: get_val(0),
            tx_bytes: get_val(8),
        });
    }

    Ok(devices)
}
