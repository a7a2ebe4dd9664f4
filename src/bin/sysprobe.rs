//! sysprobe - polls process and host telemetry and logs it.
//!
//! Each round enumerates processes, computes per-process CPU usage from the
//! previous round, and takes one system sample.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use sysprobe::collector::{CollectError, Collector, NativePlatform, Platform};
use sysprobe::model::{ProcessSnapshot, SystemSample};
use sysprobe::rates::ProcessCpuRates;

/// Process and host telemetry poller.
#[derive(Parser)]
#[command(name = "sysprobe", about = "Process and host telemetry poller", version)]
struct Args {
    /// Seconds between rounds. The one-second sampling window is part of it.
    #[arg(short, long, default_value = "2")]
    interval: u64,

    /// Number of rounds, 0 runs until interrupted.
    #[arg(short, long, default_value = "0")]
    count: u64,

    /// Track a single process until it exits.
    #[arg(short, long)]
    pid: Option<u32>,

    /// Processes listed per round, by CPU usage.
    #[arg(short, long, default_value = "10")]
    top: usize,

    /// Path to /proc filesystem (Linux only).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Path to /sys filesystem (Linux only).
    #[arg(long, default_value = "/sys")]
    sys_path: String,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("sysprobe={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[cfg(target_os = "linux")]
fn build_platform(args: &Args) -> Result<NativePlatform, CollectError> {
    use sysprobe::collector::{ProcFs, RealFs};
    Ok(ProcFs::new(RealFs::new(), &args.proc_path).with_sys_path(&args.sys_path))
}

#[cfg(not(target_os = "linux"))]
fn build_platform(args: &Args) -> Result<NativePlatform, CollectError> {
    if args.proc_path != "/proc" || args.sys_path != "/sys" {
        warn!("--proc-path and --sys-path only apply on Linux");
    }
    sysprobe::collector::native()
}

/// Formats KiB as a human-readable size string.
fn format_kb(kb: u64) -> String {
    const GB: u64 = 1024 * 1024;
    const MB: u64 = 1024;

    if kb >= GB {
        format!("{:.1}G", kb as f64 / GB as f64)
    } else if kb >= MB {
        format!("{:.1}M", kb as f64 / MB as f64)
    } else {
        format!("{}K", kb)
    }
}

/// Highest `cpu_usage` first, ties by pid.
fn top_by_cpu(processes: &mut [ProcessSnapshot], n: usize) -> &[ProcessSnapshot] {
    processes.sort_by(|a, b| {
        b.cpu_usage
            .total_cmp(&a.cpu_usage)
            .then_with(|| a.pid.cmp(&b.pid))
    });
    &processes[..n.min(processes.len())]
}

fn describe_sample(sample: &SystemSample) -> String {
    let mut parts = vec![
        format!("cpu {:.1}% x{}", sample.cpu_percent, sample.cpu_count),
        format!(
            "mem {}/{}",
            format_kb(sample.memory.used),
            format_kb(sample.memory.total)
        ),
        format!(
            "swap {}/{}",
            format_kb(sample.memory.swap_used),
            format_kb(sample.memory.swap_total)
        ),
        format!(
            "net in {}B out {}B",
            sample.network.bytes_in, sample.network.bytes_out
        ),
    ];
    if let Some(temp) = sample.temperature {
        parts.push(format!("temp {}C", temp));
    }
    if sample.power.battery_count > 0 {
        parts.push(format!(
            "battery {}%{}",
            sample.power.battery_percent,
            if sample.power.has_ac { " (ac)" } else { "" }
        ));
    }
    parts.join(", ")
}

fn log_process(process: &ProcessSnapshot) {
    info!(
        pid = process.pid,
        uid = process.uid,
        state = %process.state,
        cpu = process.cpu_usage,
        rss = process.mem_resident_size,
        threads = process.thread_count,
        "{}",
        process.command
    );
}

/// One polling round. Returns false when a tracked pid has exited or cannot
/// be looked up at all.
fn poll<P: Platform>(
    collector: &mut Collector<P>,
    rates: &mut ProcessCpuRates,
    args: &Args,
) -> bool {
    match args.pid {
        Some(pid) => match collector.process(pid) {
            Ok(process) => {
                let mut tracked = [process];
                rates.update(&mut tracked);
                log_process(&tracked[0]);
            }
            Err(CollectError::ProcessGone(_)) => {
                info!(pid, "process exited");
                return false;
            }
            Err(e @ CollectError::Unsupported(_)) => {
                error!(pid, "cannot track processes: {}", e);
                return false;
            }
            Err(e) => error!(pid, "failed to read process: {}", e),
        },
        None => {
            let mut processes = collector.processes();
            rates.update(&mut processes);
            info!("{} processes", processes.len());
            for process in top_by_cpu(&mut processes, args.top) {
                log_process(process);
            }
        }
    }

    let sample = collector.sample_system();
    info!("{}", describe_sample(&sample));
    if let Some(timing) = collector.last_timing() {
        debug!(
            total_ms = timing.total.as_millis() as u64,
            memory_ms = timing.memory.as_millis() as u64,
            power_ms = timing.power.as_millis() as u64,
            "sample timing"
        );
    }
    true
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    info!("sysprobe {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}s, count={}, top={}",
        args.interval, args.count, args.top
    );

    let platform = match build_platform(&args) {
        Ok(platform) => platform,
        Err(e) => {
            error!("No usable platform backend: {}", e);
            std::process::exit(1);
        }
    };
    let mut collector = Collector::new(platform);
    let mut rates = ProcessCpuRates::new(collector.cpu_time_per_second());

    let interval = Duration::from_secs(args.interval);

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let mut rounds: u64 = 0;
    while running.load(Ordering::SeqCst) {
        rounds += 1;
        if !poll(&mut collector, &mut rates, &args) {
            break;
        }
        if args.count != 0 && rounds >= args.count {
            break;
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!("Shutdown complete after {} rounds", rounds);
}
