//! Human-readable formatting and process memory probing.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::sync::Mutex;
use sysinfo::{MemoryRefreshKind, Pid, ProcessRefreshKind, RefreshKind, System};

static SYSTEM: Lazy<Mutex<System>> = Lazy::new(|| {
    Mutex::new(System::new_with_specifics(
        RefreshKind::new()
            .with_memory(MemoryRefreshKind::new().with_ram())
            .with_processes(ProcessRefreshKind::new().with_memory()),
    ))
});

/// Formats a count with thousands separators.
///
/// # Examples
/// ```
/// assert_eq!(docview::format::format_count(1234567), "1,234,567");
/// ```
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result
}

/// Formats a byte count using binary units.
///
/// # Examples
/// ```
/// assert_eq!(docview::format::format_size(512), "512 B");
/// assert_eq!(docview::format::format_size(1536), "1.5 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Formats an entry timestamp the way the listing shows it.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

/// Memory usage of this process and of the machine, in bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryUsage {
    pub process_bytes: u64,
    pub total_bytes: u64,
}

impl MemoryUsage {
    pub fn ratio(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            self.process_bytes as f64 / self.total_bytes as f64
        }
    }

    pub fn process_mb(&self) -> f64 {
        self.process_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Samples current process memory. Returns `None` where the platform does
/// not expose it.
pub fn current_memory_usage() -> Option<MemoryUsage> {
    let mut sys = SYSTEM.lock().unwrap_or_else(|e| e.into_inner());
    sys.refresh_memory();
    let pid = Pid::from_u32(std::process::id());
    sys.refresh_process_specifics(pid, ProcessRefreshKind::new().with_memory());

    let process = sys.process(pid)?;
    let total = sys.total_memory();
    if total == 0 {
        return None;
    }
    Some(MemoryUsage {
        process_bytes: process.memory(),
        total_bytes: total,
    })
}

/// Formats memory usage in MB as a human-readable string.
///
/// # Examples
/// ```
/// assert_eq!(docview::format::format_memory_mb(512.5), "Memory: 512.5 MB");
/// assert_eq!(docview::format::format_memory_mb(2048.0), "Memory: 2.00 GB");
/// ```
pub fn format_memory_mb(memory_mb: f64) -> String {
    if memory_mb > 1024.0 {
        format!("Memory: {:.2} GB", memory_mb / 1024.0)
    } else {
        format!("Memory: {:.1} MB", memory_mb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
    }

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-03-09 14:05");
    }

    #[test]
    fn test_memory_ratio_handles_zero_total() {
        let usage = MemoryUsage {
            process_bytes: 10,
            total_bytes: 0,
        };
        assert_eq!(usage.ratio(), 0.0);
    }
}
