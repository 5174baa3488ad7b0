//! Performance monitoring: render timing, memory pressure, cache effectiveness.
//!
//! The monitor is advisory. It never changes what is rendered; it only tells
//! its owner when a cleanup pass is due.

use crate::cache::CacheStats;
use crate::format::{current_memory_usage, MemoryUsage};
use crate::pool::NodePool;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

/// Source of process memory readings.
pub trait MemoryGauge {
    /// Current usage, or `None` when the platform does not expose it.
    fn sample(&self) -> Option<MemoryUsage>;
}

/// Reads process memory through `sysinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMemoryGauge;

impl MemoryGauge for SystemMemoryGauge {
    fn sample(&self) -> Option<MemoryUsage> {
        current_memory_usage()
    }
}

/// A gauge that never reports, for hosts without memory information.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMemoryGauge;

impl MemoryGauge for NoMemoryGauge {
    fn sample(&self) -> Option<MemoryUsage> {
        None
    }
}

impl<F> MemoryGauge for F
where
    F: Fn() -> Option<MemoryUsage>,
{
    fn sample(&self) -> Option<MemoryUsage> {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CleanupReason {
    HeapPressure { ratio: f64 },
    SlowRenders { consecutive: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MonitorAction {
    None,
    /// Clear the cache and the pool's free list
    Cleanup(CleanupReason),
}

/// Point-in-time performance figures for status display.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerformanceReport {
    pub last_render: Option<Duration>,
    pub average_render: Option<Duration>,
    pub render_count: u64,
    pub scroll_events: u64,
    pub memory: Option<MemoryUsage>,
    pub cache: CacheStats,
    pub pool_in_use: usize,
    pub pool_free: usize,
    pub pool_high_water: usize,
    pub cleanups: u64,
    /// False once the memory gauge failed or reported nothing
    pub memory_gauge_enabled: bool,
}

pub struct PerformanceMonitor {
    frame_budget: Duration,
    slow_render_limit: u32,
    heap_threshold: f64,
    gauge: Box<dyn MemoryGauge>,
    gauge_enabled: bool,
    consecutive_slow: u32,
    last_render: Option<Duration>,
    total_render: Duration,
    render_count: u64,
    scroll_events: u64,
    last_memory: Option<MemoryUsage>,
    cleanups: u64,
}

impl PerformanceMonitor {
    pub fn new(
        frame_budget: Duration,
        slow_render_limit: u32,
        heap_threshold: f64,
        gauge: Box<dyn MemoryGauge>,
    ) -> Self {
        Self {
            frame_budget,
            slow_render_limit: slow_render_limit.max(1),
            heap_threshold,
            gauge,
            gauge_enabled: true,
            consecutive_slow: 0,
            last_render: None,
            total_render: Duration::ZERO,
            render_count: 0,
            scroll_events: 0,
            last_memory: None,
            cleanups: 0,
        }
    }

    /// Records one render pass. Repeated over-budget passes request a cleanup.
    pub fn record_render(&mut self, duration: Duration) -> MonitorAction {
        self.last_render = Some(duration);
        self.total_render += duration;
        self.render_count += 1;

        if duration <= self.frame_budget {
            self.consecutive_slow = 0;
            return MonitorAction::None;
        }

        self.consecutive_slow += 1;
        tracing::debug!(
            "render took {:?}, over the {:?} budget ({} in a row)",
            duration,
            self.frame_budget,
            self.consecutive_slow
        );
        if self.consecutive_slow >= self.slow_render_limit {
            let consecutive = self.consecutive_slow;
            self.consecutive_slow = 0;
            return self.cleanup(CleanupReason::SlowRenders { consecutive });
        }
        MonitorAction::None
    }

    pub fn record_scroll(&mut self) {
        self.scroll_events += 1;
    }

    /// Reads the memory gauge. A gauge that panics or reports nothing turns
    /// memory monitoring off for the rest of the monitor's life.
    pub fn sample_memory(&mut self) -> MonitorAction {
        if !self.gauge_enabled {
            return MonitorAction::None;
        }

        let gauge = &self.gauge;
        let usage = match panic::catch_unwind(AssertUnwindSafe(|| gauge.sample())) {
            Ok(Some(usage)) => usage,
            Ok(None) => {
                tracing::debug!("memory usage unavailable, disabling memory monitoring");
                self.gauge_enabled = false;
                return MonitorAction::None;
            }
            Err(_) => {
                tracing::warn!("memory gauge failed, disabling memory monitoring");
                self.gauge_enabled = false;
                return MonitorAction::None;
            }
        };

        self.last_memory = Some(usage);
        let ratio = usage.ratio();
        if ratio > self.heap_threshold {
            self.cleanup(CleanupReason::HeapPressure { ratio })
        } else {
            MonitorAction::None
        }
    }

    fn cleanup(&mut self, reason: CleanupReason) -> MonitorAction {
        self.cleanups += 1;
        MonitorAction::Cleanup(reason)
    }

    pub fn is_memory_gauge_enabled(&self) -> bool {
        self.gauge_enabled
    }

    pub fn snapshot(&self, cache: CacheStats, pool: &NodePool) -> PerformanceReport {
        PerformanceReport {
            last_render: self.last_render,
            average_render: (self.render_count > 0)
                .then(|| self.total_render / self.render_count.min(u32::MAX as u64) as u32),
            render_count: self.render_count,
            scroll_events: self.scroll_events,
            memory: self.last_memory,
            cache,
            pool_in_use: pool.in_use_count(),
            pool_free: pool.free_count(),
            pool_high_water: pool.high_water_mark(),
            cleanups: self.cleanups,
            memory_gauge_enabled: self.gauge_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor_with(gauge: Box<dyn MemoryGauge>) -> PerformanceMonitor {
        PerformanceMonitor::new(Duration::from_millis(16), 3, 0.8, gauge)
    }

    #[test]
    fn test_three_slow_renders_trigger_cleanup() {
        let mut monitor = monitor_with(Box::new(NoMemoryGauge));
        let slow = Duration::from_millis(30);

        assert_eq!(monitor.record_render(slow), MonitorAction::None);
        assert_eq!(monitor.record_render(slow), MonitorAction::None);
        assert_eq!(
            monitor.record_render(slow),
            MonitorAction::Cleanup(CleanupReason::SlowRenders { consecutive: 3 })
        );
    }

    #[test]
    fn test_fast_render_resets_slow_streak() {
        let mut monitor = monitor_with(Box::new(NoMemoryGauge));
        let slow = Duration::from_millis(30);

        monitor.record_render(slow);
        monitor.record_render(slow);
        monitor.record_render(Duration::from_millis(4));

        assert_eq!(monitor.record_render(slow), MonitorAction::None);
    }

    #[test]
    fn test_heap_pressure_triggers_cleanup() {
        let gauge = || {
            Some(MemoryUsage {
                process_bytes: 90,
                total_bytes: 100,
            })
        };
        let mut monitor = monitor_with(Box::new(gauge));

        let action = monitor.sample_memory();

        assert!(matches!(action, MonitorAction::Cleanup(CleanupReason::HeapPressure { .. })));
    }

    #[test]
    fn test_missing_memory_info_disables_gauge() {
        let mut monitor = monitor_with(Box::new(NoMemoryGauge));

        assert_eq!(monitor.sample_memory(), MonitorAction::None);
        assert!(!monitor.is_memory_gauge_enabled());
    }

    #[test]
    fn test_panicking_gauge_degrades_to_disabled() {
        let gauge = || -> Option<MemoryUsage> { panic!("gauge unavailable") };
        let mut monitor = monitor_with(Box::new(gauge));

        assert_eq!(monitor.sample_memory(), MonitorAction::None);
        assert!(!monitor.is_memory_gauge_enabled());
    }

    #[test]
    fn test_snapshot_reports_averages() {
        let mut monitor = monitor_with(Box::new(NoMemoryGauge));
        monitor.record_render(Duration::from_millis(2));
        monitor.record_render(Duration::from_millis(4));
        monitor.record_scroll();

        let report = monitor.snapshot(CacheStats::default(), &NodePool::new());

        assert_eq!(report.render_count, 2);
        assert_eq!(report.average_render, Some(Duration::from_millis(3)));
        assert_eq!(report.last_render, Some(Duration::from_millis(4)));
        assert_eq!(report.scroll_events, 1);
    }
}
