//! Timers, event rate limiting, observer lifetime, and tab visibility.
//!
//! Nothing here runs on its own: the host calls [`Coordinator::tick`] from
//! its event loop and acts on the returned events.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Periodic sweep of expired cache entries
    CacheCleanup,
    /// Periodic memory sample
    MemorySample,
    /// Resize has been quiet for the debounce delay
    ResizeSettle,
    /// Trailing edge of the scroll throttle
    ScrollTrailing,
}

impl TimerKind {
    /// Interval work is skipped while the tab is hidden.
    pub fn is_background(&self) -> bool {
        matches!(self, TimerKind::CacheCleanup | TimerKind::MemorySample)
    }
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    kind: TimerKind,
    due: Instant,
    /// `Some` for repeating timers
    every: Option<Duration>,
}

/// Named one-shot and interval timers. At most one timer per kind.
#[derive(Debug, Default)]
pub struct Timers {
    timers: Vec<Timer>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_interval(&mut self, kind: TimerKind, every: Duration, now: Instant) {
        self.cancel(kind);
        self.timers.push(Timer {
            kind,
            due: now + every,
            every: Some(every),
        });
    }

    pub fn schedule_once(&mut self, kind: TimerKind, at: Instant) {
        self.cancel(kind);
        self.timers.push(Timer {
            kind,
            due: at,
            every: None,
        });
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.timers.retain(|timer| timer.kind != kind);
    }

    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.timers.iter().any(|timer| timer.kind == kind)
    }

    /// Earliest pending deadline.
    pub fn next_due(&self) -> Option<Instant> {
        self.timers.iter().map(|timer| timer.due).min()
    }

    /// Pops every timer whose deadline has passed, re-arming interval timers.
    /// Missed intervals collapse into one firing.
    pub fn due(&mut self, now: Instant) -> Vec<TimerKind> {
        let mut fired = Vec::new();
        self.timers.retain_mut(|timer| {
            if timer.due > now {
                return true;
            }
            fired.push(timer.kind);
            match timer.every {
                Some(every) => {
                    timer.due = now + every;
                    true
                }
                None => false,
            }
        });
        fired
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

/// Leading-edge throttle that also delivers the last suppressed value once
/// the interval has passed.
#[derive(Debug, Clone)]
pub struct Throttle<T> {
    interval: Duration,
    last_fired: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
            pending: None,
        }
    }

    /// Returns the value if it may be acted on now; otherwise keeps it for
    /// the trailing edge.
    pub fn call(&mut self, value: T, now: Instant) -> Option<T> {
        let ready = self
            .last_fired
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval);
        if ready {
            self.last_fired = Some(now);
            self.pending = None;
            Some(value)
        } else {
            self.pending = Some(value);
            None
        }
    }

    /// When the suppressed value becomes deliverable.
    pub fn trailing_deadline(&self) -> Option<Instant> {
        match (&self.pending, self.last_fired) {
            (Some(_), Some(last)) => Some(last + self.interval),
            _ => None,
        }
    }

    /// Delivers the suppressed value if the interval has passed.
    pub fn flush(&mut self, now: Instant) -> Option<T> {
        let deadline = self.trailing_deadline()?;
        if now < deadline {
            return None;
        }
        self.last_fired = Some(now);
        self.pending.take()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// Delivers only the last value of a burst, once the burst has been quiet for
/// the delay.
#[derive(Debug, Clone)]
pub struct Debounce<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debounce<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replaces any pending value and restarts the delay. Returns the new
    /// deadline.
    pub fn call(&mut self, value: T, now: Instant) -> Instant {
        let deadline = now + self.delay;
        self.pending = Some((value, deadline));
        deadline
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub fn flush(&mut self, now: Instant) -> Option<T> {
        match self.pending.take() {
            Some((value, deadline)) if now >= deadline => Some(value),
            other => {
                self.pending = other;
                None
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverKind {
    /// Watches the end-of-list sentinel
    Intersection,
    /// Watches the scroll container size
    Resize,
    /// Watches render timing
    Performance,
}

/// Connection state of the host observers. Callbacks delivered after a
/// disconnect must be dropped by the caller.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Observers {
    intersection: bool,
    resize: bool,
    performance: bool,
}

impl Observers {
    pub fn connect(&mut self, kind: ObserverKind) {
        *self.flag(kind) = true;
    }

    pub fn disconnect(&mut self, kind: ObserverKind) {
        *self.flag(kind) = false;
    }

    pub fn disconnect_all(&mut self) {
        *self = Self::default();
    }

    pub fn is_connected(&self, kind: ObserverKind) -> bool {
        match kind {
            ObserverKind::Intersection => self.intersection,
            ObserverKind::Resize => self.resize,
            ObserverKind::Performance => self.performance,
        }
    }

    pub fn any_connected(&self) -> bool {
        self.intersection || self.resize || self.performance
    }

    fn flag(&mut self, kind: ObserverKind) -> &mut bool {
        match kind {
            ObserverKind::Intersection => &mut self.intersection,
            ObserverKind::Resize => &mut self.resize,
            ObserverKind::Performance => &mut self.performance,
        }
    }
}

/// Work the owner should perform, produced by [`Coordinator::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordinatorEvent {
    CleanupCache,
    SampleMemory,
    /// Apply a settled viewport height
    Resize(f32),
    /// Apply a throttled scroll position
    Scroll(f32),
}

pub struct Coordinator {
    timers: Timers,
    scroll: Throttle<f32>,
    resize: Debounce<f32>,
    observers: Observers,
    hidden: bool,
    /// A resize that settled while hidden
    deferred_resize: Option<f32>,
    destroyed: bool,
}

impl Coordinator {
    pub fn new(scroll_throttle: Duration, resize_debounce: Duration) -> Self {
        Self {
            timers: Timers::new(),
            scroll: Throttle::new(scroll_throttle),
            resize: Debounce::new(resize_debounce),
            observers: Observers::default(),
            hidden: false,
            deferred_resize: None,
            destroyed: false,
        }
    }

    /// Starts the interval timers.
    pub fn start(&mut self, cleanup_every: Duration, sample_every: Duration, now: Instant) {
        if self.destroyed {
            return;
        }
        self.timers
            .schedule_interval(TimerKind::CacheCleanup, cleanup_every, now);
        self.timers
            .schedule_interval(TimerKind::MemorySample, sample_every, now);
    }

    pub fn observers(&self) -> &Observers {
        &self.observers
    }

    pub fn observers_mut(&mut self) -> &mut Observers {
        &mut self.observers
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Throttles a scroll position. Returns it when it may be applied now.
    pub fn on_scroll(&mut self, scroll_top: f32, now: Instant) -> Option<f32> {
        if self.destroyed {
            return None;
        }
        let immediate = self.scroll.call(scroll_top, now);
        match self.scroll.trailing_deadline() {
            Some(at) => self.timers.schedule_once(TimerKind::ScrollTrailing, at),
            None => self.timers.cancel(TimerKind::ScrollTrailing),
        }
        immediate
    }

    /// Debounces a viewport size change. Only delivered when the resize
    /// observer is connected.
    pub fn on_resize(&mut self, viewport_height: f32, now: Instant) {
        if self.destroyed || !self.observers.is_connected(ObserverKind::Resize) {
            return;
        }
        let at = self.resize.call(viewport_height, now);
        self.timers.schedule_once(TimerKind::ResizeSettle, at);
    }

    /// Whether a sentinel intersection callback should be acted on.
    pub fn accepts_intersection(&self) -> bool {
        !self.destroyed && self.observers.is_connected(ObserverKind::Intersection)
    }

    /// Records tab visibility. Becoming visible returns a resize that settled
    /// while hidden.
    pub fn set_hidden(&mut self, hidden: bool) -> Option<f32> {
        if self.destroyed {
            return None;
        }
        let was_hidden = self.hidden;
        self.hidden = hidden;
        if was_hidden && !hidden {
            self.deferred_resize.take()
        } else {
            None
        }
    }

    /// Fires due timers and turns them into events.
    pub fn tick(&mut self, now: Instant) -> Vec<CoordinatorEvent> {
        if self.destroyed {
            return Vec::new();
        }

        let mut events = Vec::new();
        for kind in self.timers.due(now) {
            if kind.is_background() && self.hidden {
                continue;
            }
            match kind {
                TimerKind::CacheCleanup => events.push(CoordinatorEvent::CleanupCache),
                TimerKind::MemorySample => events.push(CoordinatorEvent::SampleMemory),
                TimerKind::ResizeSettle => {
                    if let Some(height) = self.resize.flush(now) {
                        if self.hidden {
                            self.deferred_resize = Some(height);
                        } else {
                            events.push(CoordinatorEvent::Resize(height));
                        }
                    }
                }
                TimerKind::ScrollTrailing => {
                    if let Some(scroll_top) = self.scroll.flush(now) {
                        events.push(CoordinatorEvent::Scroll(scroll_top));
                    }
                }
            }
        }
        events
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_due()
    }

    /// Disconnects observers and drops every timer. Idempotent.
    pub fn destroy(&mut self) {
        self.timers.clear();
        self.observers.disconnect_all();
        self.scroll.cancel();
        self.resize.cancel();
        self.deferred_resize = None;
        self.destroyed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_interval_timer_rearms() {
        let start = Instant::now();
        let mut timers = Timers::new();
        timers.schedule_interval(TimerKind::CacheCleanup, Duration::from_secs(60), start);

        assert!(timers.due(start + Duration::from_secs(59)).is_empty());
        assert_eq!(
            timers.due(start + Duration::from_secs(60)),
            vec![TimerKind::CacheCleanup]
        );
        assert!(timers.is_scheduled(TimerKind::CacheCleanup));
    }

    #[test]
    fn test_one_shot_timer_fires_once() {
        let start = Instant::now();
        let mut timers = Timers::new();
        timers.schedule_once(TimerKind::ResizeSettle, start + ms(150));

        assert_eq!(timers.due(start + ms(200)), vec![TimerKind::ResizeSettle]);
        assert!(timers.due(start + ms(400)).is_empty());
        assert!(timers.is_empty());
    }

    #[test]
    fn test_throttle_leading_and_trailing() {
        let start = Instant::now();
        let mut throttle = Throttle::new(ms(16));

        assert_eq!(throttle.call(1.0, start), Some(1.0));
        assert_eq!(throttle.call(2.0, start + ms(5)), None);
        assert_eq!(throttle.call(3.0, start + ms(10)), None);
        assert_eq!(throttle.flush(start + ms(12)), None);
        assert_eq!(throttle.flush(start + ms(16)), Some(3.0));
        assert_eq!(throttle.flush(start + ms(40)), None);
    }

    #[test]
    fn test_debounce_delivers_last_value_after_quiet_period() {
        let start = Instant::now();
        let mut debounce = Debounce::new(ms(150));

        debounce.call(300.0, start);
        debounce.call(480.0, start + ms(100));

        assert_eq!(debounce.flush(start + ms(200)), None);
        assert_eq!(debounce.flush(start + ms(250)), Some(480.0));
        assert!(!debounce.is_pending());
    }

    #[test]
    fn test_hidden_tab_skips_interval_work() {
        let start = Instant::now();
        let mut coordinator = Coordinator::new(ms(16), ms(150));
        coordinator.start(Duration::from_secs(60), Duration::from_secs(30), start);

        coordinator.set_hidden(true);
        let events = coordinator.tick(start + Duration::from_secs(61));

        assert!(events.is_empty());
        // Intervals keep running and resume when visible again.
        coordinator.set_hidden(false);
        let events = coordinator.tick(start + Duration::from_secs(125));
        assert!(events.contains(&CoordinatorEvent::CleanupCache));
        assert!(events.contains(&CoordinatorEvent::SampleMemory));
    }

    #[test]
    fn test_resize_settled_while_hidden_applies_on_show() {
        let start = Instant::now();
        let mut coordinator = Coordinator::new(ms(16), ms(150));
        coordinator.observers_mut().connect(ObserverKind::Resize);

        coordinator.set_hidden(true);
        coordinator.on_resize(720.0, start);
        assert!(coordinator.tick(start + ms(200)).is_empty());

        assert_eq!(coordinator.set_hidden(false), Some(720.0));
    }

    #[test]
    fn test_scroll_trailing_edge_is_delivered_by_tick() {
        let start = Instant::now();
        let mut coordinator = Coordinator::new(ms(16), ms(150));

        assert_eq!(coordinator.on_scroll(100.0, start), Some(100.0));
        assert_eq!(coordinator.on_scroll(180.0, start + ms(4)), None);

        assert_eq!(
            coordinator.tick(start + ms(20)),
            vec![CoordinatorEvent::Scroll(180.0)]
        );
    }

    #[test]
    fn test_destroy_drops_timers_and_callbacks() {
        let start = Instant::now();
        let mut coordinator = Coordinator::new(ms(16), ms(150));
        coordinator.observers_mut().connect(ObserverKind::Intersection);
        coordinator.observers_mut().connect(ObserverKind::Resize);
        coordinator.start(Duration::from_secs(60), Duration::from_secs(30), start);
        coordinator.on_resize(500.0, start);

        coordinator.destroy();
        coordinator.destroy();

        assert!(coordinator.timers().is_empty());
        assert!(!coordinator.accepts_intersection());
        assert!(coordinator.tick(start + Duration::from_secs(600)).is_empty());
        assert_eq!(coordinator.on_scroll(10.0, start), None);
    }
}
