//! Row windowing for virtual scrolling.
//!
//! Computes which contiguous index range of the full list is materialized for
//! a scroll position, and decides when a scroll movement is large enough to be
//! worth a re-render.

/// Default number of rows the start index must move before re-rendering.
pub const DEFAULT_HYSTERESIS_ROWS: usize = 5;

/// Half-open row index range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibleRange {
    pub start: usize,
    pub end: usize,
}

impl VisibleRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.end).contains(&index)
    }
}

/// The currently materialized window and its geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewWindow {
    pub visible_start: usize,
    pub visible_end: usize,
    pub row_height: f32,
    pub buffer_size: usize,
}

/// Computes the rows to materialize for a scroll position.
///
/// `start = floor(scroll_top / row_height)` and
/// `end = min(start + ceil(viewport_height / row_height) + buffer_size, total_rows)`,
/// both clamped to `[0, total_rows]`.
pub fn compute_visible_range(
    scroll_top: f32,
    viewport_height: f32,
    row_height: f32,
    buffer_size: usize,
    total_rows: usize,
) -> VisibleRange {
    if !(row_height > 0.0) || total_rows == 0 {
        return VisibleRange::default();
    }

    let scroll_top = if scroll_top.is_finite() { scroll_top.max(0.0) } else { 0.0 };
    let viewport_height = if viewport_height.is_finite() { viewport_height.max(0.0) } else { 0.0 };

    let start = ((scroll_top / row_height).floor() as usize).min(total_rows);
    let visible_rows = (viewport_height / row_height).ceil() as usize;
    let end = start
        .saturating_add(visible_rows)
        .saturating_add(buffer_size)
        .min(total_rows);

    VisibleRange { start, end }
}

/// Tracks the current window and filters out sub-threshold scroll movement.
#[derive(Debug, Clone)]
pub struct RowWindowManager {
    row_height: f32,
    buffer_size: usize,
    hysteresis_rows: usize,
    viewport_height: f32,
    current: Option<VisibleRange>,
    /// Set when geometry or row count changed; forces the next emission
    dirty: bool,
    total_rows: usize,
}

impl RowWindowManager {
    pub fn new(row_height: f32, buffer_size: usize, hysteresis_rows: usize) -> Self {
        Self {
            row_height,
            buffer_size,
            hysteresis_rows,
            viewport_height: 0.0,
            current: None,
            dirty: true,
            total_rows: 0,
        }
    }

    /// True only if the start index moved by more than the hysteresis threshold.
    pub fn should_update(&self, previous: VisibleRange, new: VisibleRange) -> bool {
        previous.start.abs_diff(new.start) > self.hysteresis_rows
    }

    /// Recomputes the range for a scroll position and returns it when the
    /// renderer should act on it.
    pub fn update(&mut self, scroll_top: f32, total_rows: usize) -> Option<VisibleRange> {
        if total_rows != self.total_rows {
            self.total_rows = total_rows;
            self.dirty = true;
        }

        let new = compute_visible_range(
            scroll_top,
            self.viewport_height,
            self.row_height,
            self.buffer_size,
            total_rows,
        );

        let emit = match self.current {
            Some(previous) if !self.dirty => self.should_update(previous, new),
            _ => true,
        };

        if emit {
            self.current = Some(new);
            self.dirty = false;
            Some(new)
        } else {
            None
        }
    }

    /// Updates the viewport height; the next `update` always emits.
    pub fn set_viewport_height(&mut self, viewport_height: f32) {
        if (viewport_height - self.viewport_height).abs() > f32::EPSILON {
            self.viewport_height = viewport_height;
            self.dirty = true;
        }
    }

    pub fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    /// Forces the next `update` to emit.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Forgets the current window (folder change).
    pub fn reset(&mut self) {
        self.current = None;
        self.dirty = true;
        self.total_rows = 0;
    }

    pub fn current(&self) -> Option<VisibleRange> {
        self.current
    }

    pub fn row_height(&self) -> f32 {
        self.row_height
    }

    pub fn view_window(&self) -> ViewWindow {
        let range = self.current.unwrap_or_default();
        ViewWindow {
            visible_start: range.start,
            visible_end: range.end,
            row_height: self.row_height,
            buffer_size: self.buffer_size,
        }
    }

    /// Height of the skipped rows above the window.
    pub fn top_padding(&self, range: VisibleRange) -> f32 {
        range.start as f32 * self.row_height
    }

    /// Height of the rows after the window, so the scrollbar spans all rows.
    pub fn bottom_padding(&self, range: VisibleRange, total_rows: usize) -> f32 {
        total_rows.saturating_sub(range.end) as f32 * self.row_height
    }

    /// Scroll height of the whole list.
    pub fn total_height(&self, total_rows: usize) -> f32 {
        total_rows as f32 * self.row_height
    }
}
