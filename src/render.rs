//! Renderer: binds entries to pooled nodes on the table surface.
//!
//! Each strategy materializes rows differently:
//!
//! - `VirtualScroll` keeps only the window, backed by spacers sized for the
//!   rows outside it. Rows still inside the window keep their nodes.
//! - `LazyLoading` appends rows it has not rendered yet.
//! - `Pagination` replaces the body with the current page.
//! - `FullRender` builds every row once and never recycles.

use crate::format::{format_size, format_timestamp};
use crate::model::{folders_first, Entry, EntryId, EntryKind, Strategy, ViewMode};
use crate::pool::{NodeId, NodeKind, NodePool};
use crate::surface::TableSurface;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const PLACEHOLDER_TEXT: &str = "Loading...";

const LIST_COLUMNS: [&str; 4] = ["name", "updated", "size", "owner"];
const GRID_COLUMNS: [&str; 2] = ["thumbnail", "name"];

/// Result of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered { rows: usize, duration: Duration },
    /// No surface was attached; nothing was touched
    Skipped,
}

impl RenderOutcome {
    pub fn duration(&self) -> Option<Duration> {
        match self {
            RenderOutcome::Rendered { duration, .. } => Some(*duration),
            RenderOutcome::Skipped => None,
        }
    }
}

/// Identity of a materialized row across passes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RowKey {
    Entry(EntryId),
    /// An unloaded slot at a list index
    Placeholder(usize),
}

pub struct Renderer {
    strategy: Strategy,
    row_height: f32,
    /// Rows currently on the surface, by identity
    bound: HashMap<RowKey, NodeId>,
    bound_mode: Option<ViewMode>,
    passes: u64,
}

impl Renderer {
    pub fn new(strategy: Strategy, row_height: f32) -> Self {
        Self {
            strategy,
            row_height,
            bound: HashMap::new(),
            bound_mode: None,
            passes: 0,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Number of completed passes.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Renders a window of the list.
    ///
    /// # Arguments
    /// * `surface` - The table body; `None` skips the pass with a warning
    /// * `pool` - Source of row, cell and tile nodes
    /// * `rows` - Entries at indices `offset_index..`; `None` marks a slot whose
    ///   page has not arrived yet (virtual scrolling only, other strategies skip it)
    /// * `view_mode` - List rows or grid tiles
    /// * `offset_index` - Index of the first slot, sizing the leading spacer
    /// * `total_rows` - Rows in the whole list, sizing the trailing spacer
    ///
    /// # Returns
    /// [`RenderOutcome::Skipped`] without a surface, otherwise the pass timing
    ///
    /// # Examples
    /// ```ignore
    /// let outcome = renderer.render_window(
    ///     Some(&mut surface),
    ///     &mut pool,
    ///     &slots,
    ///     ViewMode::List,
    ///     range.start,
    ///     total_rows,
    /// );
    /// ```
    pub fn render_window(
        &mut self,
        surface: Option<&mut TableSurface>,
        pool: &mut NodePool,
        rows: &[Option<Arc<Entry>>],
        view_mode: ViewMode,
        offset_index: usize,
        total_rows: usize,
    ) -> RenderOutcome {
        let Some(surface) = surface else {
            tracing::warn!(strategy = %self.strategy, "no table body attached, skipping render");
            return RenderOutcome::Skipped;
        };

        let started = Instant::now();
        if self.bound_mode != Some(view_mode) {
            self.release_all(surface, pool);
            self.bound_mode = Some(view_mode);
        }
        surface.view_mode = view_mode;

        match self.strategy {
            Strategy::VirtualScroll => {
                self.render_virtual(surface, pool, rows, view_mode, offset_index, total_rows)
            }
            Strategy::LazyLoading => {
                let base = surface.row_count();
                self.append_unrendered(surface, pool, rows, view_mode, base);
            }
            Strategy::Pagination => {
                self.release_all(surface, pool);
                self.append_unrendered(surface, pool, rows, view_mode, offset_index);
            }
            Strategy::FullRender => {
                self.release_all(surface, pool);
                // Discarded rather than recycled.
                pool.clear();
                surface.lazy_images = true;
                surface.hover_debounce = true;
                self.append_unrendered(surface, pool, rows, view_mode, 0);
            }
        }

        self.passes += 1;
        RenderOutcome::Rendered {
            rows: surface.row_count(),
            duration: started.elapsed(),
        }
    }

    fn render_virtual(
        &mut self,
        surface: &mut TableSurface,
        pool: &mut NodePool,
        rows: &[Option<Arc<Entry>>],
        view_mode: ViewMode,
        offset_index: usize,
        total_rows: usize,
    ) {
        let mut slots = rows.to_vec();
        order_loaded_slots(&mut slots);

        let kind = node_kind(view_mode);
        let keys: Vec<RowKey> = slots
            .iter()
            .enumerate()
            .map(|(position, slot)| match slot {
                Some(entry) => RowKey::Entry(entry.id.clone()),
                None => RowKey::Placeholder(offset_index + position),
            })
            .collect();

        // Rows leaving the window go back first so entering rows can reuse them.
        let wanted: HashSet<&RowKey> = keys.iter().collect();
        let mut previous = std::mem::take(&mut self.bound);
        previous.retain(|key, id| {
            let stays = wanted.contains(key);
            if !stays {
                pool.release(*id);
            }
            stays
        });
        drop(wanted);
        surface.take_rows();

        let mut next_rows = Vec::with_capacity(slots.len());
        for (position, (slot, key)) in slots.iter().zip(keys).enumerate() {
            let index = offset_index + position;
            if self.bound.contains_key(&key) {
                continue;
            }

            let node = match previous.remove(&key) {
                Some(id) if pool.node(id).map(|n| n.kind()) == Some(kind) => id,
                Some(id) => {
                    pool.release(id);
                    pool.acquire(kind)
                }
                None => pool.acquire(kind),
            };
            bind_row(pool, node, slot.as_deref(), index, view_mode, surface.lazy_images);
            self.bound.insert(key, node);
            next_rows.push(node);
        }

        for (_, id) in previous {
            pool.release(id);
        }

        let rendered = next_rows.len();
        surface.set_rows(pool, next_rows);
        surface.leading_spacer = offset_index as f32 * self.row_height;
        surface.trailing_spacer =
            total_rows.saturating_sub(offset_index + rendered) as f32 * self.row_height;
    }

    fn append_unrendered(
        &mut self,
        surface: &mut TableSurface,
        pool: &mut NodePool,
        rows: &[Option<Arc<Entry>>],
        view_mode: ViewMode,
        base_index: usize,
    ) {
        let mut fresh: Vec<Arc<Entry>> = rows
            .iter()
            .flatten()
            .filter(|entry| !self.bound.contains_key(&RowKey::Entry(entry.id.clone())))
            .cloned()
            .collect();
        folders_first(&mut fresh);

        let kind = node_kind(view_mode);
        let mut index = base_index;
        for entry in fresh {
            let key = RowKey::Entry(entry.id.clone());
            if self.bound.contains_key(&key) {
                continue;
            }
            let node = pool.acquire(kind);
            bind_row(pool, node, Some(&entry), index, view_mode, surface.lazy_images);
            self.bound.insert(key, node);
            surface.push_row(pool, node);
            index += 1;
        }

        surface.leading_spacer = 0.0;
        surface.trailing_spacer = 0.0;
    }

    /// Releases every row on the surface back to the pool.
    pub fn clear(&mut self, surface: Option<&mut TableSurface>, pool: &mut NodePool) {
        if let Some(surface) = surface {
            self.release_all(surface, pool);
            surface.leading_spacer = 0.0;
            surface.trailing_spacer = 0.0;
        } else {
            for (_, id) in self.bound.drain() {
                pool.release(id);
            }
        }
        self.bound_mode = None;
    }

    fn release_all(&mut self, surface: &mut TableSurface, pool: &mut NodePool) {
        for id in surface.take_rows() {
            pool.release(id);
        }
        for (_, id) in self.bound.drain() {
            pool.release(id);
        }
    }
}

fn node_kind(view_mode: ViewMode) -> NodeKind {
    match view_mode {
        ViewMode::List => NodeKind::Row,
        ViewMode::Grid => NodeKind::Tile,
    }
}

/// Sorts the loaded slots folders-first while placeholders keep their positions.
fn order_loaded_slots(slots: &mut [Option<Arc<Entry>>]) {
    let mut loaded: Vec<Arc<Entry>> = slots.iter().flatten().cloned().collect();
    folders_first(&mut loaded);
    let mut loaded = loaded.into_iter();
    for slot in slots.iter_mut().filter(|slot| slot.is_some()) {
        *slot = loaded.next();
    }
}

fn cell_texts(entry: Option<&Entry>, view_mode: ViewMode) -> Vec<String> {
    match (entry, view_mode) {
        (Some(entry), ViewMode::List) => vec![
            entry.name.clone(),
            format_timestamp(&entry.updated_at),
            match (entry.kind, entry.size) {
                (EntryKind::File, Some(size)) => format_size(size),
                _ => "-".to_string(),
            },
            entry.owner_name.clone(),
        ],
        (Some(entry), ViewMode::Grid) => vec![String::new(), entry.name.clone()],
        (None, ViewMode::List) => vec![
            PLACEHOLDER_TEXT.to_string(),
            String::new(),
            String::new(),
            String::new(),
        ],
        (None, ViewMode::Grid) => vec![String::new(), PLACEHOLDER_TEXT.to_string()],
    }
}

/// Writes entry data into a row node, reusing its existing cells.
fn bind_row(
    pool: &mut NodePool,
    row: NodeId,
    entry: Option<&Entry>,
    index: usize,
    view_mode: ViewMode,
    lazy_images: bool,
) {
    let Some(node) = pool.node_mut(row) else {
        return;
    };
    node.attributes.clear();
    node.text.clear();
    node.set_attr("data-index", index.to_string());
    match entry {
        Some(entry) => {
            node.set_attr("data-id", entry.id.as_str());
            node.set_attr("data-kind", if entry.is_folder() { "folder" } else { "file" });
        }
        None => node.set_attr("data-placeholder", "true"),
    }

    let columns: &[&str] = match view_mode {
        ViewMode::List => &LIST_COLUMNS,
        ViewMode::Grid => &GRID_COLUMNS,
    };
    let texts = cell_texts(entry, view_mode);

    let mut cells = node.children().to_vec();
    if cells.len() != columns.len() {
        for cell in cells.drain(..) {
            pool.release(cell);
        }
        for _ in columns {
            let cell = pool.acquire(NodeKind::Cell);
            pool.append_child(row, cell);
            cells.push(cell);
        }
    }

    for ((cell, column), text) in cells.into_iter().zip(columns).zip(texts) {
        let Some(cell) = pool.node_mut(cell) else {
            continue;
        };
        cell.attributes.clear();
        cell.text = text;
        cell.set_attr("data-column", *column);
        if *column == "thumbnail" {
            if let Some(entry) = entry {
                cell.set_attr("data-src", format!("/thumbnails/{}", entry.id));
            }
            if lazy_images {
                cell.set_attr("loading", "lazy");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn files(range: std::ops::Range<usize>) -> Vec<Option<Arc<Entry>>> {
        let ts = Utc.with_ymd_and_hms(2024, 5, 2, 8, 30, 0).unwrap();
        range
            .map(|i| Some(Arc::new(Entry::file(format!("f{}", i), format!("file-{}.pdf", i), ts, 2048))))
            .collect()
    }

    fn ids(surface: &TableSurface, pool: &NodePool) -> Vec<String> {
        surface
            .snapshot(pool)
            .into_iter()
            .filter_map(|row| row.entry_id)
            .collect()
    }

    #[test]
    fn test_virtual_scroll_sets_spacers() {
        let mut renderer = Renderer::new(Strategy::VirtualScroll, 40.0);
        let mut pool = NodePool::new();
        let mut surface = TableSurface::new();

        renderer.render_window(Some(&mut surface), &mut pool, &files(10..30), ViewMode::List, 10, 100);

        assert_eq!(surface.row_count(), 20);
        assert_eq!(surface.leading_spacer, 400.0);
        assert_eq!(surface.trailing_spacer, 70.0 * 40.0);
    }

    #[test]
    fn test_virtual_scroll_reuses_rows_still_in_window() {
        let mut renderer = Renderer::new(Strategy::VirtualScroll, 40.0);
        let mut pool = NodePool::new();
        let mut surface = TableSurface::new();

        renderer.render_window(Some(&mut surface), &mut pool, &files(0..20), ViewMode::List, 0, 100);
        let kept = surface.rows()[10];
        let created_after_first = pool.created_count();

        renderer.render_window(Some(&mut surface), &mut pool, &files(10..30), ViewMode::List, 10, 100);

        assert_eq!(surface.rows()[0], kept);
        // Ten rows left the window and ten entered: the pool covers all of them.
        assert_eq!(pool.created_count(), created_after_first);
        assert_eq!(pool.in_use_count(), 20 * 5);
        assert_eq!(ids(&surface, &pool)[0], "f10");
    }

    #[test]
    fn test_virtual_scroll_renders_placeholders_for_missing_slots() {
        let mut renderer = Renderer::new(Strategy::VirtualScroll, 40.0);
        let mut pool = NodePool::new();
        let mut surface = TableSurface::new();
        let mut rows = files(0..3);
        rows.push(None);

        renderer.render_window(Some(&mut surface), &mut pool, &rows, ViewMode::List, 0, 4);

        let snapshot = surface.snapshot(&pool);
        assert!(snapshot[3].placeholder);
        assert_eq!(snapshot[3].index, Some(3));
        assert_eq!(snapshot[3].cells[0], PLACEHOLDER_TEXT);
    }

    #[test]
    fn test_lazy_loading_appends_without_discarding() {
        let mut renderer = Renderer::new(Strategy::LazyLoading, 40.0);
        let mut pool = NodePool::new();
        let mut surface = TableSurface::new();

        renderer.render_window(Some(&mut surface), &mut pool, &files(0..50), ViewMode::List, 0, 120);
        let first = surface.rows()[0];
        let mut all = files(0..50);
        all.extend(files(50..100));
        renderer.render_window(Some(&mut surface), &mut pool, &all, ViewMode::List, 0, 120);

        assert_eq!(surface.row_count(), 100);
        assert_eq!(surface.rows()[0], first);
        assert_eq!(surface.snapshot(&pool)[99].index, Some(99));
    }

    #[test]
    fn test_pagination_replaces_body() {
        let mut renderer = Renderer::new(Strategy::Pagination, 40.0);
        let mut pool = NodePool::new();
        let mut surface = TableSurface::new();

        renderer.render_window(Some(&mut surface), &mut pool, &files(0..50), ViewMode::List, 0, 120);
        renderer.render_window(Some(&mut surface), &mut pool, &files(50..100), ViewMode::List, 50, 120);

        assert_eq!(surface.row_count(), 50);
        assert_eq!(ids(&surface, &pool)[0], "f50");
        // Second page reuses the first page's nodes.
        assert_eq!(pool.created_count(), 50 * 5);
    }

    #[test]
    fn test_folders_render_before_files() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 2, 8, 30, 0).unwrap();
        let rows = vec![
            Some(Arc::new(Entry::file("f1", "a.pdf", ts, 1))),
            Some(Arc::new(Entry::folder("d1", "Plans", ts))),
            Some(Arc::new(Entry::file("f2", "b.pdf", ts, 1))),
        ];
        let mut renderer = Renderer::new(Strategy::Pagination, 40.0);
        let mut pool = NodePool::new();
        let mut surface = TableSurface::new();

        renderer.render_window(Some(&mut surface), &mut pool, &rows, ViewMode::List, 0, 3);

        assert_eq!(ids(&surface, &pool), vec!["d1", "f1", "f2"]);
        assert_eq!(surface.snapshot(&pool)[0].cells[2], "-");
    }

    #[test]
    fn test_full_render_applies_cosmetics_only() {
        let mut renderer = Renderer::new(Strategy::FullRender, 40.0);
        let mut pool = NodePool::new();
        let mut surface = TableSurface::new();

        renderer.render_window(Some(&mut surface), &mut pool, &files(0..5), ViewMode::Grid, 0, 5);
        renderer.render_window(Some(&mut surface), &mut pool, &files(0..5), ViewMode::Grid, 0, 5);

        assert!(surface.lazy_images);
        assert!(surface.hover_debounce);
        assert_eq!(pool.free_count(), 0);
        let thumb = pool.node(surface.rows()[0]).unwrap().children()[0];
        assert_eq!(pool.node(thumb).unwrap().attr("loading"), Some("lazy"));
    }

    #[test]
    fn test_view_mode_switch_rebuilds_without_leaks() {
        let mut renderer = Renderer::new(Strategy::VirtualScroll, 40.0);
        let mut pool = NodePool::new();
        let mut surface = TableSurface::new();

        renderer.render_window(Some(&mut surface), &mut pool, &files(0..10), ViewMode::List, 0, 10);
        renderer.render_window(Some(&mut surface), &mut pool, &files(0..10), ViewMode::Grid, 0, 10);

        assert!(surface.snapshot(&pool).iter().all(|row| row.tile));
        assert_eq!(pool.in_use_count(), 10 * 3);
    }

    #[test]
    fn test_missing_surface_skips_pass() {
        let mut renderer = Renderer::new(Strategy::LazyLoading, 40.0);
        let mut pool = NodePool::new();

        let outcome = renderer.render_window(None, &mut pool, &files(0..5), ViewMode::List, 0, 5);

        assert_eq!(outcome, RenderOutcome::Skipped);
        assert_eq!(pool.in_use_count(), 0);
        assert_eq!(renderer.passes(), 0);
    }

    #[test]
    fn test_clear_returns_every_node() {
        let mut renderer = Renderer::new(Strategy::LazyLoading, 40.0);
        let mut pool = NodePool::new();
        let mut surface = TableSurface::new();
        renderer.render_window(Some(&mut surface), &mut pool, &files(0..8), ViewMode::List, 0, 8);

        renderer.clear(Some(&mut surface), &mut pool);

        assert_eq!(surface.row_count(), 0);
        assert_eq!(pool.in_use_count(), 0);
    }
}
