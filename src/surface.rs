//! Headless table surface.
//!
//! The surface stands in for the host page's `<tbody>` and its surroundings:
//! the ordered body rows, the spacer heights that keep the scrollbar honest,
//! and a few presentation flags the renderer toggles.

use crate::model::ViewMode;
use crate::pool::{NodeId, NodeKind, NodePool};

/// Host elements the table can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mounts {
    /// A table body to render rows into
    pub body: bool,
    /// A scroll container marked for virtual scrolling
    pub virtual_container: bool,
    /// An end-of-list sentinel watched for lazy loading
    pub sentinel: bool,
    /// A mount point for pagination controls
    pub pagination: bool,
}

impl Mounts {
    /// Every attachment point present.
    pub fn all() -> Self {
        Self {
            body: true,
            virtual_container: true,
            sentinel: true,
            pagination: true,
        }
    }

    pub fn none() -> Self {
        Self {
            body: false,
            virtual_container: false,
            sentinel: false,
            pagination: false,
        }
    }
}

impl Default for Mounts {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSurface {
    rows: Vec<NodeId>,
    /// Height above the first materialized row
    pub leading_spacer: f32,
    /// Height below the last materialized row
    pub trailing_spacer: f32,
    pub view_mode: ViewMode,
    /// Shows the "load more" affordance after a failed fetch
    pub load_more_visible: bool,
    /// Thumbnails carry `loading="lazy"`
    pub lazy_images: bool,
    /// Hover effects are debounced
    pub hover_debounce: bool,
}

impl TableSurface {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            leading_spacer: 0.0,
            trailing_spacer: 0.0,
            view_mode: ViewMode::List,
            load_more_visible: false,
            lazy_images: false,
            hover_debounce: false,
        }
    }

    pub fn rows(&self) -> &[NodeId] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn push_row(&mut self, pool: &mut NodePool, id: NodeId) {
        pool.set_attached(id, true);
        self.rows.push(id);
    }

    pub(crate) fn set_rows(&mut self, pool: &mut NodePool, rows: Vec<NodeId>) {
        for id in &rows {
            pool.set_attached(*id, true);
        }
        self.rows = rows;
    }

    pub(crate) fn take_rows(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.rows)
    }

    /// Reads the materialized rows back as plain values.
    pub fn snapshot(&self, pool: &NodePool) -> Vec<RenderedRow> {
        self.rows
            .iter()
            .filter_map(|id| {
                let node = pool.node(*id)?;
                let cells = node
                    .children()
                    .iter()
                    .filter_map(|cell| pool.node(*cell))
                    .map(|cell| cell.text.clone())
                    .collect();
                Some(RenderedRow {
                    entry_id: node.attr("data-id").map(str::to_string),
                    index: node.attr("data-index").and_then(|i| i.parse().ok()),
                    is_folder: node.attr("data-kind") == Some("folder"),
                    placeholder: node.attr("data-placeholder").is_some(),
                    tile: node.kind() == NodeKind::Tile,
                    cells,
                })
            })
            .collect()
    }
}

impl Default for TableSurface {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain-value view of one materialized row.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRow {
    pub entry_id: Option<String>,
    pub index: Option<usize>,
    pub is_folder: bool,
    pub placeholder: bool,
    pub tile: bool,
    /// Cell texts in column order
    pub cells: Vec<String>,
}
