//! UI panel rendering
//!
//! - Header (listing controls, category tabs, strategy, view mode, filter)
//! - Breadcrumbs (folder trail)
//! - Table header (sortable, resizable columns)
//! - Table panel (the engine surface inside a scroll area)
//! - Pagination bar
//! - Status bar (memory, cache, render and pool figures)
//! - Panel manager (layout and interaction routing)

pub mod breadcrumbs;
pub mod header;
pub mod pagination_bar;
pub mod panel_manager;
pub mod status_bar;
pub mod table_header;
pub mod table_panel;
