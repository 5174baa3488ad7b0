//! The document table: the engine's surface painted inside a scroll area.
//!
//! Spacer heights from the surface stand in for rows that are not
//! materialized, so the scrollbar covers the whole list.

use crate::rendering::row_renderer::{self, FolderClicked, TILE_SIZE};
use crate::ui::table_header::{self, TableHeaderInteraction};
use docview::{Action, DocumentTable, LoadState, RenderedRow, Strategy, ViewMode};
use eframe::egui;
use egui::ScrollArea;

/// What the host observed while painting the table.
pub struct TablePanelOutput {
    pub scroll_top: f32,
    pub viewport_height: f32,
    pub sentinel_visible: bool,
    pub action: Option<Action>,
}

pub fn render_table_panel(
    ui: &mut egui::Ui,
    table: &DocumentTable,
    column_widths: &mut [f32; 4],
) -> TablePanelOutput {
    let mut action = None;
    let mut sentinel_visible = false;

    if table.view_mode() == ViewMode::List {
        if let Some(TableHeaderInteraction::SortRequested(field)) =
            table_header::render_table_header(ui, column_widths, table.query())
        {
            action = Some(Action::SortBy { field, order: None });
        }
        ui.separator();
    }

    let Some(surface) = table.surface() else {
        ui.label("No table body attached");
        return TablePanelOutput {
            scroll_top: 0.0,
            viewport_height: ui.available_height(),
            sentinel_visible,
            action,
        };
    };
    let rows = table.rendered_rows();
    let row_height = table.config().row_height;

    let scroll = ScrollArea::vertical()
        .id_salt(("table_scroll", table.endpoint(), table.folder_id()))
        .auto_shrink([false, false])
        .show(ui, |ui| {
            if rows.is_empty() && table.state() != LoadState::Fetching {
                ui.label("This folder is empty");
            }

            if surface.leading_spacer > 0.0 {
                ui.add_space(surface.leading_spacer);
            }

            let clicked = match surface.view_mode {
                ViewMode::List => paint_rows(ui, &rows, column_widths, row_height),
                ViewMode::Grid => paint_tiles(ui, &rows),
            };
            if let Some(FolderClicked { folder_id, name }) = clicked {
                action = Some(Action::OpenFolder { folder_id, name });
            }

            if surface.trailing_spacer > 0.0 {
                ui.add_space(surface.trailing_spacer);
            }

            if table.strategy() == Strategy::LazyLoading {
                let (rect, _) = ui.allocate_exact_size(egui::vec2(ui.available_width(), 1.0), egui::Sense::hover());
                sentinel_visible = ui.is_rect_visible(rect);
            }

            if table.state() == LoadState::Fetching {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading...");
                });
            }
            if surface.load_more_visible {
                let label = if table.state() == LoadState::Error {
                    "Retry"
                } else {
                    "Load more"
                };
                if ui.button(label).clicked() {
                    action = Some(Action::LoadMore);
                }
            }
        });

    TablePanelOutput {
        scroll_top: scroll.state.offset.y,
        viewport_height: scroll.inner_rect.height(),
        sentinel_visible,
        action,
    }
}

fn paint_rows(
    ui: &mut egui::Ui,
    rows: &[RenderedRow],
    column_widths: &[f32; 4],
    row_height: f32,
) -> Option<FolderClicked> {
    ui.spacing_mut().item_spacing.y = 0.0;
    let mut clicked = None;
    for row in rows {
        if let Some(click) = row_renderer::render_row(ui, row, column_widths, row_height) {
            clicked = Some(click);
        }
    }
    clicked
}

fn paint_tiles(ui: &mut egui::Ui, rows: &[RenderedRow]) -> Option<FolderClicked> {
    let mut clicked = None;
    let per_line = ((ui.available_width() / TILE_SIZE.x).floor() as usize).max(1);
    for line in rows.chunks(per_line) {
        ui.horizontal(|ui| {
            for row in line {
                if let Some(click) = row_renderer::render_tile(ui, row) {
                    clicked = Some(click);
                }
            }
        });
    }
    clicked
}
