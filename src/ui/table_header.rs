//! Column headers for list mode: click to sort, drag the edges to resize.

use crate::rendering::text_utils::truncate_text_to_fit;
use docview::{ListQuery, SortBy, SortOrder};
use eframe::egui;
use egui::Color32;

pub const HEADER_HEIGHT: f32 = 24.0;
const MIN_COLUMN_WIDTH: f32 = 50.0;

const COLUMNS: [(&str, SortBy); 4] = [
    ("Name", SortBy::Name),
    ("Updated", SortBy::UpdatedAt),
    ("Size", SortBy::Size),
    ("Owner", SortBy::Owner),
];

pub enum TableHeaderInteraction {
    SortRequested(SortBy),
}

pub fn render_table_header(
    ui: &mut egui::Ui,
    column_widths: &mut [f32; 4],
    query: &ListQuery,
) -> Option<TableHeaderInteraction> {
    let start = ui.cursor().min;
    let (_rect, _) = ui.allocate_exact_size(
        egui::vec2(ui.available_width(), HEADER_HEIGHT),
        egui::Sense::hover(),
    );
    let font_id = egui::FontId::proportional(14.0);
    let mut interaction = None;
    let mut x = start.x;

    for (i, (label, sort_by)) in COLUMNS.iter().enumerate() {
        let width = column_widths[i];
        let label_rect =
            egui::Rect::from_min_size(egui::pos2(x, start.y), egui::vec2(width, HEADER_HEIGHT));

        let response = ui.interact(label_rect, ui.id().with(("sort", i)), egui::Sense::click());
        if response.clicked() {
            interaction = Some(TableHeaderInteraction::SortRequested(*sort_by));
        }
        if response.hovered() {
            ui.painter()
                .rect_filled(label_rect, 0.0, ui.visuals().widgets.hovered.weak_bg_fill);
        }

        let text = if query.sort_by == *sort_by {
            let arrow = match query.sort_order {
                SortOrder::Asc => "^",
                SortOrder::Desc => "v",
            };
            format!("{} {}", label, arrow)
        } else {
            label.to_string()
        };
        let shown = truncate_text_to_fit(&text, width, &font_id, ui.painter());
        ui.painter().text(
            label_rect.left_center() + egui::vec2(4.0, 0.0),
            egui::Align2::LEFT_CENTER,
            shown,
            font_id.clone(),
            ui.visuals().strong_text_color(),
        );

        x += width;

        if i + 1 < COLUMNS.len() {
            let handle_rect = egui::Rect::from_center_size(
                egui::pos2(x, start.y + HEADER_HEIGHT / 2.0),
                egui::vec2(8.0, HEADER_HEIGHT),
            );
            let handle = ui.interact(handle_rect, ui.id().with(("resize", i)), egui::Sense::drag());
            if handle.dragged() {
                column_widths[i] = (column_widths[i] + handle.drag_delta().x).max(MIN_COLUMN_WIDTH);
            }
            let color = if handle.hovered() || handle.dragged() {
                ui.ctx().set_cursor_icon(egui::CursorIcon::ResizeHorizontal);
                Color32::from_rgb(100, 150, 255)
            } else {
                ui.visuals()
                    .widgets
                    .noninteractive
                    .bg_stroke
                    .color
                    .gamma_multiply(0.5)
            };
            ui.painter().rect_filled(handle_rect.shrink(2.0), 0.0, color);
        }
    }

    interaction
}
