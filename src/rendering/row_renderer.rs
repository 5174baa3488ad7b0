//! Paints rendered surface rows (list mode) and tiles (grid mode).

use crate::rendering::text_utils::truncate_text_to_fit;
use docview::RenderedRow;
use eframe::egui;
use egui::{Color32, Sense};

pub const TILE_SIZE: egui::Vec2 = egui::vec2(132.0, 112.0);

const FOLDER_MARK: &str = "[+] ";

/// A click on a folder row or tile.
pub struct FolderClicked {
    pub folder_id: String,
    pub name: String,
}

fn display_name(row: &RenderedRow) -> &str {
    let name = if row.tile { row.cells.get(1) } else { row.cells.first() };
    name.map(String::as_str).unwrap_or_default()
}

fn text_color(ui: &egui::Ui, row: &RenderedRow) -> Color32 {
    if row.placeholder {
        ui.visuals().weak_text_color()
    } else if row.is_folder {
        ui.visuals().strong_text_color()
    } else {
        ui.visuals().text_color()
    }
}

fn folder_click(row: &RenderedRow, response: &egui::Response) -> Option<FolderClicked> {
    if !row.is_folder || !response.clicked() {
        return None;
    }
    Some(FolderClicked {
        folder_id: row.entry_id.clone()?,
        name: display_name(row).to_string(),
    })
}

/// Paints one list row across the column widths.
pub fn render_row(
    ui: &mut egui::Ui,
    row: &RenderedRow,
    column_widths: &[f32; 4],
    row_height: f32,
) -> Option<FolderClicked> {
    let sense = if row.is_folder { Sense::click() } else { Sense::hover() };
    let (rect, response) = ui.allocate_exact_size(egui::vec2(ui.available_width(), row_height), sense);
    if !ui.is_rect_visible(rect) {
        return None;
    }

    let painter = ui.painter();
    let odd = row.index.is_some_and(|i| i % 2 == 1);
    if response.hovered() {
        painter.rect_filled(rect, 0.0, ui.visuals().widgets.hovered.weak_bg_fill);
    } else if odd {
        painter.rect_filled(rect, 0.0, ui.visuals().faint_bg_color);
    }
    if row.is_folder && response.hovered() {
        ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
    }

    let font_id = egui::FontId::proportional(14.0);
    let color = text_color(ui, row);
    let mut x = rect.min.x;
    for (i, width) in column_widths.iter().enumerate() {
        let Some(text) = row.cells.get(i) else {
            break;
        };
        let text = if i == 0 && row.is_folder {
            format!("{}{}", FOLDER_MARK, text)
        } else {
            text.clone()
        };
        let shown = truncate_text_to_fit(&text, *width, &font_id, painter);
        painter.text(
            egui::pos2(x + 4.0, rect.center().y),
            egui::Align2::LEFT_CENTER,
            shown,
            font_id.clone(),
            color,
        );
        x += width;
    }

    folder_click(row, &response)
}

/// Paints one grid tile with a thumbnail area and the entry name.
pub fn render_tile(ui: &mut egui::Ui, row: &RenderedRow) -> Option<FolderClicked> {
    let sense = if row.is_folder { Sense::click() } else { Sense::hover() };
    let (rect, response) = ui.allocate_exact_size(TILE_SIZE, sense);
    if !ui.is_rect_visible(rect) {
        return None;
    }

    let painter = ui.painter();
    let visuals = ui.visuals();
    let fill = if response.hovered() {
        visuals.widgets.hovered.weak_bg_fill
    } else {
        visuals.faint_bg_color
    };
    painter.rect_filled(rect.shrink(2.0), 4.0, fill);

    let thumb = egui::Rect::from_min_size(
        rect.min + egui::vec2(10.0, 8.0),
        egui::vec2(rect.width() - 20.0, rect.height() - 40.0),
    );
    let thumb_fill = if row.placeholder {
        visuals.extreme_bg_color
    } else if row.is_folder {
        visuals.selection.bg_fill.gamma_multiply(0.4)
    } else {
        visuals.widgets.inactive.bg_fill
    };
    painter.rect_filled(thumb, 2.0, thumb_fill);

    let font_id = egui::FontId::proportional(12.0);
    let name = truncate_text_to_fit(display_name(row), rect.width(), &font_id, painter);
    painter.text(
        egui::pos2(rect.center().x, rect.max.y - 16.0),
        egui::Align2::CENTER_CENTER,
        name,
        font_id,
        text_color(ui, row),
    );

    folder_click(row, &response)
}
