//! Page controls for the pagination strategy, and load progress for lazy
//! loading.

use docview::format::format_count;
use docview::{Action, DocumentTable, Strategy};
use eframe::egui;

pub fn render_pagination_bar(ui: &mut egui::Ui, table: &DocumentTable) -> Option<Action> {
    let mut action = None;
    let view = table.pagination();

    ui.horizontal(|ui| match table.strategy() {
        Strategy::Pagination => {
            if ui
                .add_enabled(view.current_page > 1 && !view.loading, egui::Button::new("< Prev"))
                .clicked()
            {
                action = Some(Action::PrevPage);
            }

            let mut page = view.current_page;
            let response = ui.add(
                egui::DragValue::new(&mut page)
                    .range(1..=view.last_page)
                    .prefix("Page "),
            );
            ui.label(format!("of {}", view.last_page));
            if response.changed() && page != view.current_page {
                action = Some(Action::GoToPage { page });
            }

            if ui
                .add_enabled(view.current_page < view.last_page && !view.loading, egui::Button::new("Next >"))
                .clicked()
            {
                action = Some(Action::NextPage);
            }
            ui.separator();
            ui.label(format!("{} items", format_count(view.total_items as u64)));
        }
        Strategy::LazyLoading => {
            ui.label(format!(
                "Loaded {} of {}",
                format_count(table.loaded_rows() as u64),
                format_count(table.total_rows() as u64)
            ));
            if view.has_more_pages && !view.loading && ui.button("Load more").clicked() {
                action = Some(Action::LoadMore);
            }
        }
        Strategy::VirtualScroll => {
            let window = table.view_window();
            if window.visible_end > window.visible_start {
                ui.label(format!(
                    "Rows {}-{} of {} (buffer {})",
                    format_count(window.visible_start as u64 + 1),
                    format_count(window.visible_end as u64),
                    format_count(table.total_rows() as u64),
                    window.buffer_size
                ));
            }
        }
        Strategy::FullRender => {
            ui.label(format!("{} items", format_count(table.total_rows() as u64)));
        }
    });

    if let Some(error) = &view.error {
        ui.horizontal(|ui| {
            ui.colored_label(egui::Color32::RED, error);
            if ui.button("Retry").clicked() {
                action = Some(Action::Retry);
            }
        });
    }

    action
}
