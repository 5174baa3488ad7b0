//! Status bar: memory, cache, render and pool figures of the active table.

use crate::app::AppState;
use docview::format::{current_memory_usage, format_memory_mb};
use docview::LoadState;
use eframe::egui;
use egui::RichText;

pub fn render_status_bar(ui: &mut egui::Ui, state: &AppState) {
    ui.horizontal(|ui| {
        let Some(browser) = state.active_browser() else {
            let memory = current_memory_usage().map_or(0.0, |m| m.process_mb());
            ui.label(RichText::new(format_memory_mb(memory)).strong());
            ui.label(RichText::new("| No listing loaded").strong());
            return;
        };
        let table = browser.table();
        let report = table.performance();

        // Prefer the table's last sample; fall back to a fresh reading.
        let memory = report
            .memory
            .or_else(current_memory_usage)
            .map_or(0.0, |m| m.process_mb());
        ui.label(RichText::new(format_memory_mb(memory)).strong());
        ui.label(RichText::new("|").strong());

        ui.label(format!("Strategy: {}", table.strategy()));
        ui.label(format!(
            "Cache: {} entries, {:.0}% hits",
            report.cache.entries,
            report.cache.hit_ratio() * 100.0
        ));
        match report.last_render {
            Some(last) => ui.label(format!("Render: {:.2} ms", last.as_secs_f64() * 1000.0)),
            None => ui.label("Render: -"),
        };
        ui.label(format!(
            "Rows: {}",
            table.surface().map_or(0, |surface| surface.row_count())
        ));
        ui.label(format!(
            "Pool: {} in use, {} free, peak {}",
            report.pool_in_use, report.pool_free, report.pool_high_water
        ));
        if report.cleanups > 0 {
            ui.label(format!("Cleanups: {}", report.cleanups));
        }

        match table.state() {
            LoadState::Fetching => {
                ui.spinner();
            }
            LoadState::Error => {
                let message = state
                    .fetch_error
                    .borrow()
                    .clone()
                    .unwrap_or_else(|| "fetch failed".to_string());
                ui.label(RichText::new(message).color(egui::Color32::YELLOW));
            }
            LoadState::Idle => {}
        }
    });
}
