//! Panel orchestration and layout management.
//!
//! Lays out the header, status bar, and the central browser area, and
//! collects what the user did along with the host measurements the active
//! table needs.

use crate::app::{AppState, StrategyChoice};
use crate::io::AsyncLoader;
use crate::ui::{breadcrumbs, header, pagination_bar, status_bar, table_panel};
use docview::{Action, Category};
use std::path::PathBuf;

/// Result of panel interactions that need to be handled by the application coordinator.
pub enum PanelInteraction {
    OpenListingRequested(PathBuf),
    GeneratedListingRequested,
    CategorySelected(Category),
    StrategyChanged(StrategyChoice),
    PageSizeChanged(u32),
    /// Forwarded to the active browser
    Browser(Action),
}

/// Scroll position and viewport of the table as painted this frame.
#[derive(Debug, Clone, Copy)]
pub struct HostFrame {
    pub scroll_top: f32,
    pub viewport_height: f32,
    pub hidden: bool,
    pub sentinel_visible: bool,
}

pub struct PanelManager;

impl PanelManager {
    /// Renders all panels. `frame` is `None` when no table was painted.
    pub fn render_all_panels(
        ctx: &egui::Context,
        state: &mut AppState,
        loader: &AsyncLoader,
    ) -> (Option<PanelInteraction>, Option<HostFrame>) {
        let mut interaction: Option<PanelInteraction> = None;
        let mut frame = None;

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            if let Some(header_interaction) = header::render_header(ui, state) {
                interaction = Some(match header_interaction {
                    header::HeaderInteraction::OpenListingRequested(path) => {
                        PanelInteraction::OpenListingRequested(path)
                    }
                    header::HeaderInteraction::GeneratedListingRequested => {
                        PanelInteraction::GeneratedListingRequested
                    }
                    header::HeaderInteraction::CategorySelected(category) => {
                        PanelInteraction::CategorySelected(category)
                    }
                    header::HeaderInteraction::StrategyChanged(choice) => {
                        PanelInteraction::StrategyChanged(choice)
                    }
                    header::HeaderInteraction::PageSizeChanged(size) => {
                        PanelInteraction::PageSizeChanged(size)
                    }
                    header::HeaderInteraction::Browser(action) => PanelInteraction::Browser(action),
                });
            }
        });

        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            status_bar::render_status_bar(ui, state);
        });

        let hidden = ctx.input(|i| i.viewport().minimized.unwrap_or(false));

        egui::CentralPanel::default().show(ctx, |ui| {
            if loader.is_loading() {
                ui.horizontal(|ui| {
                    ui.spinner();
                    match loader.pending_path() {
                        Some(path) => ui.label(format!("Loading {}...", path.display())),
                        None => ui.label("Loading listing..."),
                    };
                });
                return;
            }

            let category = state.category();
            let Some(browser) = state.registry.get(&category) else {
                ui.centered_and_justified(|ui| {
                    ui.label("Open a listing or generate one to start browsing");
                });
                return;
            };

            if let Some(action) = breadcrumbs::render_breadcrumbs(ui, browser) {
                interaction = Some(PanelInteraction::Browser(action));
            }
            ui.separator();

            egui::TopBottomPanel::bottom("pagination_bar")
                .show_inside(ui, |ui| {
                    if let Some(action) = pagination_bar::render_pagination_bar(ui, browser.table()) {
                        interaction = Some(PanelInteraction::Browser(action));
                    }
                });

            let output = table_panel::render_table_panel(
                ui,
                browser.table(),
                &mut state.preferences.column_widths,
            );
            if let Some(action) = output.action {
                interaction = Some(PanelInteraction::Browser(action));
            }
            frame = Some(HostFrame {
                scroll_top: output.scroll_top,
                viewport_height: output.viewport_height,
                hidden,
                sentinel_visible: output.sentinel_visible,
            });
        });

        (interaction, frame)
    }
}
