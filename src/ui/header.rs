//! Header panel: listing controls, category tabs, and table options.

use crate::app::{AppState, StrategyChoice};
use docview::{Action, Category, SortBy, ViewMode};
use eframe::egui;
use egui::Color32;
use std::path::PathBuf;

const PAGE_SIZES: [u32; 4] = [25, 50, 100, 200];

pub enum HeaderInteraction {
    OpenListingRequested(PathBuf),
    GeneratedListingRequested,
    CategorySelected(Category),
    StrategyChanged(StrategyChoice),
    PageSizeChanged(u32),
    Browser(Action),
}

pub fn render_header(ui: &mut egui::Ui, state: &mut AppState) -> Option<HeaderInteraction> {
    let mut interaction = None;

    ui.horizontal(|ui| {
        if ui.button("Open Listing").clicked() {
            let mut dialog = rfd::FileDialog::new()
                .add_filter("Listings", &["json", "br"])
                .add_filter("Compressed listings", &["br"]);
            if let Ok(cwd) = std::env::current_dir() {
                dialog = dialog.set_directory(cwd);
            }
            if let Some(path) = dialog.pick_file() {
                interaction = Some(HeaderInteraction::OpenListingRequested(path));
            }
        }
        if ui.button("Generated Data").clicked() {
            interaction = Some(HeaderInteraction::GeneratedListingRequested);
        }
        match &state.listing_path {
            Some(path) => ui.label(path.display().to_string()),
            None => ui.weak("generated facility tree"),
        };

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let current = state.preferences.page_size;
            egui::ComboBox::from_id_salt("page_size")
                .selected_text(current.to_string())
                .show_ui(ui, |ui| {
                    for size in PAGE_SIZES {
                        if ui.selectable_label(size == current, size.to_string()).clicked() && size != current {
                            interaction = Some(HeaderInteraction::PageSizeChanged(size));
                        }
                    }
                });
            ui.label("Page size:");

            let current = state.preferences.strategy;
            egui::ComboBox::from_id_salt("strategy")
                .selected_text(current.label())
                .show_ui(ui, |ui| {
                    for choice in StrategyChoice::all() {
                        if ui.selectable_label(choice == current, choice.label()).clicked() && choice != current {
                            interaction = Some(HeaderInteraction::StrategyChanged(choice));
                        }
                    }
                });
            ui.label("Strategy:");
        });
    });

    ui.horizontal_wrapped(|ui| {
        let active = state.category();
        for category in Category::all() {
            if ui.selectable_label(category == active, category.label()).clicked() && category != active {
                interaction = Some(HeaderInteraction::CategorySelected(category));
            }
        }
    });

    ui.horizontal(|ui| {
        let mode = state.preferences.view_mode;
        if ui.selectable_label(mode == ViewMode::List, "List").clicked() && mode != ViewMode::List {
            interaction = Some(HeaderInteraction::Browser(Action::SetViewMode(ViewMode::List)));
        }
        if ui.selectable_label(mode == ViewMode::Grid, "Grid").clicked() && mode != ViewMode::Grid {
            interaction = Some(HeaderInteraction::Browser(Action::SetViewMode(ViewMode::Grid)));
        }
        ui.separator();

        let sort_by = state.preferences.sort_by;
        egui::ComboBox::from_id_salt("sort_by")
            .selected_text(sort_by.label())
            .show_ui(ui, |ui| {
                for field in SortBy::ALL {
                    if ui.selectable_label(field == sort_by, field.label()).clicked() && field != sort_by {
                        interaction = Some(HeaderInteraction::Browser(Action::SortBy {
                            field,
                            order: Some(state.preferences.sort_order),
                        }));
                    }
                }
            });
        let order_label = format!("{:?}", state.preferences.sort_order);
        if ui.button(order_label).clicked() {
            interaction = Some(HeaderInteraction::Browser(Action::SortBy {
                field: sort_by,
                order: Some(state.preferences.sort_order.toggled()),
            }));
        }
        ui.separator();

        ui.label("Filter:");
        let response = egui::TextEdit::singleline(&mut state.filter_text)
            .hint_text("name contains...")
            .desired_width(180.0)
            .show(ui)
            .response;
        let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if submitted {
            interaction = Some(HeaderInteraction::Browser(Action::SetFilter(Some(
                state.filter_text.clone(),
            ))));
        }
        if !state.filter_text.is_empty() && ui.small_button("x").clicked() {
            state.filter_text.clear();
            interaction = Some(HeaderInteraction::Browser(Action::SetFilter(None)));
        }
    });

    if let Some(err) = &state.error_message {
        ui.colored_label(Color32::RED, err);
    }

    interaction
}
