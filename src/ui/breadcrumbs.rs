//! Folder trail with up and refresh buttons.

use docview::{Action, DocumentBrowser};
use eframe::egui;

pub fn render_breadcrumbs(ui: &mut egui::Ui, browser: &DocumentBrowser) -> Option<Action> {
    let mut action = None;
    let crumbs = browser.breadcrumbs();

    ui.horizontal(|ui| {
        if ui
            .add_enabled(crumbs.len() > 1, egui::Button::new("Up"))
            .clicked()
        {
            action = Some(Action::NavigateUp);
        }
        if ui.button("Refresh").clicked() {
            action = Some(Action::Refresh);
        }
        ui.separator();

        for (index, crumb) in crumbs.iter().enumerate() {
            if index > 0 {
                ui.label("/");
            }
            if index + 1 == crumbs.len() {
                ui.strong(&crumb.name);
            } else if ui.link(&crumb.name).clicked() {
                action = Some(Action::NavigateTo { index });
            }
        }
    });

    action
}
