//! Document Browser GUI Application
//!
//! An egui host for the docview engine. It browses a facility's document
//! categories through the engine's tables:
//! - Four rendering strategies (full render, pagination, lazy loading, virtual scroll)
//! - Chunk caching, node pooling, and background fetches with retry
//! - Breadcrumb navigation, sorting, filtering, and list or grid views
//! - Persistent preferences
//!
//! The application is built with a modular architecture:
//! - `app/` - Application state, preferences, and coordination
//! - `io/` - Background listing loading and generated data
//! - `ui/` - UI panel rendering and interaction routing
//! - `rendering/` - Low-level painting of rows and tiles

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use eframe::egui;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod app;
mod io;
mod rendering;
mod ui;

use app::{AppState, ApplicationCoordinator, SettingsCoordinator};
use docview::EngineConfig;
use io::AsyncLoader;
use ui::panel_manager::{PanelInteraction, PanelManager};

fn main() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    // Optional listing file to open on startup
    let initial_listing = std::env::args().nth(1).map(PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("Document Browser"),
        ..Default::default()
    };

    eframe::run_native(
        "Document Browser",
        options,
        Box::new(move |cc| Ok(Box::new(DocViewApp::new(cc, initial_listing)))),
    )
}

struct DocViewApp {
    state: AppState,
    loader: AsyncLoader,
    /// Listing to open on the first frame
    pending_listing: Option<PathBuf>,
}

impl DocViewApp {
    fn new(cc: &eframe::CreationContext, initial_listing: Option<PathBuf>) -> Self {
        let preferences = SettingsCoordinator::load_preferences(cc.storage);
        let config = EngineConfig::load_or_default();

        let mut state = AppState::new(preferences, config);
        let ctx = cc.egui_ctx.clone();
        state.waker = Some(Arc::new(move || ctx.request_repaint()));

        if initial_listing.is_none() {
            ApplicationCoordinator::open_generated(&mut state);
        }

        Self {
            state,
            loader: AsyncLoader::new(),
            pending_listing: initial_listing,
        }
    }

    fn handle_panel_interaction(&mut self, interaction: PanelInteraction, ctx: &egui::Context) {
        match interaction {
            PanelInteraction::OpenListingRequested(path) => {
                ApplicationCoordinator::open_listing(&mut self.state, &mut self.loader, path, ctx);
            }
            PanelInteraction::GeneratedListingRequested => {
                ApplicationCoordinator::open_generated(&mut self.state);
            }
            PanelInteraction::CategorySelected(category) => {
                ApplicationCoordinator::open_category(&mut self.state, category);
            }
            PanelInteraction::StrategyChanged(choice) => {
                self.state.preferences.strategy = choice;
                ApplicationCoordinator::rebuild_browsers(&mut self.state);
            }
            PanelInteraction::PageSizeChanged(size) => {
                self.state.preferences.page_size = size;
                ApplicationCoordinator::rebuild_browsers(&mut self.state);
            }
            PanelInteraction::Browser(action) => {
                ApplicationCoordinator::dispatch(&mut self.state, action);
            }
        }
    }
}

impl eframe::App for DocViewApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        SettingsCoordinator::save_preferences(storage, &self.state.preferences);
    }

    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        ApplicationCoordinator::check_loading_completion(&mut self.state, &mut self.loader);

        if let Some(path) = self.pending_listing.take() {
            ApplicationCoordinator::open_listing(&mut self.state, &mut self.loader, path, ctx);
        }

        ApplicationCoordinator::pump(&mut self.state, ctx);

        let (interaction, host) = PanelManager::render_all_panels(ctx, &mut self.state, &self.loader);

        // Measurements describe the folder painted this frame, so they go
        // out before any navigation the frame triggered.
        if let Some(host) = host {
            ApplicationCoordinator::forward_host_metrics(
                &mut self.state,
                host.scroll_top,
                host.viewport_height,
                host.hidden,
                host.sentinel_visible,
            );
        }
        if let Some(interaction) = interaction {
            self.handle_panel_interaction(interaction, ctx);
        }

        // Persist preferences during frame (for crash resilience)
        if let Some(storage) = frame.storage_mut() {
            SettingsCoordinator::save_preferences(storage, &self.state.preferences);
        }
    }
}
