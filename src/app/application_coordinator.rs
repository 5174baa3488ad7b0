//! Application-level workflows: choosing a listing, building browsers, and
//! forwarding host events to the active table.

use crate::app::app_state::CategoryRoot;
use crate::app::AppState;
use crate::io::{AsyncLoader, LoadResult};
use docview::source::ChunkRequest;
use docview::{
    Action, Category, DataSource, DefaultEndpoints, DocumentBrowser, DocumentTable,
    EndpointBuilder, ListQuery, Mounts, RoutedSource, Strategy, SystemClock, ThreadedTransport,
};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

/// Base seed for generated listings; each category adds its index.
const GENERATED_SEED: u64 = 42;

/// Name shown for the root breadcrumb.
const ROOT_NAME: &str = "All documents";

pub struct ApplicationCoordinator;

impl ApplicationCoordinator {
    /// Serves every category from its own generated tree.
    pub fn open_generated(state: &mut AppState) {
        state.reset_listing();
        let mut routes = RoutedSource::new();
        for (i, category) in Category::all().into_iter().enumerate() {
            let (source, root) = AsyncLoader::generated_listing(GENERATED_SEED + i as u64);
            let entry_count = source
                .folder(&root)
                .map(|contents| contents.folders.len() + contents.files.len())
                .unwrap_or(0);
            routes.route(
                DefaultEndpoints.endpoint(&state.facility, &category),
                Arc::new(source),
            );
            state.roots.insert(
                category,
                CategoryRoot {
                    folder_id: root,
                    entry_count,
                },
            );
        }
        state.routes = Some(Arc::new(routes));
        let category = state.category();
        Self::open_category(state, category);
    }

    /// Starts loading a listing file in the background.
    pub fn open_listing(
        state: &mut AppState,
        loader: &mut AsyncLoader,
        path: PathBuf,
        ctx: &egui::Context,
    ) {
        state.reset_listing();
        loader.start_listing_load(path, ctx);
    }

    /// Applies a finished listing load. Returns true when one completed.
    pub fn check_loading_completion(state: &mut AppState, loader: &mut AsyncLoader) -> bool {
        match loader.check_completion() {
            LoadResult::Success { source, path } => {
                let root = source.root_folder_id().to_string();
                let entry_count = source
                    .inner()
                    .folder(&root)
                    .map(|contents| contents.folders.len() + contents.files.len())
                    .unwrap_or(0);
                let source: Arc<dyn DataSource> = Arc::new(source);

                // A single listing file stands in for every category.
                let mut routes = RoutedSource::new();
                for category in Category::all() {
                    routes.route(
                        DefaultEndpoints.endpoint(&state.facility, &category),
                        Arc::clone(&source),
                    );
                    state.roots.insert(
                        category,
                        CategoryRoot {
                            folder_id: root.clone(),
                            entry_count,
                        },
                    );
                }
                state.routes = Some(Arc::new(routes));
                state.listing_path = Some(path);
                let category = state.category();
                Self::open_category(state, category);
                true
            }
            LoadResult::Error(message) => {
                tracing::error!("listing load failed: {}", message);
                state.error_message = Some(format!("Error loading listing: {}", message));
                true
            }
            LoadResult::None => false,
        }
    }

    /// Makes `category` active, creating its browser on first use.
    pub fn open_category(state: &mut AppState, category: Category) {
        state.preferences.set_category(category);
        state.reset_metrics();
        if state.registry.contains(&category) {
            return;
        }
        let (Some(routes), Some(root)) = (state.routes.clone(), state.roots.get(&category).cloned())
        else {
            return;
        };

        let strategy = state.preferences.strategy.resolve(root.entry_count);
        let mut config = state.config.clone();
        config.page_size = state.preferences.page_size;

        let mut transport = ThreadedTransport::new(routes);
        if let Some(waker) = &state.waker {
            transport = transport.with_waker(Arc::clone(waker));
        }
        let mut table = DocumentTable::new(config, strategy, Box::new(transport), Arc::new(SystemClock));
        let fetch_error = Rc::clone(&state.fetch_error);
        table.on_error(move |error| {
            *fetch_error.borrow_mut() = Some(error.to_string());
        });
        table.attach(Mounts::all());
        table.set_view_mode(state.preferences.view_mode);
        table.set_sort(state.preferences.sort_by, state.preferences.sort_order);

        let mut browser =
            DocumentBrowser::new(state.facility.clone(), category, &DefaultEndpoints, table);
        tracing::info!(category = %category.key(), %strategy, rows = root.entry_count, "opening category");
        browser.open_root(&root.folder_id, ROOT_NAME);
        state.registry.insert(browser);
        Self::refresh_static_rows(state);
    }

    /// Rebuilds every browser, after a strategy or page size change.
    pub fn rebuild_browsers(state: &mut AppState) {
        state.registry.clear();
        let category = state.category();
        Self::open_category(state, category);
    }

    /// Runs a browser action against the active browser.
    pub fn dispatch(state: &mut AppState, action: Action) {
        if matches!(action, Action::Retry | Action::LoadMore | Action::Refresh) {
            state.fetch_error.borrow_mut().take();
        }
        let Some(browser) = state.active_browser_mut() else {
            return;
        };
        if let Err(e) = browser.dispatch(&action) {
            tracing::warn!(?action, "action rejected: {}", e);
            state.error_message = Some(e.to_string());
            return;
        }
        state.error_message = None;

        let view = state.active_browser().map(|browser| {
            let table = browser.table();
            (table.query().sort_by, table.query().sort_order, table.view_mode())
        });
        if let Some((sort_by, sort_order, view_mode)) = view {
            state.preferences.sort_by = sort_by;
            state.preferences.sort_order = sort_order;
            state.preferences.view_mode = view_mode;
        }
        if matches!(
            action,
            Action::OpenFolder { .. } | Action::NavigateUp | Action::NavigateTo { .. }
        ) {
            state.reset_metrics();
        }
        Self::refresh_static_rows(state);
    }

    /// Full-render tables never fetch; hand them the whole folder the way a
    /// server-rendered page would arrive.
    fn refresh_static_rows(state: &mut AppState) {
        let Some(routes) = state.routes.clone() else {
            return;
        };
        let Some(browser) = state.active_browser_mut() else {
            return;
        };
        if browser.table().strategy() != Strategy::FullRender {
            return;
        }
        let Some(folder_id) = browser.current_folder().map(|crumb| crumb.folder_id.clone()) else {
            return;
        };

        let current = browser.table().query().clone();
        let request = ChunkRequest {
            endpoint: browser.endpoint().to_string(),
            folder_id,
            query: ListQuery {
                page: 1,
                per_page: u32::MAX,
                ..current
            },
        };
        let chunk = routes
            .list(&request)
            .map_err(docview::FetchError::from)
            .and_then(|response| response.into_chunk());
        match chunk {
            Ok(chunk) => {
                if let Err(e) = browser.table_mut().show_static(chunk.entries) {
                    tracing::warn!("static rows rejected: {}", e);
                }
            }
            Err(e) => {
                *state.fetch_error.borrow_mut() = Some(e.to_string());
            }
        }
    }

    /// Forwards host measurements to the active table when they change.
    pub fn forward_host_metrics(
        state: &mut AppState,
        scroll_top: f32,
        viewport_height: f32,
        hidden: bool,
        sentinel_visible: bool,
    ) {
        let previous = state.metrics;
        let Some(browser) = state.active_browser_mut() else {
            return;
        };
        let table = browser.table_mut();

        if previous.hidden != hidden {
            table.on_visibility_change(hidden);
        }
        match previous.viewport_height {
            None => table.set_viewport_height(viewport_height),
            Some(height) if (height - viewport_height).abs() > 0.5 => {
                table.on_resize(viewport_height)
            }
            _ => {}
        }
        if previous.scroll_top != Some(scroll_top) {
            table.on_scroll(scroll_top);
        }
        if sentinel_visible {
            table.on_sentinel_visible();
        }

        state.metrics.scroll_top = Some(scroll_top);
        state.metrics.viewport_height = Some(viewport_height);
        state.metrics.hidden = hidden;
    }

    /// Drains fetch results, fires due timers, and schedules the next frame
    /// for the earliest pending deadline.
    pub fn pump(state: &mut AppState, ctx: &egui::Context) {
        state.registry.poll_all();
        state.registry.tick_all();

        let deadline = state
            .active_browser()
            .and_then(|browser| browser.table().next_deadline());
        if let Some(deadline) = deadline {
            ctx.request_repaint_after(deadline.saturating_duration_since(Instant::now()));
        }
    }
}
