//! Table performance manager.
//!
//! A [`DocumentTable`] owns one instance of every engine component and runs
//! the data flow between them: a view change asks the controller for a
//! chunk, the cache answers or the transport fetches, the window manager picks
//! the rows, the renderer binds them through the pool, and the monitor times
//! the pass.
//!
//! The table is driven entirely by its host: event methods (`on_scroll`,
//! `on_resize`, ...), `poll` to drain fetch results, and `tick` to fire timers.

use crate::cache::{CacheStats, ChunkCache};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::controller::{
    Completion, FetchOutcome, FetchTicket, LoadController, LoadState, LoadTarget, PaginationInfo,
    RequestToken, Trigger,
};
use crate::coordinator::{Coordinator, CoordinatorEvent, ObserverKind};
use crate::error::{EngineError, EngineResult, FetchError};
use crate::model::{Chunk, Entry, ListQuery, SortBy, SortOrder, Strategy, ViewMode};
use crate::monitor::{
    MemoryGauge, MonitorAction, PerformanceMonitor, PerformanceReport, SystemMemoryGauge,
};
use crate::pool::NodePool;
use crate::render::{RenderOutcome, Renderer};
use crate::surface::{Mounts, RenderedRow, TableSurface};
use crate::transport::{ChunkTransport, FetchRequest};
use crate::window::{compute_visible_range, RowWindowManager, ViewWindow, VisibleRange};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

/// Receives fetch failures.
pub type ErrorHandler = Box<dyn FnMut(&FetchError)>;

/// Pagination state for controls and status display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationView {
    pub current_page: u32,
    pub last_page: u32,
    pub total_items: usize,
    pub has_more_pages: bool,
    pub loading: bool,
    pub error: Option<String>,
}

/// Entries of the active folder by list index. Pages may arrive out of order.
#[derive(Debug, Default)]
struct ItemStore {
    slots: Vec<Option<Arc<Entry>>>,
    loaded_pages: BTreeSet<u32>,
}

impl ItemStore {
    fn clear(&mut self) {
        self.slots.clear();
        self.loaded_pages.clear();
    }

    fn store(&mut self, chunk: &Chunk, per_page: u32) {
        let offset = chunk.page.saturating_sub(1) as usize * per_page as usize;
        let needed = chunk.total_count.max(offset + chunk.len());
        self.slots.resize(needed, None);
        for (i, entry) in chunk.entries.iter().enumerate() {
            self.slots[offset + i] = Some(Arc::clone(entry));
        }
        self.loaded_pages.insert(chunk.page);
    }

    fn is_page_loaded(&self, page: u32) -> bool {
        self.loaded_pages.contains(&page)
    }

    fn range(&self, range: VisibleRange) -> Vec<Option<Arc<Entry>>> {
        let end = range.end.min(self.slots.len());
        let start = range.start.min(end);
        self.slots[start..end].to_vec()
    }

    /// Loaded entries up to the first gap.
    fn loaded_prefix(&self) -> Vec<Option<Arc<Entry>>> {
        self.slots
            .iter()
            .take_while(|slot| slot.is_some())
            .cloned()
            .collect()
    }

    fn loaded_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

pub struct DocumentTable {
    config: EngineConfig,
    strategy: Strategy,
    endpoint: String,
    clock: Arc<dyn Clock>,
    transport: Box<dyn ChunkTransport>,
    cache: ChunkCache,
    pool: NodePool,
    window: RowWindowManager,
    controller: LoadController,
    renderer: Renderer,
    monitor: PerformanceMonitor,
    coordinator: Coordinator,
    mounts: Mounts,
    surface: Option<TableSurface>,
    error_handler: Option<ErrorHandler>,

    folder_id: Option<String>,
    /// Sort, filter and page size of the current view; `page` is unused
    query: ListQuery,
    view_mode: ViewMode,
    scroll_top: f32,
    items: ItemStore,
    total_rows: usize,
    current_page: u32,
    static_entries: Vec<Arc<Entry>>,
    destroyed: bool,
}

impl DocumentTable {
    /// Creates a table for one strategy. Nothing is fetched or rendered until
    /// [`DocumentTable::attach`] and [`DocumentTable::show_folder`] are called.
    ///
    /// # Arguments
    /// * `config` - Engine tuning (page size, row height, timers, limits)
    /// * `strategy` - How rows are materialized; fixed for the table's life
    /// * `transport` - Runs fetches off the caller's thread; drained by [`DocumentTable::poll`]
    /// * `clock` - Time source for the cache, throttling and timers
    ///
    /// # Examples
    /// ```no_run
    /// use docview::{DocumentTable, EngineConfig, InMemorySource, Mounts, Strategy};
    /// use docview::{SystemClock, ThreadedTransport};
    /// use std::sync::Arc;
    ///
    /// let transport = ThreadedTransport::new(Arc::new(InMemorySource::new()));
    /// let mut table = DocumentTable::new(
    ///     EngineConfig::default(),
    ///     Strategy::LazyLoading,
    ///     Box::new(transport),
    ///     Arc::new(SystemClock),
    /// );
    /// table.attach(Mounts::all());
    /// table.show_folder("root", false);
    /// ```
    pub fn new(
        config: EngineConfig,
        strategy: Strategy,
        transport: Box<dyn ChunkTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let monitor = PerformanceMonitor::new(
            config.frame_budget(),
            config.slow_render_limit,
            config.heap_threshold,
            Box::new(SystemMemoryGauge),
        );
        Self {
            strategy,
            endpoint: String::new(),
            clock,
            transport,
            cache: ChunkCache::with_limits(config.cache_capacity, config.cache_timeout()),
            pool: NodePool::new(),
            window: RowWindowManager::new(config.row_height, config.buffer_size, config.hysteresis_rows),
            controller: LoadController::new(strategy),
            renderer: Renderer::new(strategy, config.row_height),
            monitor,
            coordinator: Coordinator::new(config.scroll_throttle(), config.resize_debounce()),
            mounts: Mounts::none(),
            surface: None,
            error_handler: None,
            folder_id: None,
            query: ListQuery::first_page(config.page_size),
            view_mode: ViewMode::default(),
            scroll_top: 0.0,
            items: ItemStore::default(),
            total_rows: 0,
            current_page: 1,
            static_entries: Vec::new(),
            destroyed: false,
            config,
        }
    }

    /// Sets the listing endpoint sent with every request.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_memory_gauge(mut self, gauge: Box<dyn MemoryGauge>) -> Self {
        self.monitor = PerformanceMonitor::new(
            self.config.frame_budget(),
            self.config.slow_render_limit,
            self.config.heap_threshold,
            gauge,
        );
        self
    }

    /// Installs the fetch failure handler, replacing any previous one.
    pub fn on_error(&mut self, handler: impl FnMut(&FetchError) + 'static) {
        if !self.destroyed {
            self.error_handler = Some(Box::new(handler));
        }
    }

    /// Connects the table to its host elements and starts background timers.
    pub fn attach(&mut self, mounts: Mounts) {
        if self.destroyed {
            return;
        }
        self.mounts = mounts;
        if mounts.body {
            if self.surface.is_none() {
                self.surface = Some(TableSurface::new());
            }
        } else {
            tracing::warn!("table attached without a body; rendering is disabled");
            self.surface = None;
        }

        let observers = self.coordinator.observers_mut();
        observers.connect(ObserverKind::Performance);
        if mounts.body || mounts.virtual_container {
            observers.connect(ObserverKind::Resize);
        }
        if mounts.sentinel && self.strategy == Strategy::LazyLoading {
            observers.connect(ObserverKind::Intersection);
        }

        let now = self.clock.now();
        self.coordinator
            .start(self.config.cleanup_interval(), self.config.sample_interval(), now);
    }

    // ---- view changes ----

    /// Opens a folder from its first page.
    ///
    /// Any in-flight fetch is superseded and its late result is discarded.
    /// Rendered rows, scroll position and pagination progress are reset.
    ///
    /// # Arguments
    /// * `folder_id` - The folder to list, as known to the data source
    /// * `force_refresh` - Skip the cache lookup; the fresh result is still cached
    ///
    /// # Examples
    /// ```ignore
    /// table.show_folder("d12", false);
    /// while table.poll() == 0 {}
    /// assert!(table.loaded_rows() > 0);
    /// ```
    pub fn show_folder(&mut self, folder_id: &str, force_refresh: bool) {
        if self.destroyed {
            return;
        }
        tracing::info!(folder = folder_id, strategy = %self.strategy, "showing folder");
        self.folder_id = Some(folder_id.to_string());
        self.reload(1, Trigger::FolderChange, force_refresh);
    }

    pub fn set_sort(&mut self, sort_by: SortBy, sort_order: SortOrder) {
        if self.destroyed || (self.query.sort_by == sort_by && self.query.sort_order == sort_order) {
            return;
        }
        self.query.sort_by = sort_by;
        self.query.sort_order = sort_order;
        self.reload(1, Trigger::QueryChange, false);
    }

    /// Sets the name filter. Blank filters clear it.
    pub fn set_filter(&mut self, filter: Option<String>) {
        let filter = filter.map(|f| f.trim().to_string()).filter(|f| !f.is_empty());
        if self.destroyed || self.query.filter == filter {
            return;
        }
        self.query.filter = filter;
        self.reload(1, Trigger::QueryChange, false);
    }

    pub fn set_view_mode(&mut self, view_mode: ViewMode) {
        if self.destroyed || self.view_mode == view_mode {
            return;
        }
        self.view_mode = view_mode;
        self.render();
    }

    /// Reloads the current view, bypassing the cache.
    pub fn refresh(&mut self) {
        if self.destroyed {
            return;
        }
        let page = match self.strategy {
            Strategy::Pagination => self.current_page,
            _ => 1,
        };
        self.reload(page, Trigger::Refresh, true);
    }

    /// Displays entries that are already present. Only valid for
    /// `FullRender`, which never fetches.
    pub fn show_static(&mut self, entries: Vec<Arc<Entry>>) -> EngineResult<()> {
        self.ensure_alive()?;
        if self.strategy != Strategy::FullRender {
            return Err(EngineError::UnsupportedStrategy {
                operation: "show_static",
                strategy: self.strategy,
            });
        }
        self.total_rows = entries.len();
        self.static_entries = entries;
        self.render();
        Ok(())
    }

    fn reload(&mut self, page: u32, trigger: Trigger, force_refresh: bool) {
        self.items.clear();
        self.total_rows = 0;
        self.current_page = page;
        self.scroll_top = 0.0;
        self.window.reset();
        self.controller.reset_pagination();
        self.renderer.clear(self.surface.as_mut(), &mut self.pool);
        if let Some(surface) = self.surface.as_mut() {
            surface.load_more_visible = false;
        }
        self.request_page(page, trigger, force_refresh);
    }

    fn target_for(&self, page: u32) -> Option<LoadTarget> {
        let folder_id = self.folder_id.as_ref()?;
        Some(LoadTarget::new(folder_id.clone(), self.query.with_page(page)))
    }

    fn request_page(&mut self, page: u32, trigger: Trigger, force_refresh: bool) {
        let Some(mut target) = self.target_for(page) else {
            return;
        };
        target.force_refresh = force_refresh;
        if let Some(ticket) = self.controller.request(target, trigger) {
            self.dispatch(ticket);
        }
    }

    /// Serves tickets from the cache where possible and hands the rest to the
    /// transport.
    fn dispatch(&mut self, ticket: FetchTicket) {
        let mut next = Some(ticket);
        while let Some(ticket) = next.take() {
            if !ticket.target.force_refresh {
                let key = ticket.target.key();
                if let Some(chunk) = self.cache.get(&key, self.clock.now()) {
                    let completion = self.controller.complete(ticket.token, Ok(chunk));
                    next = self.apply_completion(completion, false);
                    continue;
                }
            }

            tracing::debug!(
                token = ticket.token.0,
                folder = %ticket.target.folder_id,
                page = ticket.target.query.page,
                "dispatching fetch"
            );
            self.transport.dispatch(FetchRequest {
                token: ticket.token,
                endpoint: self.endpoint.clone(),
                folder_id: ticket.target.folder_id,
                query: ticket.target.query,
            });
        }
    }

    // ---- fetch results ----

    /// Drains finished fetches from the transport. Returns how many results
    /// were received.
    pub fn poll(&mut self) -> usize {
        if self.destroyed {
            return 0;
        }
        let results = self.transport.poll();
        let received = results.len();
        for (token, outcome) in results {
            self.handle_completion(token, outcome);
        }
        received
    }

    /// Applies one fetch result. Results for superseded requests are dropped.
    pub fn handle_completion(&mut self, token: RequestToken, outcome: FetchOutcome) {
        if self.destroyed {
            return;
        }
        let completion = self.controller.complete(token, outcome);
        let loaded = matches!(completion, Completion::Loaded { .. });
        if let Some(next) = self.apply_completion(completion, true) {
            self.dispatch(next);
        }
        if loaded && self.strategy == Strategy::VirtualScroll {
            self.request_missing_pages();
        }
    }

    fn apply_completion(&mut self, completion: Completion, store: bool) -> Option<FetchTicket> {
        match completion {
            Completion::Stale => None,
            Completion::Loaded {
                target,
                chunk,
                next,
            } => {
                if store {
                    self.cache
                        .put(target.key(), Arc::clone(&chunk), self.clock.now());
                }
                if self.is_current_view(&target) {
                    self.apply_chunk(&chunk);
                }
                next
            }
            Completion::Failed { error, next, .. } => {
                if let Some(surface) = self.surface.as_mut() {
                    surface.load_more_visible = true;
                }
                if let Some(handler) = self.error_handler.as_mut() {
                    handler(&error);
                }
                next
            }
        }
    }

    fn is_current_view(&self, target: &LoadTarget) -> bool {
        self.folder_id.as_deref() == Some(target.folder_id.as_str())
            && target.query.sort_by == self.query.sort_by
            && target.query.sort_order == self.query.sort_order
            && target.query.filter == self.query.filter
            && target.query.per_page == self.query.per_page
    }

    fn apply_chunk(&mut self, chunk: &Chunk) {
        tracing::info!(
            page = chunk.page,
            rows = chunk.len(),
            total = chunk.total_count,
            "chunk loaded"
        );
        self.items.store(chunk, self.query.per_page);
        self.total_rows = chunk.total_count;
        if self.strategy == Strategy::Pagination {
            self.current_page = chunk.page;
        }
        if let Some(surface) = self.surface.as_mut() {
            surface.load_more_visible = false;
        }
        if self.strategy == Strategy::VirtualScroll {
            self.window.update(self.scroll_top, self.total_rows);
        }
        self.render();
    }

    // ---- host events ----

    pub fn on_scroll(&mut self, scroll_top: f32) {
        if self.destroyed {
            return;
        }
        self.monitor.record_scroll();
        let now = self.clock.now();
        if let Some(scroll_top) = self.coordinator.on_scroll(scroll_top, now) {
            self.apply_scroll(scroll_top);
        }
    }

    /// Debounced viewport size change.
    pub fn on_resize(&mut self, viewport_height: f32) {
        if self.destroyed {
            return;
        }
        let now = self.clock.now();
        self.coordinator.on_resize(viewport_height, now);
    }

    /// Sets the viewport height immediately, without debouncing.
    pub fn set_viewport_height(&mut self, viewport_height: f32) {
        if !self.destroyed {
            self.apply_resize(viewport_height);
        }
    }

    pub fn on_visibility_change(&mut self, hidden: bool) {
        if self.destroyed {
            return;
        }
        if let Some(height) = self.coordinator.set_hidden(hidden) {
            self.apply_resize(height);
        }
    }

    /// The end-of-list sentinel came into view.
    pub fn on_sentinel_visible(&mut self) {
        if self.destroyed || !self.coordinator.accepts_intersection() {
            return;
        }
        self.load_next_page(Trigger::Sentinel);
    }

    /// Loads the next page (lazy loading) or re-attempts a failed fetch.
    pub fn load_more(&mut self) {
        if self.destroyed {
            return;
        }
        if self.controller.state() == LoadState::Error {
            self.retry();
        } else {
            self.load_next_page(Trigger::Sentinel);
        }
    }

    fn load_next_page(&mut self, trigger: Trigger) {
        if self.strategy != Strategy::LazyLoading {
            return;
        }
        let info = self.controller.pagination();
        if info.last_loaded_page > 0 && !info.has_more_pages {
            return;
        }
        self.request_page(info.last_loaded_page + 1, trigger, false);
    }

    fn apply_scroll(&mut self, scroll_top: f32) {
        self.scroll_top = scroll_top;
        match self.strategy {
            Strategy::VirtualScroll => {
                if self.window.update(scroll_top, self.total_rows).is_some() {
                    self.render();
                    self.request_missing_pages();
                }
            }
            Strategy::LazyLoading => {
                let rendered_height = self.items.loaded_prefix().len() as f32 * self.config.row_height;
                let bottom = scroll_top + self.window.viewport_height();
                if bottom >= rendered_height - self.config.lazy_threshold_px {
                    self.load_next_page(Trigger::ScrollRange);
                }
            }
            Strategy::Pagination | Strategy::FullRender => {}
        }
    }

    fn apply_resize(&mut self, viewport_height: f32) {
        self.window.set_viewport_height(viewport_height);
        if self.strategy == Strategy::VirtualScroll
            && self.window.update(self.scroll_top, self.total_rows).is_some()
        {
            self.render();
            self.request_missing_pages();
        }
    }

    /// Requests pages that cover the current window but have not arrived.
    fn request_missing_pages(&mut self) {
        let Some(range) = self.window.current() else {
            return;
        };
        if range.is_empty() {
            return;
        }
        let per_page = self.query.per_page.max(1) as usize;
        let first = (range.start / per_page) as u32 + 1;
        let last = ((range.end - 1) / per_page) as u32 + 1;
        let missing: Vec<u32> = (first..=last)
            .filter(|page| !self.items.is_page_loaded(*page))
            .collect();

        // A page already in flight is only re-requested when it is all the
        // window needs, which drops any older queued page.
        let in_flight = self.in_flight_page();
        let pending: Vec<u32> = missing
            .iter()
            .copied()
            .filter(|page| Some(*page) != in_flight)
            .collect();
        let pages = if pending.is_empty() { missing } else { pending };
        for page in pages {
            self.request_page(page, Trigger::ScrollRange, false);
        }
    }

    /// Page of the in-flight fetch when it belongs to the current view.
    fn in_flight_page(&self) -> Option<u32> {
        let ticket = self.controller.in_flight()?;
        self.is_current_view(&ticket.target)
            .then_some(ticket.target.query.page)
    }

    // ---- pagination ----

    pub fn go_to_page(&mut self, page: u32) -> EngineResult<()> {
        self.ensure_alive()?;
        if self.strategy != Strategy::Pagination {
            return Err(EngineError::UnsupportedStrategy {
                operation: "go_to_page",
                strategy: self.strategy,
            });
        }
        let last_page = self.controller.pagination().last_page;
        if page == 0 || (last_page > 0 && page > last_page) {
            return Err(EngineError::PageOutOfRange { page, last_page });
        }
        self.request_page(page, Trigger::PageChange, false);
        Ok(())
    }

    pub fn next_page(&mut self) -> EngineResult<()> {
        self.go_to_page(self.current_page + 1)
    }

    pub fn prev_page(&mut self) -> EngineResult<()> {
        self.go_to_page(self.current_page.saturating_sub(1))
    }

    /// Re-attempts the last failed fetch.
    pub fn retry(&mut self) {
        if self.destroyed {
            return;
        }
        if let Some(ticket) = self.controller.retry() {
            self.dispatch(ticket);
        }
    }

    // ---- timers ----

    /// Fires due timers. Call regularly from the host loop.
    pub fn tick(&mut self) {
        if self.destroyed {
            return;
        }
        let now = self.clock.now();
        for event in self.coordinator.tick(now) {
            match event {
                CoordinatorEvent::CleanupCache => {
                    let removed = self.cache.cleanup_expired(now);
                    if removed > 0 {
                        tracing::debug!(removed, "expired cache entries swept");
                    }
                }
                CoordinatorEvent::SampleMemory => {
                    let action = self.monitor.sample_memory();
                    self.handle_monitor_action(action);
                }
                CoordinatorEvent::Resize(height) => self.apply_resize(height),
                CoordinatorEvent::Scroll(scroll_top) => self.apply_scroll(scroll_top),
            }
        }
    }

    /// When the next timer is due, for scheduling the host's next wakeup.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.coordinator.next_deadline()
    }

    // ---- rendering ----

    fn render(&mut self) {
        let (rows, offset) = match self.strategy {
            Strategy::VirtualScroll => {
                let range = self.window.current().unwrap_or_else(|| {
                    compute_visible_range(
                        self.scroll_top,
                        self.window.viewport_height(),
                        self.config.row_height,
                        self.config.buffer_size,
                        self.total_rows,
                    )
                });
                (self.items.range(range), range.start)
            }
            Strategy::LazyLoading => (self.items.loaded_prefix(), 0),
            Strategy::Pagination => {
                let per_page = self.query.per_page as usize;
                let start = self.current_page.saturating_sub(1) as usize * per_page;
                let range = VisibleRange {
                    start,
                    end: start + per_page,
                };
                (self.items.range(range), start)
            }
            Strategy::FullRender => (
                self.static_entries.iter().cloned().map(Some).collect(),
                0,
            ),
        };

        let outcome = self.renderer.render_window(
            self.surface.as_mut(),
            &mut self.pool,
            &rows,
            self.view_mode,
            offset,
            self.total_rows,
        );
        if let RenderOutcome::Rendered { duration, .. } = outcome {
            let action = self.monitor.record_render(duration);
            self.handle_monitor_action(action);
        }
    }

    fn handle_monitor_action(&mut self, action: MonitorAction) {
        if let MonitorAction::Cleanup(reason) = action {
            tracing::warn!(
                ?reason,
                cached = self.cache.len(),
                pooled = self.pool.free_count(),
                "performance threshold exceeded, clearing cache and node pool"
            );
            self.cache.clear();
            self.pool.clear();
        }
    }

    // ---- teardown ----

    /// Stops timers and observers, releases every node, and empties the
    /// cache. Safe to call more than once; the table ignores all further
    /// events.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.coordinator.destroy();
        self.controller.cancel();
        self.renderer.clear(self.surface.as_mut(), &mut self.pool);
        self.pool.clear();
        self.cache.clear();
        self.items.clear();
        self.static_entries.clear();
        self.error_handler = None;
        self.destroyed = true;
        tracing::debug!(strategy = %self.strategy, "table destroyed");
    }

    fn ensure_alive(&self) -> EngineResult<()> {
        if self.destroyed {
            Err(EngineError::Destroyed)
        } else {
            Ok(())
        }
    }

    // ---- accessors ----

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn folder_id(&self) -> Option<&str> {
        self.folder_id.as_deref()
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn state(&self) -> LoadState {
        self.controller.state()
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.controller.last_error()
    }

    pub fn surface(&self) -> Option<&TableSurface> {
        self.surface.as_ref()
    }

    pub fn pool(&self) -> &NodePool {
        &self.pool
    }

    /// The materialized rows as plain values.
    pub fn rendered_rows(&self) -> Vec<RenderedRow> {
        self.surface
            .as_ref()
            .map(|surface| surface.snapshot(&self.pool))
            .unwrap_or_default()
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn loaded_rows(&self) -> usize {
        match self.strategy {
            Strategy::FullRender => self.static_entries.len(),
            _ => self.items.loaded_count(),
        }
    }

    pub fn visible_range(&self) -> Option<VisibleRange> {
        self.window.current()
    }

    /// The materialized window with its row geometry. Empty before the first
    /// virtual-scroll pass.
    pub fn view_window(&self) -> ViewWindow {
        self.window.view_window()
    }

    /// Scroll height of the whole list.
    pub fn content_height(&self) -> f32 {
        self.window.total_height(self.total_rows)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn pagination_info(&self) -> PaginationInfo {
        self.controller.pagination()
    }

    pub fn pagination(&self) -> PaginationView {
        let info = self.controller.pagination();
        PaginationView {
            current_page: self.current_page,
            last_page: info.last_page.max(1),
            total_items: info.total_items,
            has_more_pages: info.has_more_pages,
            loading: self.controller.state() == LoadState::Fetching,
            error: self.controller.last_error().map(ToString::to_string),
        }
    }

    pub fn performance(&self) -> PerformanceReport {
        self.monitor.snapshot(self.cache.stats(), &self.pool)
    }

    pub fn timers_pending(&self) -> usize {
        self.coordinator.timers().len()
    }

    pub fn observers_connected(&self) -> bool {
        self.coordinator.observers().any_connected()
    }
}

impl Drop for DocumentTable {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::monitor::NoMemoryGauge;
    use crate::source::InMemorySource;
    use crate::transport::RecordingTransport;
    use chrono::{TimeZone, Utc};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn source(files: usize) -> Arc<InMemorySource> {
        let ts = Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
        let mut source = InMemorySource::new();
        source.add_entry("root", Entry::folder("d1", "Archive", ts));
        for i in 0..files {
            source.add_entry("root", Entry::file(format!("f{:03}", i), format!("doc-{:03}.pdf", i), ts, 100));
        }
        Arc::new(source)
    }

    fn table(strategy: Strategy, transport: RecordingTransport) -> (DocumentTable, ManualClock) {
        let clock = ManualClock::new();
        let mut table = DocumentTable::new(
            EngineConfig::default(),
            strategy,
            Box::new(transport),
            Arc::new(clock.clone()),
        )
        .with_memory_gauge(Box::new(NoMemoryGauge));
        table.attach(Mounts::all());
        (table, clock)
    }

    #[test]
    fn test_pagination_walks_pages() {
        let transport = RecordingTransport::serving(source(119));
        let (mut table, _clock) = table(Strategy::Pagination, transport.clone());

        table.show_folder("root", false);
        table.poll();
        assert_eq!(table.rendered_rows().len(), 50);
        assert_eq!(table.pagination().last_page, 3);

        table.next_page().unwrap();
        table.poll();
        assert_eq!(table.pagination().current_page, 2);
        assert_eq!(table.rendered_rows()[0].entry_id.as_deref(), Some("f049"));

        table.prev_page().unwrap();
        // Page 1 comes from the cache.
        assert_eq!(transport.request_count(), 2);
        assert_eq!(table.pagination().current_page, 1);
        assert_eq!(table.rendered_rows()[0].entry_id.as_deref(), Some("d1"));
    }

    #[test]
    fn test_go_to_page_validates_range_and_strategy() {
        let transport = RecordingTransport::serving(source(119));
        let (mut table, _clock) = table(Strategy::Pagination, transport);
        table.show_folder("root", false);
        table.poll();

        assert!(matches!(
            table.go_to_page(4),
            Err(EngineError::PageOutOfRange { page: 4, last_page: 3 })
        ));
        assert!(table.go_to_page(0).is_err());

        let (mut lazy, _clock) = table_lazy();
        assert!(matches!(
            lazy.go_to_page(2),
            Err(EngineError::UnsupportedStrategy { .. })
        ));
    }

    fn table_lazy() -> (DocumentTable, ManualClock) {
        table(Strategy::LazyLoading, RecordingTransport::serving(source(10)))
    }

    #[test]
    fn test_failure_reaches_handler_and_shows_load_more() {
        let transport = RecordingTransport::new();
        let (mut table, _clock) = table(Strategy::LazyLoading, transport.clone());
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&errors);
        table.on_error(move |error| sink.borrow_mut().push(error.to_string()));

        table.show_folder("root", false);
        let token = transport.last_request().unwrap().token;
        table.handle_completion(token, Err(FetchError::Rejected("permission denied".into())));

        assert_eq!(table.state(), LoadState::Error);
        assert_eq!(*errors.borrow(), vec!["permission denied".to_string()]);
        assert!(table.surface().unwrap().load_more_visible);
        // No automatic retry.
        assert_eq!(transport.request_count(), 1);

        table.load_more();
        assert_eq!(transport.request_count(), 2);
        assert_eq!(transport.last_request().unwrap().query.page, 1);
    }

    #[test]
    fn test_forced_refresh_bypasses_cache_but_stores_result() {
        let transport = RecordingTransport::serving(source(10));
        let (mut table, _clock) = table(Strategy::Pagination, transport.clone());

        table.show_folder("root", false);
        table.poll();
        table.show_folder("root", false);
        assert_eq!(transport.request_count(), 1);

        table.show_folder("root", true);
        table.poll();
        assert_eq!(transport.request_count(), 2);
        assert_eq!(table.rendered_rows().len(), 11);
    }

    #[test]
    fn test_sort_change_supersedes_in_flight_request() {
        let transport = RecordingTransport::new();
        let (mut table, _clock) = table(Strategy::Pagination, transport.clone());

        table.show_folder("root", false);
        let first = transport.last_request().unwrap().token;
        table.set_sort(SortBy::UpdatedAt, SortOrder::Desc);
        let second = transport.last_request().unwrap();

        assert_ne!(first, second.token);
        assert_eq!(second.query.sort_by, SortBy::UpdatedAt);
        table.handle_completion(first, Err(FetchError::Network("late".into())));
        assert_eq!(table.state(), LoadState::Fetching);
    }

    #[test]
    fn test_view_mode_switch_renders_tiles() {
        let transport = RecordingTransport::serving(source(5));
        let (mut table, _clock) = table(Strategy::LazyLoading, transport);
        table.show_folder("root", false);
        table.poll();

        table.set_view_mode(ViewMode::Grid);

        let rows = table.rendered_rows();
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|row| row.tile));
    }

    #[test]
    fn test_full_render_never_fetches() {
        let transport = RecordingTransport::new();
        let (mut table, _clock) = table(Strategy::FullRender, transport.clone());
        let ts = Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();

        table.show_folder("root", false);
        table
            .show_static(vec![Arc::new(Entry::file("a", "a.pdf", ts, 1))])
            .unwrap();

        assert_eq!(transport.request_count(), 0);
        assert_eq!(table.rendered_rows().len(), 1);
        assert!(table.surface().unwrap().lazy_images);
    }

    #[test]
    fn test_missing_body_skips_rendering() {
        let transport = RecordingTransport::serving(source(5));
        let clock = ManualClock::new();
        let mut table = DocumentTable::new(
            EngineConfig::default(),
            Strategy::LazyLoading,
            Box::new(transport),
            Arc::new(clock),
        )
        .with_memory_gauge(Box::new(NoMemoryGauge));
        table.attach(Mounts {
            body: false,
            ..Mounts::all()
        });

        table.show_folder("root", false);
        table.poll();

        assert!(table.surface().is_none());
        assert_eq!(table.loaded_rows(), 6);
        assert_eq!(table.performance().render_count, 0);
    }

    #[test]
    fn test_cleanup_timer_sweeps_expired_entries() {
        let transport = RecordingTransport::serving(source(5));
        let (mut table, clock) = table(Strategy::Pagination, transport);
        table.show_folder("root", false);
        table.poll();
        assert_eq!(table.cache_stats().entries, 1);

        clock.advance(std::time::Duration::from_secs(200));
        table.tick();
        assert_eq!(table.cache_stats().entries, 1);

        clock.advance(std::time::Duration::from_secs(150));
        table.tick();
        assert_eq!(table.cache_stats().entries, 0);
    }
}
