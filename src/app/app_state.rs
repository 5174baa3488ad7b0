//! Centralized application state for the document browser.

use crate::app::Preferences;
use docview::transport::Waker;
use docview::{BrowserRegistry, Category, DocumentBrowser, EngineConfig, FacilityId, RoutedSource};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

/// Root folder of a category's listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRoot {
    pub folder_id: String,
    /// Entries directly in the root, used to size the auto strategy
    pub entry_count: usize,
}

/// Last host measurements forwarded to the active table.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HostMetrics {
    pub scroll_top: Option<f32>,
    pub viewport_height: Option<f32>,
    pub hidden: bool,
}

pub struct AppState {
    pub preferences: Preferences,
    pub config: EngineConfig,
    pub facility: FacilityId,
    pub registry: BrowserRegistry,
    /// Every category endpoint routed to its listing
    pub routes: Option<Arc<RoutedSource>>,
    pub roots: HashMap<Category, CategoryRoot>,
    /// `None` while browsing generated data
    pub listing_path: Option<PathBuf>,
    pub error_message: Option<String>,
    /// Written by the tables' error handlers
    pub fetch_error: Rc<RefCell<Option<String>>>,
    /// Filter text being edited in the header
    pub filter_text: String,
    pub metrics: HostMetrics,
    pub waker: Option<Waker>,
}

impl AppState {
    pub fn new(preferences: Preferences, config: EngineConfig) -> Self {
        Self {
            preferences,
            config,
            facility: FacilityId::new("1"),
            registry: BrowserRegistry::new(),
            routes: None,
            roots: HashMap::new(),
            listing_path: None,
            error_message: None,
            fetch_error: Rc::new(RefCell::new(None)),
            filter_text: String::new(),
            metrics: HostMetrics::default(),
            waker: None,
        }
    }

    pub fn category(&self) -> Category {
        self.preferences.category()
    }

    pub fn active_browser(&self) -> Option<&DocumentBrowser> {
        self.registry.get(&self.category())
    }

    pub fn active_browser_mut(&mut self) -> Option<&mut DocumentBrowser> {
        let category = self.category();
        self.registry.get_mut(&category)
    }

    /// Drops every browser and the listing they read from.
    pub fn reset_listing(&mut self) {
        self.registry.clear();
        self.routes = None;
        self.roots.clear();
        self.listing_path = None;
        self.error_message = None;
        self.fetch_error.borrow_mut().take();
        self.filter_text.clear();
        self.metrics = HostMetrics::default();
    }

    /// Forgets host measurements so the next frame re-sends them.
    pub fn reset_metrics(&mut self) {
        self.metrics = HostMetrics {
            hidden: self.metrics.hidden,
            ..HostMetrics::default()
        };
    }
}
