//! Per-category document browser.
//!
//! One [`DocumentBrowser`] serves every document category of a facility; the
//! category only decides the endpoint. The host keeps browsers in a
//! [`BrowserRegistry`] and feeds user input to them as typed [`Action`]s.

use crate::error::{EngineError, EngineResult};
use crate::model::{SortBy, SortOrder, ViewMode};
use crate::table::DocumentTable;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FacilityId(pub String);

impl FacilityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LifelineKind {
    Electrical,
    Gas,
    Water,
    Elevator,
    Hvac,
}

impl LifelineKind {
    pub const ALL: [LifelineKind; 5] = [
        LifelineKind::Electrical,
        LifelineKind::Gas,
        LifelineKind::Water,
        LifelineKind::Elevator,
        LifelineKind::Hvac,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            LifelineKind::Electrical => "electrical",
            LifelineKind::Gas => "gas",
            LifelineKind::Water => "water",
            LifelineKind::Elevator => "elevator",
            LifelineKind::Hvac => "hvac",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LifelineKind::Electrical => "Electrical",
            LifelineKind::Gas => "Gas",
            LifelineKind::Water => "Water",
            LifelineKind::Elevator => "Elevator",
            LifelineKind::Hvac => "HVAC",
        }
    }
}

/// Document category of a facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Documents,
    Contracts,
    Maintenance,
    Lifeline(LifelineKind),
}

impl Category {
    pub fn all() -> Vec<Category> {
        let mut all = vec![Category::Documents, Category::Contracts, Category::Maintenance];
        all.extend(LifelineKind::ALL.into_iter().map(Category::Lifeline));
        all
    }

    pub fn label(&self) -> String {
        match self {
            Category::Documents => "Documents".to_string(),
            Category::Contracts => "Contracts".to_string(),
            Category::Maintenance => "Maintenance".to_string(),
            Category::Lifeline(kind) => format!("Lifeline: {}", kind.label()),
        }
    }

    /// Stable identifier used for persistence.
    pub fn key(&self) -> String {
        match self {
            Category::Documents => "documents".to_string(),
            Category::Contracts => "contracts".to_string(),
            Category::Maintenance => "maintenance".to_string(),
            Category::Lifeline(kind) => format!("lifeline-{}", kind.slug()),
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::all()
            .into_iter()
            .find(|category| category.key() == s)
            .ok_or_else(|| format!("unknown category `{}`", s))
    }
}

/// Builds the listing endpoint for a facility category.
pub trait EndpointBuilder {
    fn endpoint(&self, facility: &FacilityId, category: &Category) -> String;
}

impl<F> EndpointBuilder for F
where
    F: Fn(&FacilityId, &Category) -> String,
{
    fn endpoint(&self, facility: &FacilityId, category: &Category) -> String {
        self(facility, category)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEndpoints;

impl EndpointBuilder for DefaultEndpoints {
    fn endpoint(&self, facility: &FacilityId, category: &Category) -> String {
        match category {
            Category::Documents => format!("/facilities/{}/documents", facility),
            Category::Contracts => format!("/facilities/{}/contracts/documents", facility),
            Category::Maintenance => format!("/facilities/{}/maintenance/documents", facility),
            Category::Lifeline(kind) => format!(
                "/facilities/{}/lifeline-equipment/{}/documents",
                facility,
                kind.slug()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub folder_id: String,
    pub name: String,
}

pub struct DocumentBrowser {
    facility_id: FacilityId,
    category: Category,
    endpoint: String,
    table: DocumentTable,
    /// Root first, current folder last
    breadcrumbs: Vec<Breadcrumb>,
}

impl DocumentBrowser {
    pub fn new(
        facility_id: FacilityId,
        category: Category,
        endpoints: &dyn EndpointBuilder,
        table: DocumentTable,
    ) -> Self {
        let endpoint = endpoints.endpoint(&facility_id, &category);
        tracing::debug!(category = %category.key(), endpoint = %endpoint, "browser created");
        Self {
            facility_id,
            category,
            table: table.with_endpoint(endpoint.clone()),
            endpoint,
            breadcrumbs: Vec::new(),
        }
    }

    pub fn facility_id(&self) -> &FacilityId {
        &self.facility_id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn table(&self) -> &DocumentTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut DocumentTable {
        &mut self.table
    }

    pub fn breadcrumbs(&self) -> &[Breadcrumb] {
        &self.breadcrumbs
    }

    pub fn current_folder(&self) -> Option<&Breadcrumb> {
        self.breadcrumbs.last()
    }

    /// Starts browsing from a root folder, discarding the trail.
    pub fn open_root(&mut self, folder_id: &str, name: &str) {
        self.breadcrumbs.clear();
        self.open_folder(folder_id, name);
    }

    pub fn open_folder(&mut self, folder_id: &str, name: &str) {
        self.breadcrumbs.push(Breadcrumb {
            folder_id: folder_id.to_string(),
            name: name.to_string(),
        });
        self.table.show_folder(folder_id, false);
    }

    /// Goes to the parent folder. Returns false at the root.
    pub fn navigate_up(&mut self) -> bool {
        if self.breadcrumbs.len() < 2 {
            return false;
        }
        self.breadcrumbs.pop();
        self.show_current();
        true
    }

    /// Goes back to the breadcrumb at `index`.
    pub fn navigate_to(&mut self, index: usize) -> EngineResult<()> {
        if index >= self.breadcrumbs.len() {
            return Err(EngineError::InvalidAction(format!(
                "no breadcrumb at {} (trail has {})",
                index,
                self.breadcrumbs.len()
            )));
        }
        if index + 1 == self.breadcrumbs.len() {
            return Ok(());
        }
        self.breadcrumbs.truncate(index + 1);
        self.show_current();
        Ok(())
    }

    fn show_current(&mut self) {
        if let Some(crumb) = self.breadcrumbs.last() {
            let folder_id = crumb.folder_id.clone();
            self.table.show_folder(&folder_id, false);
        }
    }

    pub fn dispatch(&mut self, action: &Action) -> EngineResult<()> {
        (action.kind().handler())(self, action)
    }

    pub fn destroy(&mut self) {
        self.table.destroy();
        self.breadcrumbs.clear();
    }
}

/// Owns the active browser of each category.
#[derive(Default)]
pub struct BrowserRegistry {
    browsers: HashMap<Category, DocumentBrowser>,
}

impl BrowserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a browser, destroying the one it replaces.
    pub fn insert(&mut self, browser: DocumentBrowser) {
        if let Some(mut previous) = self.browsers.insert(browser.category(), browser) {
            previous.destroy();
        }
    }

    pub fn get(&self, category: &Category) -> Option<&DocumentBrowser> {
        self.browsers.get(category)
    }

    pub fn get_mut(&mut self, category: &Category) -> Option<&mut DocumentBrowser> {
        self.browsers.get_mut(category)
    }

    /// Unregisters and destroys a browser.
    pub fn remove(&mut self, category: &Category) -> Option<DocumentBrowser> {
        let mut browser = self.browsers.remove(category)?;
        browser.destroy();
        Some(browser)
    }

    pub fn contains(&self, category: &Category) -> bool {
        self.browsers.contains_key(category)
    }

    pub fn len(&self) -> usize {
        self.browsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.browsers.is_empty()
    }

    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<_> = self.browsers.keys().copied().collect();
        categories.sort();
        categories
    }

    /// Drains fetch results for every browser. Returns the total received.
    pub fn poll_all(&mut self) -> usize {
        self.browsers
            .values_mut()
            .map(|browser| browser.table_mut().poll())
            .sum()
    }

    pub fn tick_all(&mut self) {
        for browser in self.browsers.values_mut() {
            browser.table_mut().tick();
        }
    }

    pub fn clear(&mut self) {
        for (_, mut browser) in self.browsers.drain() {
            browser.destroy();
        }
    }
}

/// A user interaction, parsed from a `data-action` tag and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    OpenFolder { folder_id: String, name: String },
    NavigateUp,
    NavigateTo { index: usize },
    Refresh,
    NextPage,
    PrevPage,
    GoToPage { page: u32 },
    LoadMore,
    Retry,
    SetViewMode(ViewMode),
    /// Without an order, sorting by the current field flips its order
    SortBy { field: SortBy, order: Option<SortOrder> },
    SetFilter(Option<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    OpenFolder,
    NavigateUp,
    NavigateTo,
    Refresh,
    NextPage,
    PrevPage,
    GoToPage,
    LoadMore,
    Retry,
    SetViewMode,
    SortBy,
    SetFilter,
}

pub type ActionHandler = fn(&mut DocumentBrowser, &Action) -> EngineResult<()>;

impl ActionKind {
    pub const ALL: [ActionKind; 12] = [
        ActionKind::OpenFolder,
        ActionKind::NavigateUp,
        ActionKind::NavigateTo,
        ActionKind::Refresh,
        ActionKind::NextPage,
        ActionKind::PrevPage,
        ActionKind::GoToPage,
        ActionKind::LoadMore,
        ActionKind::Retry,
        ActionKind::SetViewMode,
        ActionKind::SortBy,
        ActionKind::SetFilter,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            ActionKind::OpenFolder => "open-folder",
            ActionKind::NavigateUp => "navigate-up",
            ActionKind::NavigateTo => "navigate-to",
            ActionKind::Refresh => "refresh",
            ActionKind::NextPage => "next-page",
            ActionKind::PrevPage => "prev-page",
            ActionKind::GoToPage => "go-to-page",
            ActionKind::LoadMore => "load-more",
            ActionKind::Retry => "retry",
            ActionKind::SetViewMode => "set-view-mode",
            ActionKind::SortBy => "sort-by",
            ActionKind::SetFilter => "set-filter",
        }
    }

    pub fn handler(&self) -> ActionHandler {
        match self {
            ActionKind::OpenFolder => open_folder,
            ActionKind::NavigateUp => navigate_up,
            ActionKind::NavigateTo => navigate_to,
            ActionKind::Refresh => refresh,
            ActionKind::NextPage => next_page,
            ActionKind::PrevPage => prev_page,
            ActionKind::GoToPage => go_to_page,
            ActionKind::LoadMore => load_more,
            ActionKind::Retry => retry,
            ActionKind::SetViewMode => set_view_mode,
            ActionKind::SortBy => sort_by,
            ActionKind::SetFilter => set_filter,
        }
    }
}

impl FromStr for ActionKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.tag() == s)
            .ok_or_else(|| EngineError::InvalidAction(format!("unknown action `{}`", s)))
    }
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::OpenFolder { .. } => ActionKind::OpenFolder,
            Action::NavigateUp => ActionKind::NavigateUp,
            Action::NavigateTo { .. } => ActionKind::NavigateTo,
            Action::Refresh => ActionKind::Refresh,
            Action::NextPage => ActionKind::NextPage,
            Action::PrevPage => ActionKind::PrevPage,
            Action::GoToPage { .. } => ActionKind::GoToPage,
            Action::LoadMore => ActionKind::LoadMore,
            Action::Retry => ActionKind::Retry,
            Action::SetViewMode(_) => ActionKind::SetViewMode,
            Action::SortBy { .. } => ActionKind::SortBy,
            Action::SetFilter(_) => ActionKind::SetFilter,
        }
    }

    /// Parses a tag such as `go-to-page` with parameters such as `page=3`.
    pub fn parse(tag: &str, params: &BTreeMap<String, String>) -> EngineResult<Self> {
        let action = match tag.parse::<ActionKind>()? {
            ActionKind::OpenFolder => {
                let folder_id = required(params, "id")?.to_string();
                let name = params
                    .get("name")
                    .cloned()
                    .unwrap_or_else(|| folder_id.clone());
                Action::OpenFolder { folder_id, name }
            }
            ActionKind::NavigateUp => Action::NavigateUp,
            ActionKind::NavigateTo => Action::NavigateTo {
                index: parse_param(params, "index")?,
            },
            ActionKind::Refresh => Action::Refresh,
            ActionKind::NextPage => Action::NextPage,
            ActionKind::PrevPage => Action::PrevPage,
            ActionKind::GoToPage => Action::GoToPage {
                page: parse_param(params, "page")?,
            },
            ActionKind::LoadMore => Action::LoadMore,
            ActionKind::Retry => Action::Retry,
            ActionKind::SetViewMode => Action::SetViewMode(
                required(params, "mode")?
                    .parse()
                    .map_err(EngineError::InvalidAction)?,
            ),
            ActionKind::SortBy => Action::SortBy {
                field: required(params, "field")?
                    .parse()
                    .map_err(EngineError::InvalidAction)?,
                order: params
                    .get("order")
                    .map(|order| order.parse())
                    .transpose()
                    .map_err(EngineError::InvalidAction)?,
            },
            ActionKind::SetFilter => Action::SetFilter(params.get("value").cloned()),
        };
        Ok(action)
    }
}

fn required<'a>(params: &'a BTreeMap<String, String>, name: &str) -> EngineResult<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| EngineError::InvalidAction(format!("missing parameter `{}`", name)))
}

fn parse_param<T: FromStr>(params: &BTreeMap<String, String>, name: &str) -> EngineResult<T> {
    let raw = required(params, name)?;
    raw.parse()
        .map_err(|_| EngineError::InvalidAction(format!("bad value `{}` for `{}`", raw, name)))
}

fn mismatch(expected: ActionKind) -> EngineError {
    EngineError::InvalidAction(format!("handler for `{}` got another action", expected.tag()))
}

fn open_folder(browser: &mut DocumentBrowser, action: &Action) -> EngineResult<()> {
    let Action::OpenFolder { folder_id, name } = action else {
        return Err(mismatch(ActionKind::OpenFolder));
    };
    browser.open_folder(folder_id, name);
    Ok(())
}

fn navigate_up(browser: &mut DocumentBrowser, _action: &Action) -> EngineResult<()> {
    browser.navigate_up();
    Ok(())
}

fn navigate_to(browser: &mut DocumentBrowser, action: &Action) -> EngineResult<()> {
    let Action::NavigateTo { index } = action else {
        return Err(mismatch(ActionKind::NavigateTo));
    };
    browser.navigate_to(*index)
}

fn refresh(browser: &mut DocumentBrowser, _action: &Action) -> EngineResult<()> {
    browser.table_mut().refresh();
    Ok(())
}

fn next_page(browser: &mut DocumentBrowser, _action: &Action) -> EngineResult<()> {
    browser.table_mut().next_page()
}

fn prev_page(browser: &mut DocumentBrowser, _action: &Action) -> EngineResult<()> {
    browser.table_mut().prev_page()
}

fn go_to_page(browser: &mut DocumentBrowser, action: &Action) -> EngineResult<()> {
    let Action::GoToPage { page } = action else {
        return Err(mismatch(ActionKind::GoToPage));
    };
    browser.table_mut().go_to_page(*page)
}

fn load_more(browser: &mut DocumentBrowser, _action: &Action) -> EngineResult<()> {
    browser.table_mut().load_more();
    Ok(())
}

fn retry(browser: &mut DocumentBrowser, _action: &Action) -> EngineResult<()> {
    browser.table_mut().retry();
    Ok(())
}

fn set_view_mode(browser: &mut DocumentBrowser, action: &Action) -> EngineResult<()> {
    let Action::SetViewMode(mode) = action else {
        return Err(mismatch(ActionKind::SetViewMode));
    };
    browser.table_mut().set_view_mode(*mode);
    Ok(())
}

fn sort_by(browser: &mut DocumentBrowser, action: &Action) -> EngineResult<()> {
    let Action::SortBy { field, order } = action else {
        return Err(mismatch(ActionKind::SortBy));
    };
    let table = browser.table_mut();
    let order = order.unwrap_or_else(|| {
        let query = table.query();
        if query.sort_by == *field {
            query.sort_order.toggled()
        } else {
            SortOrder::Asc
        }
    });
    table.set_sort(*field, order);
    Ok(())
}

fn set_filter(browser: &mut DocumentBrowser, action: &Action) -> EngineResult<()> {
    let Action::SetFilter(filter) = action else {
        return Err(mismatch(ActionKind::SetFilter));
    };
    browser.table_mut().set_filter(filter.clone());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::EngineConfig;
    use crate::model::{Entry, Strategy};
    use crate::monitor::NoMemoryGauge;
    use crate::source::InMemorySource;
    use crate::surface::Mounts;
    use crate::transport::RecordingTransport;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn browser(category: Category, transport: RecordingTransport) -> DocumentBrowser {
        let mut table = DocumentTable::new(
            EngineConfig::default(),
            Strategy::Pagination,
            Box::new(transport),
            Arc::new(ManualClock::new()),
        )
        .with_memory_gauge(Box::new(NoMemoryGauge));
        table.attach(Mounts::all());
        DocumentBrowser::new(FacilityId::new("12"), category, &DefaultEndpoints, table)
    }

    fn tree() -> Arc<InMemorySource> {
        let ts = Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap();
        let mut source = InMemorySource::new();
        source.add_entry("root", Entry::folder("d1", "Permits", ts));
        source.add_entry("d1", Entry::folder("d2", "2024", ts));
        source.add_entry("d2", Entry::file("f1", "permit.pdf", ts, 10));
        Arc::new(source)
    }

    #[test]
    fn test_default_endpoints() {
        let facility = FacilityId::new("12");
        let endpoints = DefaultEndpoints;

        assert_eq!(endpoints.endpoint(&facility, &Category::Documents), "/facilities/12/documents");
        assert_eq!(
            endpoints.endpoint(&facility, &Category::Maintenance),
            "/facilities/12/maintenance/documents"
        );
        assert_eq!(
            endpoints.endpoint(&facility, &Category::Lifeline(LifelineKind::Hvac)),
            "/facilities/12/lifeline-equipment/hvac/documents"
        );
    }

    #[test]
    fn test_closure_endpoint_builder() {
        let builder = |facility: &FacilityId, category: &Category| {
            format!("/api/{}/{}", facility, category.key())
        };
        let browser = DocumentBrowser::new(
            FacilityId::new("7"),
            Category::Contracts,
            &builder,
            DocumentTable::new(
                EngineConfig::default(),
                Strategy::Pagination,
                Box::new(RecordingTransport::new()),
                Arc::new(ManualClock::new()),
            ),
        );

        assert_eq!(browser.endpoint(), "/api/7/contracts");
        assert_eq!(browser.table().endpoint(), "/api/7/contracts");
    }

    #[test]
    fn test_category_keys_parse_back() {
        for category in Category::all() {
            assert_eq!(category.key().parse::<Category>(), Ok(category));
        }
        assert!("lifeline-steam".parse::<Category>().is_err());
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!(
            Action::parse("go-to-page", &params(&[("page", "3")])).unwrap(),
            Action::GoToPage { page: 3 }
        );
        assert_eq!(
            Action::parse("set-view-mode", &params(&[("mode", "icon")])).unwrap(),
            Action::SetViewMode(ViewMode::Grid)
        );
        assert_eq!(
            Action::parse("open-folder", &params(&[("id", "d1")])).unwrap(),
            Action::OpenFolder {
                folder_id: "d1".into(),
                name: "d1".into()
            }
        );
        assert!(Action::parse("go-to-page", &params(&[("page", "x")])).is_err());
        assert!(Action::parse("go-to-page", &params(&[])).is_err());
        assert!(Action::parse("delete-everything", &params(&[])).is_err());
    }

    #[test]
    fn test_breadcrumb_navigation() {
        let transport = RecordingTransport::serving(tree());
        let mut browser = browser(Category::Documents, transport.clone());

        browser.open_root("root", "Top");
        browser.table_mut().poll();
        browser
            .dispatch(&Action::parse("open-folder", &params(&[("id", "d1"), ("name", "Permits")])).unwrap())
            .unwrap();
        browser.table_mut().poll();
        browser.open_folder("d2", "2024");
        browser.table_mut().poll();
        assert_eq!(browser.breadcrumbs().len(), 3);
        assert_eq!(browser.table().rendered_rows()[0].entry_id.as_deref(), Some("f1"));

        assert!(browser.navigate_up());
        assert_eq!(browser.current_folder().unwrap().folder_id, "d1");

        browser.dispatch(&Action::NavigateTo { index: 0 }).unwrap();
        assert_eq!(browser.breadcrumbs().len(), 1);
        assert!(!browser.navigate_up());
        assert!(browser.navigate_to(5).is_err());
        // Revisited folders come from the cache.
        assert_eq!(transport.request_count(), 3);
        assert_eq!(transport.last_request().unwrap().endpoint, "/facilities/12/documents");
    }

    #[test]
    fn test_sort_action_toggles_current_field() {
        let transport = RecordingTransport::new();
        let mut browser = browser(Category::Documents, transport);
        browser.open_root("root", "Top");

        let action = Action::parse("sort-by", &params(&[("field", "name")])).unwrap();
        browser.dispatch(&action).unwrap();
        assert_eq!(browser.table().query().sort_order, SortOrder::Desc);

        let action = Action::parse("sort-by", &params(&[("field", "size")])).unwrap();
        browser.dispatch(&action).unwrap();
        assert_eq!(browser.table().query().sort_by, SortBy::Size);
        assert_eq!(browser.table().query().sort_order, SortOrder::Asc);
    }

    #[test]
    fn test_registry_remove_destroys_browser() {
        let mut registry = BrowserRegistry::new();
        registry.insert(browser(Category::Documents, RecordingTransport::new()));
        registry.insert(browser(Category::Lifeline(LifelineKind::Gas), RecordingTransport::new()));
        assert_eq!(registry.len(), 2);

        let removed = registry.remove(&Category::Documents).unwrap();
        assert!(removed.table().is_destroyed());
        assert!(!registry.contains(&Category::Documents));
        assert!(registry.get(&Category::Lifeline(LifelineKind::Gas)).is_some());
        assert!(registry.remove(&Category::Documents).is_none());
    }
}
