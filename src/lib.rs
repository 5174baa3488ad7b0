pub mod browser;
pub mod cache;
pub mod clock;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod error;
pub mod fixture;
pub mod format;
pub mod model;
pub mod monitor;
pub mod pool;
pub mod render;
pub mod retry;
pub mod source;
pub mod surface;
pub mod table;
pub mod transport;
pub mod window;

// Data model
pub use model::{
    Chunk, ChunkKey, Entry, EntryId, EntryKind, ListQuery, SortBy, SortOrder, Strategy, ViewMode,
};

// Engine components
pub use cache::{CacheStats, ChunkCache};
pub use controller::{Completion, LoadController, LoadState, LoadTarget, RequestToken, Trigger};
pub use coordinator::Coordinator;
pub use monitor::{MemoryGauge, PerformanceMonitor, PerformanceReport};
pub use pool::{NodeId, NodeKind, NodePool};
pub use render::Renderer;
pub use surface::{Mounts, RenderedRow, TableSurface};
pub use window::{RowWindowManager, VisibleRange};

// Table and browser
pub use browser::{
    Action, ActionKind, BrowserRegistry, Category, DefaultEndpoints, DocumentBrowser,
    EndpointBuilder, FacilityId, LifelineKind,
};
pub use table::{DocumentTable, PaginationView};

// Data sources and transport
pub use source::{DataSource, InMemorySource, JsonListingSource, ListingResponse, RoutedSource};
pub use transport::{ChunkTransport, RecordingTransport, ThreadedTransport};

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult, FetchError};
pub use retry::RetryPolicy;
