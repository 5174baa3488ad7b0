//! Load controller: decides when a chunk fetch is issued and which
//! completions are applied.
//!
//! At most one request is in flight per table. Triggers that arrive while
//! fetching either wait in a single-slot queue (latest wins) or supersede the
//! in-flight request outright, making its eventual completion stale.

use crate::error::FetchError;
use crate::model::{Chunk, ChunkKey, ListQuery, Strategy};
use std::sync::Arc;

pub type FetchOutcome = Result<Arc<Chunk>, FetchError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Fetching,
    Error,
}

/// What caused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The virtual-scroll window moved
    ScrollRange,
    /// The end-of-list sentinel became visible
    Sentinel,
    /// An explicit page change
    PageChange,
    /// A different folder was opened
    FolderChange,
    /// Sort order or filter changed
    QueryChange,
    /// Forced reload of the current view
    Refresh,
    /// Re-attempt of a failed request
    Retry,
}

impl Trigger {
    /// Whether this trigger invalidates whatever is in flight.
    pub fn supersedes(&self) -> bool {
        matches!(
            self,
            Trigger::FolderChange | Trigger::QueryChange | Trigger::Refresh
        )
    }
}

/// What to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadTarget {
    pub folder_id: String,
    pub query: ListQuery,
    /// Skip the cache lookup; the result is still cached
    pub force_refresh: bool,
}

impl LoadTarget {
    pub fn new(folder_id: impl Into<String>, query: ListQuery) -> Self {
        Self {
            folder_id: folder_id.into(),
            query,
            force_refresh: false,
        }
    }

    pub fn forced(mut self) -> Self {
        self.force_refresh = true;
        self
    }

    pub fn key(&self) -> ChunkKey {
        ChunkKey::new(self.folder_id.clone(), self.query.clone())
    }

    fn same_request(&self, other: &LoadTarget) -> bool {
        self.folder_id == other.folder_id && self.query == other.query
    }
}

/// Monotonically increasing request identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(pub u64);

/// An issued request. The owner must dispatch it and report back with
/// [`LoadController::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub token: RequestToken,
    pub target: LoadTarget,
}

/// Pagination info from the latest applied chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaginationInfo {
    pub has_more_pages: bool,
    pub total_items: usize,
    /// Page of the last applied chunk, 0 before the first
    pub last_loaded_page: u32,
    pub last_page: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The token was superseded; the result must not be applied
    Stale,
    Loaded {
        target: LoadTarget,
        chunk: Arc<Chunk>,
        next: Option<FetchTicket>,
    },
    Failed {
        target: LoadTarget,
        error: FetchError,
        next: Option<FetchTicket>,
    },
}

impl Completion {
    pub fn next(&self) -> Option<&FetchTicket> {
        match self {
            Completion::Stale => None,
            Completion::Loaded { next, .. } | Completion::Failed { next, .. } => next.as_ref(),
        }
    }
}

pub struct LoadController {
    strategy: Strategy,
    state: LoadState,
    next_token: u64,
    in_flight: Option<FetchTicket>,
    queued: Option<LoadTarget>,
    failed: Option<(LoadTarget, FetchError)>,
    pagination: PaginationInfo,
    issued: u64,
}

impl LoadController {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            state: LoadState::Idle,
            next_token: 1,
            in_flight: None,
            queued: None,
            failed: None,
            pagination: PaginationInfo::default(),
            issued: 0,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn pagination(&self) -> PaginationInfo {
        self.pagination
    }

    pub fn in_flight(&self) -> Option<&FetchTicket> {
        self.in_flight.as_ref()
    }

    pub fn queued(&self) -> Option<&LoadTarget> {
        self.queued.as_ref()
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.failed.as_ref().map(|(_, error)| error)
    }

    /// Total tickets issued over the controller's life.
    pub fn issued_count(&self) -> u64 {
        self.issued
    }

    /// Asks for `target`. Returns a ticket when a fetch should start now.
    pub fn request(&mut self, target: LoadTarget, trigger: Trigger) -> Option<FetchTicket> {
        if !self.strategy.uses_data_flow() {
            return None;
        }

        match self.state {
            LoadState::Idle | LoadState::Error => Some(self.issue(target)),
            LoadState::Fetching if trigger.supersedes() => {
                if let Some(stale) = &self.in_flight {
                    tracing::debug!(token = stale.token.0, "superseding in-flight request");
                }
                self.queued = None;
                Some(self.issue(target))
            }
            LoadState::Fetching => {
                let duplicate = self
                    .in_flight
                    .as_ref()
                    .is_some_and(|ticket| ticket.target.same_request(&target));
                // The newest trigger wins, even when it is the in-flight one.
                self.queued = if duplicate { None } else { Some(target) };
                None
            }
        }
    }

    /// Re-issues the last failed request.
    pub fn retry(&mut self) -> Option<FetchTicket> {
        if self.state != LoadState::Error {
            return None;
        }
        let (target, _) = self.failed.clone()?;
        self.request(target, Trigger::Retry)
    }

    /// Applies a completion. Only the latest issued token is accepted.
    pub fn complete(&mut self, token: RequestToken, outcome: FetchOutcome) -> Completion {
        let ticket = match self.in_flight.take() {
            Some(ticket) if ticket.token == token => ticket,
            other => {
                self.in_flight = other;
                tracing::debug!(token = token.0, "discarding stale completion");
                return Completion::Stale;
            }
        };

        let result = match outcome {
            Ok(chunk) => {
                self.state = LoadState::Idle;
                self.failed = None;
                self.apply_pagination(&chunk);
                Ok(chunk)
            }
            Err(error) => {
                tracing::error!(folder = %ticket.target.folder_id, page = ticket.target.query.page, "fetch failed: {}", error);
                self.state = LoadState::Error;
                self.failed = Some((ticket.target.clone(), error.clone()));
                Err(error)
            }
        };

        let next = self.queued.take().map(|target| self.issue(target));
        match result {
            Ok(chunk) => Completion::Loaded {
                target: ticket.target,
                chunk,
                next,
            },
            Err(error) => Completion::Failed {
                target: ticket.target,
                error,
                next,
            },
        }
    }

    /// Drops the in-flight and queued requests; any late completion is stale.
    pub fn cancel(&mut self) {
        self.in_flight = None;
        self.queued = None;
        if self.state == LoadState::Fetching {
            self.state = LoadState::Idle;
        }
    }

    /// Forgets pagination progress (folder or query change).
    pub fn reset_pagination(&mut self) {
        self.pagination = PaginationInfo::default();
    }

    fn issue(&mut self, target: LoadTarget) -> FetchTicket {
        let token = RequestToken(self.next_token);
        self.next_token += 1;
        self.issued += 1;
        self.state = LoadState::Fetching;
        let ticket = FetchTicket { token, target };
        self.in_flight = Some(ticket.clone());
        ticket
    }

    fn apply_pagination(&mut self, chunk: &Chunk) {
        self.pagination = PaginationInfo {
            has_more_pages: chunk.has_more,
            total_items: chunk.total_count,
            last_loaded_page: chunk.page,
            last_page: chunk.last_page,
        };
    }
}
