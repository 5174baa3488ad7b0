//! Fetch transport: the only asynchronous boundary of a table.
//!
//! A transport runs chunk requests somewhere else and hands `(token, outcome)`
//! pairs back when the owner polls. The owner decides what a completion means.

use crate::controller::{FetchOutcome, RequestToken};
use crate::error::FetchError;
use crate::model::ListQuery;
use crate::retry::RetryPolicy;
use crate::source::{ChunkRequest, DataSource, SourceError};
use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Called from the worker thread when a result is ready, typically to
/// request a repaint.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub token: RequestToken,
    pub endpoint: String,
    pub folder_id: String,
    pub query: ListQuery,
}

impl FetchRequest {
    fn chunk_request(&self) -> ChunkRequest {
        ChunkRequest {
            endpoint: self.endpoint.clone(),
            folder_id: self.folder_id.clone(),
            query: self.query.clone(),
        }
    }
}

pub trait ChunkTransport {
    /// Starts a fetch. Must not block on the source.
    fn dispatch(&mut self, request: FetchRequest);

    /// Drains every completion that has arrived since the last poll.
    fn poll(&mut self) -> Vec<(RequestToken, FetchOutcome)>;

    /// Fetches started but not yet drained.
    fn pending(&self) -> usize;
}

/// Performs one fetch against a source, retrying transient failures.
pub fn fetch_chunk(
    source: &dyn DataSource,
    request: &FetchRequest,
    policy: &RetryPolicy,
    sleep: impl FnMut(Duration),
) -> FetchOutcome {
    let chunk_request = request.chunk_request();
    policy
        .run(
            |_| source.list(&chunk_request),
            SourceError::is_transient,
            sleep,
        )
        .map_err(FetchError::from)
        .and_then(|response| response.into_chunk())
        .map(Arc::new)
}

/// Runs each fetch on a background thread and returns results over a channel.
pub struct ThreadedTransport {
    source: Arc<dyn DataSource>,
    policy: RetryPolicy,
    sender: Sender<(RequestToken, FetchOutcome)>,
    receiver: Receiver<(RequestToken, FetchOutcome)>,
    waker: Option<Waker>,
    /// Fetches dispatched and not yet polled
    in_progress: Arc<Mutex<usize>>,
}

impl ThreadedTransport {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        let (sender, receiver) = channel();
        Self {
            source,
            policy: RetryPolicy::default(),
            sender,
            receiver,
            waker: None,
            in_progress: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_waker(mut self, waker: Waker) -> Self {
        self.waker = Some(waker);
        self
    }
}

impl ChunkTransport for ThreadedTransport {
    fn dispatch(&mut self, request: FetchRequest) {
        *self.in_progress.lock().unwrap_or_else(|e| e.into_inner()) += 1;

        let source = Arc::clone(&self.source);
        let policy = self.policy;
        let sender = self.sender.clone();
        let waker = self.waker.clone();

        thread::spawn(move || {
            let outcome = fetch_chunk(source.as_ref(), &request, &policy, thread::sleep);
            // The receiver is gone once the table is dropped.
            let _ = sender.send((request.token, outcome));
            if let Some(waker) = waker {
                waker();
            }
        });
    }

    fn poll(&mut self) -> Vec<(RequestToken, FetchOutcome)> {
        let results: Vec<_> = self.receiver.try_iter().collect();
        if !results.is_empty() {
            let mut in_progress = self.in_progress.lock().unwrap_or_else(|e| e.into_inner());
            *in_progress = in_progress.saturating_sub(results.len());
        }
        results
    }

    fn pending(&self) -> usize {
        *self.in_progress.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Default)]
struct Recording {
    requests: Vec<FetchRequest>,
    ready: VecDeque<(RequestToken, FetchOutcome)>,
    outstanding: usize,
}

/// A synchronous transport that records every request.
///
/// With a source attached, each request is answered immediately and the
/// result waits for the next poll. Without one, results are supplied through
/// [`RecordingTransport::respond`]. Clones share the same recording.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    inner: Arc<Mutex<Recording>>,
    source: Option<Arc<dyn DataSource>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serving(source: Arc<dyn DataSource>) -> Self {
        Self {
            inner: Arc::default(),
            source: Some(source),
        }
    }

    fn recording(&self) -> std::sync::MutexGuard<'_, Recording> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every request dispatched so far, in order.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.recording().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.recording().requests.len()
    }

    pub fn last_request(&self) -> Option<FetchRequest> {
        self.recording().requests.last().cloned()
    }

    /// Queues a completion for the next poll.
    pub fn respond(&self, token: RequestToken, outcome: FetchOutcome) {
        self.recording().ready.push_back((token, outcome));
    }
}

impl ChunkTransport for RecordingTransport {
    fn dispatch(&mut self, request: FetchRequest) {
        let answer = self
            .source
            .as_ref()
            .map(|source| fetch_chunk(source.as_ref(), &request, &RetryPolicy::none(), |_| {}));

        let mut recording = self.recording();
        recording.outstanding += 1;
        if let Some(outcome) = answer {
            recording.ready.push_back((request.token, outcome));
        }
        recording.requests.push(request);
    }

    fn poll(&mut self) -> Vec<(RequestToken, FetchOutcome)> {
        let mut recording = self.recording();
        let results: Vec<_> = recording.ready.drain(..).collect();
        recording.outstanding = recording.outstanding.saturating_sub(results.len());
        results
    }

    fn pending(&self) -> usize {
        self.recording().outstanding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Entry;
    use crate::source::{InMemorySource, ListingResponse};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    fn source() -> Arc<InMemorySource> {
        let ts = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let mut source = InMemorySource::new();
        for i in 0..3 {
            source.add_entry("root", Entry::file(format!("f{}", i), format!("doc{}.pdf", i), ts, 10));
        }
        Arc::new(source)
    }

    fn request(token: u64) -> FetchRequest {
        FetchRequest {
            token: RequestToken(token),
            endpoint: "/facilities/1/documents".into(),
            folder_id: "root".into(),
            query: ListQuery::first_page(50),
        }
    }

    struct FlakySource {
        failures_left: AtomicUsize,
    }

    impl DataSource for FlakySource {
        fn list(&self, _request: &ChunkRequest) -> Result<ListingResponse, SourceError> {
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(SourceError::Unavailable("connection reset".into()));
            }
            Ok(ListingResponse::rejected("empty"))
        }
    }

    #[test]
    fn test_fetch_chunk_retries_transient_errors() {
        let flaky = FlakySource {
            failures_left: AtomicUsize::new(2),
        };
        let outcome = fetch_chunk(&flaky, &request(1), &RetryPolicy::default(), |_| {});

        // Reached the source on the third attempt.
        assert_eq!(outcome, Err(FetchError::Rejected("empty".into())));
    }

    #[test]
    fn test_fetch_chunk_gives_up_after_max_attempts() {
        let flaky = FlakySource {
            failures_left: AtomicUsize::new(5),
        };
        let outcome = fetch_chunk(&flaky, &request(1), &RetryPolicy::default(), |_| {});

        assert!(matches!(outcome, Err(FetchError::Network(_))));
        assert_eq!(flaky.failures_left.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_threaded_transport_delivers_and_wakes() {
        let woken = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&woken);
        let mut transport = ThreadedTransport::new(source())
            .with_waker(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));

        transport.dispatch(request(7));
        assert_eq!(transport.pending(), 1);

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut results = Vec::new();
        while results.is_empty() && Instant::now() < deadline {
            results = transport.poll();
            thread::sleep(Duration::from_millis(5));
        }

        let (token, outcome) = results.pop().unwrap();
        assert_eq!(token, RequestToken(7));
        assert_eq!(outcome.unwrap().len(), 3);
        assert_eq!(transport.pending(), 0);
        // The waker runs right after the send; give it a moment.
        let deadline = Instant::now() + Duration::from_secs(5);
        while woken.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(woken.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_recording_transport_shares_state_across_clones() {
        let handle = RecordingTransport::serving(source());
        let mut transport = handle.clone();

        transport.dispatch(request(1));

        assert_eq!(handle.request_count(), 1);
        assert_eq!(handle.pending(), 1);
        let results = transport.poll();
        assert_eq!(results.len(), 1);
        assert_eq!(handle.pending(), 0);
    }
}
