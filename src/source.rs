//! Data sources and the listing wire format.
//!
//! A source answers one chunk request with the listing endpoint's response
//! shape `{success, message?, data: {folders, files, pagination}}`.

use crate::error::FetchError;
use crate::fixture::ListingFixture;
use crate::model::{Chunk, Entry, EntryId, EntryKind, ListQuery, SortBy, SortOrder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Parameters of one chunk fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRequest {
    /// Listing endpoint of the category being browsed
    pub endpoint: String,
    pub folder_id: String,
    pub query: ListQuery,
}

#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not be reached
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("failed to decode listing: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Unavailable(_) | SourceError::Io(_))
    }
}

impl From<SourceError> for FetchError {
    fn from(error: SourceError) -> Self {
        match error {
            SourceError::Unavailable(message) => FetchError::Network(message),
            SourceError::Io(e) => FetchError::Network(e.to_string()),
            SourceError::Decode(e) => FetchError::Malformed(e.to_string()),
        }
    }
}

/// Anything that can answer listing requests.
pub trait DataSource: Send + Sync {
    fn list(&self, request: &ChunkRequest) -> Result<ListingResponse, SourceError>;
}

/// Top-level listing response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ListingData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub folders: Vec<WireEntry>,
    #[serde(default)]
    pub files: Vec<WireEntry>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub last_page: u32,
    pub total: usize,
    pub has_more_pages: bool,
}

/// An entry as the endpoint sends it; the kind is implied by its array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEntry {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default)]
    pub owner_name: String,
}

impl WireEntry {
    fn into_entry(self, kind: EntryKind) -> Entry {
        Entry {
            id: EntryId(self.id),
            kind,
            name: self.name,
            updated_at: self.updated_at,
            size: match kind {
                EntryKind::Folder => None,
                EntryKind::File => self.size,
            },
            owner_name: self.owner_name,
        }
    }
}

impl From<&Entry> for WireEntry {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.id.0.clone(),
            name: entry.name.clone(),
            updated_at: entry.updated_at,
            size: entry.size,
            owner_name: entry.owner_name.clone(),
        }
    }
}

/// Ids arrive as strings from some endpoints and as integers from others.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

impl ListingResponse {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }

    /// Converts the response to a chunk: folders first, then files.
    pub fn into_chunk(self) -> Result<Chunk, FetchError> {
        if !self.success {
            return Err(FetchError::Rejected(
                self.message.unwrap_or_else(|| "request failed".to_string()),
            ));
        }
        let data = self
            .data
            .ok_or_else(|| FetchError::Malformed("response has no data".to_string()))?;

        let entries = data
            .folders
            .into_iter()
            .map(|wire| Arc::new(wire.into_entry(EntryKind::Folder)))
            .chain(
                data.files
                    .into_iter()
                    .map(|wire| Arc::new(wire.into_entry(EntryKind::File))),
            )
            .collect();

        Ok(Chunk {
            entries,
            total_count: data.pagination.total,
            has_more: data.pagination.has_more_pages,
            page: data.pagination.current_page,
            last_page: data.pagination.last_page,
        })
    }
}

/// Folder contents held by an [`InMemorySource`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderContents {
    #[serde(default)]
    pub folders: Vec<Entry>,
    #[serde(default)]
    pub files: Vec<Entry>,
}

/// A folder tree held in memory. Applies filter, sort and pagination the way
/// the listing endpoint does.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    folders: HashMap<String, FolderContents>,
    /// Requests handled, for fetch accounting in tests and the status bar
    requests: Arc<std::sync::atomic::AtomicUsize>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_folder(&mut self, folder_id: impl Into<String>, contents: FolderContents) {
        self.folders.insert(folder_id.into(), contents);
    }

    /// Adds an entry to a folder, creating the folder listing if needed.
    /// Adding a folder entry also creates its (empty) listing.
    pub fn add_entry(&mut self, parent_id: &str, entry: Entry) {
        if entry.is_folder() {
            self.folders.entry(entry.id.0.clone()).or_default();
        }
        let contents = self.folders.entry(parent_id.to_string()).or_default();
        match entry.kind {
            EntryKind::Folder => contents.folders.push(entry),
            EntryKind::File => contents.files.push(entry),
        }
    }

    pub fn folder(&self, folder_id: &str) -> Option<&FolderContents> {
        self.folders.get(folder_id)
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    /// Number of `list` calls answered so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Runs the query against one folder.
    pub fn query(&self, folder_id: &str, query: &ListQuery) -> Option<ListingData> {
        let contents = self.folders.get(folder_id)?;
        let needle = query
            .filter
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_lowercase);
        let matches = |entry: &&Entry| {
            needle
                .as_deref()
                .map_or(true, |needle| entry.name.to_lowercase().contains(needle))
        };

        let mut ordered: Vec<&Entry> = contents
            .folders
            .iter()
            .filter(&matches)
            .chain(contents.files.iter().filter(&matches))
            .collect();
        ordered.sort_by(|a, b| compare_entries(a, b, query.sort_by, query.sort_order));

        let per_page = query.per_page.max(1) as usize;
        let total = ordered.len();
        let last_page = total.div_ceil(per_page).max(1) as u32;
        let current_page = query.page.max(1);
        let start = (current_page as usize - 1).saturating_mul(per_page).min(total);
        let end = (start + per_page).min(total);

        let mut data = ListingData {
            folders: Vec::new(),
            files: Vec::new(),
            pagination: Pagination {
                current_page,
                last_page,
                total,
                has_more_pages: current_page < last_page,
            },
        };
        for entry in &ordered[start..end] {
            match entry.kind {
                EntryKind::Folder => data.folders.push(WireEntry::from(*entry)),
                EntryKind::File => data.files.push(WireEntry::from(*entry)),
            }
        }
        Some(data)
    }
}

/// Folders first; within a kind by the sort key, then name, then id.
fn compare_entries(a: &Entry, b: &Entry, sort_by: SortBy, order: SortOrder) -> Ordering {
    let by_key = match sort_by {
        SortBy::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortBy::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortBy::Size => a.size.unwrap_or(0).cmp(&b.size.unwrap_or(0)),
        SortBy::Owner => a.owner_name.cmp(&b.owner_name),
    };
    let by_key = match order {
        SortOrder::Asc => by_key,
        SortOrder::Desc => by_key.reverse(),
    };
    a.kind
        .cmp(&b.kind)
        .then(by_key)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

impl DataSource for InMemorySource {
    fn list(&self, request: &ChunkRequest) -> Result<ListingResponse, SourceError> {
        self.requests
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(match self.query(&request.folder_id, &request.query) {
            Some(data) => ListingResponse {
                success: true,
                message: None,
                data: Some(data),
            },
            None => ListingResponse::rejected(format!("folder `{}` not found", request.folder_id)),
        })
    }
}

impl From<ListingFixture> for InMemorySource {
    fn from(fixture: ListingFixture) -> Self {
        let mut source = InMemorySource::new();
        for (folder_id, contents) in fixture.folders {
            source.insert_folder(folder_id, contents);
        }
        source
    }
}

/// Serves a listing fixture file written by `docview-gen`.
pub struct JsonListingSource {
    root_folder_id: String,
    inner: InMemorySource,
}

impl JsonListingSource {
    /// Loads a `.json` or Brotli-compressed `.json.br` fixture.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let fixture = ListingFixture::read(path)?;
        tracing::info!(
            folders = fixture.folders.len(),
            "loaded listing fixture {}",
            path.display()
        );
        Ok(Self {
            root_folder_id: fixture.root.clone(),
            inner: InMemorySource::from(fixture),
        })
    }

    pub fn root_folder_id(&self) -> &str {
        &self.root_folder_id
    }

    pub fn inner(&self) -> &InMemorySource {
        &self.inner
    }
}

impl DataSource for JsonListingSource {
    fn list(&self, request: &ChunkRequest) -> Result<ListingResponse, SourceError> {
        self.inner.list(request)
    }
}

/// Routes requests to a source by endpoint.
#[derive(Default)]
pub struct RoutedSource {
    routes: HashMap<String, Arc<dyn DataSource>>,
}

impl RoutedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&mut self, endpoint: impl Into<String>, source: Arc<dyn DataSource>) {
        self.routes.insert(endpoint.into(), source);
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl DataSource for RoutedSource {
    fn list(&self, request: &ChunkRequest) -> Result<ListingResponse, SourceError> {
        match self.routes.get(&request.endpoint) {
            Some(source) => source.list(request),
            None => Ok(ListingResponse::rejected(format!(
                "no listing endpoint `{}`",
                request.endpoint
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, 10, 0, 0).unwrap()
    }

    fn source() -> InMemorySource {
        let mut source = InMemorySource::new();
        source.add_entry("root", Entry::file("f1", "Boiler manual.pdf", ts(3), 300));
        source.add_entry("root", Entry::folder("d1", "Inspections", ts(1)));
        source.add_entry("root", Entry::file("f2", "annual report.xlsx", ts(2), 100));
        source.add_entry("root", Entry::folder("d2", "Blueprints", ts(5)));
        source
    }

    fn request(query: ListQuery) -> ChunkRequest {
        ChunkRequest {
            endpoint: "/facilities/1/documents".into(),
            folder_id: "root".into(),
            query,
        }
    }

    #[test]
    fn test_folders_first_then_sorted_files() {
        let chunk = source()
            .list(&request(ListQuery::first_page(50)))
            .unwrap()
            .into_chunk()
            .unwrap();

        let names: Vec<&str> = chunk.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Blueprints", "Inspections", "annual report.xlsx", "Boiler manual.pdf"]
        );
        assert_eq!(chunk.total_count, 4);
        assert!(!chunk.has_more);
    }

    #[test]
    fn test_descending_sort_keeps_folders_first() {
        let mut query = ListQuery::first_page(50);
        query.sort_by = SortBy::UpdatedAt;
        query.sort_order = SortOrder::Desc;

        let chunk = source().list(&request(query)).unwrap().into_chunk().unwrap();

        let ids: Vec<&str> = chunk.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["d2", "d1", "f1", "f2"]);
    }

    #[test]
    fn test_pagination_over_combined_list() {
        let query = ListQuery::first_page(3).with_page(2);
        let chunk = source().list(&request(query)).unwrap().into_chunk().unwrap();

        assert_eq!(chunk.len(), 1);
        assert_eq!(chunk.page, 2);
        assert_eq!(chunk.last_page, 2);
        assert_eq!(chunk.total_count, 4);
        assert!(!chunk.has_more);
    }

    #[test]
    fn test_filter_is_case_insensitive_substring() {
        let mut query = ListQuery::first_page(50);
        query.filter = Some("BO".into());

        let chunk = source().list(&request(query)).unwrap().into_chunk().unwrap();

        let ids: Vec<&str> = chunk.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["f1"]);
    }

    #[test]
    fn test_unknown_folder_is_rejected() {
        let mut req = request(ListQuery::first_page(50));
        req.folder_id = "missing".into();

        let result = source().list(&req).unwrap().into_chunk();

        assert!(matches!(result, Err(FetchError::Rejected(_))));
    }

    #[test]
    fn test_wire_response_decodes_numeric_ids() {
        let json = r#"{
            "success": true,
            "data": {
                "folders": [{"id": 7, "name": "Permits", "updatedAt": "2024-06-01T10:00:00Z", "ownerName": "Sato"}],
                "files": [{"id": "a1", "name": "log.csv", "updatedAt": "2024-06-02T10:00:00Z", "size": 512}],
                "pagination": {"currentPage": 1, "lastPage": 4, "total": 180, "hasMorePages": true}
            }
        }"#;

        let response: ListingResponse = serde_json::from_str(json).unwrap();
        let chunk = response.into_chunk().unwrap();

        assert_eq!(chunk.entries[0].id.as_str(), "7");
        assert!(chunk.entries[0].is_folder());
        assert_eq!(chunk.entries[1].size, Some(512));
        assert_eq!(chunk.total_count, 180);
        assert!(chunk.has_more);
    }

    #[test]
    fn test_unsuccessful_response_carries_message() {
        let response: ListingResponse =
            serde_json::from_str(r#"{"success": false, "message": "permission denied"}"#).unwrap();

        assert_eq!(
            response.into_chunk(),
            Err(FetchError::Rejected("permission denied".into()))
        );
    }

    #[test]
    fn test_routed_source_rejects_unknown_endpoint() {
        let mut routed = RoutedSource::new();
        routed.route("/facilities/1/documents", Arc::new(source()));

        let mut req = request(ListQuery::first_page(50));
        assert!(routed.list(&req).unwrap().success);

        req.endpoint = "/facilities/1/contracts/documents".into();
        assert!(!routed.list(&req).unwrap().success);
    }
}
