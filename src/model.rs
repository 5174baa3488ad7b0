//! Data model shared by every engine component.
//!
//! Entries are immutable value objects: the engine receives them from a data
//! source, shares them behind `Arc`, and never mutates one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Opaque entry identifier, unique within a folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    // Declaration order is render order: folders before files.
    Folder,
    File,
}

/// A folder or file record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntryId,
    pub kind: EntryKind,
    pub name: String,
    pub updated_at: DateTime<Utc>,
    /// Size in bytes; always `None` for folders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default)]
    pub owner_name: String,
}

impl Entry {
    pub fn folder(id: impl Into<String>, name: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: EntryId::new(id),
            kind: EntryKind::Folder,
            name: name.into(),
            updated_at,
            size: None,
            owner_name: String::new(),
        }
    }

    pub fn file(
        id: impl Into<String>,
        name: impl Into<String>,
        updated_at: DateTime<Utc>,
        size: u64,
    ) -> Self {
        Self {
            id: EntryId::new(id),
            kind: EntryKind::File,
            name: name.into(),
            updated_at,
            size: Some(size),
            owner_name: String::new(),
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner_name = owner.into();
        self
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Name,
    UpdatedAt,
    Size,
    Owner,
}

impl SortBy {
    pub const ALL: [SortBy; 4] = [SortBy::Name, SortBy::UpdatedAt, SortBy::Size, SortBy::Owner];

    pub fn label(&self) -> &'static str {
        match self {
            SortBy::Name => "Name",
            SortBy::UpdatedAt => "Updated",
            SortBy::Size => "Size",
            SortBy::Owner => "Owner",
        }
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortBy::Name),
            "updated_at" | "updatedAt" | "date" => Ok(SortBy::UpdatedAt),
            "size" => Ok(SortBy::Size),
            "owner" | "owner_name" | "ownerName" => Ok(SortBy::Owner),
            other => Err(format!("unknown sort key `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order `{}`", other)),
        }
    }
}

/// Request parameters that affect the contents of a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// 1-based page number
    pub page: u32,
    pub per_page: u32,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl ListQuery {
    pub fn first_page(per_page: u32) -> Self {
        Self {
            page: 1,
            per_page,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            filter: None,
        }
    }

    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    /// Index of the first entry of this page in the full ordered list.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) as usize * self.per_page as usize
    }
}

/// Cache key: every parameter that affects the fetched result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    pub folder_id: String,
    pub query: ListQuery,
}

impl ChunkKey {
    pub fn new(folder_id: impl Into<String>, query: ListQuery) -> Self {
        Self {
            folder_id: folder_id.into(),
            query,
        }
    }
}

/// An ordered run of entries returned for one [`ChunkKey`].
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Folders first, then files, in source order
    pub entries: Vec<Arc<Entry>>,
    /// Total entries in the folder across all pages
    pub total_count: usize,
    pub has_more: bool,
    pub page: u32,
    pub last_page: u32,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rendering strategy, fixed for the lifetime of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    FullRender,
    VirtualScroll,
    LazyLoading,
    Pagination,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::FullRender,
        Strategy::VirtualScroll,
        Strategy::LazyLoading,
        Strategy::Pagination,
    ];

    /// Picks a strategy from the expected row count.
    pub fn recommended_for(total_rows: usize) -> Self {
        if total_rows > 1000 {
            Strategy::VirtualScroll
        } else if total_rows > 500 {
            Strategy::LazyLoading
        } else if total_rows > 100 {
            Strategy::Pagination
        } else {
            Strategy::FullRender
        }
    }

    /// Whether the strategy pulls chunks through the cache and pool.
    pub fn uses_data_flow(&self) -> bool {
        !matches!(self, Strategy::FullRender)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::FullRender => "full_render",
            Strategy::VirtualScroll => "virtual_scroll",
            Strategy::LazyLoading => "lazy_loading",
            Strategy::Pagination => "pagination",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| format!("unknown strategy `{}`", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    List,
    Grid,
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(ViewMode::List),
            "grid" | "icon" => Ok(ViewMode::Grid),
            other => Err(format!("unknown view mode `{}`", other)),
        }
    }
}

/// Orders entries folders-first without disturbing the order within a kind.
pub fn folders_first(entries: &mut [Arc<Entry>]) {
    entries.sort_by_key(|entry| entry.kind);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_recommended_strategy_thresholds() {
        assert_eq!(Strategy::recommended_for(50), Strategy::FullRender);
        assert_eq!(Strategy::recommended_for(101), Strategy::Pagination);
        assert_eq!(Strategy::recommended_for(501), Strategy::LazyLoading);
        assert_eq!(Strategy::recommended_for(5000), Strategy::VirtualScroll);
    }

    #[test]
    fn test_folders_first_is_stable() {
        let mut entries = vec![
            Arc::new(Entry::file("f1", "b.pdf", ts(), 10)),
            Arc::new(Entry::folder("d1", "Drawings", ts())),
            Arc::new(Entry::file("f2", "a.pdf", ts(), 20)),
            Arc::new(Entry::folder("d2", "Contracts", ts())),
        ];

        folders_first(&mut entries);

        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d2", "f1", "f2"]);
    }

    #[test]
    fn test_view_mode_accepts_icon_alias() {
        assert_eq!("icon".parse::<ViewMode>(), Ok(ViewMode::Grid));
        assert_eq!("list".parse::<ViewMode>(), Ok(ViewMode::List));
        assert!("table".parse::<ViewMode>().is_err());
    }

    #[test]
    fn test_strategy_round_trips_through_str() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.as_str().parse::<Strategy>(), Ok(strategy));
        }
    }

    #[test]
    fn test_query_offset() {
        let query = ListQuery::first_page(50).with_page(3);
        assert_eq!(query.offset(), 100);
    }
}
