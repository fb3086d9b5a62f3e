//! Core data types for books, library entries, sorting, filtering and search results.
//!
//! This module defines the fundamental data structures used throughout Shoko:
//!
//! - [`Book`] - A book as owned by the book store
//! - [`LibraryBook`] - A book enriched with library-only attributes (pins, unread counts)
//! - [`Chapter`] - A single chapter with its read flag
//! - [`SortSpec`] / [`SortKey`] - How the library view should be ordered
//! - [`FilterState`] - The advanced filter dimensions applied by the filter pipeline
//! - [`SourceSearchResult`] / [`GlobalSearchResult`] - Outcomes of a multi-source search
//!
//! Timestamps are epoch milliseconds, as reported by the book store.
//!
//! # Examples
//!
//! ```rust
//! use shoko::types::*;
//!
//! let book = Book {
//!     id: 1,
//!     source_id: "royalroad".to_string(),
//!     key: "/fiction/21220".to_string(),
//!     title: "Mother of Learning".to_string(),
//!     author: "nobody103".to_string(),
//!     genres: vec!["Fantasy".to_string()],
//!     status: BookStatus::Completed,
//!     ..Default::default()
//! };
//!
//! let entry = LibraryBook::from(book);
//! assert!(!entry.is_pinned);
//! assert_eq!(entry.book.title, "Mother of Learning");
//! ```

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Identifier of a book inside the book store.
pub type BookId = i64;

/// Publication status of a book as reported by its source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    #[default]
    Unknown,
    Ongoing,
    Completed,
    Licensed,
    PublishingFinished,
    Cancelled,
    OnHiatus,
}

/// Represents a book with all its descriptive metadata.
///
/// Books are owned by the book store; this crate only reads and copies them.
///
/// # Fields
///
/// * `id` - Store identifier
/// * `source_id` - Identifier of the content source the book came from
/// * `key` - Source-side key (URL or identifier), unique within the source
/// * `title` / `author` / `description` / `genres` / `cover_url` - Descriptive metadata
/// * `status` - Publication status
/// * `favorite` - Whether the book is in the user's library
/// * `date_added` / `last_update` / `last_read` - Epoch millisecond timestamps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub source_id: String,
    pub key: String,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub cover_url: Option<String>,
    pub status: BookStatus,
    pub favorite: bool,
    pub date_added: i64,
    pub last_update: i64,
    pub last_read: i64,
}

impl Book {
    /// Returns `true` if the book carries `genre`, compared case-insensitively.
    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g.eq_ignore_ascii_case(genre))
    }
}

/// A library entry: a [`Book`] plus the attributes that only exist for library books.
///
/// Produced per query by the book store and never persisted by this crate.
/// `date_upload` and `date_fetched` hold the latest chapter upload and fetch
/// times; the book store may leave them at zero, in which case the sort engine
/// fills them in through enrichment queries when it needs them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryBook {
    #[serde(flatten)]
    pub book: Book,
    pub unread_count: u32,
    pub total_chapters: u32,
    pub is_pinned: bool,
    /// Position among pinned entries; only meaningful when `is_pinned` is set.
    pub pinned_order: i64,
    pub is_archived: bool,
    pub date_upload: i64,
    pub date_fetched: i64,
}

impl LibraryBook {
    pub fn id(&self) -> BookId {
        self.book.id
    }
}

impl From<Book> for LibraryBook {
    fn from(book: Book) -> Self {
        LibraryBook {
            book,
            ..Default::default()
        }
    }
}

/// A single chapter of a book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: i64,
    pub book_id: BookId,
    pub title: String,
    /// Chapter number (can be decimal for side chapters)
    pub number: f64,
    pub read: bool,
    pub date_upload: i64,
    pub date_fetched: i64,
}

/// One row of an enrichment query: the latest timestamp of some kind for a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestTimestamp {
    pub id: BookId,
    pub timestamp: i64,
}

/// Keys the library view can be sorted by.
///
/// `LastRead`, `DateAdded` and `DateFetched` are not reliably present on a
/// library snapshot and are resolved through enrichment queries against the
/// book store before sorting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Title,
    Author,
    LastRead,
    LastUpdated,
    Unread,
    TotalChapters,
    Source,
    DateAdded,
    DateFetched,
}

impl SortKey {
    /// Returns `true` if sorting by this key needs an enrichment query.
    pub fn needs_enrichment(self) -> bool {
        matches!(
            self,
            SortKey::LastRead | SortKey::DateAdded | SortKey::DateFetched
        )
    }
}

/// A sort key plus direction and archive visibility.
///
/// # Examples
///
/// ```rust
/// use shoko::types::{SortKey, SortSpec};
///
/// let spec = SortSpec::new(SortKey::LastRead).descending().with_archived();
/// assert!(!spec.ascending);
/// assert!(spec.include_archived);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub ascending: bool,
    pub include_archived: bool,
}

impl SortSpec {
    pub fn new(key: SortKey) -> Self {
        SortSpec {
            key,
            ascending: true,
            include_archived: false,
        }
    }

    pub fn descending(mut self) -> Self {
        self.ascending = false;
        self
    }

    pub fn with_archived(mut self) -> Self {
        self.include_archived = true;
        self
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec::new(SortKey::default())
    }
}

/// Sort keys accepted by the filter pipeline.
///
/// Extends [`SortKey`] with keys that need per-book chapter data, which only
/// the filter pipeline computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterSortKey {
    Library(SortKey),
    /// Number of read chapters.
    ChaptersRead,
    /// Ratio of read chapters to total chapters.
    CompletionRate,
}

impl Default for FilterSortKey {
    fn default() -> Self {
        FilterSortKey::Library(SortKey::default())
    }
}

impl From<SortKey> for FilterSortKey {
    fn from(key: SortKey) -> Self {
        FilterSortKey::Library(key)
    }
}

/// Reading progress of a book derived from its chapter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl CompletionStatus {
    /// Derives the completion status from a chapter list.
    ///
    /// A book without chapters, or with no read chapter, has not been started.
    ///
    /// ```rust
    /// use shoko::types::{Chapter, CompletionStatus};
    ///
    /// let read = Chapter { read: true, ..Default::default() };
    /// let unread = Chapter::default();
    ///
    /// assert_eq!(CompletionStatus::from_chapters(&[]), CompletionStatus::NotStarted);
    /// assert_eq!(
    ///     CompletionStatus::from_chapters(&[read.clone(), unread]),
    ///     CompletionStatus::InProgress
    /// );
    /// assert_eq!(CompletionStatus::from_chapters(&[read]), CompletionStatus::Completed);
    /// ```
    pub fn from_chapters(chapters: &[Chapter]) -> Self {
        let read = chapters.iter().filter(|c| c.read).count();
        CompletionStatus::from_counts(read, chapters.len())
    }

    /// Derives the completion status from `read` out of `total` chapters.
    pub fn from_counts(read: usize, total: usize) -> Self {
        if read == 0 {
            CompletionStatus::NotStarted
        } else if read >= total {
            CompletionStatus::Completed
        } else {
            CompletionStatus::InProgress
        }
    }
}

/// The advanced filter applied by the [`FilterPipeline`](crate::filter::FilterPipeline).
///
/// Every dimension is optional: an empty set (or `None` bound, or blank query)
/// places no constraint on that dimension. Dimensions combine with logical AND.
///
/// Built with `derive_builder`; every field defaults.
///
/// ```rust
/// use shoko::types::{BookStatus, FilterState, FilterSortKey};
///
/// let filter = FilterState::builder()
///     .include_genres(["Fantasy".to_string()])
///     .statuses([BookStatus::Ongoing])
///     .min_chapters(10usize)
///     .sort_by(FilterSortKey::CompletionRate)
///     .build()
///     .unwrap();
///
/// assert_eq!(filter.min_chapters, Some(10));
/// assert!(filter.sort_ascending);
/// assert!(filter.needs_chapters());
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default, setter(into))]
pub struct FilterState {
    /// Free-text search over title, author and description.
    pub query: String,
    pub include_genres: HashSet<String>,
    pub exclude_genres: HashSet<String>,
    pub statuses: HashSet<BookStatus>,
    pub source_ids: HashSet<String>,
    pub authors: HashSet<String>,
    /// Inclusive lower bound on chapter count.
    pub min_chapters: Option<usize>,
    /// Inclusive upper bound on chapter count.
    pub max_chapters: Option<usize>,
    pub completion: HashSet<CompletionStatus>,
    pub sort_by: FilterSortKey,
    pub sort_ascending: bool,
    pub include_archived: bool,
}

impl FilterState {
    pub fn builder() -> FilterStateBuilder {
        FilterStateBuilder::default()
    }

    /// Returns `true` if evaluating this filter requires per-book chapter lists.
    pub fn needs_chapters(&self) -> bool {
        self.min_chapters.is_some()
            || self.max_chapters.is_some()
            || !self.completion.is_empty()
            || matches!(
                self.sort_by,
                FilterSortKey::ChaptersRead | FilterSortKey::CompletionRate
            )
    }
}

impl Default for FilterState {
    fn default() -> Self {
        FilterState {
            query: String::new(),
            include_genres: HashSet::new(),
            exclude_genres: HashSet::new(),
            statuses: HashSet::new(),
            source_ids: HashSet::new(),
            authors: HashSet::new(),
            min_chapters: None,
            max_chapters: None,
            completion: HashSet::new(),
            sort_by: FilterSortKey::default(),
            sort_ascending: true,
            include_archived: false,
        }
    }
}

/// Display-ready projection of a library entry returned by the filter pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookItem {
    pub id: BookId,
    pub source_id: String,
    pub title: String,
    pub author: String,
    pub cover_url: Option<String>,
    pub status: BookStatus,
    pub favorite: bool,
    pub unread_count: u32,
    pub total_chapters: u32,
    pub is_pinned: bool,
    pub is_archived: bool,
}

impl From<&LibraryBook> for BookItem {
    fn from(entry: &LibraryBook) -> Self {
        BookItem {
            id: entry.book.id,
            source_id: entry.book.source_id.clone(),
            title: entry.book.title.clone(),
            author: entry.book.author.clone(),
            cover_url: entry.book.cover_url.clone(),
            status: entry.book.status,
            favorite: entry.book.favorite,
            unread_count: entry.unread_count,
            total_chapters: entry.total_chapters,
            is_pinned: entry.is_pinned,
            is_archived: entry.is_archived,
        }
    }
}

/// Identity of a registered content source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub id: String,
    pub name: String,
}

/// A single item returned by a source search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceItem {
    /// Source-side key, matched against library books' `key` for de-duplication
    pub key: String,
    pub title: String,
    pub author: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// A search hit annotated with its source and library membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchItem {
    #[serde(flatten)]
    pub item: SourceItem,
    pub source_id: String,
    /// Whether a book with the same `(source_id, key)` is already in the library
    pub in_library: bool,
}

/// Where a single source is in its search lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Searching,
    Completed,
    Failed,
}

/// One source's outcome within a global search.
///
/// A failed entry always has empty `results` and `is_loading == false`;
/// the constructors uphold that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSearchResult {
    pub source_id: String,
    pub source_name: String,
    pub results: Vec<SearchItem>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl SourceSearchResult {
    /// An in-flight entry with no results yet.
    pub fn searching(source_id: impl Into<String>, source_name: impl Into<String>) -> Self {
        SourceSearchResult {
            source_id: source_id.into(),
            source_name: source_name.into(),
            results: Vec::new(),
            is_loading: true,
            error: None,
        }
    }

    pub fn completed(
        source_id: impl Into<String>,
        source_name: impl Into<String>,
        results: Vec<SearchItem>,
    ) -> Self {
        SourceSearchResult {
            source_id: source_id.into(),
            source_name: source_name.into(),
            results,
            is_loading: false,
            error: None,
        }
    }

    pub fn failed(
        source_id: impl Into<String>,
        source_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        SourceSearchResult {
            source_id: source_id.into(),
            source_name: source_name.into(),
            results: Vec::new(),
            is_loading: false,
            error: Some(error.into()),
        }
    }

    pub fn phase(&self) -> SearchPhase {
        if self.error.is_some() {
            SearchPhase::Failed
        } else if self.is_loading {
            SearchPhase::Searching
        } else {
            SearchPhase::Completed
        }
    }
}

/// The merged outcome of a query run against several sources.
///
/// `source_results` follows source iteration order, not completion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSearchResult {
    pub query: String,
    pub source_results: Vec<SourceSearchResult>,
    /// Sum of result counts across all sources; failed sources contribute nothing.
    pub total_results: usize,
    pub duration: Duration,
}

impl GlobalSearchResult {
    /// Assembles a result, deriving `total_results` from the per-source entries.
    pub fn new(
        query: impl Into<String>,
        source_results: Vec<SourceSearchResult>,
        duration: Duration,
    ) -> Self {
        let total_results = source_results.iter().map(|r| r.results.len()).sum();
        GlobalSearchResult {
            query: query.into(),
            source_results,
            total_results,
            duration,
        }
    }

    /// Returns `true` once no source is still searching.
    pub fn is_complete(&self) -> bool {
        self.source_results.iter().all(|r| !r.is_loading)
    }

    /// Iterates over every hit from every source, in source order.
    pub fn items(&self) -> impl Iterator<Item = &SearchItem> {
        self.source_results.iter().flat_map(|r| r.results.iter())
    }
}
