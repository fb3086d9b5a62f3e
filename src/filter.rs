//! Advanced library filtering.
//!
//! The [`FilterPipeline`] narrows a library snapshot down with the predicates
//! of a [`FilterState`] and hands the survivors to the
//! [`SortEngine`](crate::sort::SortEngine).
//!
//! Every dimension is a pure AND filter. The cheap field-only predicates run
//! first; chapter-count and completion predicates need each book's chapter
//! list from the book store, so they only run on books that survived, and only
//! when the filter actually uses them. The same chapter data feeds the
//! [`ChaptersRead`](FilterSortKey::ChaptersRead) and
//! [`CompletionRate`](FilterSortKey::CompletionRate) sort keys. Nothing is
//! memoized between requests.

use futures::future::try_join_all;
use futures::stream::{BoxStream, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    cache::LibraryCache,
    error::Result,
    sort::SortEngine,
    types::{
        Book, BookId, BookItem, BookStatus, Chapter, CompletionStatus, FilterSortKey, FilterState,
        LibraryBook, SortSpec,
    },
};

/// Read progress of one book, computed from its chapter list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChapterStats {
    pub total: usize,
    pub read: usize,
}

impl ChapterStats {
    pub fn from_chapters(chapters: &[Chapter]) -> Self {
        ChapterStats {
            total: chapters.len(),
            read: chapters.iter().filter(|c| c.read).count(),
        }
    }

    pub fn completion(&self) -> CompletionStatus {
        CompletionStatus::from_counts(self.read, self.total)
    }

    /// Read chapters over total chapters, `0.0` for a book without chapters.
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.read as f64 / self.total as f64
        }
    }
}

/// Field-only predicates of a filter, with case folding done once up front.
struct FieldMatcher<'a> {
    query: Option<String>,
    include_genres: &'a HashSet<String>,
    exclude_genres: &'a HashSet<String>,
    statuses: &'a HashSet<BookStatus>,
    source_ids: &'a HashSet<String>,
    authors: HashSet<String>,
}

impl<'a> FieldMatcher<'a> {
    fn new(filter: &'a FilterState) -> Self {
        let query = filter.query.trim();
        FieldMatcher {
            query: (!query.is_empty()).then(|| query.to_lowercase()),
            include_genres: &filter.include_genres,
            exclude_genres: &filter.exclude_genres,
            statuses: &filter.statuses,
            source_ids: &filter.source_ids,
            authors: filter.authors.iter().map(|a| a.to_lowercase()).collect(),
        }
    }

    fn matches(&self, book: &Book) -> bool {
        self.matches_query(book)
            && (self.include_genres.is_empty()
                || self.include_genres.iter().any(|g| book.has_genre(g)))
            && !self.exclude_genres.iter().any(|g| book.has_genre(g))
            && (self.statuses.is_empty() || self.statuses.contains(&book.status))
            && (self.source_ids.is_empty() || self.source_ids.contains(&book.source_id))
            && (self.authors.is_empty() || self.authors.contains(&book.author.to_lowercase()))
    }

    fn matches_query(&self, book: &Book) -> bool {
        let Some(query) = &self.query else {
            return true;
        };
        book.title.to_lowercase().contains(query)
            || book.author.to_lowercase().contains(query)
            || book
                .description
                .as_ref()
                .is_some_and(|d| d.to_lowercase().contains(query))
    }
}

fn matches_chapters(filter: &FilterState, stats: &ChapterStats) -> bool {
    filter.min_chapters.is_none_or(|min| stats.total >= min)
        && filter.max_chapters.is_none_or(|max| stats.total <= max)
        && (filter.completion.is_empty() || filter.completion.contains(&stats.completion()))
}

/// Filters and sorts library snapshots for display.
#[derive(Clone)]
pub struct FilterPipeline {
    cache: Arc<LibraryCache>,
    sorter: SortEngine,
}

impl FilterPipeline {
    pub fn new(cache: Arc<LibraryCache>, sorter: SortEngine) -> Self {
        FilterPipeline { cache, sorter }
    }

    /// Filters the cached library, returning an empty list on any failure.
    ///
    /// An empty result does not tell "no matches" apart from "the store
    /// failed"; use [`try_apply`](FilterPipeline::try_apply) for that.
    pub async fn apply(&self, filter: &FilterState) -> Vec<BookItem> {
        self.try_apply(filter).await.unwrap_or_else(|e| {
            warn!(error = %e, "library filtering failed, returning no books");
            Vec::new()
        })
    }

    /// Filters the cached library, surfacing store failures.
    pub async fn try_apply(&self, filter: &FilterState) -> Result<Vec<BookItem>> {
        let snapshot = self.cache.library().await?;
        self.run(snapshot.as_ref().clone(), filter).await
    }

    /// Re-runs the filter on every library change the store reports.
    ///
    /// Failed emissions become empty lists, like [`apply`](FilterPipeline::apply).
    pub fn subscribe(&self, filter: FilterState) -> BoxStream<'static, Vec<BookItem>> {
        let pipeline = self.clone();
        let filter = Arc::new(filter);
        self.cache
            .subscribe_library()
            .then(move |snapshot| {
                let pipeline = pipeline.clone();
                let filter = Arc::clone(&filter);
                async move {
                    let result = match snapshot {
                        Ok(books) => pipeline.run(books, &filter).await,
                        Err(e) => Err(e),
                    };
                    result.unwrap_or_else(|e| {
                        warn!(error = %e, "library subscription update failed, emitting no books");
                        Vec::new()
                    })
                }
            })
            .boxed()
    }

    /// Filters and sorts an explicit snapshot.
    pub async fn run(
        &self,
        books: Vec<LibraryBook>,
        filter: &FilterState,
    ) -> Result<Vec<BookItem>> {
        let total = books.len();
        let matcher = FieldMatcher::new(filter);
        let mut candidates: Vec<LibraryBook> = books
            .into_iter()
            .filter(|b| filter.include_archived || !b.is_archived)
            .filter(|b| matcher.matches(&b.book))
            .collect();

        let mut stats: HashMap<BookId, ChapterStats> = HashMap::new();
        if filter.needs_chapters() {
            stats = self.chapter_stats(&candidates).await?;
            candidates.retain(|b| matches_chapters(filter, &stats[&b.id()]));
        }

        debug!(total, kept = candidates.len(), "library filtered");

        let sorted = match filter.sort_by {
            FilterSortKey::Library(key) => {
                let spec = SortSpec {
                    key,
                    ascending: filter.sort_ascending,
                    include_archived: filter.include_archived,
                };
                self.sorter.sort(candidates, &spec).await?
            }
            FilterSortKey::ChaptersRead => self.sorter.order_with(
                candidates,
                filter.include_archived,
                filter.sort_ascending,
                |a, b| stats[&a.id()].read.cmp(&stats[&b.id()].read),
            ),
            FilterSortKey::CompletionRate => self.sorter.order_with(
                candidates,
                filter.include_archived,
                filter.sort_ascending,
                |a, b| stats[&a.id()].rate().total_cmp(&stats[&b.id()].rate()),
            ),
        };

        Ok(sorted.iter().map(BookItem::from).collect())
    }

    async fn chapter_stats(&self, books: &[LibraryBook]) -> Result<HashMap<BookId, ChapterStats>> {
        let store = self.cache.store();
        let lookups = books.iter().map(|b| async move {
            let chapters = store.get_chapters_for_book(b.id()).await?;
            Ok::<_, crate::Error>((b.id(), ChapterStats::from_chapters(&chapters)))
        });
        Ok(try_join_all(lookups).await?.into_iter().collect())
    }
}
