//! The caller-facing library API.
//!
//! [`Library`] wires a [`BookStore`] and a [`Sources`] registry to the cache,
//! sort engine, filter pipeline, search aggregator and search history, and
//! exposes what a view model needs.
//!
//! Read methods never fail: store errors are logged and turned into empty
//! values, and per-source search errors stay inside their
//! [`SourceSearchResult`](crate::types::SourceSearchResult). The `try_*`
//! variants return the underlying [`Result`] instead. Mutations return
//! their `Result` directly and invalidate the cache when they succeed.
//!
//! # Examples
//!
//! ```rust,no_run
//! use shoko::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(store: Arc<dyn BookStore>) -> shoko::Result<()> {
//! let library = Library::new(store, Sources::new(), LibraryConfig::default());
//!
//! let books = library.get_library(&SortSpec::new(SortKey::LastRead).descending()).await;
//!
//! let filter = FilterState::builder()
//!     .include_genres(["Fantasy".to_string()])
//!     .min_chapters(10usize)
//!     .build()
//!     .unwrap();
//! let fantasy = library.apply_filters(&filter).await;
//!
//! library.save_search_history("cultivation");
//! let hits = library.search_global("cultivation", &[]).await;
//! # Ok(())
//! # }
//! ```

use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use tracing::warn;

use crate::{
    cache::{CacheStats, LibraryCache},
    config::LibraryConfig,
    error::Result,
    filter::FilterPipeline,
    history::SearchHistory,
    search::SearchAggregator,
    sort::SortEngine,
    source::Sources,
    store::BookStore,
    types::{Book, BookId, BookItem, FilterState, GlobalSearchResult, LibraryBook, SortSpec},
};

/// Entry point tying the library components together.
pub struct Library {
    cache: Arc<LibraryCache>,
    sorter: SortEngine,
    filters: FilterPipeline,
    search: SearchAggregator,
    history: SearchHistory,
    config: LibraryConfig,
}

impl Library {
    pub fn new(store: Arc<dyn BookStore>, sources: Sources, config: LibraryConfig) -> Self {
        let cache = Arc::new(LibraryCache::new(Arc::clone(&store), config.cache_ttl));
        let sorter = SortEngine::new(store, config.pinned_placement);
        let filters = FilterPipeline::new(Arc::clone(&cache), sorter.clone());
        let search = SearchAggregator::new(Arc::new(sources), Arc::clone(&cache))
            .with_timeout(config.source_timeout);
        let history = SearchHistory::new(config.history_capacity);

        Library {
            cache,
            sorter,
            filters,
            search,
            history,
            config,
        }
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<LibraryCache> {
        &self.cache
    }

    pub fn sources(&self) -> &Arc<Sources> {
        self.search.sources()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // Library reads

    /// The sorted library, or an empty list if the store fails.
    pub async fn get_library(&self, spec: &SortSpec) -> Vec<LibraryBook> {
        self.try_get_library(spec).await.unwrap_or_else(|e| {
            warn!(error = %e, "failed to load library");
            Vec::new()
        })
    }

    pub async fn try_get_library(&self, spec: &SortSpec) -> Result<Vec<LibraryBook>> {
        let snapshot = self.cache.library().await?;
        self.sorter.sort(snapshot.as_ref().clone(), spec).await
    }

    /// The sorted library, re-emitted on every store change.
    pub fn subscribe_library(&self, spec: SortSpec) -> BoxStream<'static, Vec<LibraryBook>> {
        let sorter = self.sorter.clone();
        self.cache
            .subscribe_library()
            .then(move |snapshot| {
                let sorter = sorter.clone();
                async move {
                    let result = match snapshot {
                        Ok(books) => sorter.sort(books, &spec).await,
                        Err(e) => Err(e),
                    };
                    result.unwrap_or_else(|e| {
                        warn!(error = %e, "library subscription update failed");
                        Vec::new()
                    })
                }
            })
            .boxed()
    }

    pub async fn favorites(&self) -> Vec<Book> {
        match self.cache.favorites().await {
            Ok(books) => books.as_ref().clone(),
            Err(e) => {
                warn!(error = %e, "failed to load favorites");
                Vec::new()
            }
        }
    }

    pub fn subscribe_favorites(&self) -> BoxStream<'static, Vec<Book>> {
        self.cache
            .subscribe_favorites()
            .map(|update| {
                update.unwrap_or_else(|e| {
                    warn!(error = %e, "favorites subscription update failed");
                    Vec::new()
                })
            })
            .boxed()
    }

    /// Looks a book up by id. Unknown ids and store failures both yield `None`.
    pub async fn get_book(&self, id: BookId) -> Option<Book> {
        self.cache.store().get(id).await.unwrap_or_else(|e| {
            warn!(id, error = %e, "failed to load book");
            None
        })
    }

    // Filtering

    pub async fn apply_filters(&self, filter: &FilterState) -> Vec<BookItem> {
        self.filters.apply(filter).await
    }

    pub async fn try_apply_filters(&self, filter: &FilterState) -> Result<Vec<BookItem>> {
        self.filters.try_apply(filter).await
    }

    pub fn subscribe_filters(&self, filter: FilterState) -> BoxStream<'static, Vec<BookItem>> {
        self.filters.subscribe(filter)
    }

    // Global search

    pub async fn search_global(&self, query: &str, source_ids: &[String]) -> GlobalSearchResult {
        self.search.search(query, source_ids).await
    }

    pub fn search_global_stream(
        &self,
        query: &str,
        source_ids: &[String],
    ) -> BoxStream<'static, GlobalSearchResult> {
        self.search.search_stream(query, source_ids)
    }

    pub fn save_search_history(&self, query: &str) {
        self.history.save(query);
    }

    pub fn get_search_history(&self, limit: usize) -> Vec<String> {
        self.history.get(limit)
    }

    pub fn clear_search_history(&self) {
        self.history.clear();
    }

    // Mutations

    pub async fn update_book(&self, book: &Book) -> Result<()> {
        self.cache.update(book).await
    }

    pub async fn update_books(&self, books: &[Book]) -> Result<()> {
        self.cache.update_many(books).await
    }

    pub async fn insert_books(&self, books: &[Book]) -> Result<Vec<BookId>> {
        self.cache.insert(books).await
    }

    pub async fn delete_books(&self, ids: &[BookId]) -> Result<()> {
        self.cache.delete(ids).await
    }

    pub async fn set_categories(&self, book_ids: &[BookId], category_ids: &[i64]) -> Result<()> {
        self.cache.set_categories(book_ids, category_ids).await
    }

    /// Deletes every book that is not in the library.
    pub async fn prune_library(&self) -> Result<()> {
        self.cache.prune().await
    }

    /// Pins `id` after every currently pinned entry.
    ///
    /// The new `pinned_order` is one more than the highest existing one, or
    /// `0` when nothing is pinned yet. An entry that is already pinned keeps
    /// its order and nothing is written. Returns the entry's order.
    pub async fn pin_book(&self, id: BookId) -> Result<i64> {
        let snapshot = self.cache.library().await?;
        if let Some(current) = snapshot.iter().find(|b| b.id() == id && b.is_pinned) {
            return Ok(current.pinned_order);
        }

        let order = snapshot
            .iter()
            .filter(|b| b.is_pinned)
            .map(|b| b.pinned_order)
            .max()
            .map_or(0, |max| max + 1);
        self.cache.update_pin_status(id, true, order).await?;
        Ok(order)
    }

    pub async fn unpin_book(&self, id: BookId) -> Result<()> {
        self.cache.update_pin_status(id, false, 0).await
    }

    pub async fn set_archived(&self, id: BookId, archived: bool) -> Result<()> {
        self.cache.update_archive_status(id, archived).await
    }
}
