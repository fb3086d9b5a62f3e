//! Time-bounded cache over the book store's hot read paths.
//!
//! [`LibraryCache`] serves two one-shot reads, "all library books" and "all
//! favorites", from memory for up to a configurable time-to-live. A single
//! [`tokio::sync::Mutex`] coordinates every read and every invalidation:
//!
//! - On a miss the store fetch runs while the lock is held. Concurrent misses
//!   therefore collapse into one fetch, at the cost of blocking unrelated
//!   cache reads until it finishes.
//! - Invalidation takes the same lock, so no read that starts after an
//!   invalidation can observe an entry captured before it.
//! - A failed fetch leaves the cache exactly as it was.
//!
//! Mutations are forwarded to the store through this type and invalidate the
//! cache once the store accepts them. Subscriptions bypass the cache.
//!
//! # Examples
//!
//! ```rust,no_run
//! use shoko::cache::LibraryCache;
//! use shoko::store::BookStore;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example(store: Arc<dyn BookStore>) -> shoko::Result<()> {
//! let cache = LibraryCache::new(store, Duration::from_secs(300));
//!
//! let first = cache.library().await?;   // miss: fetched from the store
//! let second = cache.library().await?;  // hit: same allocation
//! assert!(Arc::ptr_eq(&first, &second));
//!
//! cache.invalidate().await;
//! # Ok(())
//! # }
//! ```

use futures::stream::BoxStream;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::{
    error::Result,
    store::{BOOK_CACHE_TAG, BookStore},
    types::{Book, BookId, LibraryBook, SortKey},
};

/// The cached read paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Library,
    Favorites,
}

/// A cached payload and the instant it was captured.
///
/// Entries are never mutated; a refresh replaces the whole entry.
#[derive(Debug)]
pub struct CachedEntry<T> {
    payload: Arc<T>,
    captured_at: Instant,
}

impl<T> CachedEntry<T> {
    fn new(payload: T) -> Self {
        CachedEntry {
            payload: Arc::new(payload),
            captured_at: Instant::now(),
        }
    }

    pub fn payload(&self) -> &Arc<T> {
        &self.payload
    }

    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

#[derive(Debug, Default)]
struct CacheState {
    library: Option<CachedEntry<Vec<LibraryBook>>>,
    favorites: Option<CachedEntry<Vec<Book>>>,
}

impl CacheState {
    fn library(&mut self) -> &mut Option<CachedEntry<Vec<LibraryBook>>> {
        &mut self.library
    }

    fn favorites(&mut self) -> &mut Option<CachedEntry<Vec<Book>>> {
        &mut self.favorites
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

/// Snapshot of the cache's hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

impl CacheStats {
    /// Fraction of reads served from memory, `0.0` before the first read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// TTL cache in front of a [`BookStore`].
pub struct LibraryCache {
    store: Arc<dyn BookStore>,
    ttl: Duration,
    state: Mutex<CacheState>,
    counters: Counters,
}

impl LibraryCache {
    pub fn new(store: Arc<dyn BookStore>, ttl: Duration) -> Self {
        LibraryCache {
            store,
            ttl,
            state: Mutex::new(CacheState::default()),
            counters: Counters::default(),
        }
    }

    /// The store this cache reads from.
    pub fn store(&self) -> &Arc<dyn BookStore> {
        &self.store
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// All library entries, archived ones included.
    pub async fn library(&self) -> Result<Arc<Vec<LibraryBook>>> {
        let store = Arc::clone(&self.store);
        self.read_through(CacheKind::Library, CacheState::library, || async move {
            store.get_all(SortKey::default(), true).await
        })
        .await
    }

    /// All favorite books.
    pub async fn favorites(&self) -> Result<Arc<Vec<Book>>> {
        let store = Arc::clone(&self.store);
        self.read_through(CacheKind::Favorites, CacheState::favorites, || async move {
            store.get_favorites().await
        })
        .await
    }

    async fn read_through<T, F, Fut>(
        &self,
        kind: CacheKind,
        slot: fn(&mut CacheState) -> &mut Option<CachedEntry<T>>,
        fetch: F,
    ) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut state = self.state.lock().await;

        if let Some(entry) = slot(&mut *state) {
            if entry.is_fresh(self.ttl) {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(?kind, age_ms = entry.age().as_millis() as u64, "cache hit");
                return Ok(Arc::clone(&entry.payload));
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        debug!(?kind, "cache miss, fetching from store");

        // The lock stays held across the fetch so concurrent misses share it.
        let entry = CachedEntry::new(fetch().await?);
        let payload = Arc::clone(&entry.payload);
        *slot(&mut *state) = Some(entry);
        Ok(payload)
    }

    /// Drops both cached entries and the store's own `"book"` cache entries.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.library = None;
        state.favorites = None;
        self.store.invalidate_cache(BOOK_CACHE_TAG).await;
        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!("cache invalidated");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
        }
    }

    /// Live library updates, straight from the store.
    pub fn subscribe_library(&self) -> BoxStream<'static, Result<Vec<LibraryBook>>> {
        self.store.subscribe_library()
    }

    /// Live favorites updates, straight from the store.
    pub fn subscribe_favorites(&self) -> BoxStream<'static, Result<Vec<Book>>> {
        self.store.subscribe_favorites()
    }

    /// Runs a store mutation and invalidates the cache if it succeeds.
    async fn mutate<T, Fut>(&self, op: &'static str, mutation: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let value = mutation.await?;
        debug!(op, "mutation accepted");
        self.invalidate().await;
        Ok(value)
    }

    pub async fn update(&self, book: &Book) -> Result<()> {
        self.mutate("update", self.store.update(book)).await
    }

    pub async fn update_many(&self, books: &[Book]) -> Result<()> {
        self.mutate("update_many", self.store.update_many(books)).await
    }

    pub async fn insert(&self, books: &[Book]) -> Result<Vec<BookId>> {
        self.mutate("insert", self.store.insert(books)).await
    }

    pub async fn delete(&self, ids: &[BookId]) -> Result<()> {
        self.mutate("delete", self.store.delete(ids)).await
    }

    pub async fn set_categories(&self, book_ids: &[BookId], category_ids: &[i64]) -> Result<()> {
        self.mutate(
            "set_categories",
            self.store.set_categories(book_ids, category_ids),
        )
        .await
    }

    pub async fn prune(&self) -> Result<()> {
        self.mutate("prune", self.store.delete_not_in_library()).await
    }

    pub async fn update_pin_status(
        &self,
        id: BookId,
        pinned: bool,
        pinned_order: i64,
    ) -> Result<()> {
        self.mutate(
            "update_pin_status",
            self.store.update_pin_status(id, pinned, pinned_order),
        )
        .await
    }

    pub async fn update_archive_status(&self, id: BookId, archived: bool) -> Result<()> {
        self.mutate(
            "update_archive_status",
            self.store.update_archive_status(id, archived),
        )
        .await
    }
}
