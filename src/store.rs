//! The book store seam.
//!
//! [`BookStore`] is the query-capable persistence layer this crate reads from.
//! It is implemented outside the crate (a database, an in-memory fake in tests)
//! and consumed through `Arc<dyn BookStore>`.
//!
//! Reads go through the [`LibraryCache`](crate::cache::LibraryCache) where a hot
//! path exists. Mutations must also go through the cache so that it can
//! invalidate itself after every accepted write.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{
    error::Result,
    types::{Book, BookId, Chapter, LatestTimestamp, LibraryBook, SortKey},
};

/// Cache tag the store's own secondary cache uses for book rows.
pub const BOOK_CACHE_TAG: &str = "book";

/// Trait that book store implementations must provide.
///
/// # Implementation Guidelines
///
/// - Report failures as [`Error::Store`](crate::Error::Store)
/// - Return `Ok(None)` from [`get`](BookStore::get) for unknown ids rather than an error
/// - Subscriptions should emit the current state first, then every change
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Point lookup by id.
    async fn get(&self, id: BookId) -> Result<Option<Book>>;

    /// All library entries. `sort_hint` is advisory; callers never rely on the
    /// order the store returns.
    async fn get_all(&self, sort_hint: SortKey, include_archived: bool)
    -> Result<Vec<LibraryBook>>;

    async fn get_favorites(&self) -> Result<Vec<Book>>;

    async fn get_chapters_for_book(&self, id: BookId) -> Result<Vec<Chapter>>;

    /// Last-read time per book.
    async fn get_latest_by_last_read(&self) -> Result<Vec<LatestTimestamp>>;

    /// Latest chapter upload time per book.
    async fn get_latest_by_chapter_upload(&self) -> Result<Vec<LatestTimestamp>>;

    /// Latest chapter fetch time per book.
    async fn get_latest_by_chapter_fetch(&self) -> Result<Vec<LatestTimestamp>>;

    /// Live view of the whole library, archived entries included.
    fn subscribe_library(&self) -> BoxStream<'static, Result<Vec<LibraryBook>>>;

    /// Live view of favorite books.
    fn subscribe_favorites(&self) -> BoxStream<'static, Result<Vec<Book>>>;

    async fn update(&self, book: &Book) -> Result<()>;

    async fn update_many(&self, books: &[Book]) -> Result<()>;

    /// Inserts books and returns their assigned ids, in input order.
    async fn insert(&self, books: &[Book]) -> Result<Vec<BookId>>;

    async fn delete(&self, ids: &[BookId]) -> Result<()>;

    async fn set_categories(&self, book_ids: &[BookId], category_ids: &[i64]) -> Result<()>;

    /// Deletes every book that is not in the library.
    async fn delete_not_in_library(&self) -> Result<()>;

    async fn update_pin_status(&self, id: BookId, pinned: bool, pinned_order: i64) -> Result<()>;

    async fn update_archive_status(&self, id: BookId, archived: bool) -> Result<()>;

    /// Drops entries tagged `tag` from the store's own secondary cache, if it has one.
    async fn invalidate_cache(&self, _tag: &str) {}
}
