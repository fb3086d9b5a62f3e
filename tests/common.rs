//! Common test utilities and fixtures
//!
//! An in-memory book store with call counters and failure switches, plus a few
//! fake content sources. Shared by all test modules.
#![allow(dead_code)]

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use shoko::prelude::*;
use shoko::types::{BookId, Chapter, LatestTimestamp, SourceItem};
use shoko::{Error, Result};

pub const TEST_TTL: Duration = Duration::from_secs(5 * 60);
pub const EPSILON: Duration = Duration::from_millis(1);

type Subscriber = mpsc::UnboundedSender<Result<Vec<LibraryBook>>>;

/// In-memory [`BookStore`] for tests.
#[derive(Default)]
pub struct MemoryStore {
    books: Mutex<Vec<LibraryBook>>,
    chapters: Mutex<HashMap<BookId, Vec<Chapter>>>,
    last_read: Mutex<Vec<LatestTimestamp>>,
    uploads: Mutex<Vec<LatestTimestamp>>,
    fetches: Mutex<Vec<LatestTimestamp>>,
    categories: Mutex<HashMap<BookId, Vec<i64>>>,
    subscribers: Mutex<Vec<Subscriber>>,
    fetch_delay: Mutex<Option<Duration>>,
    fail_reads: AtomicBool,
    fail_mutations: AtomicBool,
    pub get_all_calls: AtomicUsize,
    pub favorites_calls: AtomicUsize,
    pub chapter_calls: AtomicUsize,
    pub enrichment_calls: AtomicUsize,
    pub invalidated_tags: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new(books: Vec<LibraryBook>) -> Arc<Self> {
        let store = MemoryStore::default();
        *store.books.lock() = books;
        Arc::new(store)
    }

    pub fn with_chapters(&self, id: BookId, chapters: Vec<Chapter>) {
        self.chapters.lock().insert(id, chapters);
    }

    pub fn with_last_read(&self, rows: Vec<(BookId, i64)>) {
        *self.last_read.lock() = rows_to_timestamps(rows);
    }

    pub fn with_uploads(&self, rows: Vec<(BookId, i64)>) {
        *self.uploads.lock() = rows_to_timestamps(rows);
    }

    pub fn with_fetches(&self, rows: Vec<(BookId, i64)>) {
        *self.fetches.lock() = rows_to_timestamps(rows);
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock() = Some(delay);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    pub fn get_all_calls(&self) -> usize {
        self.get_all_calls.load(Ordering::SeqCst)
    }

    pub fn chapter_calls(&self) -> usize {
        self.chapter_calls.load(Ordering::SeqCst)
    }

    pub fn categories_of(&self, id: BookId) -> Vec<i64> {
        self.categories.lock().get(&id).cloned().unwrap_or_default()
    }

    pub fn snapshot(&self) -> Vec<LibraryBook> {
        self.books.lock().clone()
    }

    /// Replaces the library without going through any cache.
    pub fn replace_books(&self, books: Vec<LibraryBook>) {
        *self.books.lock() = books;
        self.notify();
    }

    async fn read_gate(&self) -> Result<()> {
        let delay = *self.fetch_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::store("read failed"));
        }
        Ok(())
    }

    fn write_gate(&self) -> Result<()> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Error::store("write failed"));
        }
        Ok(())
    }

    fn notify(&self) {
        let snapshot = self.books.lock().clone();
        self.subscribers
            .lock()
            .retain(|tx| tx.unbounded_send(Ok(snapshot.clone())).is_ok());
    }

    fn modify(&self, id: BookId, f: impl FnOnce(&mut LibraryBook)) {
        if let Some(entry) = self.books.lock().iter_mut().find(|b| b.id() == id) {
            f(entry);
        }
        self.notify();
    }
}

fn rows_to_timestamps(rows: Vec<(BookId, i64)>) -> Vec<LatestTimestamp> {
    rows.into_iter()
        .map(|(id, timestamp)| LatestTimestamp { id, timestamp })
        .collect()
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn get(&self, id: BookId) -> Result<Option<Book>> {
        self.read_gate().await?;
        Ok(self
            .books
            .lock()
            .iter()
            .find(|b| b.id() == id)
            .map(|b| b.book.clone()))
    }

    async fn get_all(
        &self,
        _sort_hint: SortKey,
        include_archived: bool,
    ) -> Result<Vec<LibraryBook>> {
        self.get_all_calls.fetch_add(1, Ordering::SeqCst);
        self.read_gate().await?;
        Ok(self
            .books
            .lock()
            .iter()
            .filter(|b| include_archived || !b.is_archived)
            .cloned()
            .collect())
    }

    async fn get_favorites(&self) -> Result<Vec<Book>> {
        self.favorites_calls.fetch_add(1, Ordering::SeqCst);
        self.read_gate().await?;
        Ok(self
            .books
            .lock()
            .iter()
            .filter(|b| b.book.favorite)
            .map(|b| b.book.clone())
            .collect())
    }

    async fn get_chapters_for_book(&self, id: BookId) -> Result<Vec<Chapter>> {
        self.chapter_calls.fetch_add(1, Ordering::SeqCst);
        self.read_gate().await?;
        Ok(self.chapters.lock().get(&id).cloned().unwrap_or_default())
    }

    async fn get_latest_by_last_read(&self) -> Result<Vec<LatestTimestamp>> {
        self.enrichment_calls.fetch_add(1, Ordering::SeqCst);
        self.read_gate().await?;
        Ok(self.last_read.lock().clone())
    }

    async fn get_latest_by_chapter_upload(&self) -> Result<Vec<LatestTimestamp>> {
        self.enrichment_calls.fetch_add(1, Ordering::SeqCst);
        self.read_gate().await?;
        Ok(self.uploads.lock().clone())
    }

    async fn get_latest_by_chapter_fetch(&self) -> Result<Vec<LatestTimestamp>> {
        self.enrichment_calls.fetch_add(1, Ordering::SeqCst);
        self.read_gate().await?;
        Ok(self.fetches.lock().clone())
    }

    fn subscribe_library(&self) -> BoxStream<'static, Result<Vec<LibraryBook>>> {
        let (tx, rx) = mpsc::unbounded();
        let current = if self.fail_reads.load(Ordering::SeqCst) {
            Err(Error::store("subscription failed"))
        } else {
            Ok(self.books.lock().clone())
        };
        let _ = tx.unbounded_send(current);
        self.subscribers.lock().push(tx);
        rx.boxed()
    }

    fn subscribe_favorites(&self) -> BoxStream<'static, Result<Vec<Book>>> {
        self.subscribe_library()
            .map(|update| {
                update.map(|books| {
                    books
                        .into_iter()
                        .filter(|b| b.book.favorite)
                        .map(|b| b.book)
                        .collect()
                })
            })
            .boxed()
    }

    async fn update(&self, book: &Book) -> Result<()> {
        self.write_gate()?;
        let book = book.clone();
        self.modify(book.id, move |entry| entry.book = book);
        Ok(())
    }

    async fn update_many(&self, books: &[Book]) -> Result<()> {
        self.write_gate()?;
        {
            let mut entries = self.books.lock();
            for book in books {
                if let Some(entry) = entries.iter_mut().find(|b| b.id() == book.id) {
                    entry.book = book.clone();
                }
            }
        }
        self.notify();
        Ok(())
    }

    async fn insert(&self, books: &[Book]) -> Result<Vec<BookId>> {
        self.write_gate()?;
        let mut ids = Vec::with_capacity(books.len());
        {
            let mut entries = self.books.lock();
            let mut next = entries.iter().map(|b| b.id()).max().unwrap_or(0) + 1;
            for book in books {
                let mut entry = LibraryBook::from(book.clone());
                entry.book.id = next;
                ids.push(next);
                entries.push(entry);
                next += 1;
            }
        }
        self.notify();
        Ok(ids)
    }

    async fn delete(&self, ids: &[BookId]) -> Result<()> {
        self.write_gate()?;
        self.books.lock().retain(|b| !ids.contains(&b.id()));
        self.notify();
        Ok(())
    }

    async fn set_categories(&self, book_ids: &[BookId], category_ids: &[i64]) -> Result<()> {
        self.write_gate()?;
        let mut categories = self.categories.lock();
        for id in book_ids {
            categories.insert(*id, category_ids.to_vec());
        }
        Ok(())
    }

    async fn delete_not_in_library(&self) -> Result<()> {
        self.write_gate()?;
        self.books.lock().retain(|b| b.book.favorite);
        self.notify();
        Ok(())
    }

    async fn update_pin_status(&self, id: BookId, pinned: bool, pinned_order: i64) -> Result<()> {
        self.write_gate()?;
        self.modify(id, |entry| {
            entry.is_pinned = pinned;
            entry.pinned_order = pinned_order;
        });
        Ok(())
    }

    async fn update_archive_status(&self, id: BookId, archived: bool) -> Result<()> {
        self.write_gate()?;
        self.modify(id, |entry| entry.is_archived = archived);
        Ok(())
    }

    async fn invalidate_cache(&self, tag: &str) {
        self.invalidated_tags.lock().push(tag.to_string());
    }
}

/// A source answering every query with a fixed list of items.
pub struct StaticSource {
    id: String,
    name: String,
    items: Vec<SourceItem>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(id: &str, name: &str, keys: &[&str]) -> Self {
        StaticSource {
            id: id.to_string(),
            name: name.to_string(),
            items: keys.iter().map(|key| item(key)).collect(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Source for StaticSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, _query: &str) -> Result<Vec<SourceItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.items.clone())
    }
}

/// A source whose every search fails.
pub struct FailingSource {
    id: String,
}

impl FailingSource {
    pub fn new(id: &str) -> Self {
        FailingSource { id: id.to_string() }
    }
}

#[async_trait]
impl Source for FailingSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Failing Source"
    }

    async fn search(&self, _query: &str) -> Result<Vec<SourceItem>> {
        Err(Error::source(self.id.clone(), "HTTP 503"))
    }
}

/// A source whose search task panics.
pub struct PanickingSource;

#[async_trait]
impl Source for PanickingSource {
    fn id(&self) -> &str {
        "panics"
    }

    fn name(&self) -> &str {
        "Panicking Source"
    }

    async fn search(&self, _query: &str) -> Result<Vec<SourceItem>> {
        panic!("parser blew up");
    }
}

pub fn item(key: &str) -> SourceItem {
    SourceItem {
        key: key.to_string(),
        title: format!("Title {}", key),
        ..Default::default()
    }
}

/// A plain, unpinned, favorite library entry.
pub fn entry(id: BookId, title: &str) -> LibraryBook {
    LibraryBook {
        book: Book {
            id,
            source_id: "src".to_string(),
            key: format!("/novel/{}", id),
            title: title.to_string(),
            author: format!("Author {}", id),
            favorite: true,
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn pinned(id: BookId, title: &str, order: i64) -> LibraryBook {
    LibraryBook {
        is_pinned: true,
        pinned_order: order,
        ..entry(id, title)
    }
}

pub fn archived(id: BookId, title: &str) -> LibraryBook {
    LibraryBook {
        is_archived: true,
        ..entry(id, title)
    }
}

pub fn chapters(read: usize, unread: usize) -> Vec<Chapter> {
    (0..read + unread)
        .map(|i| Chapter {
            id: i as i64,
            number: i as f64 + 1.0,
            read: i < read,
            ..Default::default()
        })
        .collect()
}

pub fn ids<T: HasId>(items: &[T]) -> Vec<BookId> {
    items.iter().map(HasId::book_id).collect()
}

pub trait HasId {
    fn book_id(&self) -> BookId;
}

impl HasId for LibraryBook {
    fn book_id(&self) -> BookId {
        self.id()
    }
}

impl HasId for BookItem {
    fn book_id(&self) -> BookId {
        self.id
    }
}

pub fn library(store: Arc<MemoryStore>) -> Library {
    Library::new(store, Sources::new(), LibraryConfig::default())
}

pub fn library_with(store: Arc<MemoryStore>, sources: Sources, config: LibraryConfig) -> Library {
    Library::new(store, sources, config)
}
