//! Pin-aware ordering of library snapshots.
//!
//! The [`SortEngine`] turns an unordered set of [`LibraryBook`]s and a
//! [`SortSpec`] into a single ordered list:
//!
//! 1. Archived entries are dropped unless the spec includes them.
//! 2. Entries are split into pinned and unpinned, keeping input order in each.
//! 3. Pinned entries are ordered by `pinned_order` only.
//! 4. Unpinned entries are ordered by the spec's key. `LastRead`, `DateAdded`
//!    and `DateFetched` first join the latest timestamps from the book store
//!    onto the unpinned entries by id; entries without a row keep their value.
//! 5. The result is pinned followed by unpinned.
//! 6. For a descending spec, [`PinnedPlacement`] decides what gets reversed.
//!
//! All sorts are stable: entries with equal keys keep their input order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::{
    error::Result,
    store::BookStore,
    types::{BookId, LibraryBook, SortKey, SortSpec},
};

/// Where pinned entries end up when a sort is descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinnedPlacement {
    /// Reverse the whole pinned-then-unpinned list. Pinned entries end up
    /// last, in reverse `pinned_order`.
    #[default]
    ReverseWithList,
    /// Reverse only the unpinned block. Pinned entries stay first, in
    /// `pinned_order`.
    AlwaysFirst,
}

/// Orders library snapshots, querying the book store for enrichment data.
#[derive(Clone)]
pub struct SortEngine {
    store: Arc<dyn BookStore>,
    placement: PinnedPlacement,
}

impl SortEngine {
    pub fn new(store: Arc<dyn BookStore>, placement: PinnedPlacement) -> Self {
        SortEngine { store, placement }
    }

    pub fn placement(&self) -> PinnedPlacement {
        self.placement
    }

    /// Sorts `books` according to `spec`.
    ///
    /// # Errors
    ///
    /// Fails only if an enrichment query against the book store fails.
    pub async fn sort(&self, books: Vec<LibraryBook>, spec: &SortSpec) -> Result<Vec<LibraryBook>> {
        let (pinned, mut unpinned) = partition(books, spec.include_archived);

        if spec.key.needs_enrichment() {
            self.enrich(&mut unpinned, spec.key).await?;
        }

        let key = spec.key;
        Ok(arrange(
            pinned,
            unpinned,
            spec.ascending,
            self.placement,
            |a, b| compare(key, a, b),
        ))
    }

    /// Orders `books` with a caller-supplied comparator for the unpinned block.
    ///
    /// Archive filtering, pin handling and direction work exactly as in
    /// [`sort`](SortEngine::sort); no enrichment query is made.
    pub fn order_with<F>(
        &self,
        books: Vec<LibraryBook>,
        include_archived: bool,
        ascending: bool,
        compare: F,
    ) -> Vec<LibraryBook>
    where
        F: Fn(&LibraryBook, &LibraryBook) -> Ordering + Sync,
    {
        let (pinned, unpinned) = partition(books, include_archived);
        arrange(pinned, unpinned, ascending, self.placement, compare)
    }

    async fn enrich(&self, books: &mut [LibraryBook], key: SortKey) -> Result<()> {
        let rows = match key {
            SortKey::LastRead => self.store.get_latest_by_last_read().await?,
            SortKey::DateAdded => self.store.get_latest_by_chapter_upload().await?,
            SortKey::DateFetched => self.store.get_latest_by_chapter_fetch().await?,
            _ => return Ok(()),
        };

        let latest: HashMap<BookId, i64> = rows.into_iter().map(|r| (r.id, r.timestamp)).collect();
        debug!(?key, rows = latest.len(), "joined enrichment rows");

        for book in books.iter_mut() {
            let Some(&timestamp) = latest.get(&book.id()) else {
                continue;
            };
            match key {
                SortKey::LastRead => book.book.last_read = timestamp,
                SortKey::DateAdded => book.date_upload = timestamp,
                SortKey::DateFetched => book.date_fetched = timestamp,
                _ => {}
            }
        }
        Ok(())
    }
}

/// Drops archived entries (unless kept) and splits the rest by pin status.
fn partition(
    books: Vec<LibraryBook>,
    include_archived: bool,
) -> (Vec<LibraryBook>, Vec<LibraryBook>) {
    books
        .into_iter()
        .filter(|b| include_archived || !b.is_archived)
        .partition(|b| b.is_pinned)
}

fn arrange<F>(
    mut pinned: Vec<LibraryBook>,
    mut unpinned: Vec<LibraryBook>,
    ascending: bool,
    placement: PinnedPlacement,
    compare: F,
) -> Vec<LibraryBook>
where
    F: Fn(&LibraryBook, &LibraryBook) -> Ordering + Sync,
{
    pinned.sort_by_key(|b| b.pinned_order);
    unpinned.par_sort_by(|a, b| compare(a, b));

    match (ascending, placement) {
        (true, _) => {
            pinned.append(&mut unpinned);
            pinned
        }
        (false, PinnedPlacement::ReverseWithList) => {
            pinned.append(&mut unpinned);
            pinned.reverse();
            pinned
        }
        (false, PinnedPlacement::AlwaysFirst) => {
            unpinned.reverse();
            pinned.append(&mut unpinned);
            pinned
        }
    }
}

/// Ascending comparison of two entries by `key`.
pub fn compare(key: SortKey, a: &LibraryBook, b: &LibraryBook) -> Ordering {
    match key {
        SortKey::Title => a.book.title.cmp(&b.book.title),
        SortKey::Author => a.book.author.cmp(&b.book.author),
        SortKey::LastRead => a.book.last_read.cmp(&b.book.last_read),
        SortKey::LastUpdated => a.book.last_update.cmp(&b.book.last_update),
        SortKey::Unread => a.unread_count.cmp(&b.unread_count),
        SortKey::TotalChapters => a.total_chapters.cmp(&b.total_chapters),
        SortKey::Source => a.book.source_id.cmp(&b.book.source_id),
        SortKey::DateAdded => a.date_upload.cmp(&b.date_upload),
        SortKey::DateFetched => a.date_fetched.cmp(&b.date_fetched),
    }
}
