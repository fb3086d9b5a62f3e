//! # Shoko - Library aggregation core for a personal novel library
//!
//! Shoko is the part of a novel reader that sits between the view models and the
//! data: it serves library reads through a time-bounded cache, produces stable,
//! pin-aware sorted views, runs advanced filters, and fans a search query out
//! across many content sources at once.
//!
//! ## Features
//!
//! - **Cached Reads**: Library and favorites reads served from a TTL cache that
//!   every mutation invalidates
//! - **Pin-Aware Sorting**: Pinned entries ordered by their pin position, the rest
//!   by any of nine keys, with enrichment queries for timestamps
//! - **Advanced Filtering**: Text, genre, status, source, author, chapter-count
//!   and completion filters combined with AND
//! - **Global Search**: Concurrent or progressive multi-source search where one
//!   failing source never fails the whole search
//! - **Search History**: Bounded, de-duplicated, most-recent-first
//!
//! ## Quick Start
//!
//! ```rust
//! use shoko::prelude::*;
//! use shoko::types::SourceItem;
//! use async_trait::async_trait;
//!
//! struct Shelf;
//!
//! #[async_trait]
//! impl Source for Shelf {
//!     fn id(&self) -> &str { "shelf" }
//!     fn name(&self) -> &str { "Local Shelf" }
//!
//!     async fn search(&self, query: &str) -> shoko::Result<Vec<SourceItem>> {
//!         Ok(vec![SourceItem {
//!             key: "/novel/1".to_string(),
//!             title: format!("{} (complete)", query),
//!             ..Default::default()
//!         }])
//!     }
//! }
//!
//! # async fn example(store: std::sync::Arc<dyn BookStore>) {
//! let mut sources = Sources::new();
//! sources.add(Shelf);
//!
//! let library = Library::new(store, sources, LibraryConfig::default());
//!
//! let result = library.search_global("mother of learning", &[]).await;
//! println!("Found {} results", result.total_results);
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`library`]: The [`Library`] facade used by callers
//! - [`cache`]: TTL cache over the book store with coordinated invalidation
//! - [`sort`]: Pin-aware sort engine
//! - [`filter`]: Filter pipeline
//! - [`search`]: Multi-source search aggregator
//! - [`history`]: Search history
//! - [`store`] / [`source`]: Seams for the book store and content sources
//! - [`types`]: Core data structures
//! - [`config`]: Runtime configuration
//! - [`error`]: Error handling

pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod history;
pub mod library;
pub mod search;
pub mod sort;
pub mod source;
pub mod store;
pub mod types;

/// Prelude module for convenient imports.
///
/// ```rust
/// use shoko::prelude::*;
///
/// // Now you have access to:
/// // - Library, LibraryConfig
/// // - BookStore, Source, Sources
/// // - Book, LibraryBook, FilterState, SortSpec, SortKey, GlobalSearchResult
/// ```
pub mod prelude {
    pub use crate::{
        config::LibraryConfig,
        library::Library,
        sort::PinnedPlacement,
        source::{Source, Sources},
        store::BookStore,
        types::{
            Book, BookItem, BookStatus, CompletionStatus, FilterSortKey, FilterState,
            GlobalSearchResult, LibraryBook, SortKey, SortSpec, SourceSearchResult,
        },
    };
}

// Re-export main types at crate root for direct access
pub use config::LibraryConfig;
pub use error::{Error, Result};
pub use library::Library;
pub use source::{Source, Sources};
pub use store::BookStore;
pub use types::{Book, FilterState, GlobalSearchResult, LibraryBook, SortKey, SortSpec};
