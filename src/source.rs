//! Source trait and registry for managing content sources.
//!
//! This module defines the [`Source`] trait that every content source implements,
//! and the [`Sources`] registry that the
//! [`SearchAggregator`](crate::search::SearchAggregator) fans queries out over.
//! How a source talks to its website is its own business; this crate only
//! orchestrates calls to it.
//!
//! # Examples
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
//!             key: format!("/novel/{}", query),
//!             title: query.to_string(),
//!             ..Default::default()
//!         }])
//!     }
//! }
//!
//! let mut sources = Sources::new();
//! sources.add(Shelf);
//! assert_eq!(sources.list_ids(), vec!["shelf".to_string()]);
//! assert!(sources.get("shelf").is_some());
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    error::{Error, Result},
    types::{SourceInfo, SourceItem},
};

/// Trait that all content sources must implement.
///
/// # Required Methods
///
/// * [`id()`](Source::id) - Unique identifier for the source
/// * [`name()`](Source::name) - Human-readable name
/// * [`search()`](Source::search) - Search the source's catalog
///
/// # Implementation Guidelines
///
/// - Return detailed errors using the [`Error`](crate::Error) types
/// - Do not retry internally on behalf of the aggregator; failures are reported as-is
/// - Fill in `key` on every item, it is what library de-duplication matches on
#[async_trait]
pub trait Source: Send + Sync {
    /// Returns the unique identifier for this source.
    ///
    /// Must match the `source_id` stored on books that came from this source.
    fn id(&self) -> &str;

    /// Returns the human-readable name of this source.
    fn name(&self) -> &str;

    /// Searches the source's catalog for `query`.
    ///
    /// # Errors
    ///
    /// * [`Error::Source`](crate::Error::Source) - For source-specific errors
    async fn search(&self, query: &str) -> Result<Vec<SourceItem>>;
}

/// A registry of content sources, kept in registration order.
///
/// Iteration order is the order sources were added; search results are
/// assembled in this order.
#[derive(Clone)]
pub struct Sources {
    sources: Vec<Arc<dyn Source>>,
    by_id: HashMap<String, usize>,
}

impl Sources {
    /// Creates a new empty registry.
    ///
    /// ```rust
    /// use shoko::prelude::*;
    ///
    /// let sources = Sources::new();
    /// assert_eq!(sources.len(), 0);
    /// assert!(sources.is_empty());
    /// ```
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    /// Adds a source to the registry.
    ///
    /// Adding a source whose id is already registered replaces the earlier
    /// one in place, keeping its position. Returns a mutable reference to
    /// self for chaining.
    pub fn add(&mut self, source: impl Source + 'static) -> &mut Self {
        self.add_shared(Arc::new(source))
    }

    /// Adds an already shared source to the registry.
    pub fn add_shared(&mut self, source: Arc<dyn Source>) -> &mut Self {
        let id = source.id().to_string();
        match self.by_id.get(&id) {
            Some(&index) => self.sources[index] = source,
            None => {
                self.by_id.insert(id, self.sources.len());
                self.sources.push(source);
            }
        }
        self
    }

    /// Retrieves a source by its ID.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Source>> {
        self.by_id
            .get(id)
            .and_then(|&index| self.sources.get(index))
            .cloned()
    }

    /// Returns the IDs of all registered sources, in registration order.
    pub fn list_ids(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.id().to_string()).collect()
    }

    /// Returns id and name of all registered sources, in registration order.
    pub fn list(&self) -> Vec<SourceInfo> {
        self.sources
            .iter()
            .map(|s| SourceInfo {
                id: s.id().to_string(),
                name: s.name().to_string(),
            })
            .collect()
    }

    /// Searches a single source by id.
    ///
    /// # Errors
    ///
    /// * Returns [`Error::NotFound`](crate::Error::NotFound) if the source doesn't exist
    /// * Returns source-specific errors if the search fails
    pub async fn search(&self, source_id: &str, query: &str) -> Result<Vec<SourceItem>> {
        match self.get(source_id) {
            Some(source) => source.search(query).await,
            None => Err(Error::not_found(format!("Source: {}", source_id))),
        }
    }

    /// Returns the number of sources in the registry.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns `true` if the registry contains no sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for Sources {
    fn default() -> Self {
        Self::new()
    }
}
