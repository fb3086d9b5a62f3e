//! Multi-source search with per-source failure isolation.
//!
//! The [`SearchAggregator`] runs one query against many [`Source`](crate::source::Source)s
//! and merges the outcomes into a [`GlobalSearchResult`]. Each source moves
//! through `Searching` and ends `Completed` or `Failed`; a failed source only
//! ever affects its own [`SourceSearchResult`].
//!
//! Two execution modes are available:
//!
//! - [`search`](SearchAggregator::search) spawns one task per source, waits for
//!   all of them and returns a single result.
//! - [`search_stream`](SearchAggregator::search_stream) first emits every source
//!   as loading, then searches sources one after another and re-emits the whole
//!   result each time one finishes.
//!
//! In both modes `source_results` follows source iteration order, and every
//! hit is flagged when its `(source_id, key)` is already in the library. The
//! library snapshot behind that flag is taken once per request.
//!
//! # Examples
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use shoko::search::SearchAggregator;
//!
//! # async fn example(search: SearchAggregator) {
//! // Everything at once
//! let result = search.search("reincarnation", &[]).await;
//! println!("{} hits in {:?}", result.total_results, result.duration);
//!
//! // Source by source
//! let mut updates = search.search_stream("reincarnation", &["royalroad".to_string()]);
//! while let Some(update) = updates.next().await {
//!     println!("{} hits so far", update.total_results);
//! }
//! # }
//! ```

use futures::future::join_all;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    cache::LibraryCache,
    error::Error,
    source::Sources,
    types::{GlobalSearchResult, SearchItem, SourceSearchResult},
};

/// `(source_id, key)` pairs of every book in the library.
type LibraryKeys = Arc<HashSet<(String, String)>>;

/// Message used for source ids that are not registered.
pub const SOURCE_NOT_FOUND: &str = "Source not found";

/// Fans queries out over a [`Sources`] registry.
#[derive(Clone)]
pub struct SearchAggregator {
    sources: Arc<Sources>,
    cache: Arc<LibraryCache>,
    timeout: Option<Duration>,
}

impl SearchAggregator {
    pub fn new(sources: Arc<Sources>, cache: Arc<LibraryCache>) -> Self {
        SearchAggregator {
            sources,
            cache,
            timeout: None,
        }
    }

    /// Sets a time budget for each single source search.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sources(&self) -> &Arc<Sources> {
        &self.sources
    }

    /// Searches all `source_ids` concurrently (every registered source when
    /// empty) and returns once all of them have finished.
    pub async fn search(&self, query: &str, source_ids: &[String]) -> GlobalSearchResult {
        let started = Instant::now();
        let targets = self.targets(source_ids);
        let keys = self.library_keys().await;

        let handles: Vec<_> = targets
            .iter()
            .map(|id| {
                tokio::spawn(search_source(
                    Arc::clone(&self.sources),
                    id.clone(),
                    query.to_string(),
                    Arc::clone(&keys),
                    self.timeout,
                ))
            })
            .collect();

        let source_results = join_all(handles)
            .await
            .into_iter()
            .zip(targets)
            .map(|(joined, id)| {
                joined.unwrap_or_else(|e| {
                    let name = self.source_name(&id);
                    warn!(source = %id, error = %e, "search task failed");
                    SourceSearchResult::failed(id, name, Error::from(e).to_string())
                })
            })
            .collect();

        let result = GlobalSearchResult::new(query, source_results, started.elapsed());
        info!(
            query,
            sources = result.source_results.len(),
            total = result.total_results,
            elapsed_ms = result.duration.as_millis() as u64,
            "global search finished"
        );
        result
    }

    /// Searches `source_ids` (every registered source when empty) one at a
    /// time, emitting the accumulated result after each source.
    ///
    /// The first emission marks every source as loading. Each later emission
    /// is a complete result in which one more source has completed or failed.
    /// Dropping the stream stops further sources from being searched.
    pub fn search_stream(
        &self,
        query: &str,
        source_ids: &[String],
    ) -> BoxStream<'static, GlobalSearchResult> {
        let targets = self.targets(source_ids);
        let current = targets
            .iter()
            .map(|id| SourceSearchResult::searching(id.clone(), self.source_name(id)))
            .collect();

        let progress = Progress {
            aggregator: self.clone(),
            query: query.to_string(),
            targets,
            current,
            next: None,
            keys: None,
            started: Instant::now(),
        };

        stream::unfold(progress, |mut progress| async move {
            let index = match progress.next {
                None => {
                    progress.next = Some(0);
                    return Some((progress.snapshot(), progress));
                }
                Some(index) if index < progress.targets.len() => index,
                Some(_) => return None,
            };

            let keys = match &progress.keys {
                Some(keys) => Arc::clone(keys),
                None => {
                    let keys = progress.aggregator.library_keys().await;
                    progress.keys = Some(Arc::clone(&keys));
                    keys
                }
            };

            let id = progress.targets[index].clone();
            debug!(source = %id, position = index, "streaming search step");
            let step = tokio::spawn(search_source(
                Arc::clone(&progress.aggregator.sources),
                id.clone(),
                progress.query.clone(),
                keys,
                progress.aggregator.timeout,
            ));
            progress.current[index] = step.await.unwrap_or_else(|e| {
                let name = progress.aggregator.source_name(&id);
                warn!(source = %id, error = %e, "search task failed");
                SourceSearchResult::failed(id, name, Error::from(e).to_string())
            });
            progress.next = Some(index + 1);

            Some((progress.snapshot(), progress))
        })
        .boxed()
    }

    fn targets(&self, source_ids: &[String]) -> Vec<String> {
        if source_ids.is_empty() {
            self.sources.list_ids()
        } else {
            source_ids.to_vec()
        }
    }

    fn source_name(&self, id: &str) -> String {
        self.sources
            .get(id)
            .map(|s| s.name().to_string())
            .unwrap_or_else(|| id.to_string())
    }

    async fn library_keys(&self) -> LibraryKeys {
        match self.cache.library().await {
            Ok(books) => Arc::new(
                books
                    .iter()
                    .map(|b| (b.book.source_id.clone(), b.book.key.clone()))
                    .collect(),
            ),
            Err(e) => {
                warn!(error = %e, "library snapshot unavailable, no hit is flagged as in library");
                LibraryKeys::default()
            }
        }
    }
}

/// State carried between emissions of a streaming search.
struct Progress {
    aggregator: SearchAggregator,
    query: String,
    targets: Vec<String>,
    current: Vec<SourceSearchResult>,
    /// Index of the next source to search; `None` until the initial emission.
    next: Option<usize>,
    keys: Option<LibraryKeys>,
    started: Instant,
}

impl Progress {
    fn snapshot(&self) -> GlobalSearchResult {
        GlobalSearchResult::new(
            self.query.clone(),
            self.current.clone(),
            self.started.elapsed(),
        )
    }
}

async fn search_source(
    sources: Arc<Sources>,
    source_id: String,
    query: String,
    keys: LibraryKeys,
    timeout: Option<Duration>,
) -> SourceSearchResult {
    let Some(source) = sources.get(&source_id) else {
        warn!(source = %source_id, "search requested for unknown source");
        return SourceSearchResult::failed(source_id.clone(), source_id, SOURCE_NOT_FOUND);
    };
    let name = source.name().to_string();

    let search = source.search(&query);
    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, search)
            .await
            .unwrap_or_else(|_| Err(Error::Timeout(format!("{} after {:?}", source_id, limit)))),
        None => search.await,
    };

    match outcome {
        Ok(items) => {
            let results = items
                .into_iter()
                .map(|item| SearchItem {
                    in_library: keys.contains(&(source_id.clone(), item.key.clone())),
                    source_id: source_id.clone(),
                    item,
                })
                .collect();
            SourceSearchResult::completed(source_id, name, results)
        }
        Err(e) => {
            warn!(source = %source_id, error = %e, "source search failed");
            SourceSearchResult::failed(source_id, name, e.to_string())
        }
    }
}
