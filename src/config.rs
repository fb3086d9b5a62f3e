//! Runtime configuration for a [`Library`](crate::library::Library).
//!
//! ```rust
//! use shoko::config::LibraryConfig;
//! use shoko::sort::PinnedPlacement;
//! use std::time::Duration;
//!
//! let config = LibraryConfig::builder()
//!     .cache_ttl(Duration::from_secs(60))
//!     .source_timeout(Duration::from_secs(15))
//!     .pinned_placement(PinnedPlacement::AlwaysFirst)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.history_capacity, 50);
//! assert_eq!(config.source_timeout, Some(Duration::from_secs(15)));
//! ```

use derive_builder::Builder;
use std::time::Duration;

use crate::{error::Error, sort::PinnedPlacement};

/// How long cached library reads stay fresh.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// How many past queries the search history keeps.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Library-wide settings.
///
/// # Fields
///
/// * `cache_ttl` - Maximum age of a cached library or favorites read
/// * `history_capacity` - Maximum number of search history entries
/// * `source_timeout` - Optional time budget for a single source search
/// * `pinned_placement` - Where pinned entries end up in descending sorts
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct LibraryConfig {
    #[builder(default = "DEFAULT_CACHE_TTL")]
    pub cache_ttl: Duration,
    #[builder(default = "DEFAULT_HISTORY_CAPACITY")]
    pub history_capacity: usize,
    #[builder(default)]
    pub source_timeout: Option<Duration>,
    #[builder(default)]
    pub pinned_placement: PinnedPlacement,
}

impl LibraryConfig {
    pub fn builder() -> LibraryConfigBuilder {
        LibraryConfigBuilder::default()
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        LibraryConfig {
            cache_ttl: DEFAULT_CACHE_TTL,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            source_timeout: None,
            pinned_placement: PinnedPlacement::default(),
        }
    }
}

impl LibraryConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.cache_ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err("cache_ttl must be greater than zero".to_string());
        }
        if self.history_capacity == Some(0) {
            return Err("history_capacity must be greater than zero".to_string());
        }
        if self.source_timeout.flatten().is_some_and(|t| t.is_zero()) {
            return Err("source_timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl From<LibraryConfigBuilderError> for Error {
    fn from(err: LibraryConfigBuilderError) -> Self {
        Error::config(err.to_string())
    }
}
