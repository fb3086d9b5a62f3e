//! Error types and result handling for Shoko operations.
//!
//! This module defines the error handling system used throughout Shoko.
//! All fallible operations return a [`Result<T>`] which is a type alias for
//! `std::result::Result<T, Error>`.
//!
//! # Error Categories
//!
//! - **Store Errors**: The underlying book store failed a read or a mutation
//! - **Source Errors**: A content source failed a search, with the source id attached
//! - **Not Found**: Missing books or sources
//! - **Timeouts**: A source call exceeded the configured timeout
//! - **Config Errors**: Invalid [`LibraryConfig`](crate::config::LibraryConfig) values
//! - **Join Errors**: A spawned search task panicked or was cancelled
//!
//! The caller-facing methods on [`Library`](crate::library::Library) swallow these
//! errors and return empty values instead. The `try_*` variants expose them.
//!
//! # Examples
//!
//! ```rust
//! use shoko::{Error, Result};
//!
//! fn lookup(found: bool) -> Result<u32> {
//!     if found {
//!         Ok(7)
//!     } else {
//!         Err(Error::not_found("Book with ID 42"))
//!     }
//! }
//!
//! match lookup(false) {
//!     Ok(id) => println!("Found {}", id),
//!     Err(Error::NotFound(msg)) => println!("Missing: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```

use thiserror::Error;

/// Type alias for Results with Shoko errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all Shoko operations.
///
/// # Variants
///
/// * [`Store`](Error::Store) - Book store read or mutation failures
/// * [`Source`](Error::Source) - Source-specific search failures
/// * [`NotFound`](Error::NotFound) - Missing resources
/// * [`Timeout`](Error::Timeout) - Source calls that exceeded their time budget
/// * [`Config`](Error::Config) - Invalid configuration
/// * [`Join`](Error::Join) - Failed search tasks
/// * [`Other`](Error::Other) - Generic error messages
#[derive(Error, Debug)]
pub enum Error {
    /// Failures reported by the underlying book store.
    ///
    /// The store is an external collaborator; whatever it reports is carried
    /// here as a message.
    ///
    /// ```rust
    /// use shoko::Error;
    ///
    /// let error = Error::store("database is locked");
    /// assert_eq!(error.to_string(), "Store error: database is locked");
    /// ```
    #[error("Store error: {0}")]
    Store(String),

    /// Source-specific errors with contextual information.
    ///
    /// # Fields
    ///
    /// * `src` - The identifier of the source that encountered the error
    /// * `message` - Descriptive error message explaining what went wrong
    #[error("Source error [{src}]: {message}")]
    Source { src: String, message: String },

    /// Resource not found errors.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A source call took longer than the configured timeout.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Invalid configuration values.
    #[error("Config error: {0}")]
    Config(String),

    /// A spawned search task panicked or was cancelled.
    #[error("Join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Generic error messages.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates a store error with the given message.
    pub fn store(msg: impl Into<String>) -> Self {
        Error::Store(msg.into())
    }

    /// Creates a source-specific error with source ID and message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use shoko::Error;
    ///
    /// let error = Error::source("royalroad", "HTTP 503");
    /// assert_eq!(error.to_string(), "Source error [royalroad]: HTTP 503");
    /// ```
    pub fn source(src: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Source {
            src: src.into(),
            message: msg.into(),
        }
    }

    /// Creates a not found error with the given message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}
