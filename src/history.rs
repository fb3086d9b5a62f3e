//! Bounded, most-recent-first search history.
//!
//! History lives for the lifetime of the process. Persisting it is left to
//! the embedding application, which can seed it with
//! [`SearchHistory::from_entries`] and read it back with
//! [`SearchHistory::entries`].
//!
//! ```rust
//! use shoko::history::SearchHistory;
//!
//! let history = SearchHistory::new(50);
//! history.save("worm");
//! history.save("ward");
//! history.save("worm");
//!
//! assert_eq!(history.get(10), vec!["worm", "ward"]);
//! ```

use parking_lot::Mutex;
use std::collections::VecDeque;

/// Past search queries, newest first, without duplicates.
#[derive(Debug)]
pub struct SearchHistory {
    entries: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl SearchHistory {
    pub fn new(capacity: usize) -> Self {
        SearchHistory {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Seeds a history from entries ordered newest first.
    ///
    /// Duplicates keep their newest position and entries beyond `capacity`
    /// are dropped.
    pub fn from_entries<I, S>(capacity: usize, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let history = SearchHistory::new(capacity);
        {
            let mut guard = history.entries.lock();
            for entry in entries {
                let entry = entry.into();
                if guard.len() < capacity && !guard.contains(&entry) {
                    guard.push_back(entry);
                }
            }
        }
        history
    }

    /// Records `query` as the most recent search.
    ///
    /// Surrounding whitespace is trimmed and blank queries are ignored. A
    /// query already in the history moves to the front.
    pub fn save(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }

        let mut entries = self.entries.lock();
        if let Some(pos) = entries.iter().position(|e| e == query) {
            entries.remove(pos);
        }
        entries.push_front(query.to_string());
        entries.truncate(self.capacity);
    }

    /// Returns up to `limit` entries, newest first.
    pub fn get(&self, limit: usize) -> Vec<String> {
        self.entries.lock().iter().take(limit).cloned().collect()
    }

    /// Returns every entry, newest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
