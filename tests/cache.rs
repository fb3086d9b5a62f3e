//! Cache behavior: TTL, invalidation and failure handling.

mod common;

use common::*;
use shoko::cache::LibraryCache;
use shoko::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn cache_over(store: &Arc<MemoryStore>) -> LibraryCache {
    LibraryCache::new(store.clone(), TEST_TTL)
}

#[tokio::test(start_paused = true)]
async fn test_hit_within_ttl_returns_same_snapshot() {
    let store = MemoryStore::new(vec![entry(1, "Worm"), entry(2, "Ward")]);
    let cache = cache_over(&store);

    let first = cache.library().await.unwrap();
    tokio::time::advance(TEST_TTL - EPSILON).await;
    let second = cache.library().await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(store.get_all_calls(), 1);

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test(start_paused = true)]
async fn test_expired_entry_is_refetched() {
    let store = MemoryStore::new(vec![entry(1, "Worm")]);
    let cache = cache_over(&store);

    let first = cache.library().await.unwrap();
    tokio::time::advance(TEST_TTL + EPSILON).await;
    let second = cache.library().await.unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(store.get_all_calls(), 2);
}

#[tokio::test]
async fn test_library_snapshot_includes_archived() {
    let store = MemoryStore::new(vec![entry(1, "Worm"), archived(2, "Pact")]);
    let cache = cache_over(&store);

    let books = cache.library().await.unwrap();
    assert_eq!(ids(books.as_slice()), vec![1, 2]);
}

#[tokio::test]
async fn test_successful_mutation_invalidates() {
    let store = MemoryStore::new(vec![entry(1, "Worm")]);
    let cache = cache_over(&store);

    cache.library().await.unwrap();
    cache.favorites().await.unwrap();

    let mut renamed = store.snapshot()[0].book.clone();
    renamed.title = "Worm (Rewrite)".to_string();
    cache.update(&renamed).await.unwrap();

    let books = cache.library().await.unwrap();
    assert_eq!(books[0].book.title, "Worm (Rewrite)");
    assert_eq!(store.get_all_calls(), 2);

    cache.favorites().await.unwrap();
    assert_eq!(store.favorites_calls.load(std::sync::atomic::Ordering::SeqCst), 2);

    assert_eq!(cache.stats().invalidations, 1);
    assert_eq!(*store.invalidated_tags.lock(), vec!["book".to_string()]);
}

#[tokio::test]
async fn test_failed_mutation_keeps_cache() {
    let store = MemoryStore::new(vec![entry(1, "Worm")]);
    let cache = cache_over(&store);

    let before = cache.library().await.unwrap();
    store.fail_mutations(true);
    assert!(cache.delete(&[1]).await.is_err());

    let after = cache.library().await.unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(cache.stats().invalidations, 0);
    assert!(store.invalidated_tags.lock().is_empty());
}

#[tokio::test]
async fn test_every_mutation_kind_invalidates() {
    let store = MemoryStore::new(vec![entry(1, "Worm"), entry(2, "Ward")]);
    let cache = cache_over(&store);

    let book = store.snapshot()[0].book.clone();
    cache.update(&book).await.unwrap();
    cache.update_many(&[book.clone()]).await.unwrap();
    cache.insert(&[book]).await.unwrap();
    cache.set_categories(&[1], &[7]).await.unwrap();
    cache.update_pin_status(1, true, 0).await.unwrap();
    cache.update_archive_status(2, true).await.unwrap();
    cache.delete(&[3]).await.unwrap();
    cache.prune().await.unwrap();

    assert_eq!(cache.stats().invalidations, 8);
    assert_eq!(store.categories_of(1), vec![7]);
}

#[tokio::test]
async fn test_failed_fetch_leaves_no_entry() {
    let store = MemoryStore::new(vec![entry(1, "Worm")]);
    let cache = cache_over(&store);

    store.fail_reads(true);
    assert!(cache.library().await.is_err());

    store.fail_reads(false);
    let books = cache.library().await.unwrap();
    assert_eq!(ids(books.as_slice()), vec![1]);
    assert_eq!(store.get_all_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_keeps_error_visible() {
    let store = MemoryStore::new(vec![entry(1, "Worm")]);
    let cache = cache_over(&store);

    cache.library().await.unwrap();
    tokio::time::advance(TEST_TTL + EPSILON).await;

    store.fail_reads(true);
    let err = cache.library().await.unwrap_err();
    assert!(err.to_string().contains("read failed"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_share_one_fetch() {
    let store = MemoryStore::new(vec![entry(1, "Worm")]);
    store.set_fetch_delay(Duration::from_millis(50));
    let cache = Arc::new(cache_over(&store));

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.library().await.map(|b| b.len()) })
        })
        .collect();

    for reader in readers {
        assert_eq!(reader.await.unwrap().unwrap(), 1);
    }
    assert_eq!(store.get_all_calls(), 1);
}

#[tokio::test]
async fn test_hit_rate() {
    let store = MemoryStore::new(vec![entry(1, "Worm")]);
    let cache = cache_over(&store);
    assert_eq!(cache.stats().hit_rate(), 0.0);

    for _ in 0..4 {
        cache.library().await.unwrap();
    }
    assert_eq!(cache.stats().hit_rate(), 0.75);
}
