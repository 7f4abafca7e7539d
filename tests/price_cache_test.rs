//! Tests for the shared price cache and its listeners

mod common;

use common::prices;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tradesync::services::PriceCache;
use tradesync::types::Quote;

// =============================================================================
// Merge semantics
// =============================================================================

mod merge_tests {
    use super::*;

    #[test]
    fn test_update_merges_instead_of_replacing() {
        let cache = PriceCache::new();
        cache.merge_snapshot(prices(&[("EURUSD", 1.1, 1.1002)]));
        cache.merge_update("GBPUSD", Quote::new(1.27, 1.2702));

        assert_eq!(cache.get("EURUSD"), Some(Quote::new(1.1, 1.1002)));
        assert_eq!(cache.get("GBPUSD"), Some(Quote::new(1.27, 1.2702)));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_snapshot_subset_keeps_other_symbols() {
        let cache = PriceCache::new();
        cache.merge_snapshot(prices(&[("EURUSD", 1.1, 1.1002), ("XAUUSD", 2400.0, 2400.5)]));
        cache.merge_snapshot(prices(&[("EURUSD", 1.2, 1.2002)]));

        assert_eq!(cache.get("EURUSD"), Some(Quote::new(1.2, 1.2002)));
        assert_eq!(cache.get("XAUUSD"), Some(Quote::new(2400.0, 2400.5)));
    }

    #[test]
    fn test_version_bumps_on_every_merge() {
        let cache = PriceCache::new();
        let v0 = cache.version();
        cache.merge_update("EURUSD", Quote::new(1.1, 1.1002));
        cache.merge_update("EURUSD", Quote::new(1.1001, 1.1003));
        assert_eq!(cache.version(), v0 + 2);

        cache.merge_snapshot(Default::default());
        assert_eq!(cache.version(), v0 + 2);
    }
}

// =============================================================================
// Listeners
// =============================================================================

mod listener_tests {
    use super::*;

    #[test]
    fn test_listener_sees_full_cache() {
        let cache = PriceCache::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = cache.add_listener(move |map| sink.lock().unwrap().push(map.len()));

        cache.merge_update("EURUSD", Quote::new(1.1, 1.1002));
        cache.merge_update("GBPUSD", Quote::new(1.27, 1.2702));

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_late_listener_gets_current_cache_immediately() {
        let cache = PriceCache::new();
        cache.merge_update("EURUSD", Quote::new(1.1, 1.1002));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let _sub = cache.add_listener(move |map| {
            assert!(map.contains_key("EURUSD"));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_on_empty_cache_waits() {
        let cache = PriceCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let _sub = cache.add_listener(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let cache = PriceCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let sub = cache.add_listener(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(cache.listener_count(), 1);

        sub.unsubscribe();
        assert_eq!(cache.listener_count(), 0);

        cache.merge_update("EURUSD", Quote::new(1.1, 1.1002));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
