// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `zonecache.rs`

#[cfg(test)]
mod tests {
    use crate::dns::{diff, ChangeRequest, DnsHostedZone, DnsName, DnsSet, DnsSetName, RecordSet, RecordType, ZoneId};
    use crate::provider::{
        ChangeResult, ProgressFn, ProviderError, ProviderHandler, ZoneState,
    };
    use crate::zonecache::ZoneCache;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::Duration;

    /// Handler that counts reads and serves a fixed zone.
    struct CountingHandler {
        reads: AtomicUsize,
    }

    #[async_trait]
    impl ProviderHandler for CountingHandler {
        async fn get_zones(&self) -> Result<Vec<DnsHostedZone>, ProviderError> {
            Ok(vec![])
        }

        async fn get_zone_state(&self, _zone: &ZoneId) -> Result<ZoneState, ProviderError> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ZoneState::empty(n.to_string()))
        }

        async fn execute(
            &self,
            _zone: &ZoneId,
            _requests: &[ChangeRequest],
            _progress: ProgressFn<'_>,
        ) -> Result<Vec<ChangeResult>, ProviderError> {
            Ok(vec![])
        }

        fn release(&self) {}
    }

    fn cache_with_counter() -> (ZoneCache, Arc<CountingHandler>) {
        let handler = Arc::new(CountingHandler {
            reads: AtomicUsize::new(0),
        });
        let cache = ZoneCache::new(handler.clone(), None, Duration::from_secs(300));
        (cache, handler)
    }

    fn zone() -> ZoneId {
        ZoneId::new("mock-inmemory", "first.example.com")
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let (cache, handler) = cache_with_counter();
        cache.get_zone_state(&zone(), false).await.unwrap();
        cache.get_zone_state(&zone(), false).await.unwrap();
        assert_eq!(handler.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn force_refresh_bypasses_cache() {
        let (cache, handler) = cache_with_counter();
        cache.get_zone_state(&zone(), false).await.unwrap();
        cache.get_zone_state(&zone(), true).await.unwrap();
        assert_eq!(handler.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dirty_zone_is_refreshed_on_next_read() {
        let (cache, handler) = cache_with_counter();
        cache.get_zone_state(&zone(), false).await.unwrap();
        cache.mark_dirty(&zone()).await;
        cache.get_zone_state(&zone(), false).await.unwrap();
        assert_eq!(handler.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_expiry_triggers_refresh() {
        let (cache, handler) = cache_with_counter();
        cache.get_zone_state(&zone(), false).await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;
        cache.get_zone_state(&zone(), false).await.unwrap();
        assert_eq!(handler.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_override_shortens_lifetime() {
        let (cache, handler) = cache_with_counter();
        cache.set_ttl_override(&zone(), Some(Duration::from_secs(10)));
        cache.get_zone_state(&zone(), false).await.unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        cache.get_zone_state(&zone(), false).await.unwrap();
        assert_eq!(handler.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_readers_share_one_fetch() {
        let (cache, handler) = cache_with_counter();
        let cache = Arc::new(cache);
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                cache.get_zone_state(&zone(), false).await.unwrap()
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        // Single-flight: at most one fetch should have happened while the
        // slot was cold, and the rest hit the cache.
        assert_eq!(handler.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn apply_success_patches_cached_state() {
        let (cache, handler) = cache_with_counter();
        cache.get_zone_state(&zone(), false).await.unwrap();

        let mut desired = DnsSet::new(DnsSetName::simple(
            DnsName::new("e1.first.example.com").unwrap(),
        ));
        desired.put(RecordSet::new(
            RecordType::A,
            300,
            vec!["1.1.1.1".to_string()],
        ));
        let requests = diff(None, Some(&desired));
        cache.apply_success(&zone(), &requests).await;

        let state = cache.get_zone_state(&zone(), false).await.unwrap();
        assert!(state.sets.contains_key(&desired.name));
        // Patch happened in place, without a backend read.
        assert_eq!(handler.reads.load(Ordering::SeqCst), 1);
    }
}
