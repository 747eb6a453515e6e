//! Tile fetch coordination: reconciles the currently visible tile keys
//! against the cache and issues at most one outstanding fetch per key.
//!
//! Fetches run as detached tokio tasks bounded by a semaphore; completed
//! downloads are decoded off the owner thread and handed back over a
//! channel. The owner drains that channel non-blockingly once per frame,
//! so rendering never waits on the network.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tokio::sync::Semaphore;

use crate::api::TileFetcher;
use crate::core::config::FetchConfig;
use crate::core::grid::TileKey;
use crate::tiles::cache::{TileCache, TileImage};

/// Why a tile fetch produced no image. All variants are treated the same
/// by the core: the key stays absent and is re-requested the next time a
/// visibility pass finds it missing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("tile not found")]
    NotFound,

    #[error("decode error: {0}")]
    Decode(String),
}

/// Completed fetch handed back to the owner thread.
#[derive(Debug)]
pub struct FetchOutcome {
    pub key: TileKey,
    /// Cache generation captured when the fetch was issued.
    pub generation: u64,
    pub result: Result<TileImage, FetchError>,
}

/// Issues network requests for missing, not-yet-in-flight tiles and
/// installs the results into the [`TileCache`].
pub struct FetchCoordinator {
    fetcher: Arc<dyn TileFetcher>,
    semaphore: Arc<Semaphore>,
    request_timeout: Duration,
    result_tx: Sender<FetchOutcome>,
    result_rx: Receiver<FetchOutcome>,
}

impl FetchCoordinator {
    pub fn new(fetcher: Arc<dyn TileFetcher>, config: &FetchConfig) -> Self {
        let (result_tx, result_rx) = unbounded();
        Self {
            fetcher,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            request_timeout: config.request_timeout,
            result_tx,
            result_rx,
        }
    }

    /// Reconciles the visible set against the cache: every key that is
    /// neither cached nor in flight is marked in flight and fetched on a
    /// detached task. Keys are processed in visibility order; the
    /// semaphore queues any excess beyond the concurrency bound.
    ///
    /// Must be called from within a tokio runtime.
    pub fn reconcile(&self, cache: &mut TileCache, product_id: &str, visible: &[TileKey]) {
        for &key in visible {
            if cache.contains(&key) || cache.is_in_flight(&key) {
                continue;
            }
            cache.mark_in_flight(key);
            self.spawn_fetch(product_id.to_string(), key, cache.generation());
        }
    }

    fn spawn_fetch(&self, product_id: String, key: TileKey, generation: u64) {
        let fetcher = Arc::clone(&self.fetcher);
        let semaphore = Arc::clone(&self.semaphore);
        let request_timeout = self.request_timeout;
        let result_tx = self.result_tx.clone();

        tokio::spawn(async move {
            // Closed only on coordinator teardown.
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            log::debug!("fetching tile {} for {}", key, product_id);
            let fetched = tokio::time::timeout(request_timeout, fetcher.fetch_tile(&product_id, key))
                .await
                .unwrap_or_else(|_| Err(FetchError::Transport("request timed out".into())));
            let result = match fetched {
                Ok(bytes) => decode_tile(&bytes),
                Err(e) => Err(e),
            };
            let _ = result_tx.send(FetchOutcome {
                key,
                generation,
                result,
            });
        });
    }

    /// Drains completed fetches into the cache without blocking. Returns
    /// the number of tiles newly installed.
    ///
    /// Outcomes from a superseded generation are dropped entirely: their
    /// in-flight markers were already cleared wholesale by the
    /// invalidation, and the same key may have a fresh fetch outstanding
    /// whose marker must not be disturbed.
    pub fn pump(&self, cache: &mut TileCache) -> usize {
        let mut installed = 0;
        while let Ok(outcome) = self.result_rx.try_recv() {
            if outcome.generation != cache.generation() {
                log::debug!("dropping stale fetch outcome for {}", outcome.key);
                continue;
            }
            cache.clear_in_flight(&outcome.key);
            match outcome.result {
                Ok(image) => {
                    if cache.insert(outcome.key, image, outcome.generation) {
                        installed += 1;
                    }
                }
                Err(e) => {
                    // No entry is created; the key stays retriable.
                    log::warn!("tile {} failed: {}", outcome.key, e);
                }
            }
        }
        installed
    }

    /// Whether any completed fetches are waiting to be pumped.
    pub fn has_pending_results(&self) -> bool {
        !self.result_rx.is_empty()
    }
}

fn decode_tile(bytes: &[u8]) -> Result<TileImage, FetchError> {
    image::load_from_memory(bytes)
        .map(|img| Arc::new(img.to_rgba8()))
        .map_err(|e| FetchError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Fetcher whose completions are held back until the test opens the
    /// gate; every call is counted.
    struct GatedFetcher {
        gate: Notify,
        open: std::sync::atomic::AtomicBool,
        calls: AtomicUsize,
        response: Result<Vec<u8>, FetchError>,
    }

    impl GatedFetcher {
        fn new(response: Result<Vec<u8>, FetchError>) -> Arc<Self> {
            Arc::new(Self {
                gate: Notify::new(),
                open: std::sync::atomic::AtomicBool::new(false),
                calls: AtomicUsize::new(0),
                response,
            })
        }

        fn open_gate(&self) {
            self.open.store(true, Ordering::SeqCst);
            self.gate.notify_waiters();
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TileFetcher for GatedFetcher {
        async fn fetch_tile(
            &self,
            _product_id: &str,
            _key: TileKey,
        ) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            while !self.open.load(Ordering::SeqCst) {
                let notified = self.gate.notified();
                if self.open.load(Ordering::SeqCst) {
                    break;
                }
                notified.await;
            }
            self.response.clone()
        }
    }

    fn png_bytes() -> Vec<u8> {
        // A valid 1x1 PNG so the decode path is exercised end to end.
        let mut bytes = Vec::new();
        image::DynamicImage::new_rgba8(1, 1)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageOutputFormat::Png,
            )
            .unwrap();
        bytes
    }

    async fn pump_until(
        coordinator: &FetchCoordinator,
        cache: &mut TileCache,
        done: impl Fn(&TileCache) -> bool,
    ) {
        for _ in 0..200 {
            coordinator.pump(cache);
            if done(cache) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_at_most_one_fetch_per_key_under_rapid_reconcile() {
        let fetcher = GatedFetcher::new(Ok(png_bytes()));
        let coordinator =
            FetchCoordinator::new(fetcher.clone(), &FetchConfig::for_testing());
        let mut cache = TileCache::new();
        let visible = vec![TileKey::new(1, 0, 0), TileKey::new(1, 0, 1)];

        // Simulate rapid pan events while the fetches are unresolved.
        for _ in 0..10 {
            coordinator.reconcile(&mut cache, "wac_global", &visible);
        }
        assert_eq!(cache.in_flight_count(), 2);

        fetcher.open_gate();
        pump_until(&coordinator, &mut cache, |c| c.len() == 2).await;
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(cache.in_flight_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_fetch_leaves_key_retriable() {
        let fetcher = GatedFetcher::new(Err(FetchError::NotFound));
        let coordinator =
            FetchCoordinator::new(fetcher.clone(), &FetchConfig::for_testing());
        let mut cache = TileCache::new();
        let key = TileKey::new(3, 2, 5);

        fetcher.open_gate();
        coordinator.reconcile(&mut cache, "wac_global", &[key]);
        pump_until(&coordinator, &mut cache, |c| c.in_flight_count() == 0).await;
        assert!(!cache.contains(&key));

        // A later visibility pass issues a fresh request for the same key.
        coordinator.reconcile(&mut cache, "wac_global", &[key]);
        pump_until(&coordinator, &mut cache, |c| c.in_flight_count() == 0).await;
        assert_eq!(fetcher.calls(), 2);
        assert!(!cache.contains(&key));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stale_generation_outcome_is_dropped() {
        let fetcher = GatedFetcher::new(Ok(png_bytes()));
        let coordinator =
            FetchCoordinator::new(fetcher.clone(), &FetchConfig::for_testing());
        let mut cache = TileCache::new();
        let key = TileKey::new(2, 1, 1);

        coordinator.reconcile(&mut cache, "wac_global", &[key]);
        // Zoom change while the fetch is in flight.
        cache.invalidate_all();

        fetcher.open_gate();
        // The stale outcome must neither insert nor disturb the new state.
        for _ in 0..50 {
            coordinator.pump(&mut cache);
            tokio::time::sleep(Duration::from_millis(5)).await;
            if fetcher.calls() == 1 && !coordinator.has_pending_results() {
                break;
            }
        }
        coordinator.pump(&mut cache);
        assert!(cache.is_empty());
        assert_eq!(cache.in_flight_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_undecodable_bytes_count_as_failure() {
        let fetcher = GatedFetcher::new(Ok(vec![0xde, 0xad, 0xbe, 0xef]));
        let coordinator =
            FetchCoordinator::new(fetcher.clone(), &FetchConfig::for_testing());
        let mut cache = TileCache::new();
        let key = TileKey::new(1, 1, 0);

        fetcher.open_gate();
        coordinator.reconcile(&mut cache, "wac_global", &[key]);
        pump_until(&coordinator, &mut cache, |c| c.in_flight_count() == 0).await;
        assert!(!cache.contains(&key));
    }
}
