//! In-memory cover art cache warmed by the browse iterators

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::RwLock;

use crate::error::ServerError;
use crate::iterator::PrefetchFn;

/// Source of cover art image bytes, usually the media server's image endpoint
#[async_trait]
pub trait CoverArtLoader: Send + Sync {
    async fn load_cover_art(&self, cover_art_id: &str) -> Result<Vec<u8>, ServerError>;
}

#[derive(Default)]
struct CacheState {
    images: HashMap<String, Arc<Vec<u8>>>,
    /// insertion order, oldest first
    order: VecDeque<String>,
    size: usize,
    in_flight: HashSet<String>,
}

/// Cover art cache bounded by total image size, evicting oldest first
#[derive(Clone)]
pub struct CoverArtCache {
    loader: Arc<dyn CoverArtLoader>,
    state: Arc<RwLock<CacheState>>,
    max_bytes: usize,
}

impl CoverArtCache {
    pub fn new(loader: Arc<dyn CoverArtLoader>, max_bytes: usize) -> Self {
        Self {
            loader,
            state: Arc::new(RwLock::new(CacheState::default())),
            max_bytes,
        }
    }

    pub async fn get(&self, cover_art_id: &str) -> Option<Arc<Vec<u8>>> {
        self.state.read().await.images.get(cover_art_id).cloned()
    }

    pub async fn contains(&self, cover_art_id: &str) -> bool {
        self.state.read().await.images.contains_key(cover_art_id)
    }

    pub async fn size_bytes(&self) -> usize {
        self.state.read().await.size
    }

    /// Returns the cached image, loading it first if needed.
    pub async fn get_or_load(&self, cover_art_id: &str) -> Result<Arc<Vec<u8>>> {
        if let Some(image) = self.get(cover_art_id).await {
            return Ok(image);
        }
        let image = Arc::new(self.loader.load_cover_art(cover_art_id).await?);
        let mut state = self.state.write().await;
        self.store(&mut state, cover_art_id, image.clone());
        Ok(image)
    }

    /// Loads an image into the cache unless it is cached or already loading.
    pub async fn prefetch(&self, cover_art_id: &str) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if state.images.contains_key(cover_art_id)
                || !state.in_flight.insert(cover_art_id.to_string())
            {
                return Ok(());
            }
        }

        let result = self.loader.load_cover_art(cover_art_id).await;

        // the ID leaves `in_flight` only once the image is visible
        let mut state = self.state.write().await;
        state.in_flight.remove(cover_art_id);
        let image = result?;
        tracing::trace!(cover_art_id, bytes = image.len(), "Cover art prefetched");
        self.store(&mut state, cover_art_id, Arc::new(image));
        Ok(())
    }

    /// Sink to hand to media providers.
    pub fn prefetch_fn(&self) -> PrefetchFn {
        let cache = self.clone();
        Arc::new(move |cover_art_id: String| {
            let cache = cache.clone();
            async move { cache.prefetch(&cover_art_id).await }.boxed()
        })
    }

    fn store(&self, state: &mut CacheState, cover_art_id: &str, image: Arc<Vec<u8>>) {
        if image.len() > self.max_bytes {
            tracing::debug!(
                cover_art_id,
                bytes = image.len(),
                "Cover art larger than cache, not stored"
            );
            return;
        }

        let added = image.len();
        if let Some(old) = state.images.insert(cover_art_id.to_string(), image) {
            state.size -= old.len();
            state.order.retain(|id| id != cover_art_id);
        }
        state.order.push_back(cover_art_id.to_string());
        state.size += added;

        while state.size > self.max_bytes {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            if let Some(evicted) = state.images.remove(&oldest) {
                state.size -= evicted.len();
            }
        }
    }
}
