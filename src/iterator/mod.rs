//! Iterator module - lazily fetched, filtered media listings
//!
//! Providers turn a browse or search request into a fetch closure; the types
//! here drive that closure page by page and hand items out one at a time.
//!
//! - `paged`: the generic sequential iterator shared by albums, artists, tracks
//! - `random`: de-duplicated random album iteration
//! - `retry`: retry policy applied to every page fetch
//!
//! Iterators are meant for a single consumer. Fetch errors are never returned
//! to the caller: they are logged and end the listing. Once `next()` returns
//! `None` it keeps returning `None`.

mod paged;
mod random;
mod retry;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};

use crate::model::{Album, Artist, Track};

pub use paged::{PagedIter, new_album_iterator, new_artist_iterator, new_track_iterator};
pub use random::RandomAlbumIter;

/// Fetches up to `limit` items starting `offset` items into the listing.
pub type FetchFn<M> =
    Box<dyn Fn(usize, usize) -> BoxFuture<'static, anyhow::Result<Vec<M>>> + Send + Sync>;

/// Best-effort notification that a cover art ID is about to be displayed.
pub type PrefetchFn = Arc<dyn Fn(String) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Pull-based listing of media items
///
/// Must be polled inside a tokio runtime: prefetching spawns tokio tasks and
/// retry backoff uses tokio timers.
#[async_trait]
pub trait MediaIterator<M: Send + 'static>: Send {
    /// Next item, or `None` once the listing is exhausted.
    async fn next(&mut self) -> Option<M>;

    /// Pulls up to `n` items. Fewer are returned only at the end of the listing.
    async fn next_batch(&mut self, n: usize) -> Vec<M> {
        let mut items = Vec::with_capacity(n);
        while items.len() < n {
            match self.next().await {
                Some(item) => items.push(item),
                None => break,
            }
        }
        items
    }
}

pub type AlbumIterator = Box<dyn MediaIterator<Album>>;
pub type ArtistIterator = Box<dyn MediaIterator<Artist>>;
pub type TrackIterator = Box<dyn MediaIterator<Track>>;

/// Adapts an iterator into a `Stream` for use with `StreamExt` combinators.
/// The stream needs a tokio runtime, like the iterator it wraps.
pub fn into_stream<M: Send + 'static>(iter: Box<dyn MediaIterator<M>>) -> BoxStream<'static, M> {
    Box::pin(stream::unfold(iter, |mut iter| async move {
        iter.next().await.map(|item| (item, iter))
    }))
}

/// Fires the prefetch sink on a detached task. Never awaited; failures are
/// only logged.
pub(crate) fn spawn_prefetch(prefetch: &Option<PrefetchFn>, cover_art_id: &str) {
    let Some(prefetch) = prefetch else {
        return;
    };
    if cover_art_id.is_empty() {
        return;
    }
    let task = prefetch(cover_art_id.to_string());
    let cover_art_id = cover_art_id.to_string();
    tokio::spawn(async move {
        if let Err(e) = task.await {
            tracing::debug!(cover_art_id, error = %e, "Cover art prefetch failed");
        }
    });
}
