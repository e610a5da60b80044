use std::collections::VecDeque;

use async_trait::async_trait;

use crate::config::{DEFAULT_PAGE_SIZE, RetryPolicy};
use crate::model::{
    Album, AlbumFilter, Artist, ArtistFilter, MediaFilter, MediaItem, NilFilter, Track,
};

use super::retry::fetch_page;
use super::{FetchFn, MediaIterator, PrefetchFn, spawn_prefetch};

/// Sequential listing over any paged fetch function.
///
/// Items are requested `page_size` at a time. The server offset advances by
/// the number of items the server actually returned, so short pages are fine.
/// Pages that the client-side filter empties completely are skipped without
/// ending the listing; only an empty server page (or a fetch error once the
/// retry policy gives up) ends it.
pub struct PagedIter<M, F> {
    fetch: FetchFn<M>,
    filter: F,
    prefetch: Option<PrefetchFn>,
    page_size: usize,
    retry: RetryPolicy,
    server_pos: usize,
    buffer: VecDeque<M>,
    done: bool,
}

impl<M: MediaItem, F: MediaFilter<M>> PagedIter<M, F> {
    pub fn new(fetch: FetchFn<M>, filter: F, prefetch: Option<PrefetchFn>) -> Self {
        Self {
            fetch,
            filter,
            prefetch,
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::none(),
            server_pos: 0,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn next_item(&mut self) -> Option<M> {
        if self.done {
            return None;
        }
        if let Some(item) = self.buffer.pop_front() {
            return Some(item);
        }

        // keep fetching until the server runs out or a page survives the filter
        let mut page = loop {
            let mut items =
                match fetch_page(&self.fetch, self.server_pos, self.page_size, &self.retry).await {
                    Ok(items) => items,
                    Err(e) => {
                        tracing::warn!(
                            offset = self.server_pos,
                            error = %e,
                            "Error fetching items"
                        );
                        Vec::new()
                    }
                };
            if items.is_empty() {
                tracing::debug!(offset = self.server_pos, "Listing exhausted");
                self.done = true;
                return None;
            }
            self.server_pos += items.len();
            if !self.filter.is_nil() {
                items.retain(|item| self.filter.matches(item));
            }
            if !items.is_empty() {
                break VecDeque::from(items);
            }
        };

        for item in &page {
            spawn_prefetch(&self.prefetch, item.cover_art_id());
        }
        let first = page.pop_front();
        self.buffer = page;
        first
    }
}

#[async_trait]
impl<M: MediaItem, F: MediaFilter<M>> MediaIterator<M> for PagedIter<M, F> {
    async fn next(&mut self) -> Option<M> {
        self.next_item().await
    }
}

pub fn new_album_iterator(
    fetch: FetchFn<Album>,
    filter: AlbumFilter,
    prefetch: Option<PrefetchFn>,
) -> PagedIter<Album, AlbumFilter> {
    PagedIter::new(fetch, filter, prefetch)
}

pub fn new_artist_iterator(
    fetch: FetchFn<Artist>,
    filter: ArtistFilter,
    prefetch: Option<PrefetchFn>,
) -> PagedIter<Artist, ArtistFilter> {
    PagedIter::new(fetch, filter, prefetch)
}

pub fn new_track_iterator(
    fetch: FetchFn<Track>,
    prefetch: Option<PrefetchFn>,
) -> PagedIter<Track, NilFilter<Track>> {
    PagedIter::new(fetch, NilFilter::new(), prefetch)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::ServerError;
    use crate::iterator::test_support::{Page, ScriptedFetch, recording_prefetch};
    use crate::model::AlbumFilterOptions;

    fn albums(range: std::ops::Range<usize>) -> Vec<Album> {
        range
            .map(|i| Album {
                id: format!("al-{i}"),
                cover_art_id: format!("cover-{i}"),
                name: format!("Album {i}"),
                year: 1980 + (i % 40) as i32,
                ..Default::default()
            })
            .collect()
    }

    fn tracks(range: std::ops::Range<usize>) -> Vec<Track> {
        range
            .map(|i| Track {
                id: format!("tr-{i}"),
                cover_art_id: format!("cover-{i}"),
                ..Default::default()
            })
            .collect()
    }

    fn year_filter(min_year: i32) -> AlbumFilter {
        AlbumFilter::new(AlbumFilterOptions {
            min_year,
            ..Default::default()
        })
    }

    async fn drain<M: MediaItem, F: MediaFilter<M>>(iter: &mut PagedIter<M, F>) -> Vec<M> {
        let mut out = Vec::new();
        while let Some(item) = iter.next_item().await {
            out.push(item);
        }
        out
    }

    #[tokio::test]
    async fn two_full_pages_then_empty() {
        let script = ScriptedFetch::new(vec![
            Page::Items(tracks(0..20)),
            Page::Items(tracks(20..40)),
            Page::Items(vec![]),
        ]);
        let mut iter = new_track_iterator(script.fetch_fn(), None);

        let items = drain(&mut iter).await;
        assert_eq!(items.len(), 40);
        assert_eq!(items[0].id, "tr-0");
        assert_eq!(items[39].id, "tr-39");
        assert_eq!(script.calls(), vec![(0, 20), (20, 20), (40, 20)]);

        for _ in 0..3 {
            assert!(iter.next_item().await.is_none());
        }
        assert_eq!(script.calls().len(), 3, "no fetch after exhaustion");
    }

    #[tokio::test]
    async fn offset_advances_by_items_returned() {
        let script = ScriptedFetch::new(vec![
            Page::Items(tracks(0..7)),
            Page::Items(tracks(7..20)),
            Page::Items(tracks(20..21)),
        ]);
        let mut iter = new_track_iterator(script.fetch_fn(), None);

        assert_eq!(drain(&mut iter).await.len(), 21);
        assert_eq!(script.calls(), vec![(0, 20), (7, 20), (20, 20), (21, 20)]);
    }

    #[tokio::test]
    async fn fully_filtered_page_does_not_end_iteration() {
        let mut page_one = albums(0..20);
        for album in &mut page_one {
            album.year = 1970;
        }
        let mut page_two = albums(20..25);
        for album in &mut page_two {
            album.year = 2005;
        }
        let script = ScriptedFetch::new(vec![
            Page::Items(page_one),
            Page::Items(page_two),
            Page::Items(vec![]),
        ]);
        let mut iter = new_album_iterator(script.fetch_fn(), year_filter(2000), None);

        let ids: Vec<_> = drain(&mut iter).await.into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["al-20", "al-21", "al-22", "al-23", "al-24"]);
        assert_eq!(script.calls(), vec![(0, 20), (20, 20), (25, 20)]);
    }

    #[tokio::test]
    async fn every_returned_item_matches_the_filter() {
        let script = ScriptedFetch::new(vec![
            Page::Items(albums(0..20)),
            Page::Items(albums(20..40)),
            Page::Items(albums(40..55)),
        ]);
        let filter = year_filter(2000);
        let mut iter = new_album_iterator(script.fetch_fn(), filter.clone(), None);

        let items = drain(&mut iter).await;
        assert!(!items.is_empty());
        assert!(items.iter().all(|a| filter.matches(a)));
        let expected = albums(0..55).into_iter().filter(|a| filter.matches(a)).count();
        assert_eq!(items.len(), expected);
    }

    #[tokio::test]
    async fn nil_filter_passes_everything_through() {
        let script = ScriptedFetch::new(vec![Page::Items(albums(0..12))]);
        let mut iter = new_album_iterator(script.fetch_fn(), AlbumFilter::default(), None);
        assert_eq!(drain(&mut iter).await, albums(0..12));
    }

    #[tokio::test]
    async fn fetch_error_ends_iteration() {
        let script = ScriptedFetch::new(vec![
            Page::Items(tracks(0..20)),
            Page::Fail(ServerError::Transport("connection reset".into())),
            Page::Items(tracks(20..40)),
        ]);
        let mut iter = new_track_iterator(script.fetch_fn(), None);

        assert_eq!(drain(&mut iter).await.len(), 20);
        assert!(iter.next_item().await.is_none());
        assert_eq!(script.calls().len(), 2);
    }

    #[tokio::test]
    async fn retry_policy_recovers_from_transient_errors() {
        let script = ScriptedFetch::new(vec![
            Page::Items(tracks(0..20)),
            Page::Fail(ServerError::Transport("connection reset".into())),
            Page::Items(tracks(20..30)),
        ]);
        let mut iter = new_track_iterator(script.fetch_fn(), None)
            .with_retry(RetryPolicy::with_retries(2, Duration::from_millis(1)));

        assert_eq!(drain(&mut iter).await.len(), 30);
        assert_eq!(script.calls(), vec![(0, 20), (20, 20), (20, 20), (30, 20)]);
    }

    #[tokio::test]
    async fn prefetch_fires_for_every_item_on_the_page() {
        let (prefetch, seen) = recording_prefetch();
        let script = ScriptedFetch::new(vec![Page::Items(tracks(0..3))]);
        let mut iter = new_track_iterator(script.fetch_fn(), Some(prefetch));

        let first = iter.next_item().await.unwrap();
        assert_eq!(first.id, "tr-0");
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["cover-0", "cover-1", "cover-2"]
        );
    }

    #[tokio::test]
    async fn custom_page_size_and_batches() {
        let script = ScriptedFetch::new(vec![Page::Items(tracks(0..5)), Page::Items(tracks(5..8))]);
        let mut iter = new_track_iterator(script.fetch_fn(), None).with_page_size(5);

        assert_eq!(iter.next_batch(6).await.len(), 6);
        assert_eq!(iter.next_batch(6).await.len(), 2);
        assert!(iter.next_batch(6).await.is_empty());
        assert_eq!(script.calls(), vec![(0, 5), (5, 5), (8, 5)]);
    }
}
