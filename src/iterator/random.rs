use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;

use crate::config::{DEFAULT_RANDOM_BATCH_SIZE, DEFAULT_RANDOM_MIN_HIT_RATIO, RetryPolicy};
use crate::model::{Album, AlbumFilter, MediaFilter};

use super::retry::fetch_page;
use super::{FetchFn, MediaIterator, PrefetchFn, spawn_prefetch};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// Sampling the server's random endpoint
    Random,
    /// Sweeping a stable sort order for whatever random sampling missed
    Sweep,
}

/// Random album order without repeats.
///
/// Servers paginate a random sort poorly: each request is an independent
/// sample, so repeats grow as the unseen pool shrinks. The iterator first
/// samples the random endpoint, remembering every album ID it has seen. Once
/// a batch contains too few new albums it switches for good to a sweep over
/// a deterministic order, skipping albums it has already returned.
///
/// A fetch error while sampling ends the listing at once. During the sweep
/// an error is logged and handled like an empty page, which also ends it.
pub struct RandomAlbumIter {
    random_fetch: FetchFn<Album>,
    sweep_fetch: FetchFn<Album>,
    filter: AlbumFilter,
    prefetch: Option<PrefetchFn>,
    batch_size: usize,
    min_hit_ratio: f64,
    retry: RetryPolicy,
    seen: HashSet<String>,
    phase: Phase,
    offset: usize,
    buffer: VecDeque<Album>,
    done: bool,
}

impl RandomAlbumIter {
    pub fn new(
        sweep_fetch: FetchFn<Album>,
        random_fetch: FetchFn<Album>,
        filter: AlbumFilter,
        prefetch: Option<PrefetchFn>,
    ) -> Self {
        Self {
            random_fetch,
            sweep_fetch,
            filter,
            prefetch,
            batch_size: DEFAULT_RANDOM_BATCH_SIZE,
            min_hit_ratio: DEFAULT_RANDOM_MIN_HIT_RATIO,
            retry: RetryPolicy::none(),
            seen: HashSet::new(),
            phase: Phase::Random,
            offset: 0,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_min_hit_ratio(mut self, ratio: f64) -> Self {
        self.min_hit_ratio = ratio;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn next_album(&mut self) -> Option<Album> {
        if self.done {
            return None;
        }

        while self.buffer.is_empty() {
            let fetched = match self.phase {
                Phase::Random => self.sample_random().await,
                Phase::Sweep => self.sweep_next_page().await,
            };
            if !fetched {
                self.finish();
                return None;
            }
        }

        self.buffer.pop_front()
    }

    /// Returns false when the listing must end.
    async fn sample_random(&mut self) -> bool {
        // offset means nothing for a random sample
        let albums = match fetch_page(&self.random_fetch, 0, self.batch_size, &self.retry).await {
            Ok(albums) => albums,
            Err(e) => {
                tracing::warn!(error = %e, "Error fetching random albums");
                return false;
            }
        };

        let mut hits = 0;
        for album in albums {
            // seen albums count even when filtered out, they still tell us
            // how much of the pool is left
            if self.seen.insert(album.id.clone()) {
                hits += 1;
                if self.filter.matches(&album) {
                    spawn_prefetch(&self.prefetch, &album.cover_art_id);
                    self.buffer.push_back(album);
                }
            }
        }

        let hit_ratio = hits as f64 / self.batch_size as f64;
        if hit_ratio < self.min_hit_ratio {
            tracing::debug!(
                hits,
                hit_ratio,
                seen = self.seen.len(),
                "Switching random albums to sweep"
            );
            self.phase = Phase::Sweep;
        }
        true
    }

    async fn sweep_next_page(&mut self) -> bool {
        let albums = match fetch_page(&self.sweep_fetch, self.offset, self.batch_size, &self.retry)
            .await
        {
            Ok(albums) => albums,
            Err(e) => {
                tracing::warn!(offset = self.offset, error = %e, "Error fetching albums");
                Vec::new()
            }
        };
        if albums.is_empty() {
            return false;
        }

        self.offset += albums.len();
        for album in albums {
            if !self.seen.contains(&album.id) && self.filter.matches(&album) {
                self.seen.insert(album.id.clone());
                spawn_prefetch(&self.prefetch, &album.cover_art_id);
                self.buffer.push_back(album);
            }
        }
        true
    }

    fn finish(&mut self) {
        self.done = true;
        self.buffer.clear();
        // can be large and is never consulted again
        self.seen = HashSet::new();
    }
}

#[async_trait]
impl MediaIterator<Album> for RandomAlbumIter {
    async fn next(&mut self) -> Option<Album> {
        self.next_album().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use crate::iterator::test_support::{Page, ScriptedFetch, recording_prefetch};
    use crate::model::AlbumFilterOptions;

    fn album(i: usize) -> Album {
        Album {
            id: format!("al-{i}"),
            cover_art_id: format!("cover-{i}"),
            year: if i % 2 == 0 { 2010 } else { 1990 },
            ..Default::default()
        }
    }

    fn batch(ids: impl IntoIterator<Item = usize>) -> Page<Album> {
        Page::Items(ids.into_iter().map(album).collect())
    }

    async fn drain(iter: &mut RandomAlbumIter) -> Vec<String> {
        let mut ids = Vec::new();
        while let Some(a) = iter.next_album().await {
            ids.push(a.id);
        }
        ids
    }

    #[tokio::test]
    async fn never_returns_an_album_twice() {
        // heavy overlap between random batches, then a full sweep of 0..60
        let random = ScriptedFetch::new(vec![
            batch(0..25),
            batch(10..35),
            batch(20..45),
            batch(30..55),
            batch(40..65),
        ]);
        let sweep = ScriptedFetch::new(vec![batch(0..25), batch(25..50), batch(50..70)]);
        let mut iter = RandomAlbumIter::new(
            sweep.fetch_fn(),
            random.fetch_fn(),
            AlbumFilter::default(),
            None,
        );

        let ids = drain(&mut iter).await;
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        assert_eq!(ids.len(), 70);
    }

    #[tokio::test]
    async fn low_hit_ratio_switches_to_sweep_for_good() {
        // 25 new, then only 5 new (ratio 0.2 < 0.3)
        let random = ScriptedFetch::new(vec![
            batch(0..25),
            batch((0..20).chain(100..105)),
            batch(200..225),
        ]);
        let sweep = ScriptedFetch::new(vec![batch((0..20).chain(300..305)), Page::Items(vec![])]);
        let mut iter = RandomAlbumIter::new(
            sweep.fetch_fn(),
            random.fetch_fn(),
            AlbumFilter::default(),
            None,
        );

        let ids = drain(&mut iter).await;
        assert_eq!(random.calls(), vec![(0, 25), (0, 25)]);
        assert_eq!(sweep.calls(), vec![(0, 25), (25, 25)]);
        assert_eq!(ids.len(), 25 + 5 + 5);
        assert!(ids.ends_with(&[
            "al-300".to_string(),
            "al-301".to_string(),
            "al-302".to_string(),
            "al-303".to_string(),
            "al-304".to_string(),
        ]));
        assert!(iter.next_album().await.is_none());
    }

    #[tokio::test]
    async fn filtered_out_albums_still_count_as_hits() {
        // all 25 are new but only the even ones match
        let random = ScriptedFetch::new(vec![batch(0..25), batch(0..25)]);
        let sweep = ScriptedFetch::new(vec![]);
        let filter = AlbumFilter::new(AlbumFilterOptions {
            min_year: 2000,
            ..Default::default()
        });
        let mut iter = RandomAlbumIter::new(sweep.fetch_fn(), random.fetch_fn(), filter, None);

        let ids = drain(&mut iter).await;
        assert_eq!(ids.len(), 13);
        // the first batch kept sampling; the second (all repeats) switched
        assert_eq!(random.calls().len(), 2);
        assert_eq!(sweep.calls(), vec![(0, 25)]);
    }

    #[tokio::test]
    async fn random_fetch_error_ends_iteration_immediately() {
        let random = ScriptedFetch::new(vec![
            batch(0..25),
            Page::Fail(ServerError::Transport("timeout".into())),
        ]);
        let sweep = ScriptedFetch::new(vec![batch(0..50)]);
        let mut iter = RandomAlbumIter::new(
            sweep.fetch_fn(),
            random.fetch_fn(),
            AlbumFilter::default(),
            None,
        );

        assert_eq!(drain(&mut iter).await.len(), 25);
        assert!(sweep.calls().is_empty(), "sweep never reached");
        assert!(iter.next_album().await.is_none());
        assert_eq!(random.calls().len(), 2);
    }

    #[tokio::test]
    async fn sweep_fetch_error_is_treated_as_the_end() {
        let random = ScriptedFetch::new(vec![batch(0..5)]);
        let sweep = ScriptedFetch::new(vec![
            batch(0..25),
            Page::Fail(ServerError::from_status_code(500, "oops")),
            batch(25..50),
        ]);
        let mut iter = RandomAlbumIter::new(
            sweep.fetch_fn(),
            random.fetch_fn(),
            AlbumFilter::default(),
            None,
        );

        assert_eq!(drain(&mut iter).await.len(), 25);
        assert_eq!(sweep.calls(), vec![(0, 25), (25, 25)]);
        assert!(iter.next_album().await.is_none());
    }

    #[tokio::test]
    async fn exhaustion_releases_seen_set() {
        let random = ScriptedFetch::new(vec![batch(0..3)]);
        let sweep = ScriptedFetch::new(vec![]);
        let mut iter = RandomAlbumIter::new(
            sweep.fetch_fn(),
            random.fetch_fn(),
            AlbumFilter::default(),
            None,
        );

        assert_eq!(drain(&mut iter).await.len(), 3);
        assert!(iter.seen.is_empty());
        assert!(iter.done);
    }

    #[tokio::test]
    async fn prefetches_only_matching_new_albums() {
        let (prefetch, seen) = recording_prefetch();
        let random = ScriptedFetch::new(vec![batch(0..4)]);
        let sweep = ScriptedFetch::new(vec![batch(0..6)]);
        let filter = AlbumFilter::new(AlbumFilterOptions {
            max_year: 2000,
            ..Default::default()
        });
        let mut iter =
            RandomAlbumIter::new(sweep.fetch_fn(), random.fetch_fn(), filter, Some(prefetch));

        let ids = drain(&mut iter).await;
        assert_eq!(ids, vec!["al-1", "al-3", "al-5"]);
        assert_eq!(*seen.lock().unwrap(), vec!["cover-1", "cover-3", "cover-5"]);
    }
}
