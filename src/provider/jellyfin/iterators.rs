use std::future::Future;

use anyhow::Context;
use chrono::Datelike;
use futures::FutureExt;

use crate::error::ServerError;
use crate::iterator::{
    AlbumIterator, ArtistIterator, FetchFn, RandomAlbumIter, TrackIterator, new_album_iterator,
    new_artist_iterator, new_track_iterator,
};
use crate::model::{Album, AlbumFilter, ArtistFilter, MediaFilter};
use crate::provider::MediaProvider;
use crate::{log_fetch_request, log_fetch_result};

use super::JellyfinMediaProvider;
use super::api::{Filter, ItemType, MIN_YEAR, Paging, QueryOpts, Sort, SortField, SortMode};
use super::convert::{to_album, to_artist, to_track};

pub const ALBUM_SORT_RECENTLY_ADDED: &str = "Recently Added";
pub const ALBUM_SORT_RANDOM: &str = "Random";
pub const ALBUM_SORT_TITLE_AZ: &str = "Title (A-Z)";
pub const ALBUM_SORT_ARTIST_AZ: &str = "Artist (A-Z)";
pub const ALBUM_SORT_YEAR_ASCENDING: &str = "Year (ascending)";
pub const ALBUM_SORT_YEAR_DESCENDING: &str = "Year (descending)";

pub const ARTIST_SORT_NAME_AZ: &str = "Name (A-Z)";

const ALBUM_SORT_ORDERS: &[&str] = &[
    ALBUM_SORT_RECENTLY_ADDED,
    ALBUM_SORT_RANDOM,
    ALBUM_SORT_TITLE_AZ,
    ALBUM_SORT_ARTIST_AZ,
    ALBUM_SORT_YEAR_ASCENDING,
    ALBUM_SORT_YEAR_DESCENDING,
];

const ARTIST_SORT_ORDERS: &[&str] = &[ARTIST_SORT_NAME_AZ];

/// Native sort for a named album order; unknown names keep the server default.
pub fn album_sort(sort_order: &str) -> Sort {
    match sort_order {
        ALBUM_SORT_RECENTLY_ADDED => Sort::new(SortField::DateCreated, SortMode::Descending),
        ALBUM_SORT_RANDOM => Sort {
            field: Some(SortField::Random),
            mode: None,
        },
        ALBUM_SORT_TITLE_AZ => Sort::new(SortField::SortName, SortMode::Ascending),
        ALBUM_SORT_ARTIST_AZ => Sort::new(SortField::AlbumArtist, SortMode::Ascending),
        ALBUM_SORT_YEAR_ASCENDING => Sort::new(SortField::ProductionYear, SortMode::Ascending),
        ALBUM_SORT_YEAR_DESCENDING => Sort::new(SortField::ProductionYear, SortMode::Descending),
        _ => Sort::default(),
    }
}

pub fn artist_sort(sort_order: &str) -> Sort {
    match sort_order {
        "" | ARTIST_SORT_NAME_AZ => Sort::new(SortField::SortName, SortMode::Ascending),
        _ => Sort::default(),
    }
}

/// Builds the server-side filter for `filter` and returns it together with a
/// copy of `filter` whose pushed-down constraints are cleared, so the client
/// does not apply them a second time. `filter` itself is left untouched; the
/// UI keeps showing it.
pub fn filter_from_album_filter(filter: &AlbumFilter) -> (Filter, AlbumFilter) {
    let mut native = Filter::default();
    let mut modified = filter.clone();
    let mut options = modified.options();

    if options.exclude_unfavorited {
        native.favorite = true;
        options.exclude_unfavorited = false;
    }

    let (min, max) = (options.min_year, options.max_year);
    if min > 0 || max > 0 {
        let from = if min > 0 { min } else { MIN_YEAR };
        let to = if max > 0 { max } else { chrono::Local::now().year() };
        // an empty range has no `Years` encoding; the client keeps the bounds
        if from <= to {
            native.year_range = Some((from, to));
            options.min_year = 0;
            options.max_year = 0;
        }
    }

    native.genres = std::mem::take(&mut options.genres);

    modified.set_options(options);
    (native, modified)
}

pub fn filter_from_artist_filter(filter: &ArtistFilter) -> (Filter, ArtistFilter) {
    let mut modified = filter.clone();
    let mut options = modified.options();
    let native = Filter {
        favorite: std::mem::take(&mut options.exclude_unfavorited),
        year_range: None,
        genres: std::mem::take(&mut options.genres),
    };
    modified.set_options(options);
    (native, modified)
}

/// Wraps a server query as a fetch function that logs each page and maps
/// raw records into domain objects.
fn fetcher<R, M, Q, Fut>(operation: &'static str, query: Q, convert: fn(R) -> M) -> FetchFn<M>
where
    Q: Fn(usize, usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<R>, ServerError>> + Send + 'static,
    R: Send + 'static,
    M: Send + 'static,
{
    Box::new(move |offset: usize, limit: usize| {
        let page = query(offset, limit);
        async move {
            log_fetch_request!(operation, offset, limit);
            let result = page.await;
            log_fetch_result!(operation, result);
            let items = result.with_context(|| format!("{operation} at offset {offset}"))?;
            anyhow::Ok(items.into_iter().map(convert).collect::<Vec<M>>())
        }
        .boxed()
    })
}

fn query_opts(sort: Sort, filter: &Filter, offset: usize, limit: usize) -> QueryOpts {
    QueryOpts {
        sort,
        filter: filter.clone(),
        paging: Paging {
            start_index: offset,
            limit,
        },
    }
}

impl JellyfinMediaProvider {
    fn album_fetcher(&self, sort: Sort, filter: Filter) -> FetchFn<Album> {
        let client = self.client.clone();
        fetcher(
            "get_albums",
            move |offset, limit| {
                let client = client.clone();
                let opts = query_opts(sort, &filter, offset, limit);
                async move { client.get_albums(opts).await }
            },
            to_album,
        )
    }
}

impl MediaProvider for JellyfinMediaProvider {
    fn album_sort_orders(&self) -> &'static [&'static str] {
        ALBUM_SORT_ORDERS
    }

    fn artist_sort_orders(&self) -> &'static [&'static str] {
        ARTIST_SORT_ORDERS
    }

    fn iterate_albums(&self, sort_order: &str, filter: &AlbumFilter) -> AlbumIterator {
        let sort = album_sort(sort_order);
        let (native, modified) = filter_from_album_filter(filter);
        tracing::debug!(sort_order, ?native, "Iterating albums");

        if sort_order == ALBUM_SORT_RANDOM {
            let sweep = self.album_fetcher(
                Sort::new(SortField::SortName, SortMode::Ascending),
                native.clone(),
            );
            let random = self.album_fetcher(sort, native);
            return Box::new(
                RandomAlbumIter::new(sweep, random, modified, self.prefetch_cover.clone())
                    .with_batch_size(self.browse.random_batch_size)
                    .with_min_hit_ratio(self.browse.random_min_hit_ratio)
                    .with_retry(self.browse.retry.clone()),
            );
        }

        let fetch = self.album_fetcher(sort, native);
        Box::new(
            new_album_iterator(fetch, modified, self.prefetch_cover.clone())
                .with_page_size(self.browse.page_size)
                .with_retry(self.browse.retry.clone()),
        )
    }

    fn search_albums(&self, query: &str, filter: &AlbumFilter) -> AlbumIterator {
        let client = self.client.clone();
        let query = query.to_string();
        let fetch = fetcher(
            "search_albums",
            move |offset, limit| {
                let client = client.clone();
                let query = query.clone();
                async move {
                    let paging = Paging {
                        start_index: offset,
                        limit,
                    };
                    client
                        .search(&query, ItemType::Album, paging)
                        .await
                        .map(|sr| sr.albums)
                }
            },
            to_album,
        );
        Box::new(
            new_album_iterator(fetch, filter.clone(), self.prefetch_cover.clone())
                .with_page_size(self.browse.page_size)
                .with_retry(self.browse.retry.clone()),
        )
    }

    fn iterate_artists(&self, sort_order: &str, filter: &ArtistFilter) -> ArtistIterator {
        let sort = artist_sort(sort_order);
        let (native, modified) = filter_from_artist_filter(filter);
        let client = self.client.clone();
        let fetch = fetcher(
            "get_album_artists",
            move |offset, limit| {
                let client = client.clone();
                let opts = query_opts(sort, &native, offset, limit);
                async move { client.get_album_artists(opts).await }
            },
            to_artist,
        );
        Box::new(
            new_artist_iterator(fetch, modified, self.prefetch_cover.clone())
                .with_page_size(self.browse.page_size)
                .with_retry(self.browse.retry.clone()),
        )
    }

    fn search_artists(&self, query: &str, filter: &ArtistFilter) -> ArtistIterator {
        let client = self.client.clone();
        let query = query.to_string();
        let fetch = fetcher(
            "search_artists",
            move |offset, limit| {
                let client = client.clone();
                let query = query.clone();
                async move {
                    let paging = Paging {
                        start_index: offset,
                        limit,
                    };
                    client
                        .search(&query, ItemType::Artist, paging)
                        .await
                        .map(|sr| sr.artists)
                }
            },
            to_artist,
        );
        Box::new(
            new_artist_iterator(fetch, filter.clone(), self.prefetch_cover.clone())
                .with_page_size(self.browse.page_size)
                .with_retry(self.browse.retry.clone()),
        )
    }

    fn iterate_tracks(&self, query: &str) -> TrackIterator {
        let client = self.client.clone();
        let fetch = if query.is_empty() {
            fetcher(
                "get_songs",
                move |offset, limit| {
                    let client = client.clone();
                    let opts = query_opts(Sort::default(), &Filter::default(), offset, limit);
                    async move { client.get_songs(opts).await }
                },
                to_track,
            )
        } else {
            let query = query.to_string();
            fetcher(
                "search_songs",
                move |offset, limit| {
                    let client = client.clone();
                    let query = query.clone();
                    async move {
                        let paging = Paging {
                            start_index: offset,
                            limit,
                        };
                        client
                            .search(&query, ItemType::Song, paging)
                            .await
                            .map(|sr| sr.songs)
                    }
                },
                to_track,
            )
        };
        Box::new(
            new_track_iterator(fetch, self.prefetch_cover.clone())
                .with_page_size(self.browse.page_size)
                .with_retry(self.browse.retry.clone()),
        )
    }
}
