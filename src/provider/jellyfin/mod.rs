//! Jellyfin media provider
//!
//! - `api`: query shapes, raw records and the server capability trait
//! - `convert`: raw records to domain objects
//! - `iterators`: sort and filter translation, browse/search iterators

mod api;
mod convert;
mod iterators;

use std::sync::Arc;

use crate::config::BrowseConfig;
use crate::iterator::PrefetchFn;

pub use api::{
    Filter, ItemType, JellyfinApi, MIN_YEAR, NameIdPair, Paging, QueryOpts, RawAlbum, RawArtist,
    RawSong, SearchResult, Sort, SortField, SortMode, UserData, decode_items,
};
pub use iterators::{
    ALBUM_SORT_ARTIST_AZ, ALBUM_SORT_RANDOM, ALBUM_SORT_RECENTLY_ADDED, ALBUM_SORT_TITLE_AZ,
    ALBUM_SORT_YEAR_ASCENDING, ALBUM_SORT_YEAR_DESCENDING, ARTIST_SORT_NAME_AZ, album_sort,
    artist_sort, filter_from_album_filter, filter_from_artist_filter,
};

/// Media provider backed by a Jellyfin server
#[derive(Clone)]
pub struct JellyfinMediaProvider {
    client: Arc<dyn JellyfinApi>,
    browse: BrowseConfig,
    prefetch_cover: Option<PrefetchFn>,
}

impl JellyfinMediaProvider {
    pub fn new(client: Arc<dyn JellyfinApi>, browse: BrowseConfig) -> Self {
        Self {
            client,
            browse,
            prefetch_cover: None,
        }
    }

    /// Sink notified with the cover art ID of every item an iterator is
    /// about to hand out.
    pub fn set_prefetch_cover_fn(&mut self, prefetch: PrefetchFn) {
        self.prefetch_cover = Some(prefetch);
    }
}
