//! Provider module - per-server adapters
//!
//! A provider knows one server dialect: which sort orders it offers, how to
//! express them and a filter as a paged query, and how to map the records it
//! gets back. The iterators it returns are protocol-agnostic.

pub mod jellyfin;

use crate::iterator::{AlbumIterator, ArtistIterator, TrackIterator};
use crate::model::{AlbumFilter, ArtistFilter};

pub use jellyfin::JellyfinMediaProvider;

pub trait MediaProvider: Send + Sync {
    /// Album sort order names, for display in the UI
    fn album_sort_orders(&self) -> &'static [&'static str];

    fn artist_sort_orders(&self) -> &'static [&'static str];

    /// Browse all albums. Unknown sort orders use the server's default order.
    fn iterate_albums(&self, sort_order: &str, filter: &AlbumFilter) -> AlbumIterator;

    fn search_albums(&self, query: &str, filter: &AlbumFilter) -> AlbumIterator;

    /// Browse album artists. An empty sort order selects the provider default.
    fn iterate_artists(&self, sort_order: &str, filter: &ArtistFilter) -> ArtistIterator;

    /// Search artists by name. Only the favorites constraint of `filter` is
    /// applied; genre constraints need server-side browsing.
    fn search_artists(&self, query: &str, filter: &ArtistFilter) -> ArtistIterator;

    /// All tracks when `query` is empty, otherwise matching tracks.
    fn iterate_tracks(&self, query: &str) -> TrackIterator;
}
