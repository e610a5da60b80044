//! Client-side inclusion rules for browse results
//!
//! Filters for different media types share no data, only behavior. Each one
//! exposes its options so a provider can copy a filter, strip the constraints
//! its server already applies, and hand the remainder to the iterator.

use std::fmt;
use std::marker::PhantomData;

use super::types::{Album, Artist};

/// Behavior every media filter provides
pub trait MediaFilter<M>: Clone + Send + Sync + 'static {
    type Options: Clone + fmt::Debug;

    /// True when no constraint is active, so iterators can skip filtering.
    fn is_nil(&self) -> bool;

    fn matches(&self, item: &M) -> bool;

    fn options(&self) -> Self::Options;

    fn set_options(&mut self, options: Self::Options);
}

/// Options of an [`AlbumFilter`]. Zero values mean "no constraint".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlbumFilterOptions {
    pub exclude_unfavorited: bool,
    pub min_year: i32,
    pub max_year: i32,
    pub genres: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlbumFilter {
    options: AlbumFilterOptions,
}

impl AlbumFilter {
    pub fn new(options: AlbumFilterOptions) -> Self {
        Self { options }
    }
}

impl MediaFilter<Album> for AlbumFilter {
    type Options = AlbumFilterOptions;

    fn is_nil(&self) -> bool {
        let o = &self.options;
        !o.exclude_unfavorited && o.min_year == 0 && o.max_year == 0 && o.genres.is_empty()
    }

    fn matches(&self, album: &Album) -> bool {
        let o = &self.options;
        if o.exclude_unfavorited && !album.favorite {
            return false;
        }
        if o.min_year > 0 && album.year < o.min_year {
            return false;
        }
        if o.max_year > 0 && album.year > o.max_year {
            return false;
        }
        o.genres.is_empty() || any_genre_matches(&o.genres, &album.genres)
    }

    fn options(&self) -> AlbumFilterOptions {
        self.options.clone()
    }

    fn set_options(&mut self, options: AlbumFilterOptions) {
        self.options = options;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArtistFilterOptions {
    pub exclude_unfavorited: bool,
    pub genres: Vec<String>,
}

/// Filter for artist listings. Artists carry no genre data of their own, so
/// a genre constraint can only be honored by a server that supports it; on
/// the client it is ignored and does not make the filter non-nil.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArtistFilter {
    options: ArtistFilterOptions,
}

impl ArtistFilter {
    pub fn new(options: ArtistFilterOptions) -> Self {
        Self { options }
    }
}

impl MediaFilter<Artist> for ArtistFilter {
    type Options = ArtistFilterOptions;

    fn is_nil(&self) -> bool {
        !self.options.exclude_unfavorited
    }

    fn matches(&self, artist: &Artist) -> bool {
        !self.options.exclude_unfavorited || artist.favorite
    }

    fn options(&self) -> ArtistFilterOptions {
        self.options.clone()
    }

    fn set_options(&mut self, options: ArtistFilterOptions) {
        self.options = options;
    }
}

/// Null object filter for media types with no filter concept (tracks).
pub struct NilFilter<M> {
    _marker: PhantomData<fn() -> M>,
}

impl<M> NilFilter<M> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<M> Default for NilFilter<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for NilFilter<M> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for NilFilter<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NilFilter")
    }
}

impl<M: 'static> MediaFilter<M> for NilFilter<M> {
    type Options = ();

    fn is_nil(&self) -> bool {
        true
    }

    fn matches(&self, _item: &M) -> bool {
        true
    }

    fn options(&self) {}

    fn set_options(&mut self, _options: ()) {}
}

fn any_genre_matches(wanted: &[String], have: &[String]) -> bool {
    wanted
        .iter()
        .any(|w| have.iter().any(|h| h.eq_ignore_ascii_case(w)))
}
