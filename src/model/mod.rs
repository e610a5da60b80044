//! Model module - domain types shared by providers, iterators and the UI
//!
//! - `types`: albums, artists, tracks and the `MediaItem` capability
//! - `filter`: client-side inclusion rules
//! - `cache`: cover art cache fed by iterator prefetching

mod cache;
mod filter;
mod types;

pub use cache::{CoverArtCache, CoverArtLoader};
pub use filter::{
    AlbumFilter, AlbumFilterOptions, ArtistFilter, ArtistFilterOptions, MediaFilter, NilFilter,
};
pub use types::{Album, Artist, MediaItem, Track};
