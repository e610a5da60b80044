//! Core domain types shared by every media provider

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Capability shared by everything an iterator can hand out.
///
/// Albums, artists and tracks have nothing else in common; the paging
/// machinery only needs a stable identity and the ID used to warm cover art.
pub trait MediaItem: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;
    fn cover_art_id(&self) -> &str;
}

/// An album as shown in grids and album pages
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Album {
    pub id: String,
    pub cover_art_id: String,
    pub name: String,
    pub artist_ids: Vec<String>,
    pub artist_names: Vec<String>,
    /// Release year, 0 when unknown
    pub year: i32,
    pub genres: Vec<String>,
    pub track_count: u32,
    pub duration: Duration,
    pub favorite: bool,
    pub date_added: Option<DateTime<Utc>>,
}

/// An album artist
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Artist {
    pub id: String,
    pub cover_art_id: String,
    pub name: String,
    pub album_count: u32,
    pub favorite: bool,
}

/// A single song
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Track {
    pub id: String,
    pub cover_art_id: String,
    pub title: String,
    pub album: String,
    pub album_id: String,
    pub artist_ids: Vec<String>,
    pub artist_names: Vec<String>,
    pub duration: Duration,
    pub track_number: u32,
    pub disc_number: u32,
    pub year: i32,
    pub genre: String,
    pub favorite: bool,
    pub play_count: u32,
}

macro_rules! impl_media_item {
    ($($ty:ty),*) => {
        $(
            impl MediaItem for $ty {
                fn id(&self) -> &str {
                    &self.id
                }

                fn cover_art_id(&self) -> &str {
                    &self.cover_art_id
                }
            }
        )*
    };
}

impl_media_item!(Album, Artist, Track);

impl Album {
    /// Primary artist for single-line display
    pub fn artist(&self) -> &str {
        self.artist_names.first().map(String::as_str).unwrap_or_default()
    }
}

impl Track {
    pub fn artist(&self) -> &str {
        self.artist_names.first().map(String::as_str).unwrap_or_default()
    }
}
