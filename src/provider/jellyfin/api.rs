//! Jellyfin query shapes and raw item records
//!
//! Only the subset of `BaseItemDto` the client displays is modelled. The HTTP
//! client itself lives with the application; it implements [`JellyfinApi`]
//! and can use [`QueryOpts::to_query_params`] and [`decode_items`] to talk
//! to `/Items`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::ServerError;

/// Lowest year used when a year range only has an upper bound
pub const MIN_YEAR: i32 = 1900;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortField {
    DateCreated,
    Random,
    SortName,
    AlbumArtist,
    ProductionYear,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::DateCreated => "DateCreated",
            SortField::Random => "Random",
            SortField::SortName => "SortName",
            SortField::AlbumArtist => "AlbumArtist",
            SortField::ProductionYear => "ProductionYear",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortMode {
    Ascending,
    Descending,
}

impl SortMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::Ascending => "Ascending",
            SortMode::Descending => "Descending",
        }
    }
}

/// Sort parameters. The default leaves ordering to the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sort {
    pub field: Option<SortField>,
    pub mode: Option<SortMode>,
}

impl Sort {
    pub fn new(field: SortField, mode: SortMode) -> Self {
        Self {
            field: Some(field),
            mode: Some(mode),
        }
    }
}

/// Constraints evaluated by the server
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filter {
    pub favorite: bool,
    /// Inclusive `(from, to)` years
    pub year_range: Option<(i32, i32)>,
    pub genres: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Paging {
    pub start_index: usize,
    pub limit: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryOpts {
    pub sort: Sort,
    pub filter: Filter,
    pub paging: Paging,
}

impl QueryOpts {
    /// Query string parameters for the `/Items` endpoint
    pub fn to_query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("StartIndex", self.paging.start_index.to_string()),
            ("Limit", self.paging.limit.to_string()),
        ];

        if let Some(field) = self.sort.field {
            let sort_by = match field {
                SortField::Random | SortField::SortName => field.as_str().to_string(),
                // tie-break so pages stay stable
                _ => format!("{},SortName", field.as_str()),
            };
            params.push(("SortBy", sort_by));
        }
        if let Some(mode) = self.sort.mode {
            params.push(("SortOrder", mode.as_str().to_string()));
        }

        if self.filter.favorite {
            params.push(("Filters", "IsFavorite".to_string()));
        }
        // an empty `Years` value would lift the constraint entirely
        if let Some((from, to)) = self.filter.year_range.filter(|(from, to)| from <= to) {
            let years: Vec<String> = (from..=to).map(|y| y.to_string()).collect();
            params.push(("Years", years.join(",")));
        }
        if !self.filter.genres.is_empty() {
            params.push(("Genres", self.filter.genres.join("|")));
        }
        params
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemType {
    Album,
    Artist,
    Song,
}

impl ItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Album => "MusicAlbum",
            ItemType::Artist => "MusicArtist",
            ItemType::Song => "Audio",
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NameIdPair {
    pub name: String,
    pub id: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserData {
    pub is_favorite: bool,
    pub play_count: u32,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawAlbum {
    pub id: String,
    pub name: String,
    pub album_artists: Vec<NameIdPair>,
    pub production_year: Option<i32>,
    pub genres: Vec<String>,
    pub child_count: Option<u32>,
    /// 100ns units
    pub run_time_ticks: Option<i64>,
    pub user_data: UserData,
    pub date_created: Option<DateTime<Utc>>,
    pub image_tags: HashMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawArtist {
    pub id: String,
    pub name: String,
    pub album_count: Option<u32>,
    pub user_data: UserData,
    pub image_tags: HashMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawSong {
    pub id: String,
    pub name: String,
    pub album: String,
    pub album_id: String,
    pub artist_items: Vec<NameIdPair>,
    pub run_time_ticks: Option<i64>,
    pub index_number: Option<u32>,
    pub parent_index_number: Option<u32>,
    pub production_year: Option<i32>,
    pub genres: Vec<String>,
    pub user_data: UserData,
}

/// Response of the search endpoint, split by item type
#[derive(Clone, Debug, Default)]
pub struct SearchResult {
    pub albums: Vec<RawAlbum>,
    pub artists: Vec<RawArtist>,
    pub songs: Vec<RawSong>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemsResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// Decodes an `/Items` response body.
pub fn decode_items<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, ServerError> {
    let response: ItemsResponse<T> = serde_json::from_str(body)?;
    Ok(response.items)
}

/// Query capability of a Jellyfin server
#[async_trait]
pub trait JellyfinApi: Send + Sync {
    async fn get_albums(&self, opts: QueryOpts) -> Result<Vec<RawAlbum>, ServerError>;

    async fn get_album_artists(&self, opts: QueryOpts) -> Result<Vec<RawArtist>, ServerError>;

    async fn get_songs(&self, opts: QueryOpts) -> Result<Vec<RawSong>, ServerError>;

    async fn search(
        &self,
        query: &str,
        item_type: ItemType,
        paging: Paging,
    ) -> Result<SearchResult, ServerError>;
}
