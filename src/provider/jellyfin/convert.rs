//! Raw Jellyfin records to domain objects

use std::time::Duration;

use crate::model::{Album, Artist, Track};

use super::api::{RawAlbum, RawArtist, RawSong};

fn ticks_to_duration(ticks: Option<i64>) -> Duration {
    let ticks = ticks.unwrap_or_default().max(0) as u64;
    Duration::from_nanos(ticks.saturating_mul(100))
}

// Jellyfin serves images by item ID
pub(crate) fn to_album(al: RawAlbum) -> Album {
    let (artist_ids, artist_names) = al.album_artists.into_iter().map(|a| (a.id, a.name)).unzip();
    Album {
        cover_art_id: al.id.clone(),
        id: al.id,
        name: al.name,
        artist_ids,
        artist_names,
        year: al.production_year.unwrap_or_default(),
        genres: al.genres,
        track_count: al.child_count.unwrap_or_default(),
        duration: ticks_to_duration(al.run_time_ticks),
        favorite: al.user_data.is_favorite,
        date_added: al.date_created,
    }
}

pub(crate) fn to_artist(ar: RawArtist) -> Artist {
    Artist {
        cover_art_id: ar.id.clone(),
        id: ar.id,
        name: ar.name,
        album_count: ar.album_count.unwrap_or_default(),
        favorite: ar.user_data.is_favorite,
    }
}

pub(crate) fn to_track(s: RawSong) -> Track {
    let (artist_ids, artist_names) = s.artist_items.into_iter().map(|a| (a.id, a.name)).unzip();
    Track {
        id: s.id,
        // songs show their album's art
        cover_art_id: s.album_id.clone(),
        title: s.name,
        album: s.album,
        album_id: s.album_id,
        artist_ids,
        artist_names,
        duration: ticks_to_duration(s.run_time_ticks),
        track_number: s.index_number.unwrap_or_default(),
        disc_number: s.parent_index_number.unwrap_or(1),
        year: s.production_year.unwrap_or_default(),
        genre: s.genres.into_iter().next().unwrap_or_default(),
        favorite: s.user_data.is_favorite,
        play_count: s.user_data.play_count,
    }
}
