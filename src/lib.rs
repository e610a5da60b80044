//! Media browsing core for a desktop music client.
//!
//! Providers adapt a media server's paged list and search endpoints into
//! lazily fetched, filterable iterators of albums, artists and tracks:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use supersonic_rs::MediaIterator;
//! # use supersonic_rs::config::Config;
//! # use supersonic_rs::model::AlbumFilter;
//! # use supersonic_rs::provider::{JellyfinMediaProvider, MediaProvider, jellyfin::JellyfinApi};
//! # async fn example(client: Arc<dyn JellyfinApi>) {
//! let config = Config::default();
//! let provider = JellyfinMediaProvider::new(client, config.browse.clone());
//!
//! let sort_order = &config.albums_page.sort_order;
//! let mut albums = provider.iterate_albums(sort_order, &AlbumFilter::default());
//! while let Some(album) = albums.next().await {
//!     println!("{} - {}", album.artist(), album.name);
//! }
//! # }
//! ```

pub mod config;
pub mod error;
pub mod iterator;
pub mod logging;
pub mod model;
pub mod provider;

pub use error::ServerError;
pub use iterator::{AlbumIterator, ArtistIterator, MediaIterator, TrackIterator};
pub use provider::{JellyfinMediaProvider, MediaProvider};
