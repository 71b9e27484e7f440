//! Provider records to output records.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::api::dto::{FullArtist, FullTrack, Image, SimpleAlbum};
use crate::models::{Album, Artist, Track};

const SPOTIFY_URL_KEY: &str = "spotify";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Unknown,
    Artist,
    Album,
    Track,
}

/// Image URL used when the provider returns no images, per record kind.
static DEFAULT_IMAGE_URL: Lazy<HashMap<ItemKind, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (ItemKind::Unknown, ""),
        (ItemKind::Artist, ""),
        (ItemKind::Album, ""),
        (ItemKind::Track, ""),
    ])
});

pub fn image_url(images: &[Image], kind: ItemKind) -> String {
    if let Some(first) = images.first() {
        return first.url.clone();
    }
    DEFAULT_IMAGE_URL
        .get(&kind)
        .or_else(|| DEFAULT_IMAGE_URL.get(&ItemKind::Unknown))
        .copied()
        .unwrap_or_default()
        .to_string()
}

fn spotify_url(urls: &HashMap<String, String>) -> String {
    urls.get(SPOTIFY_URL_KEY).cloned().unwrap_or_default()
}

pub fn map_album(album: &SimpleAlbum) -> Album {
    Album {
        id: album.id.clone(),
        name: album.name.clone(),
        release_date: album.release_date.clone(),
        spotify_url: spotify_url(&album.external_urls),
        image_url: image_url(&album.images, ItemKind::Album),
    }
}

pub fn map_artist(artist: &FullArtist) -> Artist {
    Artist {
        id: artist.id.clone(),
        name: artist.name.clone(),
        spotify_url: spotify_url(&artist.external_urls),
        image_url: image_url(&artist.images, ItemKind::Artist),
        genres: artist.genres.clone(),
    }
}

/// Map a raw track and its resolved artists. Tracks carry no artwork of their
/// own, so the album's images stand in for the track image.
pub fn map_track(track: &FullTrack, artists: &[FullArtist]) -> Track {
    Track {
        id: track.id.clone(),
        name: track.name.clone(),
        spotify_url: spotify_url(&track.external_urls),
        image_url: image_url(&track.album.images, ItemKind::Track),
        duration_ms: track.duration_ms,
        preview_url: track.preview_url.clone().unwrap_or_default(),
        popularity: track.popularity,
        album: map_album(&track.album),
        artists: artists.iter().map(map_artist).collect(),
    }
}
