//!
//! src/spotify.rs
//!
//! Destination catalog client: current-user lookup, playlist
//! creation, track search (delegating selection to the matcher)
//! and batched playlist appends
//!

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::config::TransferConfig;
use crate::errors::TransferError;
use crate::fetch::SpotifyClient;
use crate::matcher::{self, MatchPolicy};
use crate::transfer::DestinationCatalog;
use crate::types::{CandidateTrack, MatchResult, PlaylistHandle, RefreshedToken};

///
/// Wire shapes
///

#[derive(Debug, Deserialize)]
struct MeResponse {
    id: Option<String>
}

#[derive(Debug, Deserialize)]
struct PlaylistResponse {
    id: Option<String>,
    #[serde(default)]
    external_urls: ExternalUrls
}

#[derive(Debug, Deserialize, Default)]
struct ExternalUrls {
    spotify: Option<String>
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    tracks: SearchTracks
}

#[derive(Debug, Deserialize, Default)]
struct SearchTracks {
    #[serde(default)]
    items: Vec<SearchItem>
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: Option<String>,
    uri: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    artists: Vec<SearchArtist>
}

#[derive(Debug, Deserialize)]
struct SearchArtist {
    #[serde(default)]
    name: String
}

impl SearchItem {
    fn into_candidate(self) -> Option<CandidateTrack> {
        Some(CandidateTrack {
            id: self.id?,
            uri: self.uri?,
            name: self.name,
            artists: self.artists.into_iter().map(|a| a.name).collect()
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default = "default_expiry")]
    expires_in: i64
}

fn default_expiry() -> i64 { 3600 }

pub fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{track_id}")
}

pub struct SpotifyCatalog {
    client: SpotifyClient,
    playlist_name: String,
    playlist_description: String,
    search_limit: u32,
    match_policy: MatchPolicy
}

impl SpotifyCatalog {
    pub fn new(client: SpotifyClient, cfg: &TransferConfig) -> Self {
        Self {
            client,
            playlist_name: cfg.playlist_name.clone(),
            playlist_description: cfg.playlist_description.clone(),
            search_limit: cfg.search_limit,
            match_policy: cfg.match_policy
        }
    }

    async fn search_candidates(&self, query: &str, bearer: &str) ->
        Result<Vec<CandidateTrack>, TransferError> {

        let response = self.client
            .search(query, self.search_limit, bearer)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Upstream(
                format!("search failed: {status}")
            ));
        }

        let body: SearchResponse = response.json().await?;
        Ok(
            body.tracks.items.into_iter()
                .filter_map(SearchItem::into_candidate)
                .collect()
        )
    }
}

#[async_trait]
impl DestinationCatalog for SpotifyCatalog {
    async fn current_user(&self, bearer: &str) -> Result<String, TransferError> {
        let response = self.client.me(bearer).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Auth(
                format!("current user lookup failed: {status}")
            ));
        }

        let body: MeResponse = response.json().await?;
        body.id.ok_or_else(|| TransferError::Auth(
            "current user carried no id".to_string()
        ))
    }

    async fn create_playlist(&self, user_id: &str, bearer: &str) ->
        Result<PlaylistHandle, TransferError> {

        let response = self.client
            .create_playlist(
                user_id,
                &self.playlist_name,
                &self.playlist_description,
                bearer
            )
            .send()
            .await?;
        let status = response.status();
        if !(status.as_u16() == 200 || status.as_u16() == 201) {
            return Err(TransferError::Upstream(
                format!("playlist creation failed: {status}")
            ));
        }

        let body: PlaylistResponse = response.json().await?;
        let id = body.id.ok_or_else(|| TransferError::Upstream(
            "playlist response carried no id".to_string()
        ))?;
        let url = body.external_urls.spotify.unwrap_or_default();

        Ok( PlaylistHandle { id, url } )
    }

    /// Search misses and transport failures are never fatal to the
    /// transfer; anything going wrong here degrades to Unmatched.
    async fn search_track(&self, title: &str, artist: &str, bearer: &str) ->
        MatchResult {

        let query = matcher::build_search_query(title, artist);
        if query.is_empty() {
            return MatchResult::Unmatched;
        }

        let candidates = match self.search_candidates(&query, bearer).await {
            Ok(c) => c,
            Err(e) => {
                warn!(artist = %artist, title = %title, error = %e, "spotify.search");
                return MatchResult::Unmatched;
            }
        };

        debug!(
            artist = %artist, title = %title,
            candidates = candidates.len(), "spotify.search"
        );
        matcher::select_match(title, artist, candidates, self.match_policy)
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String], bearer: &str)
        -> bool {

        let uris: Vec<String> = track_ids.iter()
            .map(|id| track_uri(id))
            .collect();

        let response = match self.client
            .add_tracks(playlist_id, &uris, bearer)
            .send()
            .await {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, chunk = track_ids.len(), "spotify.append.send");
                return false;
            }
        };
        let status = response.status();
        if !(status.as_u16() == 200 || status.as_u16() == 201) {
            error!(status = %status, chunk = track_ids.len(), "spotify.append.status");
            return false;
        }
        true
    }

    async fn refresh_access_token(&self, refresh_token: &str) ->
        Option<RefreshedToken> {

        let response = match self.client.refresh_request(refresh_token).send().await {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "spotify.refresh.send");
                return None;
            }
        };
        if !response.status().is_success() {
            error!(status = %response.status(), "spotify.refresh.status");
            return None;
        }

        let body: TokenResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                error!(error = %e, "spotify.refresh.parse");
                return None;
            }
        };

        body.access_token.map(|access_token| RefreshedToken {
            access_token,
            expires_in: body.expires_in
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_ids_convert_to_destination_uri_scheme() {
        assert_eq!(track_uri("6GtOsEzNUhJghrIf6UTbRV"),
            "spotify:track:6GtOsEzNUhJghrIf6UTbRV");
    }

    #[test]
    fn search_payload_decodes_into_candidates() {
        let body: SearchResponse = serde_json::from_str(r#"{
            "tracks": { "items": [
                {
                    "id": "abc",
                    "uri": "spotify:track:abc",
                    "name": "Bad Romance",
                    "artists": [ { "name": "Lady Gaga" } ]
                },
                { "name": "no id, skipped" }
            ]}
        }"#).unwrap();

        let candidates: Vec<CandidateTrack> = body.tracks.items.into_iter()
            .filter_map(SearchItem::into_candidate)
            .collect();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "abc");
        assert_eq!(candidates[0].artists, vec!["Lady Gaga".to_string()]);
    }

    #[test]
    fn empty_search_payload_decodes_to_no_candidates() {
        let body: SearchResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(body.tracks.items.is_empty());
    }

    #[test]
    fn token_payload_defaults_expiry_when_absent() {
        let body: TokenResponse = serde_json::from_str(r#"{
            "access_token": "fresh"
        }"#).unwrap();
        assert_eq!(body.expires_in, 3600);
        assert_eq!(body.access_token.as_deref(), Some("fresh"));
    }
}
