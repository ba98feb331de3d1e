//!
//! src/yandex.rs
//!
//! Source catalog client: resolves the authenticated account,
//! lists the liked-track references and hydrates them into
//! TrackRecords via batched detail lookups
//!

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::TransferConfig;
use crate::errors::TransferError;
use crate::fetch::YandexClient;
use crate::transfer::SourceCatalog;
use crate::types::{SourceLibrary, TrackRecord};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

///
/// Wire shapes. The likes payload has drifted between a library-wrapped
/// and a flat form, and reference ids appear under two key names as
/// either number or string; all of that is absorbed here so the rest
/// of the pipeline sees one shape.
///

#[derive(Debug, Deserialize)]
struct AccountStatusResponse {
    result: Option<AccountResult>
}

#[derive(Debug, Deserialize)]
struct AccountResult {
    account: Option<Account>
}

#[derive(Debug, Deserialize)]
struct Account {
    uid: Option<IdValue>
}

#[derive(Debug, Deserialize)]
struct LikesResponse {
    result: Option<LikesPayload>
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LikesPayload {
    Library { library: LikedLibrary },
    Flat {
        #[serde(default)]
        tracks: Vec<TrackRef>
    }
}

#[derive(Debug, Deserialize)]
struct LikedLibrary {
    #[serde(default)]
    tracks: Vec<TrackRef>
}

#[derive(Debug, Deserialize)]
struct TrackRef {
    id: Option<IdValue>,
    #[serde(rename = "trackId")]
    track_id: Option<IdValue>
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdValue {
    Num(u64),
    Text(String)
}

impl IdValue {
    fn as_string(&self) -> String {
        match self {
            IdValue::Num(n) => n.to_string(),
            IdValue::Text(s) => s.clone()
        }
    }
}

impl TrackRef {
    fn resolve(&self) -> Option<String> {
        self.id.as_ref()
            .or(self.track_id.as_ref())
            .map(IdValue::as_string)
    }
}

#[derive(Debug, Deserialize)]
struct TrackDetailsResponse {
    #[serde(default)]
    result: Vec<Option<TrackDetail>>
}

#[derive(Debug, Deserialize)]
struct TrackDetail {
    #[serde(default)]
    title: String,
    #[serde(default)]
    artists: Vec<ArtistRef>,
    #[serde(default)]
    albums: Vec<AlbumRef>
}

#[derive(Debug, Deserialize)]
struct ArtistRef {
    #[serde(default)]
    name: String
}

#[derive(Debug, Deserialize)]
struct AlbumRef {
    #[serde(default)]
    title: String
}

impl TrackDetail {
    fn into_record(self) -> TrackRecord {
        let names: Vec<String> = self.artists.into_iter()
            .map(|a| a.name)
            .filter(|n| !n.is_empty())
            .collect();
        let artist = if names.is_empty() {
            UNKNOWN_ARTIST.to_string()
        } else {
            names.join(", ")
        };
        let album = self.albums.into_iter()
            .next()
            .map(|a| a.title)
            .unwrap_or_default();

        TrackRecord { title: self.title, artist, album }
    }
}

fn extract_refs(response: LikesResponse) -> Vec<String> {
    let refs = match response.result {
        Some(LikesPayload::Library { library }) => library.tracks,
        Some(LikesPayload::Flat { tracks }) => tracks,
        None => Vec::new()
    };
    refs.iter().filter_map(TrackRef::resolve).collect()
}

pub struct YandexMusic {
    client: YandexClient,
    detail_batch: usize
}

impl YandexMusic {
    pub fn new(client: YandexClient, cfg: &TransferConfig) -> Self {
        Self {
            client,
            detail_batch: cfg.detail_batch.clamp(1, 100)
        }
    }

    async fn resolve_uid(&self, token: &str) -> Result<String, TransferError> {
        let response = self.client.account_status(token).send().await?;
        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(TransferError::Auth(
                format!("source credential rejected: {status}")
            ));
        }
        if !status.is_success() {
            return Err(TransferError::Upstream(
                format!("account status failed: {status}")
            ));
        }

        let body: AccountStatusResponse = response.json().await?;
        body.result
            .and_then(|r| r.account)
            .and_then(|a| a.uid)
            .map(|uid| uid.as_string())
            .ok_or_else(|| TransferError::Upstream(
                "account status carried no uid".to_string()
            ))
    }

    async fn fetch_refs(&self, uid: &str, token: &str) ->
        Result<Vec<String>, TransferError> {

        let response = self.client.liked_tracks(uid, token).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Upstream(
                format!("likes listing failed: {status}")
            ));
        }

        let body: LikesResponse = response.json().await?;
        Ok(extract_refs(body))
    }

    /// Hydrates one chunk of reference ids; a failing or empty batch is
    /// a non-fatal partial failure reported through the dropped counter.
    async fn fetch_batch(&self, ids: &[String], token: &str) ->
        Option<Vec<TrackRecord>> {

        let response = match self.client.track_details(ids, token).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, batch = ids.len(), "yandex.batch.send");
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(status = %response.status(), batch = ids.len(), "yandex.batch.status");
            return None;
        }

        let body: TrackDetailsResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, batch = ids.len(), "yandex.batch.parse");
                return None;
            }
        };
        if body.result.is_empty() {
            warn!(batch = ids.len(), "yandex.batch.empty");
            return None;
        }

        Some(
            body.result.into_iter()
                .flatten()
                .map(TrackDetail::into_record)
                .collect()
        )
    }
}

#[async_trait]
impl SourceCatalog for YandexMusic {
    async fn fetch_liked_tracks(&self, token: &str) ->
        Result<SourceLibrary, TransferError> {

        let uid = self.resolve_uid(token).await?;
        let refs = self.fetch_refs(&uid, token).await?;
        info!(refs = refs.len(), "yandex.likes");

        if refs.is_empty() {
            return Ok(SourceLibrary::default());
        }

        let mut library = SourceLibrary::default();
        for chunk in refs.chunks(self.detail_batch) {
            match self.fetch_batch(chunk, token).await {
                Some(records) => library.tracks.extend(records),
                None => library.dropped += chunk.len()
            }
        }

        info!(
            tracks = library.tracks.len(),
            dropped = library.dropped,
            "yandex.hydrated"
        );
        Ok(library)
    }

    async fn validate_token(&self, token: &str) -> bool {
        match self.client.account_status(token).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs_from(raw: &str) -> Vec<String> {
        let response: LikesResponse = serde_json::from_str(raw).unwrap();
        extract_refs(response)
    }

    #[test]
    fn library_wrapped_likes_payload_decodes() {
        let refs = refs_from(r#"{
            "result": { "library": { "tracks": [
                { "id": 123 },
                { "trackId": "456" }
            ]}}
        }"#);
        assert_eq!(refs, vec!["123", "456"]);
    }

    #[test]
    fn flat_likes_payload_decodes() {
        let refs = refs_from(r#"{
            "result": { "tracks": [ { "id": "abc" } ] }
        }"#);
        assert_eq!(refs, vec!["abc"]);
    }

    #[test]
    fn missing_payload_yields_no_refs_instead_of_erroring() {
        assert!(refs_from(r#"{ "result": null }"#).is_empty());
        assert!(refs_from(r#"{}"#).is_empty());
    }

    #[test]
    fn refs_without_any_id_key_are_skipped() {
        let refs = refs_from(r#"{
            "result": { "tracks": [
                { "albumId": 9 },
                { "id": 7 }
            ]}
        }"#);
        assert_eq!(refs, vec!["7"]);
    }

    #[test]
    fn id_key_takes_precedence_over_track_id() {
        let refs = refs_from(r#"{
            "result": { "tracks": [ { "id": 1, "trackId": 2 } ] }
        }"#);
        assert_eq!(refs, vec!["1"]);
    }

    #[test]
    fn detail_maps_multi_artist_to_comma_join() {
        let detail: TrackDetail = serde_json::from_str(r#"{
            "title": "Telephone",
            "artists": [ { "name": "Lady Gaga" }, { "name": "Beyoncé" } ],
            "albums": [ { "title": "The Fame Monster" } ]
        }"#).unwrap();
        let record = detail.into_record();
        assert_eq!(record.title, "Telephone");
        assert_eq!(record.artist, "Lady Gaga, Beyoncé");
        assert_eq!(record.album, "The Fame Monster");
    }

    #[test]
    fn detail_without_artists_uses_placeholder() {
        let detail: TrackDetail = serde_json::from_str(r#"{
            "title": "Interlude",
            "artists": [],
            "albums": []
        }"#).unwrap();
        let record = detail.into_record();
        assert_eq!(record.artist, UNKNOWN_ARTIST);
        assert_eq!(record.album, "");
    }

    #[test]
    fn detail_with_missing_fields_defaults_to_empty_strings() {
        let detail: TrackDetail = serde_json::from_str(r#"{}"#).unwrap();
        let record = detail.into_record();
        assert_eq!(record.title, "");
        assert_eq!(record.artist, UNKNOWN_ARTIST);
        assert_eq!(record.album, "");
    }

    #[test]
    fn null_entries_in_detail_result_are_dropped() {
        let body: TrackDetailsResponse = serde_json::from_str(r#"{
            "result": [ null, { "title": "Kept" } ]
        }"#).unwrap();
        let records: Vec<TrackRecord> = body.result.into_iter()
            .flatten()
            .map(TrackDetail::into_record)
            .collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Kept");
    }
}
