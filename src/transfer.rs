//!
//! src/transfer.rs
//!
//! Transfer orchestrator: validates the destination session,
//! fetches the source library, matches every track with bounded
//! concurrency, batch-appends the hits and assembles the summary
//!

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::TransferConfig;
use crate::errors::TransferError;
use crate::session::SessionStore;
use crate::types::{
    MatchResult, NotFoundTrack, PlaylistHandle, RefreshedToken,
    SourceLibrary, TransferSummary
};

/// Read-only view of the source catalog.
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    async fn fetch_liked_tracks(&self, token: &str) ->
        Result<SourceLibrary, TransferError>;

    /// Side-effect-free credential probe.
    async fn validate_token(&self, token: &str) -> bool;
}

/// Read/write surface of the destination catalog.
#[async_trait]
pub trait DestinationCatalog: Send + Sync {
    async fn current_user(&self, bearer: &str) -> Result<String, TransferError>;

    async fn create_playlist(&self, user_id: &str, bearer: &str) ->
        Result<PlaylistHandle, TransferError>;

    /// Must never fail the transfer; misses degrade to Unmatched.
    async fn search_track(&self, title: &str, artist: &str, bearer: &str) ->
        MatchResult;

    /// Caller pre-chunks track_ids to the API ceiling. A false return
    /// is logged by the caller and does not abort remaining chunks.
    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String],
        bearer: &str) -> bool;

    async fn refresh_access_token(&self, refresh_token: &str) ->
        Option<RefreshedToken>;
}

pub struct Transfer {
    source: Arc<dyn SourceCatalog>,
    destination: Arc<dyn DestinationCatalog>,
    sessions: Arc<SessionStore>,
    append_chunk: usize,
    search_concurrency: usize
}

impl Transfer {
    pub fn new(
        source: Arc<dyn SourceCatalog>,
        destination: Arc<dyn DestinationCatalog>,
        sessions: Arc<SessionStore>,
        cfg: &TransferConfig
    ) -> Self {
        Self {
            source,
            destination,
            sessions,
            append_chunk: cfg.append_chunk.clamp(1, 100),
            search_concurrency: cfg.search_concurrency.max(1)
        }
    }

    /// Runs one full transfer. Fatal errors abort immediately; search
    /// misses, dropped detail batches and failed append chunks degrade
    /// into the summary instead.
    pub async fn initiate_transfer(&self, source_token: &str, session_id: &str)
        -> Result<TransferSummary, TransferError> {

        let bearer = self.resolve_bearer(session_id).await?;

        info!("transfer.source.fetch");
        let library = self.source.fetch_liked_tracks(source_token).await?;
        if library.tracks.is_empty() {
            return Err(TransferError::NoTracks(
                "source liked-tracks collection is empty".to_string()
            ));
        }
        info!(tracks = library.tracks.len(), dropped = library.dropped,
            "transfer.source.done");

        let user_id = self.destination.current_user(&bearer).await?;
        let playlist = self.destination.create_playlist(&user_id, &bearer).await?;
        info!(playlist = %playlist.id, "transfer.playlist.created");

        let (found_ids, not_found) = self.match_all(&library, &bearer).await;
        info!(found = found_ids.len(), missed = not_found.len(),
            "transfer.matching.done");

        self.append_chunked(&playlist.id, &found_ids, &bearer).await;

        Ok( TransferSummary {
            playlist_url: playlist.url,
            playlist_id: playlist.id,
            total_tracks: library.tracks.len(),
            found_tracks: found_ids.len(),
            dropped_tracks: library.dropped,
            not_found
        })
    }

    /// Side-effect-free source credential probe.
    pub async fn check_source_credential(&self, source_token: &str) -> bool {
        self.source.validate_token(source_token).await
    }

    /// Validates the session and refreshes the stored access token in
    /// place when expired. At most one refresh attempt; a failed refresh
    /// aborts before any destination catalog call is made.
    async fn resolve_bearer(&self, session_id: &str) ->
        Result<String, TransferError> {

        let entry = self.sessions.get(session_id).await
            .ok_or_else(|| TransferError::Auth(
                "destination session not found".to_string()
            ))?;

        let mut session = entry.lock().await;
        if session.is_expired() {
            let refresh_token = session.refresh_token.clone()
                .ok_or_else(|| TransferError::Auth(
                    "session expired with no refresh token".to_string()
                ))?;

            warn!("transfer.session.refresh");
            let renewed = self.destination
                .refresh_access_token(&refresh_token)
                .await
                .ok_or_else(|| TransferError::Auth(
                    "destination token refresh rejected".to_string()
                ))?;

            session.access_token = renewed.access_token;
            session.expires_at =
                Utc::now() + chrono::Duration::seconds(renewed.expires_in);
        }

        Ok(session.access_token.clone())
    }

    /// Resolves every record to a MatchResult through a semaphore-bounded
    /// fan-out and partitions the verdicts in input order. Exactly one
    /// verdict per record: found + not_found always equals the total.
    async fn match_all(&self, library: &SourceLibrary, bearer: &str) ->
        (Vec<String>, Vec<NotFoundTrack>) {

        let semaphore = Arc::new(Semaphore::new(self.search_concurrency));
        let mut handles = Vec::with_capacity(library.tracks.len());

        for record in &library.tracks {
            let semaphore = semaphore.clone();
            let destination = self.destination.clone();
            let bearer = bearer.to_string();
            let title = record.title.clone();
            let artist = record.artist.clone();

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => return MatchResult::Unmatched
                };
                destination.search_track(&title, &artist, &bearer).await
            }));
        }

        let mut found_ids = Vec::new();
        let mut not_found = Vec::new();
        for (record, handle) in library.tracks.iter().zip(handles) {
            let verdict = match handle.await {
                Ok(v) => v,
                Err(e) => {
                    error!(error = %e, artist = %record.artist,
                        title = %record.title, "transfer.match.join");
                    MatchResult::Unmatched
                }
            };
            match verdict {
                MatchResult::Matched(candidate) => {
                    debug!(artist = %record.artist, title = %record.title,
                        id = %candidate.id, "transfer.match.hit");
                    found_ids.push(candidate.id);
                },
                MatchResult::Unmatched => {
                    debug!(artist = %record.artist, title = %record.title,
                        "transfer.match.miss");
                    not_found.push(NotFoundTrack {
                        artist: record.artist.clone(),
                        title: record.title.clone()
                    });
                }
            }
        }

        (found_ids, not_found)
    }

    /// Appends the matched ids in chunks bounded by the API ceiling.
    /// A failed chunk does not stop the remaining chunks; no rollback.
    async fn append_chunked(&self, playlist_id: &str, found_ids: &[String],
        bearer: &str) {

        for (index, chunk) in found_ids.chunks(self.append_chunk).enumerate() {
            let ok = self.destination
                .add_tracks(playlist_id, chunk, bearer)
                .await;
            if ok {
                info!(batch = index + 1, size = chunk.len(), "transfer.append");
            } else {
                error!(batch = index + 1, size = chunk.len(),
                    "transfer.append.failed");
            }
        }
    }
}
