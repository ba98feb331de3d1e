//!
//! src/types.rs
//!
//! Data model shared between the catalog clients, the matcher
//! and the transfer orchestrator
//!
//!

use serde::{Deserialize, Serialize};

/// One liked track as fetched from the source catalog. Carries no unique
/// identity beyond its textual fields; duplicates are processed independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub title: String,
    pub artist: String,   // comma-joined when multiple artists
    pub album: String     // empty when unknown
}

/// The full source library plus the count of liked references whose
/// detail batch failed and were silently dropped.
#[derive(Debug, Clone, Default)]
pub struct SourceLibrary {
    pub tracks: Vec<TrackRecord>,
    pub dropped: usize
}

/// One destination search hit, alive only for the duration of matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTrack {
    pub id: String,
    pub uri: String,
    pub name: String,
    pub artists: Vec<String>
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    Matched(CandidateTrack),
    Unmatched
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistHandle {
    pub id: String,
    pub url: String
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundTrack {
    pub artist: String,
    pub title: String
}

/// Returned to the caller once per transfer, never persisted.
/// Invariant: found_tracks + not_found.len() == total_tracks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferSummary {
    pub playlist_url: String,
    pub playlist_id: String,
    pub total_tracks: usize,
    pub found_tracks: usize,
    pub dropped_tracks: usize,
    pub not_found: Vec<NotFoundTrack>
}

/// A successful refresh-token exchange against the destination service.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in: i64
}
