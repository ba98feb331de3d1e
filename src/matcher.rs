//!
//! src/matcher.rs
//!
//! Fuzzy candidate selection for destination search results.
//! Metadata between catalogs is inconsistent (romanization, remix
//! tags, multi-artist ordering), so selection favors substring
//! containment over strict equality.
//!

use crate::types::{CandidateTrack, MatchResult};

/// How to resolve a candidate list where nothing satisfies both
/// predicates. FirstResultFallback reproduces the original service's
/// always-match-something behavior; ConfidentOnly reports a miss instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    FirstResultFallback,
    ConfidentOnly
}

/// Strips any parenthetical or bracketed suffix from a title,
/// e.g. remix or live annotations.
pub fn clean_title(title: &str) -> &str {
    let cut = title.split('(').next().unwrap_or(title);
    let cut = cut.split('[').next().unwrap_or(cut);
    cut.trim()
}

/// Builds the structured search query sent to the destination index.
/// Falls back to a bare title query when no artist is available.
pub fn build_search_query(title: &str, artist: &str) -> String {
    let mut parts: Vec<String> = Vec::new();

    let clean = clean_title(title);
    if !clean.is_empty() {
        parts.push(format!("track:{clean}"));
    }

    let first_artist = artist.split(',').next().unwrap_or("").trim();
    if !first_artist.is_empty() {
        parts.push(format!("artist:{first_artist}"));
    }

    if parts.is_empty() {
        title.to_string()
    } else {
        parts.join(" ")
    }
}

fn title_matches(query_title: &str, candidate_name: &str) -> bool {
    let q = clean_title(query_title).to_lowercase();
    let c = candidate_name.to_lowercase();
    !q.is_empty() && (c.contains(&q) || q.contains(&c))
}

/// Cross-product check: any comma-separated segment of the query artist
/// against any candidate artist, containment in either direction.
fn artist_matches(query_artist: &str, candidate_artists: &[String]) -> bool {
    let query = query_artist.to_lowercase();
    query.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .any(|segment| {
            candidate_artists.iter().any(|artist| {
                let artist = artist.to_lowercase();
                !artist.is_empty()
                    && (artist.contains(segment) || segment.contains(artist.as_str()))
            })
        })
}

/// Selects the best candidate for a query track, in the search result's
/// original ranking order. Returns Unmatched only for an empty candidate
/// list, or under ConfidentOnly when no candidate satisfies both predicates.
pub fn select_match(
    title: &str,
    artist: &str,
    candidates: Vec<CandidateTrack>,
    policy: MatchPolicy
) -> MatchResult {
    if candidates.is_empty() {
        return MatchResult::Unmatched;
    }

    for candidate in &candidates {
        if title_matches(title, &candidate.name)
            && artist_matches(artist, &candidate.artists) {
            return MatchResult::Matched(candidate.clone());
        }
    }

    match policy {
        MatchPolicy::FirstResultFallback => {
            tracing::debug!(
                artist = %artist, title = %title,
                "match.fallback.first_result"
            );
            MatchResult::Matched(candidates.into_iter().next().unwrap())
        },
        MatchPolicy::ConfidentOnly => MatchResult::Unmatched
    }
}
