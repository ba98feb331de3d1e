//!
//! src/fetch.rs
//!
//! Defines methods for hitting endpoints on both catalog services
//! and returning unparsed request builders; tokens are supplied
//! per call since every request is scoped to one user's credential
//!

use url::Url;
use reqwest::{Client, header, redirect, RequestBuilder};
use crate::config::{HttpConfig, SpotifyConfig, YandexConfig};
use crate::TransferError;

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

fn client_with_headers(http: &HttpConfig, headers: header::HeaderMap) ->
    Result<Client, TransferError> {
    client_helper(http)
        .default_headers(headers)
        .build()
        .map_err(|e| TransferError::Http(format!("build client: {e}")))
}

pub fn base_client(http: &HttpConfig) -> Result<Client, TransferError> {
    let mut h = header::HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
    client_with_headers(http, h)
}

#[derive(Clone, Debug)]
pub struct YandexClient {
    pub http: Client,
    pub base: Url
}

impl YandexClient {
    pub fn new(http_config: &HttpConfig, cfg: &YandexConfig) ->
        Result<Self, TransferError> {

        let http = base_client(http_config)?;
        Ok( Self {
            http,
            base: cfg.base_url.clone()
        })
    }

    fn oauth(token: &str) -> String {
        format!("OAuth {token}")
    }

    /// GET /account/status
    pub fn account_status(&self, token: &str) -> RequestBuilder {
        let url = self.base.join("account/status").unwrap();
        self.http.get(url)
            .header(header::AUTHORIZATION, Self::oauth(token))
    }

    /// GET /users/{uid}/likes/tracks
    pub fn liked_tracks(&self, uid: &str, token: &str) -> RequestBuilder {
        let url = self.base.join(&format!("users/{uid}/likes/tracks")).unwrap();
        self.http.get(url)
            .header(header::AUTHORIZATION, Self::oauth(token))
    }

    /// POST /tracks with {"track-ids": [...]}
    pub fn track_details(&self, ids: &[String], token: &str) -> RequestBuilder {
        let url = self.base.join("tracks").unwrap();
        self.http.post(url)
            .header(header::AUTHORIZATION, Self::oauth(token))
            .json(&serde_json::json!({ "track-ids": ids }))
    }
}

#[derive(Clone, Debug)]
pub struct SpotifyClient {
    pub http: Client,
    pub cfg: SpotifyConfig
}

impl SpotifyClient {
    pub fn new(http_config: &HttpConfig, cfg: &SpotifyConfig) ->
        Result<Self, TransferError> {

        let http = base_client(http_config)?;
        Ok( Self {
            http,
            cfg: cfg.clone()
        })
    }

    /// POST {token_url} with grant_type=refresh_token, HTTP basic auth
    pub fn refresh_request(&self, refresh_token: &str) -> RequestBuilder {
        self.http
            .post(self.cfg.token_url.clone())
            .basic_auth(&self.cfg.client_id, Some(&self.cfg.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token)
            ])
    }

    /// GET /v1/me
    pub fn me(&self, bearer: &str) -> RequestBuilder {
        let url = self.cfg.api_base.join("me").unwrap();
        self.http.get(url).bearer_auth(bearer)
    }

    /// GET /v1/search?type=track&q=...&limit=
    pub fn search(&self, query: &str, limit: u32, bearer: &str) -> RequestBuilder {
        let url = self.cfg.api_base.join("search").unwrap();
        self.http.get(url).bearer_auth(bearer).query(&[
            ("type", "track"),
            ("q", query),
            ("limit", &limit.to_string())
        ])
    }

    /// POST /v1/users/{user_id}/playlists
    pub fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        bearer: &str
    ) -> RequestBuilder {
        let url = self.cfg.api_base
            .join(&format!("users/{user_id}/playlists")).unwrap();
        self.http.post(url).bearer_auth(bearer).json(&serde_json::json!({
            "name": name,
            "description": description,
            "public": true
        }))
    }

    /// POST /v1/playlists/{playlist_id}/tracks with {"uris": [...]}
    pub fn add_tracks(
        &self,
        playlist_id: &str,
        uris: &[String],
        bearer: &str
    ) -> RequestBuilder {
        let url = self.cfg.api_base
            .join(&format!("playlists/{playlist_id}/tracks")).unwrap();
        self.http.post(url).bearer_auth(bearer)
            .json(&serde_json::json!({ "uris": uris }))
    }
}
