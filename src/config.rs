//!
//! src/config.rs
//!
//! Environment-driven configuration for both catalog services,
//! the http layer, the matcher and the session store
//!
//!

use url::Url;
use std::time;
use crate::TransferError;
use crate::matcher::MatchPolicy;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 8000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 16;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

/// Constants for the transfer pipeline. Both batch ceilings are
/// API-imposed maxima (100 items per request on either service).
pub const SEARCH_LIMIT: u32 = 5;
pub const APPEND_CHUNK: usize = 100;
pub const DETAIL_BATCH: usize = 100;
pub const SEARCH_CONCURRENCY: usize = 4;
pub const SESSION_TTL_SECS: u64 = 6 * 3600;

/// Wrapper over env::var to return an invalid enviroment var error
fn env_check(s: &str) -> Result<String, TransferError> {
    match std::env::var(s) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(TransferError::Config(format!("{s} was not set"))),
    }
}

/// Ensures that url is https
fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

fn ensure_host(url: &Url, expected_host: &str) -> Result<(), String> {
    match url.host_str() {
        Some(h) if h.eq_ignore_ascii_case(expected_host) => Ok(()),
        Some(h) => Err(
            format!("Unexpected host for {url} (got {h}, expected {expected_host})")
        ),
        None => Err(format!("URL missing host: {url}"))
    }
}

fn ensure_trailing_slash(url: &mut Url) {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
}

fn env_to_uint(s: &str, default: u64) -> u64 {
    match std::env::var(s) {
        Ok(v) => v.parse::<u64>().unwrap_or(default),
        Err(_) => default
    }
}

/// Configuration for the source catalog (Yandex Music)
#[derive(Debug, Clone)]
pub struct YandexConfig {
    pub base_url: Url
}

fn build_yandex() -> Result<YandexConfig, TransferError> {
    let base_url = std::env::var("YANDEX_API_BASE")
        .unwrap_or_else(|_| "https://api.music.yandex.net/".to_string());

    let mut base_url = Url::parse(&base_url)
        .map_err(|e| TransferError::Config(
            format!("YANDEX_API_BASE invalid {e}")
        ))?;

    ensure_https(&base_url)
        .map_err(TransferError::Config)?;
    ensure_host(&base_url, "api.music.yandex.net")
        .map_err(TransferError::Config)?;
    ensure_trailing_slash(&mut base_url);

    Ok( YandexConfig { base_url } )
}

/// Configuration the destination catalog (Spotify) expects
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: Url,
    pub api_base: Url,
}

fn build_spotify() -> Result<SpotifyConfig, TransferError> {
    let client_id     = env_check("SPOTIFY_CLIENT_ID")?;
    let client_secret = env_check("SPOTIFY_CLIENT_SECRET")?;

    // form urls
    let token_url = std::env::var("SPOTIFY_TOKEN_URL")
        .unwrap_or_else(|_| "https://accounts.spotify.com/api/token".to_string());

    let api_base  = std::env::var("SPOTIFY_API_BASE")
        .unwrap_or_else(|_| "https://api.spotify.com/v1/".to_string());

    let token_url = Url::parse(&token_url)
        .map_err(|_| TransferError::Config(
            "SPOTIFY_TOKEN_URL invalid".to_string()
        ))?;

    let mut api_base  = Url::parse(&api_base)
        .map_err(|_| TransferError::Config(
            "SPOTIFY_API_BASE invalid".to_string()
        ))?;

    // ensure valid https and hostname for both urls
    ensure_https(&token_url).map_err(TransferError::Config)?;
    ensure_https(&api_base).map_err(TransferError::Config)?;
    ensure_host(&token_url, "accounts.spotify.com")
        .map_err(TransferError::Config)?;
    ensure_host(&api_base, "api.spotify.com")
        .map_err(TransferError::Config)?;
    ensure_trailing_slash(&mut api_base);

    Ok( SpotifyConfig { client_id, client_secret, token_url, api_base } )
}

///
/// Configuration for Http timeouts, pools, etc.
///
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS
        }
    }
}

fn build_http() -> HttpConfig {
    let mut http = HttpConfig::default();
    http.timeout = time::Duration::from_millis(
        env_to_uint("HTTP_TIMEOUT_MS", HTTP_TIMEOUT)
    );
    http
}

///
/// Configuration for the transfer pipeline itself: playlist naming,
/// batch ceilings and matcher policy
///
#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub playlist_name: String,
    pub playlist_description: String,
    pub search_limit: u32,        // candidates requested per search
    pub append_chunk: usize,      // ids per playlist-append call, <= 100
    pub detail_batch: usize,      // ids per source detail lookup, <= 100
    pub search_concurrency: usize,
    pub match_policy: MatchPolicy
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            playlist_name: "Яндекс Музыка – Мои лайки".to_string(),
            playlist_description: "Импортировано из Яндекс Музыки".to_string(),
            search_limit: SEARCH_LIMIT,
            append_chunk: APPEND_CHUNK,
            detail_batch: DETAIL_BATCH,
            search_concurrency: SEARCH_CONCURRENCY,
            match_policy: MatchPolicy::FirstResultFallback
        }
    }
}

fn build_transfer() -> TransferConfig {
    let mut transfer = TransferConfig::default();

    if let Ok(name) = std::env::var("PLAYLIST_NAME") {
        if !name.trim().is_empty() {
            transfer.playlist_name = name;
        }
    }
    if std::env::var("MATCH_POLICY").ok().as_deref() == Some("confident") {
        transfer.match_policy = MatchPolicy::ConfidentOnly;
    }
    transfer.search_concurrency =
        env_to_uint("SEARCH_CONCURRENCY", SEARCH_CONCURRENCY as u64) as usize;

    transfer
}

///
/// Configuration for the session store
///
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl: time::Duration
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl: time::Duration::from_secs(SESSION_TTL_SECS) }
    }
}

fn build_session() -> SessionConfig {
    SessionConfig {
        ttl: time::Duration::from_secs(
            env_to_uint("SESSION_TTL_SECS", SESSION_TTL_SECS)
        )
    }
}

///
/// Configuration for Logger
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool,
    pub include_span_events: bool,
    pub capture_error_sources: bool
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,likes_transfer=debug,reqwest=warn".to_string(),
            format: LogFormat::Json,
            with_ansi: true,
            include_file_line: true,
            include_target: true,
            include_span_events: true,
            capture_error_sources: true
        }
    }
}

///
/// AppConfig which holds everything needed by the fetch module
/// and the orchestrator
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub yandex: YandexConfig,
    pub spotify: SpotifyConfig,
    pub http: HttpConfig,
    pub transfer: TransferConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, TransferError> {
    dotenvy::dotenv().ok();

    let yandex   = build_yandex()?;
    let spotify  = build_spotify()?;
    let http     = build_http();
    let transfer = build_transfer();
    let session  = build_session();
    let logging  = LoggingConfig::default();

    Ok( AppConfig { yandex, spotify, http, transfer, session, logging } )
}
