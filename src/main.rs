//!
//! src/main.rs
//!
//! Main source file: wires configuration, logging, the catalog
//! clients and the session store, then runs one transfer from
//! env-supplied credentials and prints the summary
//!
//!

mod config;
mod errors;
mod logging;

mod fetch;
mod types;
mod matcher;
mod session;
mod yandex;
mod spotify;
mod transfer;

use std::sync::Arc;
use std::time::Duration;

use crate::errors::TransferError;
use crate::session::{Session, SessionStore};
use crate::transfer::Transfer;

const SWEEP_PERIOD: Duration = Duration::from_secs(300);

fn env_required(key: &str) -> Result<String, TransferError> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(TransferError::Config(format!("{key} was not set")))
    }
}

#[tokio::main]
async fn main() -> Result<(), TransferError> {
    let cfgs = config::load_config()?;
    let _logger = logging::init_logging(&cfgs.logging)?;

    tracing::info!(
        service = "likes-transfer",
        version = %env!("CARGO_PKG_VERSION"),
        "starting"
    );

    let yandex_client  = fetch::YandexClient::new(&cfgs.http, &cfgs.yandex)?;
    let spotify_client = fetch::SpotifyClient::new(&cfgs.http, &cfgs.spotify)?;

    let source: Arc<dyn transfer::SourceCatalog> =
        Arc::new(yandex::YandexMusic::new(yandex_client, &cfgs.transfer));
    let destination: Arc<dyn transfer::DestinationCatalog> =
        Arc::new(spotify::SpotifyCatalog::new(spotify_client, &cfgs.transfer));

    let sessions = Arc::new(SessionStore::new(cfgs.session.ttl));
    tokio::spawn(sessions.clone().run_sweeper(SWEEP_PERIOD));

    // One-shot mode: the web layer normally seeds sessions from its
    // OAuth callback; here the tokens come straight from the environment.
    let yandex_token  = env_required("YANDEX_TOKEN")?;
    let access_token  = env_required("SPOTIFY_ACCESS_TOKEN")?;
    let refresh_token = std::env::var("SPOTIFY_REFRESH_TOKEN").ok();
    let expires_in = std::env::var("SPOTIFY_EXPIRES_IN")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(3600);

    let session_id = sessions
        .insert(Session::new(access_token, refresh_token, expires_in))
        .await;

    let pipeline = Transfer::new(source, destination, sessions, &cfgs.transfer);

    if !pipeline.check_source_credential(&yandex_token).await {
        return Err(TransferError::Auth(
            "source credential probe failed".to_string()
        ));
    }

    let summary = pipeline.initiate_transfer(&yandex_token, &session_id).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
