//! services/client/src/bin/client.rs
//!
//! Diagnostic binary: wires the store against the configured backend, runs
//! initialization, and reports what the cache sees. Useful for checking an
//! environment before pointing a UI at it.

use std::sync::Arc;

use client_lib::{
    adapters::{new_token_store, SupabaseAuthAdapter, SupabaseRestAdapter, SupabaseStorageAdapter},
    config::Config,
    error::StoreError,
    store::AppStore,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), StoreError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Connecting to {}", config.supabase_url);

    // --- 2. Build the Remote Adapters ---
    let http = reqwest::Client::new();
    let tokens = new_token_store();
    let auth = Arc::new(SupabaseAuthAdapter::new(http.clone(), &config, tokens.clone()));
    let rest = Arc::new(SupabaseRestAdapter::new(http.clone(), &config, tokens.clone()));
    let storage = Arc::new(SupabaseStorageAdapter::new(http, &config, tokens));

    // --- 3. Build and Initialize the Store ---
    let store = AppStore::new(
        auth,
        rest.clone(),
        rest,
        storage,
        Some(config.prefs_path.clone()),
    );
    let user = store.init().await?;

    // --- 4. Report ---
    match user {
        Some(user) => {
            info!(user = %user.id, admin = user.is_admin, "session restored");
            info!(
                questions = store.questions().len(),
                entries = store.entries().len(),
                "cache loaded"
            );
        }
        None => info!("no persisted session; store is in the logged-out state"),
    }
    info!(language = store.language().as_str(), "preferences loaded");

    Ok(())
}
