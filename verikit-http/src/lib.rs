//! HTTP surface for the Verikit verification engine.
//!
//! Exposes the on-chain payment and LNURL-auth flows as a small JSON API,
//! plus the wallet-facing LUD-04 callback. All state lives in the shared
//! [`VerificationRegistry`]; the HTTP layer owns no challenge logic.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use verikit_engine::{LnurlAuthChallengeService, OnchainVerifier, VerificationRegistry};
use verikit_lib::chain::ChainFactProvider;
use verikit_lib::config::{LnurlServerConfig, VerificationConfig};

pub mod config;
pub mod error;
pub mod handlers;
pub mod server;

pub use config::AppConfig;

/// Shared handles the handlers work with.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<VerificationRegistry>,
    pub onchain: Arc<OnchainVerifier>,
    pub lnauth: Arc<LnurlAuthChallengeService>,
}

impl AppState {
    /// Wire up the engine over the given chain backend.
    pub fn new(
        chain: Arc<dyn ChainFactProvider>,
        lnurl: LnurlServerConfig,
        verification: &VerificationConfig,
    ) -> Self {
        let registry = Arc::new(VerificationRegistry::new());
        Self {
            onchain: Arc::new(OnchainVerifier::new(
                registry.clone(),
                chain,
                verification,
            )),
            lnauth: Arc::new(LnurlAuthChallengeService::new(
                registry.clone(),
                lnurl,
                verification,
            )),
            registry,
        }
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/verify/address/challenge",
            post(handlers::issue_address_challenge),
        )
        .route("/verify/address", post(handlers::submit_txid))
        .route("/verify/address/status", get(handlers::address_status))
        .route(
            "/verify/lnauth/challenge",
            get(handlers::issue_lnauth_challenge),
        )
        .route("/verify/lnauth/callback", get(handlers::lnauth_callback))
        .route(
            "/verify/lnauth/signature",
            post(handlers::submit_lnauth_signature),
        )
        .route("/verify/lnauth/status", get(handlers::lnauth_status))
        .route("/health", get(handlers::health))
        .with_state(state)
}
