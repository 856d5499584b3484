//! Shared application state for the HTTP API.
//!
//! [`AppState`] bundles the state coordinator (the only writer of the live
//! snapshot), the broadcast hub that `WebSocket` clients subscribe to, the
//! entity store used for reading queries, and the login session set.

use std::sync::Arc;

use hmi_core::config::AuthConfig;
use hmi_core::coordinator::StateCoordinator;
use hmi_db::SqliteStore;

use crate::auth::SessionStore;
use crate::hub::BroadcastHub;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Serializes every snapshot mutation.
    pub coordinator: Arc<StateCoordinator>,
    /// Fan-out of committed snapshots to `WebSocket` clients.
    pub hub: BroadcastHub,
    /// Entity store, read by the readings query.
    pub store: SqliteStore,
    /// Tokens issued by `POST /api/login`.
    pub sessions: SessionStore,
    /// Login credentials and token gate switch.
    pub auth: AuthConfig,
}

impl AppState {
    /// Assemble application state with an empty session set.
    ///
    /// `hub` should be the same hub registered as a listener on
    /// `coordinator`, otherwise subscribers never see a commit.
    pub fn new(
        coordinator: Arc<StateCoordinator>,
        hub: BroadcastHub,
        store: SqliteStore,
        auth: AuthConfig,
    ) -> Self {
        Self {
            coordinator,
            hub,
            store,
            sessions: SessionStore::new(),
            auth,
        }
    }
}
