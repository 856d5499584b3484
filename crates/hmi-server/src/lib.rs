//! HTTP and real-time API for the HMI backend.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Sensor ingestion** (`POST /api/v1/sensor/update`) feeding the
//!   state coordinator
//! - **Status and history** REST endpoints reading the live snapshot,
//!   the alert history, and the persisted reading log
//! - **`WebSocket` endpoint** (`/ws`) pushing every committed snapshot as
//!   an `hmi_update` event via [`tokio::sync::broadcast`]
//! - **Login** (`POST /api/login`) and an optional token gate
//!
//! # Architecture
//!
//! Handlers never touch the snapshot directly. Ingestion goes through
//! [`StateCoordinator`], which hands each commit to the [`BroadcastHub`]
//! and the persistence writer before the response is sent. Reads take a
//! cheap `Arc` clone of the latest committed snapshot.
//!
//! [`StateCoordinator`]: hmi_core::coordinator::StateCoordinator
//! [`BroadcastHub`]: hub::BroadcastHub

pub mod auth;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use hub::{BroadcastHub, HMI_UPDATE_EVENT, HmiUpdate};
pub use router::build_router;
pub use server::{ServerError, shutdown_signal, start_server};
pub use state::AppState;
