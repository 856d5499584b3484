//! State coordination and alert evaluation for the HMI backend.
//!
//! This crate owns the live plant snapshot and the rules that derive
//! alerts from it. It performs no I/O of its own: persistence and
//! real-time fan-out plug in as [`CommitListener`]s.
//!
//! # Modules
//!
//! - [`alerts`] -- Threshold evaluation producing the active-alert list.
//! - [`config`] -- Configuration loading from `hmi-config.yaml` into
//!   strongly-typed structs.
//! - [`coordinator`] -- [`StateCoordinator`], the single writer of the
//!   snapshot.
//! - [`history`] -- Bounded log of alert raises, clears, and
//!   acknowledgements.
//!
//! [`CommitListener`]: coordinator::CommitListener
//! [`StateCoordinator`]: coordinator::StateCoordinator

pub mod alerts;
pub mod config;
pub mod coordinator;
pub mod history;
