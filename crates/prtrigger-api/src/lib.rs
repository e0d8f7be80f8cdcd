//! HTTP server for the pull-request build trigger scheduler.
//!
//! Receives pull-request webhooks, exposes the forced trigger and the
//! automatic-build switch, and talks to the CI servers.

pub mod bootstrap;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;

pub use state::{AppState, Storage};
