//! # Direct Line Token Broker
//!
//! Validates an inbound OIDC bearer token, derives the caller's user id from
//! its claims and exchanges the server-held Direct Line secret for a
//! per-user session token. Also serves the web chat's static assets.
//!
//! Modules:
//! - `config`: immutable service configuration, loading and checks
//! - `auth`: bearer validation against the identity provider's keys
//! - `broker`: session token generation at the gateway
//! - `server`: axum router, static files, bootstrap
//! - `observability`: prometheus metrics

pub mod auth;
pub mod broker;
pub mod config;
pub mod observability;
pub mod server;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::config::settings::ServiceConfig;
