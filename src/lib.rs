//! Stateless per-request authentication gate for a bearer-token protected HTTP API.
//!
//! Request flow: CORS (preflight short-circuit) → route classification →
//! bearer extraction → token validation → principal lookup → access decision.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod repos;
pub mod security;
pub mod services;
pub mod state;
