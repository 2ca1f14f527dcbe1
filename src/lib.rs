//! Library crate for pick-a-number, exposing modules for binaries and integration tests.

/// Configuration file and environment overrides.
pub mod config;
/// Game persistence.
pub mod dao;
/// Forms and view models exchanged over HTTP.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP routes.
pub mod routes;
/// Application services.
pub mod services;
/// Shared state and the game domain.
pub mod state;
/// HTML rendering.
pub mod views;
