//! Grace Codex site library.
//!
//! The public reference pages, the JSON API, accounts and the admin editor
//! live here as a library so the integration tests can drive the router
//! without a network socket.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod views;
