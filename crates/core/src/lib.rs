//! Grace Codex Core - Shared types library.
//!
//! This crate provides common types used across all Grace Codex components:
//! - `site` - Public reference site and in-browser content editor
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure validation - no I/O, no
//! database access, no HTTP. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, usernames, roles, content categories and
//!   submission validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
