//! Core types for Grace Codex.
//!
//! Content categories and their schemas, validated submissions, and
//! type-safe wrappers for identifiers and account fields.

pub mod category;
pub mod content;
pub mod draft;
pub mod id;
pub mod status;
pub mod username;

pub use category::{Category, FieldKind, FieldSpec, GroupKind, UnknownSlug};
pub use content::{ContentGroup, ContentItem};
pub use draft::{GroupChange, ItemDraft, ValidationErrors};
pub use id::*;
pub use status::*;
pub use username::{Username, UsernameError};
