//! Core data models for the gallery.
//!
//! `Blob` maps to the metadata table via `sqlx::FromRow`; `ImageMetadata` is
//! the sidecar record serialized next to each uploaded image.

pub mod blob;
pub mod metadata;
