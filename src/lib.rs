//! Image gallery service with AI-generated captions.
//!
//! Uploads are resized to fit 800x600, stored in the blob store, and described
//! by a vision model; the `{description, caption}` reply is persisted as a
//! `<basename>.json` sidecar blob next to the image.

use std::sync::Arc;

pub mod config;
pub mod errors;
pub mod handlers;
pub mod imaging;
pub mod models;
pub mod routes;
pub mod services;

use services::blob_store::BlobStore;
use services::captioner::Captioner;

/// Shared application state handed to every handler via `Router::with_state`.
///
/// Both clients are constructed once at startup; the captioner sits behind a
/// trait object so tests can substitute a stub model.
#[derive(Clone)]
pub struct AppState {
    pub store: BlobStore,
    pub captioner: Arc<dyn Captioner>,
}
