//! Defines the gallery's HTTP routes.
//!
//! - `GET  /`                 — HTML gallery page
//! - `POST /upload`           — multipart image upload (field `image`)
//! - `GET  /image/{filename}` — resized image bytes
//! - `GET  /healthz`          — liveness
//! - `GET  /readyz`           — readiness (DB + disk checks)

use crate::{
    AppState,
    handlers::{
        gallery_handlers::index,
        health_handlers::{healthz, readyz},
        image_handlers::{get_image, upload},
    },
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for all gallery routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // gallery routes
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/image/{filename}", get(get_image))
}
