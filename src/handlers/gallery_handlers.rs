//! Gallery page handler.
//!
//! Lists every stored blob, keeps the ones that are not `.json` sidecars, and
//! renders them with their captions. A missing or unparsable sidecar renders
//! the image without caption text — the image/metadata pair is written
//! non-transactionally, so the page must tolerate the gap.

use crate::{
    AppState,
    errors::AppError,
    models::metadata::{ImageMetadata, sidecar_name},
    services::blob_store::StoreError,
};
use axum::{extract::State, response::Html};
use maud::{DOCTYPE, Markup, PreEscaped, html};

/// One renderable gallery entry.
struct GalleryEntry {
    name: String,
    url: String,
    metadata: Option<ImageMetadata>,
}

/// `GET /` — render the gallery page.
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let blobs = state.store.list().await?;

    let mut entries = Vec::new();
    for blob in blobs.into_iter().filter(|b| !b.is_sidecar()) {
        let metadata = match state.store.get(&sidecar_name(&blob.name)).await {
            Ok((_, bytes)) => serde_json::from_slice(&bytes).ok(),
            Err(StoreError::BlobNotFound(_)) => None,
            Err(err) => return Err(err.into()),
        };
        entries.push(GalleryEntry {
            url: format!("/image/{}", blob.name),
            name: blob.name,
            metadata,
        });
    }

    Ok(Html(render_gallery(&entries).into_string()))
}

fn render_gallery(entries: &[GalleryEntry]) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Image Gallery" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                header {
                    h1 { "Image Gallery" }
                    (upload_form())
                }
                main.gallery {
                    @if entries.is_empty() {
                        p.empty { "No images yet. Upload one above." }
                    }
                    @for entry in entries {
                        (gallery_card(entry))
                    }
                }
            }
        }
    }
}

fn upload_form() -> Markup {
    html! {
        form action="/upload" method="post" enctype="multipart/form-data" {
            input type="file" name="image" accept=".png,.jpg,.jpeg,.gif" required;
            button type="submit" { "Upload" }
        }
    }
}

fn gallery_card(entry: &GalleryEntry) -> Markup {
    html! {
        figure.card {
            img src=(entry.url) alt=(entry.name) loading="lazy";
            figcaption {
                @if let Some(meta) = &entry.metadata {
                    strong { (meta.caption) }
                    p { (meta.description) }
                } @else {
                    strong { (entry.name) }
                }
            }
        }
    }
}

const STYLE: &str = "\
body { font-family: system-ui, sans-serif; margin: 2rem; background: #fafafa; }
header { display: flex; align-items: baseline; gap: 2rem; }
.gallery { display: grid; grid-template-columns: repeat(auto-fill, minmax(260px, 1fr)); gap: 1rem; margin-top: 1.5rem; }
.card { margin: 0; background: #fff; border: 1px solid #ddd; border-radius: 6px; overflow: hidden; }
.card img { width: 100%; height: auto; display: block; }
.card figcaption { padding: 0.5rem 0.75rem; }
.card p { margin: 0.25rem 0 0; color: #555; font-size: 0.9rem; }
.empty { color: #777; }
";
