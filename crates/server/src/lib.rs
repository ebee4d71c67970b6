#![deny(warnings)]

pub mod error;
pub mod routes;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use emotisense_core::{config::UploadPolicy, pipeline::Analyzer};
use std::path::PathBuf;
use std::sync::Arc;

pub use error::ApiError;

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub upload: UploadPolicy,
    /// Uploaded videos are written here for the duration of one request.
    pub scratch_dir: PathBuf,
}

impl AppState {
    pub fn new(analyzer: Analyzer, upload: UploadPolicy, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            upload,
            scratch_dir: scratch_dir.into(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let analyze = post(routes::analyze).layer(DefaultBodyLimit::max(state.upload.max_bytes));

    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/analyze", analyze)
        .with_state(state)
}
