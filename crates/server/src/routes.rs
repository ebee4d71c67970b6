use crate::{ApiError, AppState};
use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        Multipart, State,
    },
    response::Html,
    Json,
};
use emotisense_core::{config::SERVICE_NAME, pipeline::AnalysisReport, util::scratch_file};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

const LOG_TARGET: &str = "server::routes";

/// Multipart field carrying the uploaded video.
pub const VIDEO_FIELD: &str = "video";

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Serialize)]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub report: AnalysisReport,
    pub success: bool,
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": SERVICE_NAME }))
}

pub async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!(target: LOG_TARGET, error = %e, "request is not multipart");
        ApiError::MissingVideo
    })?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        // Plain text parts never count as the upload, whatever their name.
        if field.name() != Some(VIDEO_FIELD) || field.file_name().is_none() {
            continue;
        }
        upload = Some(store_upload(&state, field).await?);
        break;
    }
    let upload = upload.ok_or(ApiError::MissingVideo)?;

    // The task owns the upload: it outlives a client that hangs up, and a panic inside the
    // analysis surfaces as a JoinError. The file is removed when the task finishes either way.
    let analyzer = Arc::clone(&state.analyzer);
    let outcome = tokio::spawn(async move { analyzer.analyze(&upload).await }).await;

    let report = match outcome {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => {
            tracing::error!(target: LOG_TARGET, error = %e, "analysis failed");
            return Err(ApiError::Analysis(e.to_string()));
        }
        Err(e) => {
            tracing::error!(target: LOG_TARGET, error = %e, "analysis task aborted");
            return Err(ApiError::Analysis(format!("analysis task aborted: {e}")));
        }
    };

    Ok(Json(AnalyzeResponse {
        report,
        success: true,
    }))
}

/// Validate the upload's filename and stream it into a fresh scratch file.
async fn store_upload(state: &AppState, mut field: Field<'_>) -> Result<TempPath, ApiError> {
    let filename = field.file_name().unwrap_or_default().to_owned();
    if filename.is_empty() {
        return Err(ApiError::NoFileSelected);
    }
    if !state.upload.allows(&filename) {
        tracing::info!(target: LOG_TARGET, filename = %filename, "rejected upload");
        return Err(ApiError::UnsupportedFormat);
    }

    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let (file, scratch) = scratch_file(&state.scratch_dir, &filename, &extension)?.into_parts();

    let mut file = tokio::fs::File::from_std(file);
    let mut written = 0usize;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len();
    }
    file.flush().await?;

    tracing::info!(
        target: LOG_TARGET,
        filename = %filename,
        path = %scratch.display(),
        bytes = written,
        "stored upload"
    );
    Ok(scratch)
}
