//! Route handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::app::asset_catalog::AssetCatalog;
use crate::app::{ConcatRequest, SplitRequest, ThumbnailRequest};
use crate::domain::errors::DomainError;
use crate::domain::model::TimeRange;
use crate::engine::BatchSlot;
use crate::server::error::ApiError;
use crate::server::ServerState;

const UPLOAD_FIELD: &str = "file";

#[derive(Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub url: String,
}

#[derive(Serialize)]
pub struct ThumbnailsResponse {
    pub thumbs: Vec<String>,
    pub folder: String,
    pub duration: f64,
    pub slots: Vec<BatchSlot<String>>,
    pub summary: String,
}

#[derive(Serialize)]
pub struct SplitResponse {
    pub segments: Vec<String>,
    pub ranges: Vec<TimeRange>,
    pub slots: Vec<BatchSlot<String>>,
    pub summary: String,
}

#[derive(Serialize)]
pub struct ConcatResponse {
    pub output: String,
}

/// `POST /upload`: stream the multipart `file` field into the catalog
pub async fn upload(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let catalog = state.container.catalog();

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let original_name = field.file_name().unwrap_or("upload").to_string();
        let mut target = catalog.create_upload(&original_name).await?;

        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    catalog.discard_upload(target).await;
                    return Err(e.into());
                }
            };
            if let Err(e) = target.file.write_all(&chunk).await {
                catalog.discard_upload(target).await;
                return Err(DomainError::from(e).into());
            }
        }

        let asset = catalog.finish_upload(target).await?;
        info!(asset = asset.id(), original = %original_name, "Upload complete");
        return Ok(Json(UploadResponse {
            url: AssetCatalog::public_url(asset.id()),
            filename: asset.id().to_string(),
        }));
    }

    Err(DomainError::InvalidInput(format!("No '{}' field in upload", UPLOAD_FIELD)).into())
}

/// `POST /thumbnails`
pub async fn thumbnails(
    State(state): State<ServerState>,
    payload: Result<Json<ThumbnailRequest>, JsonRejection>,
) -> Result<Json<ThumbnailsResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.container.thumbnail_interactor().execute(request).await?;

    Ok(Json(ThumbnailsResponse {
        thumbs: response.references(),
        summary: response.batch.summary().to_string(),
        folder: response.folder,
        duration: response.plan.duration,
        slots: response.batch.map(|a| a.reference).slots,
    }))
}

/// `POST /split`
pub async fn split(
    State(state): State<ServerState>,
    payload: Result<Json<SplitRequest>, JsonRejection>,
) -> Result<Json<SplitResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.container.split_interactor().execute(request).await?;

    Ok(Json(SplitResponse {
        segments: response.references(),
        summary: response.batch.summary().to_string(),
        ranges: response.plan.ranges,
        slots: response.batch.map(|a| a.reference).slots,
    }))
}

/// `POST /concat`
pub async fn concat(
    State(state): State<ServerState>,
    payload: Result<Json<ConcatRequest>, JsonRejection>,
) -> Result<Json<ConcatResponse>, ApiError> {
    let Json(request) = payload?;
    let artifact = state.container.concat_interactor().execute(request).await?;
    Ok(Json(ConcatResponse {
        output: artifact.reference,
    }))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true, "ts": Utc::now().timestamp_millis() }))
}
