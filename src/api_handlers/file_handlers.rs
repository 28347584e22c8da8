use std::sync::Arc;
use poem::{handler, Body, Error, Request, Response};
use poem::http::StatusCode;
use poem::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use poem::web::{Data, Json, Multipart, Path, Query};
use serde::Deserialize;
use serde_json::json;
use crate::api_handlers::log_access;
use crate::models::{FileEntry, RejectedUpload, UploadReport};
use crate::storage::names::sanitize;
use crate::storage::{DirectoryIndex, FileStore};

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    #[serde(default)]
    pub new_name: String,
}

// Lists the shared folder, optionally filtered by ?search=.
#[poem_grants::protect("user")]
#[handler]
pub async fn list_files(
    req: &Request,
    Query(params): Query<SearchParams>,
    index: Data<&Arc<DirectoryIndex>>,
) -> poem::Result<Json<Vec<FileEntry>>> {
    let files = index.list(&params.search).await;
    log_access(req, "VIEW_FILES", None);
    Ok(Json(files))
}

// Handles multipart uploads. Every field named "files" is one file; each is
// saved or rejected on its own, so one bad file does not abort the rest.
//
// Returns 400 when the form carries no "files" field at all.
#[poem_grants::protect("user")]
#[handler]
pub async fn upload_files(
    req: &Request,
    mut multipart: Multipart,
    store: Data<&Arc<FileStore>>,
) -> poem::Result<Json<UploadReport>> {
    let mut report = UploadReport::default();
    let mut received = 0usize;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("files") {
            continue;
        }
        received += 1;

        let declared = field.file_name().map(ToString::to_string).unwrap_or_default();
        if declared.is_empty() {
            tracing::warn!("File {} has empty filename, skipping", received);
            continue;
        }

        match store.upload(Box::pin(field.into_async_read()), &declared).await {
            Ok(saved) => {
                log_access(req, "FILE_UPLOAD", Some(&saved));
                report.uploaded.push(saved);
            }
            Err(err) => {
                tracing::warn!("Upload of {} rejected: {}", declared, err);
                report.rejected.push(RejectedUpload {
                    name: declared,
                    reason: err.client_message(),
                });
            }
        }
    }

    if received == 0 {
        return Err(Error::from_string("No file selected", StatusCode::BAD_REQUEST));
    }

    tracing::info!(
        "Upload complete: {} saved, {} rejected",
        report.uploaded.len(),
        report.rejected.len()
    );
    Ok(Json(report))
}

// Sends a file as an attachment so the browser saves it.
#[poem_grants::protect("user")]
#[handler]
pub async fn download_file(
    req: &Request,
    Path(filename): Path<String>,
    store: Data<&Arc<FileStore>>,
) -> poem::Result<Response> {
    let (file, len) = store.open(&filename).await?;
    log_access(req, "FILE_DOWNLOAD", Some(&filename));

    Ok(Response::builder()
        .header(CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", header_safe(&filename)))
        .header(CONTENT_TYPE, "application/octet-stream")
        .header(CONTENT_LENGTH, len)
        .body(Body::from_async_read(file)))
}

// Same as download, but inline with a guessed content type so the browser
// can render images, video, PDFs and text directly.
#[poem_grants::protect("user")]
#[handler]
pub async fn preview_file(
    req: &Request,
    Path(filename): Path<String>,
    store: Data<&Arc<FileStore>>,
) -> poem::Result<Response> {
    let (file, len) = store.open(&filename).await?;
    let content_type = mime_guess::from_path(&filename).first_or_octet_stream();
    log_access(req, "FILE_PREVIEW", Some(&filename));

    Ok(Response::builder()
        .header(CONTENT_DISPOSITION, format!("inline; filename=\"{}\"", header_safe(&filename)))
        .header(CONTENT_TYPE, content_type.essence_str())
        .header(CONTENT_LENGTH, len)
        .body(Body::from_async_read(file)))
}

#[poem_grants::protect("user")]
#[handler]
pub async fn delete_file(
    req: &Request,
    Path(filename): Path<String>,
    store: Data<&Arc<FileStore>>,
) -> poem::Result<Json<serde_json::Value>> {
    store.delete(&filename).await?;
    log_access(req, "FILE_DELETE", Some(&filename));
    Ok(Json(json!({ "deleted": filename })))
}

// Renames a file. The new name is sanitized first; a name that is already
// taken is reported as a conflict rather than suffixed.
#[poem_grants::protect("user")]
#[handler]
pub async fn rename_file(
    req: &Request,
    Path(filename): Path<String>,
    Json(payload): Json<RenameRequest>,
    store: Data<&Arc<FileStore>>,
) -> poem::Result<Json<serde_json::Value>> {
    if payload.new_name.trim().is_empty() {
        return Err(Error::from_string("Please provide a new name", StatusCode::BAD_REQUEST));
    }

    let new_name = sanitize(&payload.new_name)?;
    store.rename(&filename, &new_name).await?;
    log_access(req, "FILE_RENAME", Some(&format!("{} -> {}", filename, new_name)));
    Ok(Json(json!({ "old_name": filename, "new_name": new_name })))
}

fn header_safe(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect()
}
