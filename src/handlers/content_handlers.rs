//! HTTP handlers for content items: authoring (multipart upload), edits,
//! payload and transcript downloads, and the per-offering accessibility
//! dashboard. Storage and enrichment concerns live in `ContentService`.

use crate::{
    errors::AppError,
    models::content::{Content, ContentKind},
    services::{AppState, content_service::UpdateContent},
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use std::io;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::services::content_service::NewContent;
use crate::services::enrichment_service::infer_mime_type;

/// POST `/modules/{module_id}/content` — author a content item.
///
/// Multipart form: `title` (required), `kind` (required), optional `body`,
/// `video_url`, `position`, and one optional `file` part carrying the
/// payload. Enrichment for uploaded payloads is scheduled after the insert
/// commits; the response does not wait for it.
pub async fn upload_content(
    State(state): State<AppState>,
    Path(module_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut title: Option<String> = None;
    let mut kind: Option<ContentKind> = None;
    let mut body: Option<String> = None;
    let mut video_url: Option<String> = None;
    let mut position: i64 = 0;
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("invalid multipart body: {}", err)))?
    {
        match field.name().unwrap_or_default() {
            "title" => title = Some(read_text(field).await?),
            "kind" => {
                let raw = read_text(field).await?;
                kind = Some(raw.parse().map_err(AppError::bad_request)?);
            }
            "body" => body = Some(read_text(field).await?),
            "video_url" => video_url = Some(read_text(field).await?),
            "position" => {
                let raw = read_text(field).await?;
                position = raw
                    .parse()
                    .map_err(|_| AppError::bad_request(format!("invalid position `{}`", raw)))?;
            }
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "upload".to_string());
                let bytes = field.bytes().await.map_err(|err| {
                    AppError::bad_request(format!("could not read file part: {}", err))
                })?;
                upload = Some((file_name, bytes));
            }
            other => {
                return Err(AppError::bad_request(format!(
                    "unexpected multipart field `{}`",
                    other
                )));
            }
        }
    }

    let title = title.ok_or_else(|| AppError::bad_request("missing `title` field"))?;
    let kind = kind.ok_or_else(|| AppError::bad_request("missing `kind` field"))?;

    let new = NewContent {
        title,
        kind,
        body,
        video_url,
        position,
    };

    let upload_stream = upload.map(|(file_name, bytes)| {
        let stream = futures::stream::once(async move { Ok::<_, io::Error>(bytes) });
        (file_name, stream)
    });

    let record = state.content.create_content(module_id, new, upload_stream).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET `/content/{id}`
pub async fn get_content(
    State(state): State<AppState>,
    Path(content_id): Path<Uuid>,
) -> Result<Json<Content>, AppError> {
    Ok(Json(state.content.get_content(content_id).await?))
}

/// GET `/modules/{module_id}/content` — list module content by position.
pub async fn list_module_content(
    State(state): State<AppState>,
    Path(module_id): Path<Uuid>,
) -> Result<Json<Vec<Content>>, AppError> {
    Ok(Json(state.content.list_module_content(module_id).await?))
}

/// PATCH `/content/{id}` — partial edit; enrichment fields are untouchable.
pub async fn update_content(
    State(state): State<AppState>,
    Path(content_id): Path<Uuid>,
    Json(update): Json<UpdateContent>,
) -> Result<Json<Content>, AppError> {
    Ok(Json(state.content.update_content(content_id, update).await?))
}

/// DELETE `/content/{id}`
pub async fn delete_content(
    State(state): State<AppState>,
    Path(content_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.content.delete_content(content_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT `/content/{id}/file` — replace the uploaded payload.
///
/// Multipart form with a single `file` part. Enrichment fields are left
/// untouched; the hook fires at creation time only.
pub async fn replace_payload(
    State(state): State<AppState>,
    Path(content_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Content>, AppError> {
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("invalid multipart body: {}", err)))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "upload".to_string());
                let bytes = field.bytes().await.map_err(|err| {
                    AppError::bad_request(format!("could not read file part: {}", err))
                })?;
                upload = Some((file_name, bytes));
            }
            other => {
                return Err(AppError::bad_request(format!(
                    "unexpected multipart field `{}`",
                    other
                )));
            }
        }
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::bad_request("missing `file` part"))?;
    let stream = futures::stream::once(async move { Ok::<_, io::Error>(bytes) });

    let record = state
        .content
        .replace_payload(content_id, file_name, stream)
        .await?;
    Ok(Json(record))
}

/// GET `/content/{id}/file` — stream the stored payload back.
pub async fn download_payload(
    State(state): State<AppState>,
    Path(content_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let (record, file) = state.content.payload_reader(content_id).await?;
    let file_name = record.file_name.as_deref().unwrap_or("upload");

    let stream = ReaderStream::new(file);
    let mut response = Response::new(Body::from_stream(stream));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(infer_mime_type(file_name)),
    );
    set_attachment_header(&mut response, file_name);
    Ok(response)
}

/// GET `/content/{id}/transcript` — accessibility text as a plain-text
/// attachment; a fixed placeholder sentence when none exists yet.
pub async fn download_transcript(
    State(state): State<AppState>,
    Path(content_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let (file_name, text) = state.content.transcript(content_id).await?;

    let mut response = Response::new(Body::from(text));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    set_attachment_header(&mut response, &file_name);
    Ok(response)
}

/// GET `/offerings/{id}/accessibility` — coverage report.
pub async fn accessibility_dashboard(
    State(state): State<AppState>,
    Path(offering_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.content.accessibility_report(offering_id).await?))
}

/// POST `/offerings/{id}/accessibility/reprocess` — re-run enrichment for
/// IMAGE/FILE items still lacking text; reports counts.
pub async fn reprocess_pending(
    State(state): State<AppState>,
    Path(offering_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.content.reprocess_pending(offering_id).await?))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|err| AppError::bad_request(format!("invalid field value: {}", err)))
}

fn set_attachment_header(response: &mut Response, file_name: &str) {
    let disposition = format!("attachment; filename=\"{}\"", file_name.replace('"', ""));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, value);
    }
}
