//! src/services/enrichment_service.rs
//!
//! EnrichmentService — generates accessibility text (image descriptions and
//! document transcriptions) for uploaded content by calling an external
//! generative model. Runs decoupled from the request that created the
//! content: the content service schedules a run after its insert commits,
//! and the executor here reloads the record by id before doing anything.

use crate::models::content::Content;
use base64::{Engine as _, engine::general_purpose};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use std::{io::ErrorKind, path::PathBuf, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// One prompt covers both media types; the model is expected to pick the
/// right behavior from the mime type declared alongside the bytes.
const ENRICHMENT_PROMPT: &str = "You are an accessibility assistant for an educational \
platform. If the attached file is an image, describe it in detail for a vision-impaired \
student. If it is a PDF or other document, transcribe its text verbatim, preserving the \
structure (headings, lists, tables) as plain text. Reply with the description or \
transcription only.";

/// Prefix of results produced from a failed call. Stored as-is on the
/// content record, matching the persisted error-string behavior documented
/// in DESIGN.md.
pub const ERROR_TEXT_PREFIX: &str = "error during processing";

/// Errors from a single model call. These never escape the client:
/// `describe` folds them into the textual result.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("network error: {0}")]
    Network(String),

    #[error("service returned status {0}: {1}")]
    Api(u16, String),

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("empty response from model")]
    Empty,

    #[error("no payload available")]
    MissingPayload,
}

/// Client for the generative enrichment service.
///
/// Credential and endpoint are injected at construction; nothing is read
/// from the environment at call time.
pub struct EnrichmentClient {
    http_client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl EnrichmentClient {
    pub fn new(api_url: String, api_key: String, timeout_secs: u64) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            api_url,
            api_key,
        })
    }

    /// Produce accessibility text for one payload.
    ///
    /// Never fails past its own boundary: any error is converted into a
    /// `"error during processing: <cause>"` result that callers treat the
    /// same as a real description.
    pub async fn describe(&self, bytes: &[u8], file_name: &str) -> String {
        match self.try_describe(bytes, file_name).await {
            Ok(text) => text,
            Err(err) => {
                warn!("enrichment call for `{}` failed: {}", file_name, err);
                format!("{}: {}", ERROR_TEXT_PREFIX, err)
            }
        }
    }

    async fn try_describe(&self, bytes: &[u8], file_name: &str) -> Result<String, EnrichmentError> {
        if bytes.is_empty() {
            return Err(EnrichmentError::MissingPayload);
        }

        let mime_type = infer_mime_type(file_name);
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": ENRICHMENT_PROMPT },
                    { "inline_data": {
                        "mime_type": mime_type,
                        "data": general_purpose::STANDARD.encode(bytes),
                    }},
                ],
            }],
        });

        debug!(
            "requesting enrichment for `{}` as {} ({} bytes)",
            file_name,
            mime_type,
            bytes.len()
        );

        let response = self
            .http_client
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|err| EnrichmentError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::Api(status.as_u16(), truncate(&detail, 200)));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| EnrichmentError::Parse(err.to_string()))?;

        parsed.first_text().ok_or(EnrichmentError::Empty)
    }
}

/// Outcome of one executor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    /// A model-produced description/transcription was stored.
    Enriched,
    /// The call failed; the error text was stored and the record still
    /// marked processed.
    ErrorStored,
    /// The record was gone by the time the executor ran. No-op.
    MissingRecord,
}

/// Executor for enrichment runs.
///
/// Cheap to clone; holds the shared pool, the upload directory, and the
/// model client.
#[derive(Clone)]
pub struct EnrichmentService {
    db: Arc<SqlitePool>,
    upload_dir: PathBuf,
    client: Arc<EnrichmentClient>,
}

impl EnrichmentService {
    pub fn new(db: Arc<SqlitePool>, upload_dir: impl Into<PathBuf>, client: Arc<EnrichmentClient>) -> Self {
        Self {
            db,
            upload_dir: upload_dir.into(),
            client,
        }
    }

    /// Schedule an enrichment run on the runtime, detached from the caller.
    ///
    /// Invoked by the content service only after the inserting transaction
    /// has committed, so the executor always sees a durable record (or none,
    /// if a delete won the race).
    pub fn schedule(&self, content_id: Uuid) {
        let service = self.clone();
        tokio::spawn(async move {
            match service.process_content(content_id).await {
                Ok(outcome) => debug!("enrichment for {} finished: {:?}", content_id, outcome),
                Err(err) => warn!("enrichment for {} could not persist: {}", content_id, err),
            }
        });
    }

    /// Run enrichment for one content record.
    ///
    /// Reloads the record by id (a concurrently deleted record is a no-op),
    /// calls the model, and persists the result with a field-scoped update
    /// so concurrent edits to other fields are not clobbered. There is
    /// deliberately no short-circuit on `processed` here; that guard lives
    /// at the scheduling layer. Running this for an already-processed record
    /// calls the model again and overwrites the stored text.
    pub async fn process_content(&self, content_id: Uuid) -> Result<EnrichmentOutcome, sqlx::Error> {
        let record = sqlx::query_as::<_, Content>(
            "SELECT id, module_id, title, kind, body, video_url, file_path, file_name,
                    position, created_at, ai_text, processed
             FROM content WHERE id = ?",
        )
        .bind(content_id)
        .fetch_optional(&*self.db)
        .await?;

        let Some(record) = record else {
            debug!("content {} vanished before enrichment; skipping", content_id);
            return Ok(EnrichmentOutcome::MissingRecord);
        };

        let bytes = match &record.file_path {
            Some(rel_path) => match fs::read(self.upload_dir.join(rel_path)).await {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
                Err(err) => {
                    warn!("could not read payload for {}: {}", content_id, err);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let file_name = record.file_name.as_deref().unwrap_or("upload");
        let text = self.client.describe(&bytes, file_name).await;

        if text.is_empty() {
            return Ok(EnrichmentOutcome::ErrorStored);
        }

        let outcome = if text.starts_with(ERROR_TEXT_PREFIX) {
            EnrichmentOutcome::ErrorStored
        } else {
            EnrichmentOutcome::Enriched
        };

        // Only these two fields; a full-record rewrite here could undo a
        // teacher's concurrent edit to title or body.
        sqlx::query("UPDATE content SET ai_text = ?, processed = 1 WHERE id = ?")
            .bind(&text)
            .bind(content_id)
            .execute(&*self.db)
            .await?;

        Ok(outcome)
    }
}

/// Best-effort media type from the file-name extension.
///
/// Known PDF suffix maps to `application/pdf`; anything else is treated as
/// an image, falling back to JPEG for unknown extensions.
pub fn infer_mime_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit('.')
        .next()
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "image/jpeg",
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &text[..end])
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(self) -> Option<String> {
        let text = self
            .candidates?
            .into_iter()
            .next()?
            .content?
            .parts?
            .into_iter()
            .find_map(|part| part.text)?;

        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}
