//! src/services/content_service.rs
//!
//! ContentService — CRUD over content items backed by SQLite for metadata
//! and local disk for uploaded payloads (sharded beneath
//! `base_path/{shard}/{shard}/{file}`), plus the accessibility features
//! built on top of them: the post-commit enrichment trigger, the teacher
//! dashboard aggregation, transcript downloads, and manual reprocessing.

use crate::models::content::{Content, ContentKind};
use crate::services::enrichment_service::{EnrichmentOutcome, EnrichmentService};
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

/// Body returned when a transcript is downloaded before enrichment has
/// produced anything.
pub const TRANSCRIPT_PLACEHOLDER: &str =
    "Transcripcion no disponible todavia para este contenido.";

/// One pattern covers the known YouTube URL shapes: watch, short-link,
/// embed, and the legacy /v/ parameter form.
static YOUTUBE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:youtube\.com/(?:watch\?(?:[^#\s]*&)?v=|embed/|v/)|youtu\.be/)([A-Za-z0-9_-]{11})")
        .expect("video id pattern is valid")
});

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("module `{0}` not found")]
    ModuleNotFound(Uuid),
    #[error("content `{0}` not found")]
    ContentNotFound(Uuid),
    #[error("content `{0}` has no uploaded payload")]
    PayloadNotFound(Uuid),
    #[error("offering `{0}` not found")]
    OfferingNotFound(Uuid),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ContentResult<T> = Result<T, ContentError>;

/// Fields supplied when authoring a content item.
#[derive(Debug, Clone, Deserialize)]
pub struct NewContent {
    pub title: String,
    pub kind: ContentKind,
    pub body: Option<String>,
    pub video_url: Option<String>,
    #[serde(default)]
    pub position: i64,
}

/// Partial edit of a content item. Absent fields are left untouched.
/// `ai_text` and `processed` are not editable through this path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateContent {
    pub title: Option<String>,
    pub body: Option<String>,
    pub video_url: Option<String>,
    pub position: Option<i64>,
}

/// Teacher-facing accessibility coverage for one offering.
#[derive(Debug, Serialize)]
pub struct AccessibilityReport {
    pub offering_id: Uuid,
    pub total: usize,
    pub accessible: usize,
    /// floor(100 * accessible / total); 0 when the offering has no content.
    pub score: i64,
    pub needs_attention: Vec<AttentionItem>,
}

/// An IMAGE/FILE item still lacking accessibility text.
#[derive(Debug, Serialize)]
pub struct AttentionItem {
    pub content_id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub kind: ContentKind,
}

/// Result of a manual reprocessing sweep.
#[derive(Debug, Serialize)]
pub struct ReprocessReport {
    pub examined: usize,
    pub processed: usize,
    pub errored: usize,
}

/// ContentService provides the content-item operations:
/// - Author content (streams an optional payload to disk, inserts metadata,
///   then schedules enrichment once the insert has committed)
/// - Edit/fetch/list/delete content
/// - Dashboard aggregation and manual reprocessing per offering
/// - Transcript download material
#[derive(Clone)]
pub struct ContentService {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where uploaded payloads are stored.
    pub base_path: PathBuf,

    /// Executor for post-commit enrichment runs.
    pub enrichment: EnrichmentService,
}

impl ContentService {
    pub fn new(
        db: Arc<SqlitePool>,
        base_path: impl Into<PathBuf>,
        enrichment: EnrichmentService,
    ) -> Self {
        Self {
            db,
            base_path: base_path.into(),
            enrichment,
        }
    }

    /// Generate two-level shard identifiers for a content id.
    ///
    /// Uses MD5 of the id and returns the first two bytes as lowercase
    /// hexadecimal strings (00–ff). Reduces file count per directory.
    fn payload_shards(content_id: Uuid) -> (String, String) {
        let digest = md5::compute(content_id.as_bytes());
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Relative payload path beneath `base_path` for a content id.
    fn payload_rel_path(content_id: Uuid, file_name: &str) -> String {
        let (shard_a, shard_b) = Self::payload_shards(content_id);
        format!(
            "{}/{}/{}-{}",
            shard_a,
            shard_b,
            content_id,
            sanitize_file_name(file_name)
        )
    }

    async fn fetch_content(&self, content_id: Uuid) -> ContentResult<Content> {
        sqlx::query_as::<_, Content>(
            "SELECT id, module_id, title, kind, body, video_url, file_path, file_name,
                    position, created_at, ai_text, processed
             FROM content WHERE id = ?",
        )
        .bind(content_id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => ContentError::ContentNotFound(content_id),
            other => ContentError::Sqlx(other),
        })
    }

    async fn ensure_module_exists(&self, module_id: Uuid) -> ContentResult<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM modules WHERE id = ?)")
            .bind(module_id)
            .fetch_one(&*self.db)
            .await?;
        if exists {
            Ok(())
        } else {
            Err(ContentError::ModuleNotFound(module_id))
        }
    }

    async fn ensure_offering_exists(&self, offering_id: Uuid) -> ContentResult<()> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM offerings WHERE id = ?)")
                .bind(offering_id)
                .fetch_one(&*self.db)
                .await?;
        if exists {
            Ok(())
        } else {
            Err(ContentError::OfferingNotFound(offering_id))
        }
    }

    /// Stream an uploaded payload to its final location on disk.
    ///
    /// Writes incrementally to a temporary file, fsyncs, and atomically
    /// renames into place. Cleans up the temp file on errors.
    async fn store_payload<S>(&self, rel_path: &str, stream: S) -> ContentResult<()>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let file_path = self.base_path.join(rel_path);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            ContentError::Io(io::Error::new(
                ErrorKind::Other,
                "payload path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(ContentError::Io(err));
                }
            };
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(ContentError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(ContentError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(ContentError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(ContentError::Io(err));
        }

        Ok(())
    }

    /// Author a new content item, optionally with an uploaded payload.
    ///
    /// The payload is written to disk first, the metadata row is inserted in
    /// a transaction, and only after that transaction commits is enrichment
    /// scheduled — and only when the new record carries a payload and is not
    /// already processed. A rolled-back insert schedules nothing and removes
    /// the payload file.
    pub async fn create_content<S>(
        &self,
        module_id: Uuid,
        new: NewContent,
        upload: Option<(String, S)>,
    ) -> ContentResult<Content>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        self.ensure_module_exists(module_id).await?;

        let id = Uuid::new_v4();
        let created_at = Utc::now();

        let (file_path, file_name) = match upload {
            Some((name, stream)) => {
                let rel_path = Self::payload_rel_path(id, &name);
                self.store_payload(&rel_path, stream).await?;
                (Some(rel_path), Some(name))
            }
            None => (None, None),
        };

        let video_url = match (&new.kind, new.video_url.as_deref()) {
            (ContentKind::Video, Some(url)) if !url.is_empty() => {
                Some(normalize_video_url(url))
            }
            (_, url) => url.map(str::to_string),
        };

        let mut tx = self.db.begin().await?;
        let insert_result = sqlx::query(
            "INSERT INTO content (id, module_id, title, kind, body, video_url,
                                  file_path, file_name, position, created_at, ai_text, processed)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, 0)",
        )
        .bind(id)
        .bind(module_id)
        .bind(&new.title)
        .bind(new.kind)
        .bind(&new.body)
        .bind(&video_url)
        .bind(&file_path)
        .bind(&file_name)
        .bind(new.position.max(0))
        .bind(created_at)
        .execute(&mut *tx)
        .await;

        let committed = match insert_result {
            Ok(_) => tx.commit().await,
            Err(err) => Err(err),
        };
        if let Err(err) = committed {
            if let Some(rel_path) = &file_path {
                let _ = fs::remove_file(self.base_path.join(rel_path)).await;
            }
            return Err(ContentError::Sqlx(err));
        }

        let record = Content {
            id,
            module_id,
            title: new.title,
            kind: new.kind,
            body: new.body,
            video_url,
            file_path,
            file_name,
            position: new.position.max(0),
            created_at,
            ai_text: None,
            processed: false,
        };

        // The record is durably visible from here on; schedule at most once.
        if record.file_path.is_some() && !record.processed {
            self.enrichment.schedule(record.id);
        }

        Ok(record)
    }

    /// Partial edit: only the supplied fields are written. Video URLs are
    /// re-normalized on every save of a VIDEO item.
    pub async fn update_content(
        &self,
        content_id: Uuid,
        update: UpdateContent,
    ) -> ContentResult<Content> {
        let existing = self.fetch_content(content_id).await?;

        let title = update.title.unwrap_or(existing.title);
        let body = update.body.or(existing.body);
        let position = update.position.unwrap_or(existing.position).max(0);
        let video_url = match update.video_url.or(existing.video_url) {
            Some(url) if existing.kind == ContentKind::Video && !url.is_empty() => {
                Some(normalize_video_url(&url))
            }
            other => other,
        };

        sqlx::query(
            "UPDATE content SET title = ?, body = ?, video_url = ?, position = ? WHERE id = ?",
        )
        .bind(&title)
        .bind(&body)
        .bind(&video_url)
        .bind(position)
        .bind(content_id)
        .execute(&*self.db)
        .await?;

        self.fetch_content(content_id).await
    }

    /// Replace the uploaded payload of a content item.
    ///
    /// The new payload is written first; only then is the record repointed
    /// and the previous file removed best-effort. `ai_text` and `processed`
    /// are left untouched: enrichment is scheduled at creation time only,
    /// so replacing a payload does not re-run it.
    pub async fn replace_payload<S>(
        &self,
        content_id: Uuid,
        file_name: String,
        stream: S,
    ) -> ContentResult<Content>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let existing = self.fetch_content(content_id).await?;

        let rel_path = Self::payload_rel_path(content_id, &file_name);
        self.store_payload(&rel_path, stream).await?;

        let update_result =
            sqlx::query("UPDATE content SET file_path = ?, file_name = ? WHERE id = ?")
                .bind(&rel_path)
                .bind(&file_name)
                .bind(content_id)
                .execute(&*self.db)
                .await;
        if let Err(err) = update_result {
            let _ = fs::remove_file(self.base_path.join(&rel_path)).await;
            return Err(ContentError::Sqlx(err));
        }

        if let Some(old_rel) = existing.file_path.as_deref() {
            if old_rel != rel_path {
                let _ = fs::remove_file(self.base_path.join(old_rel)).await;
            }
        }

        self.fetch_content(content_id).await
    }

    pub async fn get_content(&self, content_id: Uuid) -> ContentResult<Content> {
        self.fetch_content(content_id).await
    }

    /// All content of a module, ordered by position.
    pub async fn list_module_content(&self, module_id: Uuid) -> ContentResult<Vec<Content>> {
        self.ensure_module_exists(module_id).await?;
        let rows = sqlx::query_as::<_, Content>(
            "SELECT id, module_id, title, kind, body, video_url, file_path, file_name,
                    position, created_at, ai_text, processed
             FROM content WHERE module_id = ? ORDER BY position, created_at",
        )
        .bind(module_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    /// Delete a content item and its payload file (best-effort).
    pub async fn delete_content(&self, content_id: Uuid) -> ContentResult<()> {
        let existing = self.fetch_content(content_id).await?;

        sqlx::query("DELETE FROM content WHERE id = ?")
            .bind(content_id)
            .execute(&*self.db)
            .await?;

        if let Some(rel_path) = &existing.file_path {
            let file_path = self.base_path.join(rel_path);
            match fs::remove_file(&file_path).await {
                Ok(_) => debug!("removed payload file {}", file_path.display()),
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!("payload file {} already missing", file_path.display());
                }
                Err(err) => return Err(ContentError::Io(err)),
            }
        }

        Ok(())
    }

    /// Open a content item's payload for streaming out.
    pub async fn payload_reader(&self, content_id: Uuid) -> ContentResult<(Content, File)> {
        let record = self.fetch_content(content_id).await?;
        let rel_path = record
            .file_path
            .as_deref()
            .ok_or(ContentError::PayloadNotFound(content_id))?;

        let file = File::open(self.base_path.join(rel_path))
            .await
            .map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    ContentError::PayloadNotFound(content_id)
                } else {
                    ContentError::Io(err)
                }
            })?;

        Ok((record, file))
    }

    /// Transcript body and attachment filename for a content item.
    ///
    /// Falls back to a fixed placeholder sentence when no accessibility
    /// text has been stored yet.
    pub async fn transcript(&self, content_id: Uuid) -> ContentResult<(String, String)> {
        let record = self.fetch_content(content_id).await?;
        let text = match record.ai_text {
            Some(text) if !text.is_empty() => text,
            _ => TRANSCRIPT_PLACEHOLDER.to_string(),
        };
        Ok((transcript_file_name(&record.title), text))
    }

    /// Accessibility coverage for one offering.
    ///
    /// IMAGE/FILE items count as accessible only with non-empty ai_text;
    /// everything else is inherently accessible. Pure read-aggregation.
    pub async fn accessibility_report(
        &self,
        offering_id: Uuid,
    ) -> ContentResult<AccessibilityReport> {
        self.ensure_offering_exists(offering_id).await?;

        let rows = sqlx::query_as::<_, Content>(
            "SELECT c.id, c.module_id, c.title, c.kind, c.body, c.video_url, c.file_path,
                    c.file_name, c.position, c.created_at, c.ai_text, c.processed
             FROM content c
             JOIN modules m ON c.module_id = m.id
             WHERE m.offering_id = ?
             ORDER BY m.position, c.position",
        )
        .bind(offering_id)
        .fetch_all(&*self.db)
        .await?;

        let total = rows.len();
        let mut accessible = 0usize;
        let mut needs_attention = Vec::new();

        for row in rows {
            if !row.kind.requires_enrichment() {
                accessible += 1;
                continue;
            }
            match &row.ai_text {
                Some(text) if !text.is_empty() => accessible += 1,
                _ => needs_attention.push(AttentionItem {
                    content_id: row.id,
                    module_id: row.module_id,
                    title: row.title,
                    kind: row.kind,
                }),
            }
        }

        let score = if total == 0 {
            0
        } else {
            (100 * accessible / total) as i64
        };

        Ok(AccessibilityReport {
            offering_id,
            total,
            accessible,
            score,
            needs_attention,
        })
    }

    /// Re-trigger enrichment for every IMAGE/FILE item of an offering that
    /// still lacks accessibility text. Runs inline (not spawned) so the
    /// caller gets accurate counts back.
    pub async fn reprocess_pending(&self, offering_id: Uuid) -> ContentResult<ReprocessReport> {
        self.ensure_offering_exists(offering_id).await?;

        let pending: Vec<Uuid> = sqlx::query_scalar(
            "SELECT c.id
             FROM content c
             JOIN modules m ON c.module_id = m.id
             WHERE m.offering_id = ?
               AND c.kind IN ('IMAGE', 'FILE')
               AND (c.ai_text IS NULL OR c.ai_text = '')",
        )
        .bind(offering_id)
        .fetch_all(&*self.db)
        .await?;

        let examined = pending.len();
        let mut processed = 0usize;
        let mut errored = 0usize;

        for content_id in pending {
            match self.enrichment.process_content(content_id).await? {
                EnrichmentOutcome::Enriched => processed += 1,
                EnrichmentOutcome::ErrorStored => errored += 1,
                EnrichmentOutcome::MissingRecord => {}
            }
        }

        Ok(ReprocessReport {
            examined,
            processed,
            errored,
        })
    }
}

/// Canonicalize an externally supplied video link.
///
/// Extracts an 11-character YouTube id from the known URL shapes and
/// rebuilds the embed form; unrecognized values are returned unchanged.
/// Idempotent on already-canonical URLs.
pub fn normalize_video_url(url: &str) -> String {
    match YOUTUBE_ID.captures(url) {
        Some(caps) => format!("https://www.youtube.com/embed/{}", &caps[1]),
        None => url.to_string(),
    }
}

/// Attachment filename for a transcript download: the title with
/// non-alphanumeric characters stripped and spaces replaced by underscores.
pub fn transcript_file_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .collect();
    format!("{}_transcripcion.txt", cleaned.replace(' ', "_"))
}

/// Keep payload filenames free of separators and control characters.
fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "upload".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::enrichment_service::EnrichmentClient;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> Arc<SqlitePool> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        for statement in [
            "CREATE TABLE courses (
                id BLOB PRIMARY KEY, code TEXT NOT NULL UNIQUE, name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '', credits INTEGER NOT NULL,
                active INTEGER NOT NULL DEFAULT 1)",
            "CREATE TABLE academic_terms (
                id BLOB PRIMARY KEY, name TEXT NOT NULL UNIQUE,
                start_date TEXT NOT NULL, end_date TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 0)",
            "CREATE TABLE offerings (
                id BLOB PRIMARY KEY,
                course_id BLOB NOT NULL REFERENCES courses(id),
                term_id BLOB NOT NULL REFERENCES academic_terms(id),
                published INTEGER NOT NULL DEFAULT 0,
                UNIQUE (course_id, term_id))",
            "CREATE TABLE modules (
                id BLOB PRIMARY KEY,
                offering_id BLOB NOT NULL REFERENCES offerings(id) ON DELETE CASCADE,
                title TEXT NOT NULL, description TEXT NOT NULL DEFAULT '',
                position INTEGER NOT NULL,
                UNIQUE (offering_id, position))",
            "CREATE TABLE content (
                id BLOB PRIMARY KEY,
                module_id BLOB NOT NULL REFERENCES modules(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                kind TEXT NOT NULL,
                body TEXT, video_url TEXT, file_path TEXT, file_name TEXT,
                position INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                ai_text TEXT,
                processed INTEGER NOT NULL DEFAULT 0)",
        ] {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }

        Arc::new(pool)
    }

    fn test_service(db: Arc<SqlitePool>, dir: &Path) -> ContentService {
        // Unreachable endpoint: enrichment calls fail fast with a network
        // error, which the client converts into stored error text.
        let client = Arc::new(
            EnrichmentClient::new("http://127.0.0.1:1/v1/generate".into(), String::new(), 1)
                .unwrap(),
        );
        let enrichment = EnrichmentService::new(db.clone(), dir, client);
        ContentService::new(db, dir, enrichment)
    }

    async fn seed_offering_and_module(db: &SqlitePool) -> (Uuid, Uuid) {
        let course_id = Uuid::new_v4();
        let term_id = Uuid::new_v4();
        let offering_id = Uuid::new_v4();
        let module_id = Uuid::new_v4();

        sqlx::query("INSERT INTO courses (id, code, name, credits) VALUES (?, ?, ?, 3)")
            .bind(course_id)
            .bind(format!("CS-{}", &course_id.to_string()[..8]))
            .bind("Intro")
            .execute(db)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO academic_terms (id, name, start_date, end_date) VALUES (?, ?, '2025-01-01', '2025-06-30')",
        )
        .bind(term_id)
        .bind(format!("term-{}", &term_id.to_string()[..8]))
        .execute(db)
        .await
        .unwrap();
        sqlx::query("INSERT INTO offerings (id, course_id, term_id) VALUES (?, ?, ?)")
            .bind(offering_id)
            .bind(course_id)
            .bind(term_id)
            .execute(db)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO modules (id, offering_id, title, position) VALUES (?, ?, 'Module 1', 1)",
        )
        .bind(module_id)
        .bind(offering_id)
        .execute(db)
        .await
        .unwrap();

        (offering_id, module_id)
    }

    async fn insert_content(
        db: &SqlitePool,
        module_id: Uuid,
        kind: &str,
        ai_text: Option<&str>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO content (id, module_id, title, kind, position, created_at, ai_text, processed)
             VALUES (?, ?, 'Item', ?, 0, ?, ?, ?)",
        )
        .bind(id)
        .bind(module_id)
        .bind(kind)
        .bind(Utc::now())
        .bind(ai_text)
        .bind(ai_text.is_some())
        .execute(db)
        .await
        .unwrap();
        id
    }

    #[test]
    fn watch_short_and_embed_urls_normalize_to_embed_form() {
        let expected = "https://www.youtube.com/embed/dQw4w9WgXcQ";
        assert_eq!(normalize_video_url("https://youtu.be/dQw4w9WgXcQ"), expected);
        assert_eq!(
            normalize_video_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            expected
        );
        assert_eq!(
            normalize_video_url("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            expected
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let canonical = "https://www.youtube.com/embed/dQw4w9WgXcQ";
        assert_eq!(normalize_video_url(canonical), canonical);
    }

    #[test]
    fn legacy_and_parameterized_urls_normalize() {
        let expected = "https://www.youtube.com/embed/dQw4w9WgXcQ";
        assert_eq!(
            normalize_video_url("https://www.youtube.com/v/dQw4w9WgXcQ"),
            expected
        );
        assert_eq!(
            normalize_video_url("https://www.youtube.com/watch?list=PL123&v=dQw4w9WgXcQ"),
            expected
        );
    }

    #[test]
    fn unrecognized_video_urls_are_kept_unchanged() {
        let original = "https://vimeo.com/123456789";
        assert_eq!(normalize_video_url(original), original);
        assert_eq!(normalize_video_url("not a url"), "not a url");
    }

    #[test]
    fn transcript_file_name_strips_and_underscores() {
        assert_eq!(
            transcript_file_name("Mapa conceptual: célula"),
            "Mapa_conceptual_célula_transcripcion.txt"
        );
        assert_eq!(transcript_file_name("Week 1"), "Week_1_transcripcion.txt");
    }

    #[tokio::test]
    async fn dashboard_counts_image_and_file_items_only_when_enriched() {
        let db = setup_test_db().await;
        let dir = std::env::temp_dir().join(format!("eduaccess-test-{}", Uuid::new_v4()));
        let service = test_service(db.clone(), &dir);
        let (offering_id, module_id) = seed_offering_and_module(&db).await;

        insert_content(&db, module_id, "TEXT", None).await;
        insert_content(&db, module_id, "TEXT", None).await;
        insert_content(&db, module_id, "IMAGE", Some("a diagram of a cell")).await;
        insert_content(&db, module_id, "FILE", None).await;

        let report = service.accessibility_report(offering_id).await.unwrap();
        assert_eq!(report.total, 4);
        assert_eq!(report.accessible, 3);
        assert_eq!(report.score, 75);
        assert_eq!(report.needs_attention.len(), 1);
        assert_eq!(report.needs_attention[0].kind, ContentKind::File);
    }

    #[tokio::test]
    async fn dashboard_score_is_zero_for_empty_offering() {
        let db = setup_test_db().await;
        let dir = std::env::temp_dir().join(format!("eduaccess-test-{}", Uuid::new_v4()));
        let service = test_service(db.clone(), &dir);
        let (offering_id, _) = seed_offering_and_module(&db).await;

        let report = service.accessibility_report(offering_id).await.unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.score, 0);
        assert!(report.needs_attention.is_empty());
    }

    #[tokio::test]
    async fn transcript_returns_placeholder_when_no_ai_text() {
        let db = setup_test_db().await;
        let dir = std::env::temp_dir().join(format!("eduaccess-test-{}", Uuid::new_v4()));
        let service = test_service(db.clone(), &dir);
        let (_, module_id) = seed_offering_and_module(&db).await;
        let content_id = insert_content(&db, module_id, "IMAGE", None).await;

        let (file_name, text) = service.transcript(content_id).await.unwrap();
        assert_eq!(text, TRANSCRIPT_PLACEHOLDER);
        assert_eq!(file_name, "Item_transcripcion.txt");
    }

    #[tokio::test]
    async fn create_content_normalizes_video_urls_at_write_time() {
        let db = setup_test_db().await;
        let dir = std::env::temp_dir().join(format!("eduaccess-test-{}", Uuid::new_v4()));
        let service = test_service(db.clone(), &dir);
        let (_, module_id) = seed_offering_and_module(&db).await;

        let record = service
            .create_content::<futures::stream::Empty<io::Result<Bytes>>>(
                module_id,
                NewContent {
                    title: "Lecture".into(),
                    kind: ContentKind::Video,
                    body: None,
                    video_url: Some("https://youtu.be/dQw4w9WgXcQ".into()),
                    position: 0,
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(
            record.video_url.as_deref(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ")
        );
        assert!(!record.processed);
        assert!(record.ai_text.is_none());
    }

    #[tokio::test]
    async fn update_content_never_touches_enrichment_fields() {
        let db = setup_test_db().await;
        let dir = std::env::temp_dir().join(format!("eduaccess-test-{}", Uuid::new_v4()));
        let service = test_service(db.clone(), &dir);
        let (_, module_id) = seed_offering_and_module(&db).await;
        let content_id = insert_content(&db, module_id, "IMAGE", Some("existing text")).await;

        let updated = service
            .update_content(
                content_id,
                UpdateContent {
                    title: Some("Renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.ai_text.as_deref(), Some("existing text"));
        assert!(updated.processed);
    }

    #[tokio::test]
    async fn uploaded_payload_ends_processed_even_when_the_call_fails() {
        let db = setup_test_db().await;
        let dir = std::env::temp_dir().join(format!("eduaccess-test-{}", Uuid::new_v4()));
        let service = test_service(db.clone(), &dir);
        let (_, module_id) = seed_offering_and_module(&db).await;

        let payload = futures::stream::iter(vec![Ok(Bytes::from_static(b"fake image bytes"))]);
        let record = service
            .create_content(
                module_id,
                NewContent {
                    title: "Chart".into(),
                    kind: ContentKind::Image,
                    body: None,
                    video_url: None,
                    position: 0,
                },
                Some(("chart.png".to_string(), payload)),
            )
            .await
            .unwrap();

        // Run the executor directly; the endpoint is unreachable so the
        // error text is stored and the record is still marked processed.
        let outcome = service.enrichment.process_content(record.id).await.unwrap();
        assert_eq!(outcome, EnrichmentOutcome::ErrorStored);

        let reloaded = service.get_content(record.id).await.unwrap();
        assert!(reloaded.processed);
        let text = reloaded.ai_text.unwrap();
        assert!(text.starts_with("error during processing"));

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn replacing_a_payload_keeps_enrichment_fields_and_drops_the_old_file() {
        let db = setup_test_db().await;
        let dir = std::env::temp_dir().join(format!("eduaccess-test-{}", Uuid::new_v4()));
        let service = test_service(db.clone(), &dir);
        let (_, module_id) = seed_offering_and_module(&db).await;

        // Seed an already-enriched record directly instead of going through
        // `create_content`, which would schedule a background enrichment run
        // that races with this test and overwrites `ai_text`.
        let id = Uuid::new_v4();
        let old_rel = format!("{}-old.png", id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(&old_rel), b"old bytes").unwrap();
        sqlx::query(
            "INSERT INTO content (id, module_id, title, kind, file_path, file_name,
                                  position, created_at, ai_text, processed)
             VALUES (?, ?, 'Diagram', ?, ?, 'old.png', 0, ?, 'a cell diagram', 1)",
        )
        .bind(id)
        .bind(module_id)
        .bind(ContentKind::Image)
        .bind(&old_rel)
        .bind(Utc::now())
        .execute(&*db)
        .await
        .unwrap();
        let record = service.get_content(id).await.unwrap();
        let old_path = dir.join(record.file_path.as_deref().unwrap());
        assert!(old_path.exists());

        let replacement = futures::stream::iter(vec![Ok(Bytes::from_static(b"new bytes"))]);
        let updated = service
            .replace_payload(record.id, "new.png".to_string(), replacement)
            .await
            .unwrap();

        assert_eq!(updated.file_name.as_deref(), Some("new.png"));
        assert_eq!(updated.ai_text.as_deref(), Some("a cell diagram"));
        assert!(updated.processed);
        assert!(!old_path.exists());
        let new_path = dir.join(updated.file_path.as_deref().unwrap());
        assert_eq!(std::fs::read(&new_path).unwrap(), b"new bytes");

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn failed_insert_leaves_no_payload_file_behind() {
        let db = setup_test_db().await;
        let dir = std::env::temp_dir().join(format!("eduaccess-test-{}", Uuid::new_v4()));
        let service = test_service(db.clone(), &dir);
        let (_, module_id) = seed_offering_and_module(&db).await;

        // Make the insert fail after the payload has been written.
        sqlx::query("DROP TABLE content").execute(&*db).await.unwrap();

        let payload = futures::stream::iter(vec![Ok(Bytes::from_static(b"payload"))]);
        let err = service
            .create_content(
                module_id,
                NewContent {
                    title: "Chart".into(),
                    kind: ContentKind::Image,
                    body: None,
                    video_url: None,
                    position: 0,
                },
                Some(("chart.png".to_string(), payload)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Sqlx(_)));
        assert_eq!(file_count(&dir), 0);

        let _ = fs::remove_dir_all(&dir).await;
    }

    fn file_count(dir: &Path) -> usize {
        let mut count = 0;
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    count += file_count(&path);
                } else {
                    count += 1;
                }
            }
        }
        count
    }

    #[tokio::test]
    async fn executor_is_a_noop_for_missing_records() {
        let db = setup_test_db().await;
        let dir = std::env::temp_dir().join(format!("eduaccess-test-{}", Uuid::new_v4()));
        let service = test_service(db.clone(), &dir);

        let outcome = service
            .enrichment
            .process_content(Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(outcome, EnrichmentOutcome::MissingRecord);
    }

    #[tokio::test]
    async fn reprocess_reports_errored_items() {
        let db = setup_test_db().await;
        let dir = std::env::temp_dir().join(format!("eduaccess-test-{}", Uuid::new_v4()));
        let service = test_service(db.clone(), &dir);
        let (offering_id, module_id) = seed_offering_and_module(&db).await;

        insert_content(&db, module_id, "IMAGE", None).await;
        insert_content(&db, module_id, "FILE", None).await;
        insert_content(&db, module_id, "IMAGE", Some("already described")).await;
        insert_content(&db, module_id, "TEXT", None).await;

        let report = service.reprocess_pending(offering_id).await.unwrap();
        assert_eq!(report.examined, 2);
        assert_eq!(report.processed, 0);
        assert_eq!(report.errored, 2);
    }
}
