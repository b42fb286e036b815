//! Content items: one unit of instructional material within a module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// What kind of material a content item carries.
///
/// IMAGE and FILE items require AI-generated accessibility text; TEXT,
/// VIDEO, and ASSESSMENT items are treated as inherently accessible by
/// the dashboard.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ContentKind {
    Text,
    Video,
    Image,
    File,
    Assessment,
}

impl ContentKind {
    /// Whether this kind needs AI enrichment to be considered accessible.
    pub fn requires_enrichment(self) -> bool {
        matches!(self, ContentKind::Image | ContentKind::File)
    }
}

impl std::str::FromStr for ContentKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "TEXT" => Ok(ContentKind::Text),
            "VIDEO" => Ok(ContentKind::Video),
            "IMAGE" => Ok(ContentKind::Image),
            "FILE" => Ok(ContentKind::File),
            "ASSESSMENT" => Ok(ContentKind::Assessment),
            other => Err(format!("unknown content kind `{}`", other)),
        }
    }
}

/// One unit of instructional material belonging to a module.
///
/// `ai_text` and `processed` are written only by the enrichment executor:
/// `processed` is true exactly when an enrichment run has stored a result
/// (which may be an error description — see `EnrichmentClient`). Enrichment
/// is never re-scheduled once `processed` is set.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Content {
    pub id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub kind: ContentKind,

    /// Inline text body (TEXT and ASSESSMENT items).
    pub body: Option<String>,

    /// External video reference, normalized to the canonical embed form
    /// at write time when recognized.
    pub video_url: Option<String>,

    /// Relative path of the uploaded payload beneath the upload directory.
    pub file_path: Option<String>,

    /// Original filename of the uploaded payload.
    pub file_name: Option<String>,

    /// Ordering key within the module. Not required to be unique.
    pub position: i64,

    pub created_at: DateTime<Utc>,

    /// AI-generated accessibility text (description or transcription).
    pub ai_text: Option<String>,

    /// True once an enrichment run has stored a result.
    pub processed: bool,
}
